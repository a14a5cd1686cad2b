use crate::error::{KeyError, KeyResult};
use credvault_types::EncryptionKeyCanary;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
use tracing::info;

/// Persistence for canary records. Records are insert-only: an identifier,
/// once stored, is never rewritten.
pub trait CanaryStore: Send + Sync {
    /// All canaries, in insertion order.
    fn find_all(&self) -> KeyResult<Vec<EncryptionKeyCanary>>;

    /// Stores a new canary. Fails if its identifier already exists.
    fn save(&self, canary: EncryptionKeyCanary) -> KeyResult<()>;
}

/// Canary store held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryCanaryStore {
    canaries: RwLock<Vec<EncryptionKeyCanary>>,
}

impl InMemoryCanaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from previously persisted records.
    pub fn with_canaries(canaries: Vec<EncryptionKeyCanary>) -> Self {
        Self {
            canaries: RwLock::new(canaries),
        }
    }

    pub fn len(&self) -> usize {
        self.canaries.read().map(|c| c.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CanaryStore for InMemoryCanaryStore {
    fn find_all(&self) -> KeyResult<Vec<EncryptionKeyCanary>> {
        let canaries = self
            .canaries
            .read()
            .map_err(|_| KeyError::Store("canary table lock poisoned".into()))?;
        Ok(canaries.clone())
    }

    fn save(&self, canary: EncryptionKeyCanary) -> KeyResult<()> {
        let mut canaries = self
            .canaries
            .write()
            .map_err(|_| KeyError::Store("canary table lock poisoned".into()))?;
        if canaries.iter().any(|c| c.uuid == canary.uuid) {
            return Err(KeyError::Store(format!("canary {} already exists", canary.uuid)));
        }
        canaries.push(canary);
        Ok(())
    }
}

/// Canary store persisted as a JSON array in a single file.
///
/// The file is read once when the store is opened and rewritten in full on
/// every save, through a temporary file renamed into place.
#[derive(Debug)]
pub struct FileCanaryStore {
    path: PathBuf,
    canaries: InMemoryCanaryStore,
    write_lock: Mutex<()>,
}

impl FileCanaryStore {
    /// Opens `path`, starting empty if the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> KeyResult<Self> {
        let path = path.into();
        let canaries = if path.exists() {
            let bytes = fs::read(&path)
                .map_err(|e| KeyError::Store(format!("failed to read {}: {e}", path.display())))?;
            let canaries: Vec<EncryptionKeyCanary> = serde_json::from_slice(&bytes)?;
            info!(path = %path.display(), count = canaries.len(), "Loaded canaries");
            canaries
        } else {
            info!(path = %path.display(), "No canary file yet, starting empty");
            Vec::new()
        };
        Ok(Self {
            path,
            canaries: InMemoryCanaryStore::with_canaries(canaries),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> KeyResult<()> {
        let json = serde_json::to_vec_pretty(&self.canaries.find_all()?)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .map_err(|e| KeyError::Store(format!("failed to write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| KeyError::Store(format!("failed to replace {}: {e}", self.path.display())))
    }
}

impl CanaryStore for FileCanaryStore {
    fn find_all(&self) -> KeyResult<Vec<EncryptionKeyCanary>> {
        self.canaries.find_all()
    }

    fn save(&self, canary: EncryptionKeyCanary) -> KeyResult<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| KeyError::Store("canary file lock poisoned".into()))?;
        self.canaries.save(canary)?;
        self.persist()
    }
}
