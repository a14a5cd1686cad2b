use crate::credential::Credential;
use crate::error::{ModelError, ModelResult};
use credvault_types::CredentialName;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard};
use tracing::info;

/// Persistence for credential versions.
///
/// Names compare case-insensitively. Saving a credential whose id is
/// already stored replaces that version in place; any other save adds a
/// new version, and the newest version is what [`find`](Self::find) returns.
pub trait CredentialStore: Send + Sync {
    /// Latest version of `name`.
    fn find(&self, name: &CredentialName) -> ModelResult<Option<Credential>>;

    fn save(&self, credential: Credential) -> ModelResult<()>;

    /// Removes every version of `name`. Returns whether anything was removed.
    fn delete(&self, name: &CredentialName) -> ModelResult<bool>;

    /// Every stored version, grouped by name, oldest first within a name.
    fn find_all(&self) -> ModelResult<Vec<Credential>>;

    fn find_or_err(&self, name: &CredentialName) -> ModelResult<Credential> {
        self.find(name)?
            .ok_or_else(|| ModelError::NotFound(name.to_string()))
    }
}

/// Credential store held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    versions: RwLock<BTreeMap<String, Vec<Credential>>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All versions of `name`, oldest first.
    pub fn versions(&self, name: &CredentialName) -> ModelResult<Vec<Credential>> {
        let versions = self.read()?;
        Ok(versions.get(&name.folded()).cloned().unwrap_or_default())
    }

    /// Number of distinct credential names.
    pub fn len(&self) -> usize {
        self.versions.read().map(|v| v.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> ModelResult<RwLockReadGuard<'_, BTreeMap<String, Vec<Credential>>>> {
        self.versions
            .read()
            .map_err(|_| ModelError::Store("credential table lock poisoned".into()))
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn find(&self, name: &CredentialName) -> ModelResult<Option<Credential>> {
        let versions = self.read()?;
        Ok(versions
            .get(&name.folded())
            .and_then(|list| list.last())
            .cloned())
    }

    fn save(&self, credential: Credential) -> ModelResult<()> {
        let mut versions = self
            .versions
            .write()
            .map_err(|_| ModelError::Store("credential table lock poisoned".into()))?;
        let list = versions.entry(credential.name.folded()).or_default();
        match list.iter_mut().find(|existing| existing.id == credential.id) {
            Some(existing) => *existing = credential,
            None => list.push(credential),
        }
        Ok(())
    }

    fn delete(&self, name: &CredentialName) -> ModelResult<bool> {
        let mut versions = self
            .versions
            .write()
            .map_err(|_| ModelError::Store("credential table lock poisoned".into()))?;
        Ok(versions.remove(&name.folded()).is_some())
    }

    fn find_all(&self) -> ModelResult<Vec<Credential>> {
        let versions = self.read()?;
        Ok(versions.values().flatten().cloned().collect())
    }
}

/// Credential store persisted as a JSON array of versions in one file.
///
/// Loaded once on open; every change rewrites the file through a temporary
/// file renamed into place.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    inner: InMemoryCredentialStore,
    write_lock: Mutex<()>,
}

impl FileCredentialStore {
    /// Opens `path`, starting empty if the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> ModelResult<Self> {
        let path = path.into();
        let inner = InMemoryCredentialStore::new();
        if path.exists() {
            let bytes = fs::read(&path)
                .map_err(|e| ModelError::Store(format!("failed to read {}: {e}", path.display())))?;
            let credentials: Vec<Credential> = serde_json::from_slice(&bytes)?;
            info!(path = %path.display(), versions = credentials.len(), "Loaded credentials");
            for credential in credentials {
                inner.save(credential)?;
            }
        }
        Ok(Self {
            path,
            inner,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> ModelResult<()> {
        let json = serde_json::to_vec_pretty(&self.inner.find_all()?)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .map_err(|e| ModelError::Store(format!("failed to write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| ModelError::Store(format!("failed to replace {}: {e}", self.path.display())))
    }

    fn lock(&self) -> ModelResult<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| ModelError::Store("credential file lock poisoned".into()))
    }
}

impl CredentialStore for FileCredentialStore {
    fn find(&self, name: &CredentialName) -> ModelResult<Option<Credential>> {
        self.inner.find(name)
    }

    fn save(&self, credential: Credential) -> ModelResult<()> {
        let _guard = self.lock()?;
        self.inner.save(credential)?;
        self.persist()
    }

    fn delete(&self, name: &CredentialName) -> ModelResult<bool> {
        let _guard = self.lock()?;
        let removed = self.inner.delete(name)?;
        if removed {
            self.persist()?;
        }
        Ok(removed)
    }

    fn find_all(&self) -> ModelResult<Vec<Credential>> {
        self.inner.find_all()
    }
}
