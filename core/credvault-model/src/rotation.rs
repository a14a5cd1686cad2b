//! Migrating stored credentials onto the active key.

use crate::error::ModelResult;
use crate::store::CredentialStore;
use credvault_keys::{Encryptor, KeyStatus};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Outcome of one rotation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationReport {
    /// Re-encrypted and saved.
    pub rotated: usize,
    /// Already entirely under the active key.
    pub skipped: usize,
    /// Could not be decrypted, re-encrypted, or saved.
    pub failed: usize,
}

/// Re-encrypts every stored credential that still has a field under a key
/// other than the active one.
///
/// A failure on one credential is logged and counted; the run continues.
pub struct EncryptionKeyRotator {
    encryptor: Encryptor,
}

impl EncryptionKeyRotator {
    pub fn new(encryptor: Encryptor) -> Self {
        Self { encryptor }
    }

    pub fn rotate(&self, store: &dyn CredentialStore) -> ModelResult<RotationReport> {
        let active = self.encryptor.active_key_uuid()?;
        let credentials = store.find_all()?;
        info!(active = %active, total = credentials.len(), "Starting key rotation");

        let mut report = RotationReport::default();
        for mut credential in credentials {
            if credential.key_uuids().iter().all(|uuid| *uuid == active) {
                report.skipped += 1;
                continue;
            }

            let result = credential
                .rotate(&self.encryptor)
                .and_then(|()| store.save(credential.clone()));
            match result {
                Ok(()) => {
                    debug!(credential = %credential.name, id = %credential.id, "Rotated credential");
                    report.rotated += 1;
                }
                Err(e) => {
                    warn!(credential = %credential.name, id = %credential.id, error = %e, "Failed to rotate credential");
                    report.failed += 1;
                }
            }
        }

        info!(
            rotated = report.rotated,
            skipped = report.skipped,
            failed = report.failed,
            "Key rotation finished"
        );
        Ok(report)
    }
}

/// Credential versions counted by the status of their least current key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyUsage {
    pub active_key: usize,
    pub inactive_keys: usize,
    pub unknown_keys: usize,
}

/// Counts stored credential versions by the keys their fields use. A version
/// with any field under an unknown key counts as unknown; otherwise one with
/// any field under an inactive key counts as inactive.
pub fn key_usage(store: &dyn CredentialStore, encryptor: &Encryptor) -> ModelResult<KeyUsage> {
    let mut usage = KeyUsage::default();
    for credential in store.find_all()? {
        let statuses: Vec<KeyStatus> = credential
            .key_uuids()
            .iter()
            .map(|uuid| encryptor.key_status(uuid))
            .collect();
        if statuses.contains(&KeyStatus::Unknown) {
            usage.unknown_keys += 1;
        } else if statuses.contains(&KeyStatus::Inactive) {
            usage.inactive_keys += 1;
        } else {
            usage.active_key += 1;
        }
    }
    Ok(usage)
}
