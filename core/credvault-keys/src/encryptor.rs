//! The encryptor facade.
//!
//! Credential code never sees keys. It hands plaintext to
//! [`Encryptor::encrypt`] and stores the returned triple; to read, it hands
//! the triple back to [`Encryptor::decrypt`], which finds the key by the
//! triple's identifier whether or not that key is still active.

use crate::error::{EncryptorError, EncryptorResult};
use crate::key_set::EncryptionKeySet;
use credvault_crypto::DecryptFailure;
use credvault_types::{Encryption, KeyUuid};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Where a key identifier stands relative to the loaded key set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStatus {
    Active,
    Inactive,
    Unknown,
}

/// Encrypts under the active key and decrypts under any known key.
///
/// Cheap to clone; all clones share one immutable key set.
#[derive(Debug, Clone)]
pub struct Encryptor {
    keys: Option<Arc<EncryptionKeySet>>,
}

impl Encryptor {
    pub fn new(keys: Arc<EncryptionKeySet>) -> Self {
        Self { keys: Some(keys) }
    }

    /// An encryptor with no keys loaded. Every call that needs a key fails
    /// with [`EncryptorError::Unavailable`].
    pub fn unavailable() -> Self {
        Self { keys: None }
    }

    pub fn is_available(&self) -> bool {
        self.keys.is_some()
    }

    pub fn key_set(&self) -> EncryptorResult<&EncryptionKeySet> {
        self.keys.as_deref().ok_or(EncryptorError::Unavailable)
    }

    pub fn active_key_uuid(&self) -> EncryptorResult<KeyUuid> {
        Ok(self.key_set()?.active_key_uuid())
    }

    pub fn key_status(&self, uuid: &KeyUuid) -> KeyStatus {
        match self.keys.as_deref() {
            Some(keys) if keys.active_key_uuid() == *uuid => KeyStatus::Active,
            Some(keys) if keys.contains(uuid) => KeyStatus::Inactive,
            _ => KeyStatus::Unknown,
        }
    }

    /// Encrypts a string under the active key. `None` yields the empty
    /// sentinel triple without touching the cipher.
    pub fn encrypt(&self, plaintext: Option<&str>) -> EncryptorResult<Encryption> {
        self.encrypt_bytes(plaintext.map(str::as_bytes))
    }

    /// Decrypts a triple written by [`Encryptor::encrypt`].
    pub fn decrypt(&self, encryption: &Encryption) -> EncryptorResult<Option<String>> {
        self.decrypt_bytes(encryption)?
            .map(|bytes| {
                String::from_utf8(bytes)
                    .map_err(|_| EncryptorError::Crypto("decrypted value is not valid UTF-8".into()))
            })
            .transpose()
    }

    pub fn encrypt_bytes(&self, plaintext: Option<&[u8]>) -> EncryptorResult<Encryption> {
        let keys = self.key_set()?;
        let active = keys.active_key_uuid();

        let Some(plaintext) = plaintext else {
            return Ok(Encryption::empty(active));
        };

        let proxy = keys.active_key();
        let encrypted = proxy
            .service()
            .encrypt(proxy.key(), plaintext)
            .map_err(|e| EncryptorError::Crypto(format!("encryption under key {active} failed: {e}")))?;
        Ok(Encryption::new(active, encrypted.ciphertext, encrypted.nonce))
    }

    pub fn decrypt_bytes(&self, encryption: &Encryption) -> EncryptorResult<Option<Vec<u8>>> {
        let Some(ciphertext) = encryption.encrypted_value.as_deref() else {
            return Ok(None);
        };

        let keys = self.key_set()?;
        let uuid = encryption.key_uuid;
        let proxy = keys.get(&uuid).ok_or_else(|| {
            debug!(key = %uuid, "Decrypt requested for a key that is not configured");
            EncryptorError::UnknownKeyReference(uuid)
        })?;
        let nonce = encryption
            .nonce
            .as_deref()
            .ok_or_else(|| EncryptorError::Crypto("stored value has no nonce".into()))?;

        proxy
            .service()
            .decrypt(proxy.key(), ciphertext, nonce)
            .map(Some)
            .map_err(|failure| {
                let reason = match failure {
                    DecryptFailure::AuthMismatch => "integrity check failed",
                    DecryptFailure::MalformedInput { .. } => "stored value is malformed",
                    DecryptFailure::Other(_) => "key backend failed",
                };
                EncryptorError::Crypto(format!("value under key {uuid}: {reason}"))
            })
    }
}
