use crate::error::{CryptoError, CryptoResult};
use crate::service::{DecryptFailure, EncryptionService, KeyHandle};
use credvault_types::{EncryptionKeyCanary, KeyUuid};
use std::sync::Arc;
use tracing::debug;

/// Marker encrypted into every canary written today.
pub const CANARY_VALUE: [u8; 64] = [0; 64];

/// Marker used by canaries written before the marker changed. Still
/// accepted when matching.
pub const DEPRECATED_CANARY_VALUE: [u8; 128] = [0; 128];

/// One configured key plus the backend that can use it.
#[derive(Clone)]
pub struct KeyProxy {
    key: KeyHandle,
    service: Arc<dyn EncryptionService>,
}

impl KeyProxy {
    pub fn new(key: KeyHandle, service: Arc<dyn EncryptionService>) -> Self {
        Self { key, service }
    }

    pub fn key(&self) -> &KeyHandle {
        &self.key
    }

    pub fn service(&self) -> &Arc<dyn EncryptionService> {
        &self.service
    }

    /// Whether the wrapped key produced `canary`.
    ///
    /// A tag mismatch, or a malformed-input failure the backend recognises
    /// as its key-mismatch pattern, means "not this key" and yields
    /// `Ok(false)`, as does plaintext that is neither marker. Every other
    /// failure means the key or backend is broken and is returned as
    /// [`CryptoError::IncorrectKey`].
    pub fn matches_canary(&self, canary: &EncryptionKeyCanary) -> CryptoResult<bool> {
        match self
            .service
            .decrypt(&self.key, &canary.encrypted_canary_value, &canary.nonce)
        {
            Ok(plaintext) => {
                Ok(plaintext == CANARY_VALUE.as_slice() || plaintext == DEPRECATED_CANARY_VALUE.as_slice())
            }
            Err(DecryptFailure::AuthMismatch) => Ok(false),
            Err(DecryptFailure::MalformedInput { signal }) if self.service.is_expected_mismatch(&signal) => {
                debug!(canary = %canary.uuid, signal = %signal, "Malformed-input failure treated as key mismatch");
                Ok(false)
            }
            Err(failure) => Err(CryptoError::IncorrectKey(format!(
                "{} failed checking canary {}: {failure}",
                self.key.describe(),
                canary.uuid
            ))),
        }
    }

    /// Encrypts the current marker under the wrapped key, producing the
    /// canary record for a newly assigned identifier.
    pub fn create_canary(&self, uuid: KeyUuid) -> CryptoResult<EncryptionKeyCanary> {
        let encrypted = self.service.encrypt(&self.key, &CANARY_VALUE)?;
        Ok(EncryptionKeyCanary::new(uuid, encrypted.ciphertext, encrypted.nonce))
    }
}

impl std::fmt::Debug for KeyProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyProxy")
            .field("key", &self.key)
            .field("provider", &self.service.provider())
            .finish()
    }
}
