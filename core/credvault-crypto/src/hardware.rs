//! Hardware-backed encryption.
//!
//! Keys never leave the external module: this side only knows their labels
//! and forwards encrypt/decrypt calls through an [`HsmClient`]. Modules
//! report failures as numeric status codes, and a failed tag check usually
//! comes back as "encrypted data invalid" (`0x40`) rather than a distinct
//! authentication error, so the service keeps a configurable set of codes
//! that count as a plain key mismatch.

use crate::cipher::{self, EncryptedData};
use crate::error::{CryptoError, CryptoResult};
use crate::key::{generate_random_key, DerivedKey};
use crate::service::{DecryptFailure, DecryptResult, EncryptionService, KeyHandle, ProviderKind};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::info;

/// Status codes used by [`SoftHsm`] and the default classification.
pub mod status {
    pub const GENERAL_ERROR: u32 = 0x05;
    pub const DEVICE_ERROR: u32 = 0x30;
    pub const ENCRYPTED_DATA_INVALID: u32 = 0x40;
    pub const ENCRYPTED_DATA_LEN_RANGE: u32 = 0x41;
    pub const KEY_HANDLE_INVALID: u32 = 0x60;
}

/// A failed call into the external module.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("module returned {code:#04x}: {message}")]
pub struct HsmError {
    pub code: u32,
    pub message: String,
}

impl HsmError {
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Connection to an external key module.
pub trait HsmClient: Send + Sync {
    fn has_key(&self, label: &str) -> Result<bool, HsmError>;

    fn create_key(&self, label: &str) -> Result<(), HsmError>;

    fn encrypt(&self, label: &str, plaintext: &[u8]) -> Result<EncryptedData, HsmError>;

    fn decrypt(&self, label: &str, ciphertext: &[u8], nonce: &[u8]) -> Result<Vec<u8>, HsmError>;
}

impl<C: HsmClient + ?Sized> HsmClient for Arc<C> {
    fn has_key(&self, label: &str) -> Result<bool, HsmError> {
        (**self).has_key(label)
    }

    fn create_key(&self, label: &str) -> Result<(), HsmError> {
        (**self).create_key(label)
    }

    fn encrypt(&self, label: &str, plaintext: &[u8]) -> Result<EncryptedData, HsmError> {
        (**self).encrypt(label, plaintext)
    }

    fn decrypt(&self, label: &str, ciphertext: &[u8], nonce: &[u8]) -> Result<Vec<u8>, HsmError> {
        (**self).decrypt(label, ciphertext, nonce)
    }
}

fn signal_for(code: u32) -> String {
    format!("{code:#04x}")
}

fn parse_signal(signal: &str) -> Option<u32> {
    let hex = signal.trim().strip_prefix("0x")?;
    u32::from_str_radix(hex, 16).ok()
}

/// Encryption service that delegates every operation to an external module.
pub struct HardwareEncryptionService<C> {
    client: C,
    malformed_codes: HashSet<u32>,
    mismatch_codes: HashSet<u32>,
}

impl<C: HsmClient> HardwareEncryptionService<C> {
    /// Uses the default classification: `0x40` and `0x41` are malformed
    /// input, and `0x40` is what the module returns for a wrong key.
    pub fn new(client: C) -> Self {
        Self {
            client,
            malformed_codes: HashSet::from([
                status::ENCRYPTED_DATA_INVALID,
                status::ENCRYPTED_DATA_LEN_RANGE,
            ]),
            mismatch_codes: HashSet::from([status::ENCRYPTED_DATA_INVALID]),
        }
    }

    /// Replaces the codes treated as an ordinary key mismatch.
    /// Every mismatch code is also treated as malformed input.
    pub fn with_mismatch_codes(mut self, codes: impl IntoIterator<Item = u32>) -> Self {
        self.mismatch_codes = codes.into_iter().collect();
        self.malformed_codes.extend(self.mismatch_codes.iter().copied());
        self
    }

    /// Replaces the codes reported as [`DecryptFailure::MalformedInput`].
    pub fn with_malformed_codes(mut self, codes: impl IntoIterator<Item = u32>) -> Self {
        self.malformed_codes = codes.into_iter().collect();
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Returns the handle for `label`, generating the key inside the module
    /// first if it does not exist yet.
    pub fn open_key(&self, label: &str) -> CryptoResult<KeyHandle> {
        if label.trim().is_empty() {
            return Err(CryptoError::UnsupportedKey("hardware key label must not be empty".into()));
        }
        let exists = self
            .client
            .has_key(label)
            .map_err(|e| CryptoError::Backend(e.to_string()))?;
        if !exists {
            info!(label = %label, "Generating key inside hardware module");
            self.client
                .create_key(label)
                .map_err(|e| CryptoError::Backend(e.to_string()))?;
        }
        Ok(KeyHandle::Hardware {
            label: label.to_string(),
        })
    }
}

impl<C: HsmClient> EncryptionService for HardwareEncryptionService<C> {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Hardware
    }

    fn encrypt(&self, key: &KeyHandle, plaintext: &[u8]) -> CryptoResult<EncryptedData> {
        match key {
            KeyHandle::Hardware { label } => self
                .client
                .encrypt(label, plaintext)
                .map_err(|e| CryptoError::Encryption(e.to_string())),
            other => Err(CryptoError::UnsupportedKey(format!(
                "{} cannot be used by the hardware backend",
                other.describe()
            ))),
        }
    }

    fn decrypt(&self, key: &KeyHandle, ciphertext: &[u8], nonce: &[u8]) -> DecryptResult {
        let KeyHandle::Hardware { label } = key else {
            return Err(DecryptFailure::Other(format!(
                "{} cannot be used by the hardware backend",
                key.describe()
            )));
        };

        self.client.decrypt(label, ciphertext, nonce).map_err(|e| {
            if self.malformed_codes.contains(&e.code) {
                DecryptFailure::MalformedInput {
                    signal: signal_for(e.code),
                }
            } else {
                DecryptFailure::Other(e.to_string())
            }
        })
    }

    fn is_expected_mismatch(&self, signal: &str) -> bool {
        parse_signal(signal).is_some_and(|code| self.mismatch_codes.contains(&code))
    }
}

/// In-process stand-in for a hardware module.
///
/// Keys are random and held in memory for the lifetime of the value.
/// Failure reporting mirrors a real module: a failed tag check is
/// `0x40`, a bad nonce size `0x41`, an unknown label `0x60`.
#[derive(Default)]
pub struct SoftHsm {
    keys: RwLock<HashMap<String, DerivedKey>>,
}

impl SoftHsm {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(&self, label: &str) -> Result<DerivedKey, HsmError> {
        let keys = self
            .keys
            .read()
            .map_err(|_| HsmError::new(status::GENERAL_ERROR, "key table poisoned"))?;
        keys.get(label)
            .cloned()
            .ok_or_else(|| HsmError::new(status::KEY_HANDLE_INVALID, format!("no key labelled '{label}'")))
    }
}

impl HsmClient for SoftHsm {
    fn has_key(&self, label: &str) -> Result<bool, HsmError> {
        let keys = self
            .keys
            .read()
            .map_err(|_| HsmError::new(status::GENERAL_ERROR, "key table poisoned"))?;
        Ok(keys.contains_key(label))
    }

    fn create_key(&self, label: &str) -> Result<(), HsmError> {
        let mut keys = self
            .keys
            .write()
            .map_err(|_| HsmError::new(status::GENERAL_ERROR, "key table poisoned"))?;
        keys.entry(label.to_string()).or_insert_with(generate_random_key);
        Ok(())
    }

    fn encrypt(&self, label: &str, plaintext: &[u8]) -> Result<EncryptedData, HsmError> {
        let key = self.key(label)?;
        cipher::encrypt(&key, plaintext).map_err(|e| HsmError::new(status::DEVICE_ERROR, e.to_string()))
    }

    fn decrypt(&self, label: &str, ciphertext: &[u8], nonce: &[u8]) -> Result<Vec<u8>, HsmError> {
        let key = self.key(label)?;
        cipher::decrypt(&key, ciphertext, nonce).map_err(|e| match e {
            CryptoError::InvalidNonceLength { .. } => {
                HsmError::new(status::ENCRYPTED_DATA_LEN_RANGE, e.to_string())
            }
            CryptoError::Decryption(_) => HsmError::new(status::ENCRYPTED_DATA_INVALID, e.to_string()),
            other => HsmError::new(status::DEVICE_ERROR, other.to_string()),
        })
    }
}
