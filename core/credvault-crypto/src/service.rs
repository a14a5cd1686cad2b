//! The encryption backend contract.

use crate::cipher::EncryptedData;
use crate::error::CryptoResult;
use crate::key::DerivedKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which backend holds a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Key material derived in-process from a configured password.
    Software,
    /// Key material held by an external module; only a label is known here.
    Hardware,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Software => f.write_str("software"),
            Self::Hardware => f.write_str("hardware"),
        }
    }
}

/// A raw key as seen by one backend.
#[derive(Clone)]
pub enum KeyHandle {
    Software(DerivedKey),
    Hardware { label: String },
}

impl KeyHandle {
    /// The backend this handle belongs to.
    pub fn provider(&self) -> ProviderKind {
        match self {
            Self::Software(_) => ProviderKind::Software,
            Self::Hardware { .. } => ProviderKind::Hardware,
        }
    }

    /// Short operator-facing description that never includes key material.
    pub fn describe(&self) -> String {
        match self {
            Self::Software(_) => "password-derived key".to_string(),
            Self::Hardware { label } => format!("hardware key '{label}'"),
        }
    }
}

impl fmt::Debug for KeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Software(_) => f.write_str("KeyHandle::Software([REDACTED])"),
            Self::Hardware { label } => f.debug_struct("KeyHandle::Hardware").field("label", label).finish(),
        }
    }
}

/// Why a decrypt call did not return plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecryptFailure {
    /// The authentication tag did not verify: the ciphertext was not
    /// produced by this key, or was modified.
    #[error("authentication tag mismatch")]
    AuthMismatch,

    /// The primitive rejected the shape of the input. `signal` is the
    /// backend's own status (e.g. `0x40`); whether it means "wrong key" is
    /// decided by [`EncryptionService::is_expected_mismatch`].
    #[error("malformed input ({signal})")]
    MalformedInput { signal: String },

    /// Anything else: the backend or key is not working.
    #[error("{0}")]
    Other(String),
}

/// Outcome of [`EncryptionService::decrypt`].
pub type DecryptResult = Result<Vec<u8>, DecryptFailure>;

/// Authenticated encrypt/decrypt over a raw key handle.
///
/// Implementations are stateless per call and safe to share between
/// threads. `encrypt` must draw a fresh random nonce every time.
pub trait EncryptionService: Send + Sync {
    /// The backend kind this service serves.
    fn provider(&self) -> ProviderKind;

    /// Encrypts `plaintext` under `key` with a fresh nonce.
    fn encrypt(&self, key: &KeyHandle, plaintext: &[u8]) -> CryptoResult<EncryptedData>;

    /// Decrypts and authenticates `ciphertext`.
    fn decrypt(&self, key: &KeyHandle, ciphertext: &[u8], nonce: &[u8]) -> DecryptResult;

    /// Whether a [`DecryptFailure::MalformedInput`] signal from this backend
    /// is the pattern it produces for an ordinary key mismatch.
    fn is_expected_mismatch(&self, _signal: &str) -> bool {
        false
    }
}
