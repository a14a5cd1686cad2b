//! Error types for key resolution and the encryptor.

use credvault_crypto::CryptoError;
use credvault_types::KeyUuid;
use thiserror::Error;

/// Result type for key resolution.
pub type KeyResult<T> = Result<T, KeyError>;

/// Failures while loading configuration or resolving keys at startup.
/// All of them are fatal: the process must not start.
#[derive(Debug, Error)]
pub enum KeyError {
    /// No usable active key: zero or several declared, the same key listed
    /// twice, or the active key could not be matched or created.
    #[error("key resolution failed: {0}")]
    KeyResolution(String),

    /// A configured key failed a canary check in a way that is not a plain
    /// key mismatch.
    #[error("incorrect key configuration for {key}: {reason}")]
    IncorrectKeyConfiguration { key: String, reason: String },

    /// Key material in the configuration is missing or malformed.
    #[error("invalid key configuration: {0}")]
    InvalidConfig(String),

    /// Canary persistence failed.
    #[error("canary store error: {0}")]
    Store(String),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for encryptor operations.
pub type EncryptorResult<T> = Result<T, EncryptorError>;

/// Per-call failures from [`crate::Encryptor`].
#[derive(Debug, Error)]
pub enum EncryptorError {
    /// No active key is loaded.
    #[error("encryptor unavailable (no active key)")]
    Unavailable,

    /// The value was written under a key that is no longer configured.
    #[error("unknown encryption key reference: {0}")]
    UnknownKeyReference(KeyUuid),

    /// Integrity check failed, or the stored triple is incomplete.
    #[error("crypto error: {0}")]
    Crypto(String),
}
