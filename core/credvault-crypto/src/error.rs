//! Error types for the encryption layer.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key derivation failed.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Encryption failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Decryption failed (wrong key or tampered data).
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// Invalid nonce length.
    #[error("invalid nonce length: expected {expected}, got {actual}")]
    InvalidNonceLength { expected: usize, actual: usize },

    /// Salt could not be decoded.
    #[error("invalid salt: {0}")]
    InvalidSalt(String),

    /// A key handle was given to a backend that cannot use it.
    #[error("unsupported key: {0}")]
    UnsupportedKey(String),

    /// The external key module rejected an operation.
    #[error("key module error: {0}")]
    Backend(String),

    /// A key produced a failure against a canary that is not a clean
    /// key mismatch. The key or its backend is misconfigured.
    #[error("incorrect key configuration: {0}")]
    IncorrectKey(String),
}
