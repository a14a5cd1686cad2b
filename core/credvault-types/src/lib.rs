//! Core type definitions for credvault.
//!
//! This crate defines the identifiers and persisted shapes shared by the
//! key-management core and the credential model:
//! - Key identifiers (UUID v4) and credential identifiers (UUID v7)
//! - Case-insensitive credential names
//! - The encryption triple stored for every sensitive field
//! - The canary record used to re-identify configured keys

mod encryption;
mod ids;
mod name;

pub use encryption::{Encryption, EncryptionKeyCanary};
pub use ids::{CredentialId, KeyUuid};
pub use name::CredentialName;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("invalid credential name: {0}")]
    InvalidName(String),
}
