//! Credential model for credvault.
//!
//! - [`Credential`]: a named, typed credential whose secret parts are held
//!   as [`EncryptedField`]s and only ever stored encrypted
//! - [`StringGenerationParameters`] and [`RsaSshGenerationParameters`]:
//!   the settings a credential was generated with, themselves encrypted
//! - [`CredentialStore`]: persistence, with an in-memory implementation
//! - [`EncryptionKeyRotator`]: moves stored credentials onto the active key

mod credential;
mod error;
mod field;
mod parameters;
mod rotation;
mod store;

pub use credential::{Credential, CredentialValue};
pub use error::{ModelError, ModelResult};
pub use field::EncryptedField;
pub use parameters::{RsaSshGenerationParameters, StringGenerationParameters, VALID_KEY_LENGTHS};
pub use rotation::{key_usage, EncryptionKeyRotator, KeyUsage, RotationReport};
pub use store::{CredentialStore, FileCredentialStore, InMemoryCredentialStore};
