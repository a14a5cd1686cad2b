//! Encryption key lifecycle for credvault.
//!
//! Startup runs [`EncryptionKeyCanaryMapper::resolve`] once: every configured
//! key is matched against the persisted canaries to recover its identifier
//! (or gets a new identifier and canary), and exactly one key is active.
//! The resulting [`EncryptionKeySet`] is immutable and shared by every
//! [`Encryptor`], which is the only way the rest of the system reaches keys.

mod config;
mod encryptor;
mod error;
mod key_set;
mod mapper;
mod store;

pub use config::{EncryptionConfig, KeyDescriptor};
pub use encryptor::{Encryptor, KeyStatus};
pub use error::{EncryptorError, EncryptorResult, KeyError, KeyResult};
pub use key_set::EncryptionKeySet;
pub use mapper::{EncryptionKeyCanaryMapper, HardwareService};
pub use store::{CanaryStore, FileCanaryStore, InMemoryCanaryStore};
