//! Encryption layer for credvault.
//!
//! - [`key`]: Argon2id key derivation and zeroizing key material
//! - [`cipher`]: ChaCha20-Poly1305 authenticated encryption with random nonces
//! - [`EncryptionService`]: the backend contract. `decrypt` reports failures
//!   as a tagged [`DecryptFailure`] so callers can tell "not this key" apart
//!   from "this key or backend is broken"
//! - [`PasswordEncryptionService`]: software backend, keys derived from passwords
//! - [`HardwareEncryptionService`]: keys live in an external module reached
//!   through [`HsmClient`]; [`SoftHsm`] is an in-process stand-in
//! - [`KeyProxy`]: answers whether a key produced a given canary

pub mod cipher;
mod error;
pub mod hardware;
pub mod key;
mod proxy;
mod service;
mod software;

pub use cipher::{EncryptedData, NONCE_SIZE, TAG_SIZE};
pub use error::{CryptoError, CryptoResult};
pub use hardware::{HardwareEncryptionService, HsmClient, HsmError, SoftHsm};
pub use key::{derive_key, generate_random_key, DerivedKey, KdfParams, Salt, KEY_SIZE, SALT_SIZE};
pub use proxy::{KeyProxy, CANARY_VALUE, DEPRECATED_CANARY_VALUE};
pub use service::{DecryptFailure, DecryptResult, EncryptionService, KeyHandle, ProviderKind};
pub use software::PasswordEncryptionService;
