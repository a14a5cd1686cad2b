//! Persisted shapes owned by the key-management core.

use crate::KeyUuid;
use serde::{Deserialize, Serialize};

/// The stored form of one sensitive field: which key encrypted it, the
/// ciphertext, and the nonce it was encrypted under.
///
/// An absent plaintext is stored as a triple whose `encrypted_value` and
/// `nonce` are both `None`. Such a triple still records the key that was
/// active when it was written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encryption {
    /// Key that produced `encrypted_value`.
    #[serde(rename = "encryption_key_uuid")]
    pub key_uuid: KeyUuid,
    /// Ciphertext including the authentication tag.
    pub encrypted_value: Option<Vec<u8>>,
    /// Nonce used for this ciphertext; never reused under the same key.
    pub nonce: Option<Vec<u8>>,
}

impl Encryption {
    /// Builds a triple holding ciphertext.
    #[must_use]
    pub fn new(key_uuid: KeyUuid, encrypted_value: Vec<u8>, nonce: Vec<u8>) -> Self {
        Self {
            key_uuid,
            encrypted_value: Some(encrypted_value),
            nonce: Some(nonce),
        }
    }

    /// Builds the sentinel triple for an absent plaintext.
    #[must_use]
    pub fn empty(key_uuid: KeyUuid) -> Self {
        Self {
            key_uuid,
            encrypted_value: None,
            nonce: None,
        }
    }

    /// True when this triple stands for an absent plaintext.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.encrypted_value.is_none()
    }
}

/// A ciphertext of a well-known marker, stored once per key.
///
/// Only the owning key can decrypt it, which lets startup code work out
/// which persisted key identifier a configured key corresponds to. The
/// `uuid` never changes after the record is created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionKeyCanary {
    pub uuid: KeyUuid,
    pub encrypted_canary_value: Vec<u8>,
    pub nonce: Vec<u8>,
}

impl EncryptionKeyCanary {
    /// Creates a canary record for the given key identifier.
    #[must_use]
    pub fn new(uuid: KeyUuid, encrypted_canary_value: Vec<u8>, nonce: Vec<u8>) -> Self {
        Self {
            uuid,
            encrypted_canary_value,
            nonce,
        }
    }
}
