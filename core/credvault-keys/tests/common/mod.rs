#![allow(dead_code)]

use credvault_crypto::{EncryptionService, KdfParams, PasswordEncryptionService, Salt, DEPRECATED_CANARY_VALUE};
use credvault_keys::{EncryptionConfig, KeyDescriptor};
use credvault_types::{Encryption, EncryptionKeyCanary, KeyUuid};

/// Fast Argon2 parameters so tests do not spend seconds per key.
pub fn fast_kdf() -> KdfParams {
    KdfParams {
        memory_cost: 1024,
        time_cost: 1,
        parallelism: 1,
    }
}

pub fn config(keys: Vec<KeyDescriptor>) -> EncryptionConfig {
    EncryptionConfig::new(keys).with_kdf(fast_kdf())
}

pub fn software_service() -> PasswordEncryptionService {
    PasswordEncryptionService::new(fast_kdf())
}

/// A canary as an older release would have written it for `password`.
pub fn deprecated_canary(uuid: KeyUuid, password: &str) -> EncryptionKeyCanary {
    let service = software_service();
    let key = service.create_key(password, &Salt::default()).unwrap();
    let encrypted = service.encrypt(&key, &DEPRECATED_CANARY_VALUE).unwrap();
    EncryptionKeyCanary::new(uuid, encrypted.ciphertext, encrypted.nonce)
}

/// A value written directly under `password`'s key and tagged with `uuid`.
pub fn value_under(uuid: KeyUuid, password: &str, plaintext: &str) -> Encryption {
    let service = software_service();
    let key = service.create_key(password, &Salt::default()).unwrap();
    let encrypted = service.encrypt(&key, plaintext.as_bytes()).unwrap();
    Encryption::new(uuid, encrypted.ciphertext, encrypted.nonce)
}
