#![allow(dead_code)]

use credvault_crypto::KdfParams;
use credvault_keys::{EncryptionConfig, EncryptionKeyCanaryMapper, Encryptor, InMemoryCanaryStore, KeyDescriptor};
use credvault_types::CredentialName;
use std::sync::Arc;

pub fn fast_kdf() -> KdfParams {
    KdfParams {
        memory_cost: 1024,
        time_cost: 1,
        parallelism: 1,
    }
}

/// Resolves `keys` against `store` and wraps the result in an encryptor.
pub fn encryptor_with(keys: Vec<KeyDescriptor>, store: &Arc<InMemoryCanaryStore>) -> Encryptor {
    let config = EncryptionConfig::new(keys).with_kdf(fast_kdf());
    let set = EncryptionKeyCanaryMapper::new(config, store.clone())
        .resolve()
        .unwrap();
    Encryptor::new(Arc::new(set))
}

pub fn encryptor() -> Encryptor {
    encryptor_with(
        vec![KeyDescriptor::software("model-tests").active()],
        &Arc::new(InMemoryCanaryStore::new()),
    )
}

/// Two encryptors over the same canaries: `before` has only `old` active,
/// `after` has `new` active and `old` inactive.
pub fn rotated_pair() -> (Encryptor, Encryptor) {
    let store = Arc::new(InMemoryCanaryStore::new());
    let before = encryptor_with(vec![KeyDescriptor::software("old").active()], &store);
    let after = encryptor_with(
        vec![KeyDescriptor::software("new").active(), KeyDescriptor::software("old")],
        &store,
    );
    (before, after)
}

pub fn name(s: &str) -> CredentialName {
    CredentialName::new(s).unwrap()
}
