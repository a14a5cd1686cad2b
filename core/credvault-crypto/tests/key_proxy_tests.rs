use credvault_crypto::{
    CryptoError, CryptoResult, DecryptFailure, DecryptResult, EncryptedData, EncryptionService,
    HardwareEncryptionService, KdfParams, KeyHandle, KeyProxy, PasswordEncryptionService,
    ProviderKind, Salt, SoftHsm, CANARY_VALUE, DEPRECATED_CANARY_VALUE,
};
use credvault_types::{EncryptionKeyCanary, KeyUuid};
use std::sync::Arc;

fn software() -> PasswordEncryptionService {
    PasswordEncryptionService::new(KdfParams {
        memory_cost: 1024,
        time_cost: 1,
        parallelism: 1,
    })
}

fn canary_for(service: &PasswordEncryptionService, key: &KeyHandle, marker: &[u8]) -> EncryptionKeyCanary {
    let encrypted = service.encrypt(key, marker).unwrap();
    EncryptionKeyCanary::new(KeyUuid::new(), encrypted.ciphertext, encrypted.nonce)
}

fn any_canary() -> EncryptionKeyCanary {
    EncryptionKeyCanary::new(KeyUuid::new(), vec![0; 32], vec![0; 12])
}

/// Backend whose decrypt always fails with the given tag.
struct FailingService {
    failure: DecryptFailure,
    mismatch_signal: Option<&'static str>,
}

impl EncryptionService for FailingService {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Hardware
    }

    fn encrypt(&self, _key: &KeyHandle, _plaintext: &[u8]) -> CryptoResult<EncryptedData> {
        Err(CryptoError::Encryption("not used".into()))
    }

    fn decrypt(&self, _key: &KeyHandle, _ciphertext: &[u8], _nonce: &[u8]) -> DecryptResult {
        Err(self.failure.clone())
    }

    fn is_expected_mismatch(&self, signal: &str) -> bool {
        self.mismatch_signal.is_some_and(|s| signal.contains(s))
    }
}

fn failing_proxy(failure: DecryptFailure, mismatch_signal: Option<&'static str>) -> KeyProxy {
    KeyProxy::new(
        KeyHandle::Hardware { label: "k".into() },
        Arc::new(FailingService {
            failure,
            mismatch_signal,
        }),
    )
}

// ── Matching ─────────────────────────────────────────────────────

#[test]
fn matches_canary_when_canary_matches() {
    let service = software();
    let key = service.create_key("p@ssword", &Salt::default()).unwrap();
    let canary = canary_for(&service, &key, &CANARY_VALUE);

    let subject = KeyProxy::new(key, Arc::new(software()));
    assert!(subject.matches_canary(&canary).unwrap());
}

#[test]
fn matches_canary_using_deprecated_marker() {
    let service = software();
    let key = service.create_key("p@ssword", &Salt::default()).unwrap();
    let canary = canary_for(&service, &key, &DEPRECATED_CANARY_VALUE);

    let subject = KeyProxy::new(key, Arc::new(software()));
    assert!(subject.matches_canary(&canary).unwrap());
}

#[test]
fn other_plaintext_is_not_a_match() {
    let service = software();
    let key = service.create_key("p@ssword", &Salt::default()).unwrap();
    let canary = canary_for(&service, &key, b"something else");

    let subject = KeyProxy::new(key, Arc::new(software()));
    assert!(!subject.matches_canary(&canary).unwrap());
}

#[test]
fn different_password_does_not_match() {
    let service = software();
    let key = service.create_key("p@ssword", &Salt::default()).unwrap();
    let canary = canary_for(&service, &key, &CANARY_VALUE);

    let other = service.create_key("different", &Salt::default()).unwrap();
    let subject = KeyProxy::new(other, Arc::new(software()));
    assert!(!subject.matches_canary(&canary).unwrap());
}

#[test]
fn hardware_wrong_key_does_not_match() {
    let service = Arc::new(HardwareEncryptionService::new(SoftHsm::new()));
    let a = KeyProxy::new(service.open_key("a").unwrap(), service.clone());
    let b = KeyProxy::new(service.open_key("b").unwrap(), service.clone());

    let canary = a.create_canary(KeyUuid::new()).unwrap();
    assert!(a.matches_canary(&canary).unwrap());
    assert!(!b.matches_canary(&canary).unwrap());
}

// ── Failure classification ───────────────────────────────────────

#[test]
fn auth_mismatch_returns_false() {
    let subject = failing_proxy(DecryptFailure::AuthMismatch, None);
    assert!(!subject.matches_canary(&any_canary()).unwrap());
}

#[test]
fn recognised_malformed_input_returns_false() {
    let subject = failing_proxy(
        DecryptFailure::MalformedInput {
            signal: "returns 0x40".into(),
        },
        Some("0x40"),
    );
    assert!(!subject.matches_canary(&any_canary()).unwrap());
}

#[test]
fn unrecognised_malformed_input_is_incorrect_key() {
    let subject = failing_proxy(DecryptFailure::MalformedInput { signal: String::new() }, Some("0x40"));
    let err = subject.matches_canary(&any_canary()).unwrap_err();
    assert!(matches!(err, CryptoError::IncorrectKey(_)));
}

#[test]
fn bad_padding_class_failure_is_incorrect_key() {
    let subject = failing_proxy(DecryptFailure::Other("bad padding".into()), Some("0x40"));
    let err = subject.matches_canary(&any_canary()).unwrap_err();
    assert!(matches!(err, CryptoError::IncorrectKey(msg) if msg.contains("bad padding")));
}

#[test]
fn other_failure_is_incorrect_key() {
    let subject = failing_proxy(DecryptFailure::Other(String::new()), None);
    assert!(matches!(
        subject.matches_canary(&any_canary()),
        Err(CryptoError::IncorrectKey(_))
    ));
}

// ── Canary creation ──────────────────────────────────────────────

#[test]
fn create_canary_encrypts_current_marker() {
    let service = software();
    let key = service.create_key("pw", &Salt::default()).unwrap();
    let subject = KeyProxy::new(key.clone(), Arc::new(software()));
    let uuid = KeyUuid::new();

    let canary = subject.create_canary(uuid).unwrap();
    assert_eq!(canary.uuid, uuid);
    let plaintext = service
        .decrypt(&key, &canary.encrypted_canary_value, &canary.nonce)
        .unwrap();
    assert_eq!(plaintext, CANARY_VALUE);
}

#[test]
fn key_proxy_debug_is_redacted() {
    let key = software().create_key("pw", &Salt::default()).unwrap();
    let subject = KeyProxy::new(key, Arc::new(software()));
    let dbg = format!("{subject:?}");
    assert!(dbg.contains("REDACTED"));
    assert!(dbg.contains("Software"));
}
