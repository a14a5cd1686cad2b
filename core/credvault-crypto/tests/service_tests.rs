use credvault_crypto::hardware::status;
use credvault_crypto::{
    CryptoError, DecryptFailure, EncryptionService, HardwareEncryptionService, HsmClient, KdfParams,
    KeyHandle, PasswordEncryptionService, ProviderKind, Salt, SoftHsm,
};
use std::sync::Arc;

fn software() -> PasswordEncryptionService {
    PasswordEncryptionService::new(KdfParams {
        memory_cost: 1024,
        time_cost: 1,
        parallelism: 1,
    })
}

// ── Software backend ─────────────────────────────────────────────

#[test]
fn software_roundtrip() {
    let service = software();
    let key = service.create_key("p@ssword", &Salt::default()).unwrap();
    let encrypted = service.encrypt(&key, b"secret").unwrap();
    assert_eq!(service.decrypt(&key, &encrypted.ciphertext, &encrypted.nonce).unwrap(), b"secret");
}

#[test]
fn software_same_password_same_key() {
    let service = software();
    let key1 = service.create_key("p@ssword", &Salt::default()).unwrap();
    let key2 = service.create_key("p@ssword", &Salt::default()).unwrap();
    let encrypted = service.encrypt(&key1, b"secret").unwrap();
    assert!(service.decrypt(&key2, &encrypted.ciphertext, &encrypted.nonce).is_ok());
}

#[test]
fn software_wrong_key_is_auth_mismatch() {
    let service = software();
    let key1 = service.create_key("first", &Salt::default()).unwrap();
    let key2 = service.create_key("second", &Salt::default()).unwrap();
    let encrypted = service.encrypt(&key1, b"secret").unwrap();
    assert_eq!(
        service.decrypt(&key2, &encrypted.ciphertext, &encrypted.nonce),
        Err(DecryptFailure::AuthMismatch)
    );
}

#[test]
fn software_bad_nonce_is_malformed_and_not_a_mismatch() {
    let service = software();
    let key = service.create_key("pw", &Salt::default()).unwrap();
    let encrypted = service.encrypt(&key, b"secret").unwrap();
    let failure = service.decrypt(&key, &encrypted.ciphertext, &[0u8; 4]).unwrap_err();
    let DecryptFailure::MalformedInput { signal } = failure else {
        panic!("expected malformed input, got {failure:?}");
    };
    assert!(!service.is_expected_mismatch(&signal));
}

#[test]
fn software_empty_password_rejected() {
    assert!(matches!(
        software().create_key("", &Salt::default()),
        Err(CryptoError::KeyDerivation(_))
    ));
}

#[test]
fn software_rejects_hardware_handle() {
    let service = software();
    let handle = KeyHandle::Hardware { label: "k".into() };
    assert!(matches!(service.encrypt(&handle, b"x"), Err(CryptoError::UnsupportedKey(_))));
    assert!(matches!(service.decrypt(&handle, b"x", &[0; 12]), Err(DecryptFailure::Other(_))));
    assert_eq!(service.provider(), ProviderKind::Software);
}

// ── Hardware backend ─────────────────────────────────────────────

#[test]
fn hardware_open_key_creates_missing_key() {
    let hsm = Arc::new(SoftHsm::new());
    let service = HardwareEncryptionService::new(hsm.clone());
    assert!(!hsm.has_key("primary").unwrap());
    let handle = service.open_key("primary").unwrap();
    assert!(hsm.has_key("primary").unwrap());
    assert_eq!(handle.provider(), ProviderKind::Hardware);
}

#[test]
fn hardware_open_key_reuses_existing_key() {
    let hsm = Arc::new(SoftHsm::new());
    let service = HardwareEncryptionService::new(hsm.clone());
    let key = service.open_key("primary").unwrap();
    let encrypted = service.encrypt(&key, b"secret").unwrap();

    let reopened = service.open_key("primary").unwrap();
    assert_eq!(service.decrypt(&reopened, &encrypted.ciphertext, &encrypted.nonce).unwrap(), b"secret");
}

#[test]
fn hardware_empty_label_rejected() {
    let service = HardwareEncryptionService::new(SoftHsm::new());
    assert!(service.open_key("  ").is_err());
}

#[test]
fn hardware_wrong_key_is_malformed_0x40() {
    let service = HardwareEncryptionService::new(SoftHsm::new());
    let a = service.open_key("a").unwrap();
    let b = service.open_key("b").unwrap();
    let encrypted = service.encrypt(&a, b"secret").unwrap();

    let failure = service.decrypt(&b, &encrypted.ciphertext, &encrypted.nonce).unwrap_err();
    assert_eq!(
        failure,
        DecryptFailure::MalformedInput {
            signal: "0x40".into()
        }
    );
    assert!(service.is_expected_mismatch("0x40"));
}

#[test]
fn hardware_other_malformed_codes_are_not_mismatches() {
    let service = HardwareEncryptionService::new(SoftHsm::new());
    let key = service.open_key("a").unwrap();
    let encrypted = service.encrypt(&key, b"secret").unwrap();

    let failure = service.decrypt(&key, &encrypted.ciphertext, &[1, 2, 3]).unwrap_err();
    assert_eq!(
        failure,
        DecryptFailure::MalformedInput {
            signal: "0x41".into()
        }
    );
    assert!(!service.is_expected_mismatch("0x41"));
    assert!(!service.is_expected_mismatch("garbage"));
}

#[test]
fn hardware_unknown_label_is_other_failure() {
    let service = HardwareEncryptionService::new(SoftHsm::new());
    let ghost = KeyHandle::Hardware { label: "ghost".into() };
    let failure = service.decrypt(&ghost, b"abc", &[0; 12]).unwrap_err();
    assert!(matches!(failure, DecryptFailure::Other(msg) if msg.contains(&format!("{:#04x}", status::KEY_HANDLE_INVALID))));
}

#[test]
fn hardware_mismatch_codes_are_configurable() {
    let service = HardwareEncryptionService::new(SoftHsm::new()).with_mismatch_codes([0x41]);
    assert!(service.is_expected_mismatch("0x41"));
    assert!(!service.is_expected_mismatch("0x40"));
}

#[test]
fn hardware_rejects_software_handle() {
    let service = HardwareEncryptionService::new(SoftHsm::new());
    let handle = software().create_key("pw", &Salt::default()).unwrap();
    assert!(matches!(service.encrypt(&handle, b"x"), Err(CryptoError::UnsupportedKey(_))));
}

// ── KeyHandle ────────────────────────────────────────────────────

#[test]
fn key_handle_debug_never_shows_material() {
    let handle = software().create_key("pw", &Salt::default()).unwrap();
    assert_eq!(format!("{handle:?}"), "KeyHandle::Software([REDACTED])");
    assert_eq!(handle.describe(), "password-derived key");
}

#[test]
fn provider_kind_serde_names() {
    assert_eq!(serde_json::to_string(&ProviderKind::Hardware).unwrap(), "\"hardware\"");
    let kind: ProviderKind = serde_json::from_str("\"software\"").unwrap();
    assert_eq!(kind, ProviderKind::Software);
}

/// Backend relying on the trait's default mismatch predicate.
struct PlainService;

impl EncryptionService for PlainService {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Software
    }

    fn encrypt(&self, _key: &KeyHandle, _plaintext: &[u8]) -> credvault_crypto::CryptoResult<credvault_crypto::EncryptedData> {
        Err(CryptoError::Encryption("unused".into()))
    }

    fn decrypt(&self, _key: &KeyHandle, _ciphertext: &[u8], _nonce: &[u8]) -> credvault_crypto::DecryptResult {
        Err(DecryptFailure::MalformedInput { signal: "0x40".into() })
    }
}

#[test]
fn default_predicate_never_reports_a_mismatch() {
    let service = PlainService;
    assert!(!service.is_expected_mismatch("0x40"));
    assert!(!service.is_expected_mismatch(""));
}
