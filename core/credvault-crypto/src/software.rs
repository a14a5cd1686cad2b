use crate::cipher::{self, EncryptedData};
use crate::error::{CryptoError, CryptoResult};
use crate::key::{derive_key, KdfParams, Salt};
use crate::service::{DecryptFailure, DecryptResult, EncryptionService, KeyHandle, ProviderKind};

/// Software backend: keys are derived from passwords with Argon2id and
/// used with ChaCha20-Poly1305 in-process.
#[derive(Debug, Clone, Default)]
pub struct PasswordEncryptionService {
    params: KdfParams,
}

impl PasswordEncryptionService {
    pub fn new(params: KdfParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &KdfParams {
        &self.params
    }

    /// Derives the key handle for a configured password.
    pub fn create_key(&self, password: &str, salt: &Salt) -> CryptoResult<KeyHandle> {
        if password.is_empty() {
            return Err(CryptoError::KeyDerivation("password must not be empty".into()));
        }
        Ok(KeyHandle::Software(derive_key(password, salt, &self.params)?))
    }
}

impl EncryptionService for PasswordEncryptionService {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Software
    }

    fn encrypt(&self, key: &KeyHandle, plaintext: &[u8]) -> CryptoResult<EncryptedData> {
        match key {
            KeyHandle::Software(derived) => cipher::encrypt(derived, plaintext),
            other => Err(CryptoError::UnsupportedKey(format!(
                "{} cannot be used by the software backend",
                other.describe()
            ))),
        }
    }

    fn decrypt(&self, key: &KeyHandle, ciphertext: &[u8], nonce: &[u8]) -> DecryptResult {
        let KeyHandle::Software(derived) = key else {
            return Err(DecryptFailure::Other(format!(
                "{} cannot be used by the software backend",
                key.describe()
            )));
        };

        cipher::decrypt(derived, ciphertext, nonce).map_err(|e| match e {
            CryptoError::Decryption(_) => DecryptFailure::AuthMismatch,
            CryptoError::InvalidNonceLength { actual, .. } => DecryptFailure::MalformedInput {
                signal: format!("nonce length {actual}"),
            },
            other => DecryptFailure::Other(other.to_string()),
        })
    }
}
