use crate::error::ModelResult;
use credvault_keys::Encryptor;
use credvault_types::{Encryption, KeyUuid};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// One encrypted value as it is persisted: the encryption triple.
///
/// A field never holds plaintext. Reading goes through [`open`](Self::open)
/// with the encryptor, which picks the key named by the triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptedField(Encryption);

impl EncryptedField {
    /// Encrypts `value` under the active key. `None` is stored as the empty
    /// sentinel and opens back to `None`.
    pub fn seal(encryptor: &Encryptor, value: Option<&str>) -> ModelResult<Self> {
        Ok(Self(encryptor.encrypt(value)?))
    }

    pub fn open(&self, encryptor: &Encryptor) -> ModelResult<Option<String>> {
        Ok(encryptor.decrypt(&self.0)?)
    }

    /// Serializes `value` to JSON and seals it.
    pub fn seal_json<T: Serialize>(encryptor: &Encryptor, value: Option<&T>) -> ModelResult<Self> {
        let json = value.map(serde_json::to_string).transpose()?;
        Self::seal(encryptor, json.as_deref())
    }

    pub fn open_json<T: DeserializeOwned>(&self, encryptor: &Encryptor) -> ModelResult<Option<T>> {
        match self.open(encryptor)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Identifier of the key this field is encrypted under.
    pub fn key_uuid(&self) -> KeyUuid {
        self.0.key_uuid
    }

    /// Whether this field holds the null sentinel.
    pub fn is_null(&self) -> bool {
        self.0.is_empty()
    }

    pub fn encryption(&self) -> &Encryption {
        &self.0
    }

    /// Decrypts under the recorded key and re-encrypts under the active key.
    pub fn rotate(&mut self, encryptor: &Encryptor) -> ModelResult<()> {
        let plaintext = encryptor.decrypt_bytes(&self.0)?;
        self.0 = encryptor.encrypt_bytes(plaintext.as_deref())?;
        Ok(())
    }
}

impl From<Encryption> for EncryptedField {
    fn from(encryption: Encryption) -> Self {
        Self(encryption)
    }
}
