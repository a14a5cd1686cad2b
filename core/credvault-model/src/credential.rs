use crate::error::ModelResult;
use crate::field::EncryptedField;
use crate::parameters::StringGenerationParameters;
use chrono::{DateTime, Utc};
use credvault_keys::Encryptor;
use credvault_types::{CredentialId, CredentialName, KeyUuid};
use serde::{Deserialize, Serialize};

/// A stored credential version.
///
/// Public parts (usernames, certificates, public keys) are kept in the clear.
/// Everything secret sits in an [`EncryptedField`] and is decrypted on demand
/// through the [`Encryptor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub id: CredentialId,
    pub name: CredentialName,
    pub created_at: DateTime<Utc>,
    pub value: CredentialValue,
}

/// The typed payload of a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialValue {
    Value {
        value: EncryptedField,
    },
    Json {
        value: EncryptedField,
    },
    Password {
        password: EncryptedField,
        parameters: EncryptedField,
    },
    User {
        username: Option<String>,
        salt: Option<String>,
        password: EncryptedField,
        parameters: EncryptedField,
    },
    Certificate {
        ca_name: Option<String>,
        certificate: Option<String>,
        private_key: EncryptedField,
    },
    Rsa {
        public_key: Option<String>,
        private_key: EncryptedField,
    },
    Ssh {
        public_key: Option<String>,
        private_key: EncryptedField,
    },
}

impl CredentialValue {
    /// Stable type name, as exposed to clients.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Value { .. } => "value",
            Self::Json { .. } => "json",
            Self::Password { .. } => "password",
            Self::User { .. } => "user",
            Self::Certificate { .. } => "certificate",
            Self::Rsa { .. } => "rsa",
            Self::Ssh { .. } => "ssh",
        }
    }

    pub fn fields(&self) -> Vec<&EncryptedField> {
        match self {
            Self::Value { value } | Self::Json { value } => vec![value],
            Self::Password { password, parameters } | Self::User { password, parameters, .. } => {
                vec![password, parameters]
            }
            Self::Certificate { private_key, .. }
            | Self::Rsa { private_key, .. }
            | Self::Ssh { private_key, .. } => vec![private_key],
        }
    }

    fn fields_mut(&mut self) -> Vec<&mut EncryptedField> {
        match self {
            Self::Value { value } | Self::Json { value } => vec![value],
            Self::Password { password, parameters } | Self::User { password, parameters, .. } => {
                vec![password, parameters]
            }
            Self::Certificate { private_key, .. }
            | Self::Rsa { private_key, .. }
            | Self::Ssh { private_key, .. } => vec![private_key],
        }
    }
}

impl Credential {
    /// A new version of `name` holding `value`, stamped now.
    pub fn new(name: CredentialName, value: CredentialValue) -> Self {
        Self {
            id: CredentialId::new(),
            name,
            created_at: Utc::now(),
            value,
        }
    }

    pub fn value(name: CredentialName, encryptor: &Encryptor, value: &str) -> ModelResult<Self> {
        let value = EncryptedField::seal(encryptor, Some(value))?;
        Ok(Self::new(name, CredentialValue::Value { value }))
    }

    pub fn json(name: CredentialName, encryptor: &Encryptor, value: &serde_json::Value) -> ModelResult<Self> {
        let value = EncryptedField::seal_json(encryptor, Some(value))?;
        Ok(Self::new(name, CredentialValue::Json { value }))
    }

    pub fn password(
        name: CredentialName,
        encryptor: &Encryptor,
        password: &str,
        parameters: Option<&StringGenerationParameters>,
    ) -> ModelResult<Self> {
        let value = CredentialValue::Password {
            password: EncryptedField::seal(encryptor, Some(password))?,
            parameters: EncryptedField::seal_json(encryptor, parameters)?,
        };
        Ok(Self::new(name, value))
    }

    pub fn user(
        name: CredentialName,
        encryptor: &Encryptor,
        username: Option<&str>,
        password: &str,
        salt: Option<&str>,
        parameters: Option<&StringGenerationParameters>,
    ) -> ModelResult<Self> {
        let value = CredentialValue::User {
            username: username.map(str::to_string),
            salt: salt.map(str::to_string),
            password: EncryptedField::seal(encryptor, Some(password))?,
            parameters: EncryptedField::seal_json(encryptor, parameters)?,
        };
        Ok(Self::new(name, value))
    }

    pub fn certificate(
        name: CredentialName,
        encryptor: &Encryptor,
        ca_name: Option<&str>,
        certificate: Option<&str>,
        private_key: Option<&str>,
    ) -> ModelResult<Self> {
        let value = CredentialValue::Certificate {
            ca_name: ca_name.map(str::to_string),
            certificate: certificate.map(str::to_string),
            private_key: EncryptedField::seal(encryptor, private_key)?,
        };
        Ok(Self::new(name, value))
    }

    pub fn rsa(
        name: CredentialName,
        encryptor: &Encryptor,
        public_key: Option<&str>,
        private_key: Option<&str>,
    ) -> ModelResult<Self> {
        let value = CredentialValue::Rsa {
            public_key: public_key.map(str::to_string),
            private_key: EncryptedField::seal(encryptor, private_key)?,
        };
        Ok(Self::new(name, value))
    }

    pub fn ssh(
        name: CredentialName,
        encryptor: &Encryptor,
        public_key: Option<&str>,
        private_key: Option<&str>,
    ) -> ModelResult<Self> {
        let value = CredentialValue::Ssh {
            public_key: public_key.map(str::to_string),
            private_key: EncryptedField::seal(encryptor, private_key)?,
        };
        Ok(Self::new(name, value))
    }

    pub fn credential_type(&self) -> &'static str {
        self.value.type_name()
    }

    /// Decrypts the main secret: the value, password, or private key.
    /// For JSON credentials this is the serialized document.
    pub fn secret(&self, encryptor: &Encryptor) -> ModelResult<Option<String>> {
        let field = match &self.value {
            CredentialValue::Value { value } | CredentialValue::Json { value } => value,
            CredentialValue::Password { password, .. } | CredentialValue::User { password, .. } => password,
            CredentialValue::Certificate { private_key, .. }
            | CredentialValue::Rsa { private_key, .. }
            | CredentialValue::Ssh { private_key, .. } => private_key,
        };
        field.open(encryptor)
    }

    /// The decoded document of a JSON credential; `None` for other types.
    pub fn json_value(&self, encryptor: &Encryptor) -> ModelResult<Option<serde_json::Value>> {
        match &self.value {
            CredentialValue::Json { value } => value.open_json(encryptor),
            _ => Ok(None),
        }
    }

    /// Generation parameters of a password or user credential, if recorded.
    pub fn generation_parameters(
        &self,
        encryptor: &Encryptor,
    ) -> ModelResult<Option<StringGenerationParameters>> {
        match &self.value {
            CredentialValue::Password { parameters, .. } | CredentialValue::User { parameters, .. } => {
                parameters.open_json(encryptor)
            }
            _ => Ok(None),
        }
    }

    pub fn username(&self) -> Option<&str> {
        match &self.value {
            CredentialValue::User { username, .. } => username.as_deref(),
            _ => None,
        }
    }

    pub fn public_key(&self) -> Option<&str> {
        match &self.value {
            CredentialValue::Rsa { public_key, .. } | CredentialValue::Ssh { public_key, .. } => {
                public_key.as_deref()
            }
            _ => None,
        }
    }

    /// Identifiers of the keys this credential's fields are encrypted under.
    pub fn key_uuids(&self) -> Vec<KeyUuid> {
        let mut uuids: Vec<KeyUuid> = self.value.fields().iter().map(|f| f.key_uuid()).collect();
        uuids.sort();
        uuids.dedup();
        uuids
    }

    /// Re-encrypts every field under the active key.
    ///
    /// Each field is decrypted with the key it records, so this works for
    /// values under inactive keys and is safe to repeat. On error the
    /// credential is left unchanged.
    pub fn rotate(&mut self, encryptor: &Encryptor) -> ModelResult<()> {
        let mut value = self.value.clone();
        for field in value.fields_mut() {
            field.rotate(encryptor)?;
        }
        self.value = value;
        Ok(())
    }
}
