//! Key configuration.
//!
//! ```json
//! {
//!   "kdf": { "memory_cost": 19456, "time_cost": 2, "parallelism": 1 },
//!   "keys": [
//!     { "provider": "software", "password": "new-secret", "active": true },
//!     { "provider": "software", "password": "old-secret", "salt": "Y3JlZHZhdWx0LWtkZi12MQ==" },
//!     { "provider": "hardware", "key_label": "credvault-2024" }
//!   ]
//! }
//! ```

use crate::error::{KeyError, KeyResult};
use credvault_crypto::{KdfParams, ProviderKind, Salt};
use serde::{Deserialize, Serialize};
use std::fmt;

/// All configured keys plus derivation parameters for software keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncryptionConfig {
    #[serde(default)]
    pub kdf: KdfParams,
    pub keys: Vec<KeyDescriptor>,
}

impl EncryptionConfig {
    pub fn new(keys: Vec<KeyDescriptor>) -> Self {
        Self {
            kdf: KdfParams::default(),
            keys,
        }
    }

    pub fn with_kdf(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    /// Parses and validates a JSON configuration.
    pub fn from_json(json: &str) -> KeyResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Index of the single active descriptor.
    pub fn active_index(&self) -> KeyResult<usize> {
        let active: Vec<usize> = self
            .keys
            .iter()
            .enumerate()
            .filter_map(|(i, k)| k.active.then_some(i))
            .collect();

        match active.as_slice() {
            [index] => Ok(*index),
            [] => Err(KeyError::KeyResolution("no key is marked active".into())),
            many => Err(KeyError::KeyResolution(format!(
                "exactly one key must be active, found {}",
                many.len()
            ))),
        }
    }

    /// Checks the active flag count and that every descriptor carries the
    /// material its backend needs.
    pub fn validate(&self) -> KeyResult<()> {
        if self.keys.is_empty() {
            return Err(KeyError::KeyResolution("no encryption keys configured".into()));
        }
        self.active_index()?;
        for (index, key) in self.keys.iter().enumerate() {
            key.validate(index)?;
        }
        Ok(())
    }
}

/// One configured key.
#[derive(Clone, Serialize, Deserialize)]
pub struct KeyDescriptor {
    pub provider: ProviderKind,
    #[serde(default)]
    pub active: bool,
    /// Software keys: password the key is derived from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Software keys: base64 16-byte salt. A fixed salt is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
    /// Hardware keys: label of the key inside the module.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_label: Option<String>,
}

impl KeyDescriptor {
    pub fn software(password: impl Into<String>) -> Self {
        Self {
            provider: ProviderKind::Software,
            active: false,
            password: Some(password.into()),
            salt: None,
            key_label: None,
        }
    }

    pub fn hardware(label: impl Into<String>) -> Self {
        Self {
            provider: ProviderKind::Hardware,
            active: false,
            password: None,
            salt: None,
            key_label: Some(label.into()),
        }
    }

    /// Marks this descriptor as the active key.
    pub fn active(mut self) -> Self {
        self.active = true;
        self
    }

    pub fn with_salt(mut self, salt: &Salt) -> Self {
        self.salt = Some(salt.to_base64());
        self
    }

    /// The decoded salt, or the default one.
    pub fn salt(&self) -> KeyResult<Salt> {
        match &self.salt {
            Some(encoded) => Ok(Salt::from_base64(encoded)?),
            None => Ok(Salt::default()),
        }
    }

    /// Operator-facing name used in logs and errors. Never contains secrets.
    pub fn describe(&self, index: usize) -> String {
        match (self.provider, &self.key_label) {
            (ProviderKind::Hardware, Some(label)) => format!("key #{index} (hardware '{label}')"),
            (provider, _) => format!("key #{index} ({provider})"),
        }
    }

    fn validate(&self, index: usize) -> KeyResult<()> {
        match self.provider {
            ProviderKind::Software => {
                if self.password.as_deref().is_none_or(str::is_empty) {
                    return Err(KeyError::InvalidConfig(format!(
                        "{} has no password",
                        self.describe(index)
                    )));
                }
                self.salt().map_err(|e| {
                    KeyError::InvalidConfig(format!("{}: {e}", self.describe(index)))
                })?;
            }
            ProviderKind::Hardware => {
                if self.key_label.as_deref().is_none_or(|l| l.trim().is_empty()) {
                    return Err(KeyError::InvalidConfig(format!(
                        "{} has no key_label",
                        self.describe(index)
                    )));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for KeyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyDescriptor")
            .field("provider", &self.provider)
            .field("active", &self.active)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("salt", &self.salt)
            .field("key_label", &self.key_label)
            .finish()
    }
}
