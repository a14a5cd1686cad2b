//! Generation parameters stored alongside generated credentials.
//!
//! Parameters are persisted as encrypted JSON and must stay readable across
//! releases: unknown fields are ignored, missing fields take their defaults,
//! and the legacy `exclude_special` flag is still understood.

use crate::error::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};

const MIN_LENGTH: u32 = 4;
const MAX_LENGTH: u32 = 200;
const DEFAULT_LENGTH: u32 = 30;

/// RSA and SSH key sizes accepted for generation.
pub const VALID_KEY_LENGTHS: [u32; 3] = [2048, 3072, 4096];

/// How a password or user credential's password was generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredStringParameters")]
pub struct StringGenerationParameters {
    pub length: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub exclude_lower: bool,
    pub exclude_upper: bool,
    pub exclude_number: bool,
    pub include_special: bool,
    pub only_hex: bool,
}

impl Default for StringGenerationParameters {
    fn default() -> Self {
        Self {
            length: DEFAULT_LENGTH,
            username: None,
            exclude_lower: false,
            exclude_upper: false,
            exclude_number: false,
            include_special: false,
            only_hex: false,
        }
    }
}

impl StringGenerationParameters {
    pub fn with_length(mut self, length: u32) -> Self {
        self.length = length;
        self
    }

    pub fn validate(&self) -> ModelResult<()> {
        if !(MIN_LENGTH..=MAX_LENGTH).contains(&self.length) {
            return Err(ModelError::InvalidParameters(format!(
                "length must be between {MIN_LENGTH} and {MAX_LENGTH}, got {}",
                self.length
            )));
        }
        if !self.only_hex
            && self.exclude_lower
            && self.exclude_upper
            && self.exclude_number
            && !self.include_special
        {
            return Err(ModelError::InvalidParameters(
                "every character class is excluded".into(),
            ));
        }
        Ok(())
    }
}

/// Wire shape accepted when reading stored parameters.
#[derive(Default, Deserialize)]
#[serde(default)]
struct StoredStringParameters {
    length: Option<u32>,
    username: Option<String>,
    exclude_lower: bool,
    exclude_upper: bool,
    exclude_number: bool,
    include_special: Option<bool>,
    exclude_special: Option<bool>,
    only_hex: bool,
}

impl From<StoredStringParameters> for StringGenerationParameters {
    fn from(stored: StoredStringParameters) -> Self {
        // Older records only carry `exclude_special`; the newer flag wins
        // when both are present.
        let include_special = stored
            .include_special
            .or(stored.exclude_special.map(|exclude| !exclude))
            .unwrap_or(false);
        Self {
            length: stored.length.unwrap_or(DEFAULT_LENGTH),
            username: stored.username,
            exclude_lower: stored.exclude_lower,
            exclude_upper: stored.exclude_upper,
            exclude_number: stored.exclude_number,
            include_special,
            only_hex: stored.only_hex,
        }
    }
}

/// Key size for generated RSA and SSH credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RsaSshGenerationParameters {
    pub key_length: u32,
}

impl Default for RsaSshGenerationParameters {
    fn default() -> Self {
        Self { key_length: 2048 }
    }
}

impl RsaSshGenerationParameters {
    pub fn new(key_length: u32) -> Self {
        Self { key_length }
    }

    pub fn validate(&self) -> ModelResult<()> {
        if VALID_KEY_LENGTHS.contains(&self.key_length) {
            Ok(())
        } else {
            Err(ModelError::InvalidKeyLength(self.key_length))
        }
    }
}
