use crate::Error;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Path-like credential name, e.g. `/deploy/db-password`.
///
/// A leading `/` is added when missing. Comparison and hashing ignore ASCII
/// case, so `/Foo` and `/foo` name the same credential; the original
/// spelling is preserved for display.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct CredentialName(String);

impl CredentialName {
    /// Validates and normalizes a credential name.
    pub fn new(name: &str) -> crate::Result<Self> {
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed == "/" {
            return Err(Error::InvalidName("name must not be empty".into()));
        }
        if trimmed.contains("//") {
            return Err(Error::InvalidName(format!("'{trimmed}' contains an empty segment")));
        }
        if trimmed.ends_with('/') {
            return Err(Error::InvalidName(format!("'{trimmed}' ends with '/'")));
        }

        let normalized = if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        };
        Ok(Self(normalized))
    }

    /// Returns the name as written (with the leading `/`).
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the lower-cased lookup key.
    #[must_use]
    pub fn folded(&self) -> String {
        self.0.to_ascii_lowercase()
    }
}

impl PartialEq for CredentialName {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for CredentialName {}

impl Hash for CredentialName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.0.bytes() {
            state.write_u8(b.to_ascii_lowercase());
        }
    }
}

impl fmt::Display for CredentialName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for CredentialName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for CredentialName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::new(&raw).map_err(serde::de::Error::custom)
    }
}
