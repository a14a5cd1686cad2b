use credvault_keys::EncryptorError;
use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("credential not found: {0}")]
    NotFound(String),

    #[error("invalid key length {0}, expected one of 2048, 3072, 4096")]
    InvalidKeyLength(u32),

    #[error("invalid generation parameters: {0}")]
    InvalidParameters(String),

    #[error(transparent)]
    Encryptor(#[from] EncryptorError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Name(#[from] credvault_types::Error),

    #[error("credential store error: {0}")]
    Store(String),
}
