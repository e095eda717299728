use detour_core::{NormalizeError, RuleId, StorageError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("malformed input: {0}")]
    MalformedInput(String),
    #[error("source and destination are the same url: {path}")]
    SameUrls { path: String },
    #[error("redirect rule not found: {0}")]
    RuleNotFound(RuleId),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<NormalizeError> for RegistryError {
    fn from(value: NormalizeError) -> Self {
        match value {
            NormalizeError::Malformed(message) => Self::MalformedInput(message),
        }
    }
}
