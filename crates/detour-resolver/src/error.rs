use detour_core::StorageError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ResolverError>;

/// Lookup failures. An unmatched path is not an error.
#[derive(Debug, Clone, Error)]
pub enum ResolverError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
