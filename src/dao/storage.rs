use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The stored revision no longer matches the one the write was based on.
    #[error("{entity} `{id}` was modified concurrently")]
    Conflict { entity: &'static str, id: String },
    /// An update targeted a document that does not exist (anymore).
    #[error("{entity} `{id}` does not exist")]
    Missing { entity: &'static str, id: String },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    pub fn conflict(entity: &'static str, id: impl ToString) -> Self {
        StorageError::Conflict {
            entity,
            id: id.to_string(),
        }
    }

    pub fn missing(entity: &'static str, id: impl ToString) -> Self {
        StorageError::Missing {
            entity,
            id: id.to_string(),
        }
    }
}
