mod config;
mod connection;
mod error;
mod models;
mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoSessionStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        match err {
            MongoDaoError::RevisionConflict { entity, id } => StorageError::conflict(entity, id),
            MongoDaoError::MissingDocument { entity, id } => StorageError::missing(entity, id),
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
