use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use thiserror::Error;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Server error code reported when a unique index rejects a write.
const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("missing MongoDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to save {entity} `{id}`")]
    Save {
        entity: &'static str,
        id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to load {entity} `{id}`")]
    Load {
        entity: &'static str,
        id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to list {entity} documents")]
    List {
        entity: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to delete {entity} `{id}`")]
    Delete {
        entity: &'static str,
        id: String,
        #[source]
        source: MongoError,
    },
    #[error("stored identifier `{value}` is not a valid UUID")]
    InvalidId { value: String },
    #[error("{entity} `{id}` was modified concurrently")]
    RevisionConflict { entity: &'static str, id: String },
    #[error("{entity} `{id}` does not exist")]
    MissingDocument { entity: &'static str, id: String },
}

/// Whether the error was raised by a unique index rejecting an insert.
pub fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE
    )
}
