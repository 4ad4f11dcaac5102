use thiserror::Error;

use crate::batch::UnresolvedKey;
use crate::index::IndexError;
use crate::keys::KeyError;
use crate::query::QueryError;

/// Errors that can occur during repository operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RepositoryError {
    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: String, id: String },
    #[error(
        "Batch incomplete: {} key(s) still unprocessed after retries",
        .unresolved.len()
    )]
    BatchIncomplete { unresolved: Vec<UnresolvedKey> },
    #[error("{type_name} rejected by validation: {}", .reasons.join("; "))]
    ValidationRejected {
        type_name: String,
        reasons: Vec<String>,
    },
    #[error("Throttled: {0}")]
    Throttled(String),
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Query failed: {0}")]
    QueryFailed(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    Query(#[from] QueryError),
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
