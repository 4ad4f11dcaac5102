use thiserror::Error;

use crate::keys::KeyError;

/// Errors raised while planning a query.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Unknown index `{tag}`, expected one of: {}", .valid.join(", "))]
    UnknownIndex { tag: String, valid: Vec<String> },
    #[error("No index of {type_name} can serve a query on [{}]", .fields.join(", "))]
    NoMatchingIndex {
        type_name: String,
        fields: Vec<String>,
    },
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),
    #[error("Query limit must be positive")]
    InvalidLimit,
    #[error(transparent)]
    Key(#[from] KeyError),
}
