use thiserror::Error;

/// Errors raised while building an index directory.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("Invalid index spec: {0}")]
    InvalidIndexSpec(String),
}
