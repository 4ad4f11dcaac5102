use thiserror::Error;

/// Errors raised while encoding key attributes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("Missing required field `{field}` for index `{index}`")]
    MissingRequiredField { index: String, field: String },
    #[error("Record sets reserved attribute `{attribute}`")]
    ReservedAttribute { attribute: String },
}
