//! Store abstraction: the remote key-value primitives and repository errors.

mod error;
mod traits;
mod types;

pub use error::{RepositoryError, Result};
pub use traits::{KeyValueStore, Validator};
pub use types::{
    BatchGetOutput, BatchWriteOutput, QueryPage, QueryRequest, SortCondition, SortKeyCondition,
};
