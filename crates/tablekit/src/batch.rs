//! Heterogeneous batches.
//!
//! Build operations with [`Repository::get_operation`],
//! [`Repository::put_operation`] and [`Repository::delete_operation`] across
//! any number of object types, run them with [`execute`], then decode each
//! position with the matching repository's [`Repository::decode_result`].
//!
//! [`Repository::get_operation`]: crate::Repository::get_operation
//! [`Repository::put_operation`]: crate::Repository::put_operation
//! [`Repository::delete_operation`]: crate::Repository::delete_operation
//! [`Repository::decode_result`]: crate::Repository::decode_result

pub use tablekit_core::batch::{
    execute, BatchConfig, BatchItemResult, BatchOperation, BatchPlan, BatchVerb, UnresolvedKey,
    DEFAULT_MAX_GET_ITEMS, DEFAULT_MAX_WRITE_ITEMS,
};
