//! Batch planner: deduplicates, chunks and dispatches heterogeneous get,
//! put and delete operations, then reassembles results in input order.

mod config;
mod executor;
mod plan;
mod types;

pub use config::{BatchConfig, DEFAULT_MAX_GET_ITEMS, DEFAULT_MAX_WRITE_ITEMS};
pub use executor::execute;
pub use plan::{BatchPlan, GetChunk, WriteChunk};
pub use types::{BatchItemResult, BatchOperation, BatchVerb, UnresolvedKey};
