//! In-memory store for testing.
//!
//! Tables live in a `HashMap` wrapped in `Arc<RwLock<_>>`; nothing is
//! persisted. The store can hold back part of every batch call to exercise
//! retry paths, and counts the calls it receives.
//!
//! # Example
//!
//! ```rust,ignore
//! use tablekit::storage::InMemoryStore;
//! use tablekit::TableConfig;
//!
//! let store = InMemoryStore::for_table(&TableConfig::new("app")).with_unprocessed_limit(10);
//! ```

mod store;

pub use store::{CallCounts, InMemoryStore};
