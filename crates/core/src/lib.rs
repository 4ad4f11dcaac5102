//! Functional core for storing many object types in one key-value table.
//!
//! Everything here is either pure (key encoding, index resolution, batch
//! planning) or generic over the [`storage::KeyValueStore`] trait, so it can be
//! exercised without a remote store.

pub mod batch;
pub mod index;
pub mod item;
pub mod keys;
pub mod query;
pub mod storage;

pub use item::Item;
