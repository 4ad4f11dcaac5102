//! Store several object types in one key-value table.
//!
//! A [`Repository`] binds one object type to its [`IndexDirectory`] and a
//! [`KeyValueStore`]. Records are written with their composite key attributes
//! computed for every index, and queries are routed to the index that can
//! serve the supplied fields.

pub mod batch;
pub mod config;
pub mod hooks;
pub mod models;
pub mod repository;
pub mod storage;

pub use config::Config;
pub use hooks::{HookEvent, Hooks};
pub use models::{ModelError, ModelFile, ModelSpec};
pub use repository::{QueryResult, Repository};

pub use tablekit_core::index::{IndexDirectory, IndexSpec, TableConfig};
pub use tablekit_core::query::{SortOrder, WhereClause};
pub use tablekit_core::storage::{KeyValueStore, RepositoryError, Result, Validator};
pub use tablekit_core::Item;
