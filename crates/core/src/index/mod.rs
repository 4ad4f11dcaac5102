//! Index directory: the validated index layout of one object type.

mod directory;
mod error;
mod table;
mod types;

pub use directory::IndexDirectory;
pub use error::IndexError;
pub use table::TableConfig;
pub use types::{CustomAttributes, IndexDefinition, IndexKind, IndexSpec};
