//! Model files: the table layout and the indexes of every object type.
//!
//! ```json
//! {
//!   "table": { "name": "app" },
//!   "models": [
//!     {
//!       "name": "Purchase",
//!       "indexes": [
//!         { "tag": "primary", "primary": true, "hashKeyFields": ["userId"], "sortKeyFields": ["itemId", "id"] },
//!         { "tag": "byItem", "global": "GSI1", "hashKeyFields": ["itemId"] }
//!       ]
//!     }
//!   ]
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tablekit_core::index::{IndexDirectory, IndexError, IndexSpec, TableConfig};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Failed to read model file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse model file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Unknown model `{name}`; valid models: {}", .valid.join(", "))]
    UnknownModel { name: String, valid: Vec<String> },
    #[error(transparent)]
    Index(#[from] IndexError),
}

/// One object type and its index specs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub name: String,
    pub indexes: Vec<IndexSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelFile {
    pub table: TableConfig,
    pub models: Vec<ModelSpec>,
}

impl ModelFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ModelError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Overrides the table name, e.g. from the environment.
    pub fn with_table_name(mut self, name: &str) -> Self {
        self.table = self.table.with_table_name(name);
        self
    }

    /// Builds the directory of the named model.
    pub fn directory(&self, name: &str) -> Result<IndexDirectory, ModelError> {
        let model = self
            .models
            .iter()
            .find(|model| model.name == name)
            .ok_or_else(|| ModelError::UnknownModel {
                name: name.to_string(),
                valid: self.models.iter().map(|model| model.name.clone()).collect(),
            })?;
        Ok(IndexDirectory::build(&model.name, &self.table, &model.indexes)?)
    }

    /// Builds every directory, failing on the first invalid model.
    pub fn directories(&self) -> Result<Vec<IndexDirectory>, ModelError> {
        self.models
            .iter()
            .map(|model| self.directory(&model.name))
            .collect()
    }
}
