use serde::{Deserialize, Serialize};

use crate::keys::KeyFormat;

/// Physical layout shared by every object type stored in one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableConfig {
    pub name: String,
    pub partition_key: String,
    /// `None` for tables keyed by partition only.
    pub sort_key: Option<String>,
    /// Object-type discriminator written on every item.
    pub type_attribute: String,
    pub key_format: KeyFormat,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            name: "tablekit".to_string(),
            partition_key: "PK".to_string(),
            sort_key: Some("SK".to_string()),
            type_attribute: "entityType".to_string(),
            key_format: KeyFormat::default(),
        }
    }
}

impl TableConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the table name.
    pub fn with_table_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Attribute names of the table's primary key.
    pub fn key_attributes(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.partition_key.as_str()).chain(self.sort_key.as_deref())
    }
}
