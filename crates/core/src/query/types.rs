use serde::{Deserialize, Serialize};

use crate::item::Item;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// A partial field set plus paging and ordering options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WhereClause {
    pub args: Item,
    /// Explicit index tag; skips automatic resolution.
    pub index: Option<String>,
    /// Field expected to be the next sort field of the chosen index.
    pub sort_by: Option<String>,
    pub sort: SortOrder,
    pub cursor: Option<String>,
    pub limit: Option<u32>,
}

impl WhereClause {
    pub fn new(args: Item) -> Self {
        Self {
            args,
            ..Self::default()
        }
    }

    pub fn index(mut self, tag: &str) -> Self {
        self.index = Some(tag.to_string());
        self
    }

    pub fn sort_by(mut self, field: &str) -> Self {
        self.sort_by = Some(field.to_string());
        self
    }

    pub fn descending(mut self) -> Self {
        self.sort = SortOrder::Descending;
        self
    }

    pub fn after(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Names of the supplied fields.
    pub fn fields(&self) -> Vec<String> {
        self.args.keys().cloned().collect()
    }
}
