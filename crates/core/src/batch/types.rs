use serde::{Deserialize, Serialize};

use crate::item::Item;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchVerb {
    Get,
    Put,
    Delete,
}

/// One entry of a batch request.
///
/// Identity is `(table, key)`; the key is the physical primary key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verb", rename_all = "lowercase")]
pub enum BatchOperation {
    Get {
        table: String,
        key: Item,
        /// Attributes to return. `None` returns the whole item.
        projection: Option<Vec<String>>,
    },
    Put {
        table: String,
        key: Item,
        item: Item,
    },
    Delete {
        table: String,
        key: Item,
    },
}

impl BatchOperation {
    pub fn get(table: &str, key: Item) -> Self {
        BatchOperation::Get {
            table: table.to_string(),
            key,
            projection: None,
        }
    }

    pub fn get_projected(table: &str, key: Item, projection: &[&str]) -> Self {
        BatchOperation::Get {
            table: table.to_string(),
            key,
            projection: Some(projection.iter().map(|s| s.to_string()).collect()),
        }
    }

    pub fn put(table: &str, key: Item, item: Item) -> Self {
        BatchOperation::Put {
            table: table.to_string(),
            key,
            item,
        }
    }

    pub fn delete(table: &str, key: Item) -> Self {
        BatchOperation::Delete {
            table: table.to_string(),
            key,
        }
    }

    pub fn verb(&self) -> BatchVerb {
        match self {
            BatchOperation::Get { .. } => BatchVerb::Get,
            BatchOperation::Put { .. } => BatchVerb::Put,
            BatchOperation::Delete { .. } => BatchVerb::Delete,
        }
    }

    pub fn table(&self) -> &str {
        match self {
            BatchOperation::Get { table, .. }
            | BatchOperation::Put { table, .. }
            | BatchOperation::Delete { table, .. } => table,
        }
    }

    pub fn key(&self) -> &Item {
        match self {
            BatchOperation::Get { key, .. }
            | BatchOperation::Put { key, .. }
            | BatchOperation::Delete { key, .. } => key,
        }
    }
}

/// The outcome of one batch entry, at the same position as its operation.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchItemResult {
    Found(Item),
    NotFound,
    /// A put or delete was applied.
    Acknowledged,
}

impl BatchItemResult {
    pub fn into_item(self) -> Option<Item> {
        match self {
            BatchItemResult::Found(item) => Some(item),
            _ => None,
        }
    }
}

/// A key the store still reported as unprocessed once retries ran out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnresolvedKey {
    pub verb: BatchVerb,
    pub table: String,
    pub key: Item,
}
