use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::item::Item;
use crate::keys::KeyPart;

/// How the sort attribute of a query is matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "camelCase")]
pub enum SortCondition {
    Equals(Value),
    BeginsWith(String),
}

impl SortCondition {
    /// Whether a stored sort value satisfies the condition.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            SortCondition::Equals(expected) => expected == value,
            SortCondition::BeginsWith(prefix) => value
                .as_str()
                .is_some_and(|value| value.starts_with(prefix.as_str())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortKeyCondition {
    pub attribute: String,
    pub condition: SortCondition,
}

/// A single-partition query against the table or one of its indexes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub table: String,
    pub index_name: Option<String>,
    pub partition: KeyPart,
    pub sort: Option<SortKeyCondition>,
    /// Sort attribute of the queried index; results are ordered by it even
    /// when no sort condition is given.
    #[serde(default)]
    pub sort_attribute: Option<String>,
    pub scan_forward: bool,
    pub limit: Option<u32>,
    pub exclusive_start_key: Option<Item>,
}

/// One page of query results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPage {
    pub items: Vec<Item>,
    /// Present when more results may follow.
    pub last_evaluated_key: Option<Item>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchGetOutput {
    pub found: Vec<Item>,
    /// Keys the store did not get to, to be resubmitted.
    pub unprocessed_keys: Vec<Item>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchWriteOutput {
    pub unprocessed_puts: Vec<Item>,
    pub unprocessed_deletes: Vec<Item>,
}

impl BatchWriteOutput {
    pub fn is_complete(&self) -> bool {
        self.unprocessed_puts.is_empty() && self.unprocessed_deletes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_begins_with_matches_string_prefix() {
        let condition = SortCondition::BeginsWith("Purchase#itemId-couch#".to_string());
        assert!(condition.matches(&json!("Purchase#itemId-couch#id-1")));
        assert!(!condition.matches(&json!("Purchase#itemId-couch2#id-1")));
        assert!(!condition.matches(&json!(12)));
    }

    #[test]
    fn test_equals_matches_exact_value() {
        let condition = SortCondition::Equals(json!(17));
        assert!(condition.matches(&json!(17)));
        assert!(!condition.matches(&json!("17")));
    }

    #[test]
    fn test_sort_condition_serializes_tagged() {
        let value = serde_json::to_value(SortCondition::BeginsWith("User#".to_string())).unwrap();
        assert_eq!(value, json!({"op": "beginsWith", "value": "User#"}));
    }
}
