use serde::{Deserialize, Serialize};

/// The shape of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexKind {
    Primary,
    LocalSecondary,
    GlobalSecondary,
    /// A global index keyed on attributes the caller computes itself.
    CustomGlobalSecondary,
}

impl IndexKind {
    pub fn is_secondary(self) -> bool {
        !matches!(self, IndexKind::Primary)
    }
}

/// A validated index of one object type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDefinition {
    pub tag: String,
    pub kind: IndexKind,
    /// Physical index name in the store. `None` for the primary index.
    pub index_name: Option<String>,
    pub hash_key_fields: Vec<String>,
    pub sort_key_fields: Vec<String>,
    pub hash_key_attribute: String,
    pub sort_key_attribute: Option<String>,
    pub descriptor: String,
}

impl IndexDefinition {
    /// Fields a query must supply to address a partition of this index.
    ///
    /// Custom indexes are addressed by their attribute names directly.
    pub fn hash_fields(&self) -> Vec<&str> {
        match self.kind {
            IndexKind::CustomGlobalSecondary => vec![self.hash_key_attribute.as_str()],
            _ => self.hash_key_fields.iter().map(String::as_str).collect(),
        }
    }

    /// Ordered sort fields usable as a query prefix.
    pub fn sort_fields(&self) -> Vec<&str> {
        match self.kind {
            IndexKind::CustomGlobalSecondary => {
                self.sort_key_attribute.as_deref().into_iter().collect()
            }
            _ => self.sort_key_fields.iter().map(String::as_str).collect(),
        }
    }

    /// Attribute the store orders this index by, if any.
    pub fn sort_attribute(&self) -> Option<&str> {
        match self.kind {
            IndexKind::CustomGlobalSecondary => self.sort_key_attribute.as_deref(),
            _ if self.sort_key_fields.is_empty() => None,
            _ => self.sort_key_attribute.as_deref(),
        }
    }

    /// Physical attributes the key codec computes for this index.
    pub fn computed_attributes(&self) -> Vec<&str> {
        if self.kind == IndexKind::CustomGlobalSecondary {
            return Vec::new();
        }
        let mut attributes = vec![self.hash_key_attribute.as_str()];
        if !self.sort_key_fields.is_empty() {
            attributes.extend(self.sort_key_attribute.as_deref());
        }
        attributes
    }
}

/// Pre-computed attributes backing a custom global index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomAttributes {
    pub hash_key: String,
    #[serde(default)]
    pub sort_key: Option<String>,
}

/// Caller-supplied description of one index, as written in a model file.
///
/// ```json
/// { "tag": "byItem", "global": "GSI1", "hashKeyFields": ["itemId"], "sortKeyFields": ["userId"] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndexSpec {
    pub tag: String,
    pub primary: bool,
    /// Physical name of a local secondary index.
    pub local: Option<String>,
    /// Physical name of a global secondary index.
    pub global: Option<String>,
    pub hash_key_fields: Vec<String>,
    pub sort_key_fields: Vec<String>,
    pub custom: Option<CustomAttributes>,
    pub hash_key_attribute: Option<String>,
    pub sort_key_attribute: Option<String>,
    pub descriptor: Option<String>,
}

impl IndexSpec {
    /// A primary index over the given fields.
    pub fn primary(hash_key_fields: &[&str], sort_key_fields: &[&str]) -> Self {
        Self {
            tag: "primary".to_string(),
            primary: true,
            hash_key_fields: to_strings(hash_key_fields),
            sort_key_fields: to_strings(sort_key_fields),
            ..Self::default()
        }
    }

    /// A global secondary index stored in the `index_name` attribute slots.
    pub fn global(
        tag: &str,
        index_name: &str,
        hash_key_fields: &[&str],
        sort_key_fields: &[&str],
    ) -> Self {
        Self {
            tag: tag.to_string(),
            global: Some(index_name.to_string()),
            hash_key_fields: to_strings(hash_key_fields),
            sort_key_fields: to_strings(sort_key_fields),
            ..Self::default()
        }
    }

    /// A local secondary index sharing the table partition key.
    pub fn local(
        tag: &str,
        index_name: &str,
        hash_key_fields: &[&str],
        sort_key_fields: &[&str],
    ) -> Self {
        Self {
            tag: tag.to_string(),
            local: Some(index_name.to_string()),
            hash_key_fields: to_strings(hash_key_fields),
            sort_key_fields: to_strings(sort_key_fields),
            ..Self::default()
        }
    }

    /// A global index over attributes the record already carries.
    pub fn custom(tag: &str, index_name: &str, hash_key: &str, sort_key: Option<&str>) -> Self {
        Self {
            tag: tag.to_string(),
            global: Some(index_name.to_string()),
            custom: Some(CustomAttributes {
                hash_key: hash_key.to_string(),
                sort_key: sort_key.map(str::to_string),
            }),
            ..Self::default()
        }
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tag = tag.to_string();
        self
    }

    pub fn with_descriptor(mut self, descriptor: &str) -> Self {
        self.descriptor = Some(descriptor.to_string());
        self
    }
}

fn to_strings(fields: &[&str]) -> Vec<String> {
    fields.iter().map(|f| f.to_string()).collect()
}
