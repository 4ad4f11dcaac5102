use std::collections::{HashMap, HashSet};

use super::{IndexDefinition, IndexError, IndexKind, IndexSpec, TableConfig};

/// Every index of one object type, built once and immutable afterwards.
///
/// Indexes are kept in declaration order with the primary index moved to the
/// front, which is the order the query planner scans them in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDirectory {
    type_name: String,
    table: TableConfig,
    indexes: Vec<IndexDefinition>,
    by_tag: HashMap<String, usize>,
}

impl IndexDirectory {
    /// Validates `specs` and builds the directory for `type_name`.
    pub fn build(
        type_name: &str,
        table: &TableConfig,
        specs: &[IndexSpec],
    ) -> Result<Self, IndexError> {
        if type_name.is_empty() {
            return Err(invalid("object type name must not be empty".to_string()));
        }

        let mut seen = HashSet::new();
        for spec in specs {
            if spec.tag.is_empty() {
                return Err(invalid(format!("an index of `{type_name}` has an empty tag")));
            }
            if !seen.insert(spec.tag.as_str()) {
                return Err(invalid(format!("duplicate tag `{}`", spec.tag)));
            }
        }

        let kinds = specs.iter().map(classify).collect::<Result<Vec<_>, _>>()?;

        let primaries: Vec<usize> = kinds
            .iter()
            .enumerate()
            .filter(|(_, kind)| **kind == IndexKind::Primary)
            .map(|(position, _)| position)
            .collect();
        let primary_spec = match primaries.as_slice() {
            [position] => &specs[*position],
            [] => return Err(invalid(format!("`{type_name}` has no primary index"))),
            _ => {
                return Err(invalid(format!(
                    "`{type_name}` declares {} primary indexes",
                    primaries.len()
                )))
            }
        };

        let primary = define(primary_spec, IndexKind::Primary, type_name, table, None)?;
        let mut indexes = Vec::with_capacity(specs.len());
        for (spec, kind) in specs.iter().zip(kinds) {
            if kind != IndexKind::Primary {
                indexes.push(define(spec, kind, type_name, table, Some(&primary))?);
            }
        }
        indexes.insert(0, primary);

        check_attribute_collisions(&indexes)?;

        let by_tag = indexes
            .iter()
            .enumerate()
            .map(|(position, index)| (index.tag.clone(), position))
            .collect();

        Ok(Self {
            type_name: type_name.to_string(),
            table: table.clone(),
            indexes,
            by_tag,
        })
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn table(&self) -> &TableConfig {
        &self.table
    }

    pub fn primary(&self) -> &IndexDefinition {
        &self.indexes[0]
    }

    pub fn get(&self, tag: &str) -> Option<&IndexDefinition> {
        self.by_tag.get(tag).map(|&position| &self.indexes[position])
    }

    /// Indexes in scan order, primary first.
    pub fn iter(&self) -> impl Iterator<Item = &IndexDefinition> {
        self.indexes.iter()
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.indexes.iter().map(|index| index.tag.as_str())
    }

    /// Attributes written by the storage layer rather than by the caller.
    pub fn reserved_attributes(&self) -> Vec<&str> {
        let mut attributes = vec![self.table.type_attribute.as_str()];
        for attribute in self.indexes.iter().flat_map(|i| i.computed_attributes()) {
            if !attributes.contains(&attribute) {
                attributes.push(attribute);
            }
        }
        attributes
    }
}

fn invalid(message: String) -> IndexError {
    IndexError::InvalidIndexSpec(message)
}

fn classify(spec: &IndexSpec) -> Result<IndexKind, IndexError> {
    let tag = &spec.tag;
    let secondary = spec.local.is_some() || spec.global.is_some();

    if spec.primary && secondary {
        return Err(invalid(format!(
            "index `{tag}` is declared both primary and secondary"
        )));
    }
    if spec.local.is_some() && spec.global.is_some() {
        return Err(invalid(format!(
            "index `{tag}` is declared both local and global"
        )));
    }

    if spec.custom.is_some() {
        if spec.primary {
            return Err(invalid(format!(
                "primary index `{tag}` cannot use custom attributes"
            )));
        }
        if spec.global.is_none() {
            return Err(invalid(format!("custom index `{tag}` must be global")));
        }
        if !spec.hash_key_fields.is_empty() || !spec.sort_key_fields.is_empty() {
            return Err(invalid(format!(
                "custom index `{tag}` cannot also declare key fields"
            )));
        }
        return Ok(IndexKind::CustomGlobalSecondary);
    }

    if !spec.primary && !secondary {
        return Err(invalid(format!(
            "index `{tag}` must be primary, local or global"
        )));
    }
    if spec.hash_key_fields.is_empty() {
        return Err(invalid(if secondary {
            format!("secondary index `{tag}` has no hash key fields and no custom attributes")
        } else {
            format!("primary index `{tag}` has no hash key fields")
        }));
    }

    Ok(if spec.primary {
        IndexKind::Primary
    } else if spec.local.is_some() {
        IndexKind::LocalSecondary
    } else {
        IndexKind::GlobalSecondary
    })
}

fn define(
    spec: &IndexSpec,
    kind: IndexKind,
    type_name: &str,
    table: &TableConfig,
    primary: Option<&IndexDefinition>,
) -> Result<IndexDefinition, IndexError> {
    let tag = &spec.tag;
    let separator = &table.key_format.separator;

    let (index_name, hash_key_attribute, sort_key_attribute) = match kind {
        IndexKind::Primary => (
            None,
            spec.hash_key_attribute
                .clone()
                .unwrap_or_else(|| table.partition_key.clone()),
            spec.sort_key_attribute.clone().or_else(|| table.sort_key.clone()),
        ),
        IndexKind::LocalSecondary => {
            let name = spec.local.clone().unwrap_or_default();
            if spec
                .hash_key_attribute
                .as_ref()
                .is_some_and(|attribute| *attribute != table.partition_key)
            {
                return Err(invalid(format!(
                    "local index `{tag}` must use the table partition key"
                )));
            }
            let sort = spec
                .sort_key_attribute
                .clone()
                .unwrap_or_else(|| format!("{name}SK"));
            (Some(name), table.partition_key.clone(), Some(sort))
        }
        IndexKind::GlobalSecondary => {
            let name = spec.global.clone().unwrap_or_default();
            let hash = spec
                .hash_key_attribute
                .clone()
                .unwrap_or_else(|| format!("{name}PK"));
            let sort = spec.sort_key_attribute.clone().or_else(|| {
                (!spec.sort_key_fields.is_empty()).then(|| format!("{name}SK"))
            });
            (Some(name), hash, sort)
        }
        IndexKind::CustomGlobalSecondary => {
            let custom = spec.custom.clone().ok_or_else(|| {
                invalid(format!("custom index `{tag}` has no custom attributes"))
            })?;
            (spec.global.clone(), custom.hash_key, custom.sort_key)
        }
    };

    if kind != IndexKind::CustomGlobalSecondary
        && !spec.sort_key_fields.is_empty()
        && sort_key_attribute.is_none()
    {
        return Err(invalid(format!(
            "index `{tag}` declares sort key fields but has no sort key attribute"
        )));
    }

    let descriptor = match (&spec.descriptor, kind) {
        (Some(descriptor), _) => descriptor.clone(),
        (None, IndexKind::GlobalSecondary) => format!("{type_name}{separator}{tag}"),
        (None, _) => type_name.to_string(),
    };

    if let (IndexKind::LocalSecondary, Some(primary)) = (kind, primary) {
        if spec.sort_key_fields.is_empty() {
            return Err(invalid(format!(
                "local index `{tag}` requires sort key fields"
            )));
        }
        if spec.hash_key_fields != primary.hash_key_fields || descriptor != primary.descriptor {
            return Err(invalid(format!(
                "local index `{tag}` must share the primary partition key"
            )));
        }
    }

    Ok(IndexDefinition {
        tag: tag.clone(),
        kind,
        index_name,
        hash_key_fields: spec.hash_key_fields.clone(),
        sort_key_fields: spec.sort_key_fields.clone(),
        hash_key_attribute,
        sort_key_attribute,
        descriptor,
    })
}

/// Two indexes writing the same physical attribute would clobber each other.
fn check_attribute_collisions(indexes: &[IndexDefinition]) -> Result<(), IndexError> {
    let mut owners: HashMap<&str, &str> = HashMap::new();
    for index in indexes {
        let attributes = index.computed_attributes();
        // A local index writes the same partition value as the primary.
        let skip = usize::from(index.kind == IndexKind::LocalSecondary);
        for attribute in attributes.into_iter().skip(skip) {
            if let Some(owner) = owners.insert(attribute, index.tag.as_str()) {
                return Err(invalid(format!(
                    "attribute `{attribute}` is computed by both `{owner}` and `{}`",
                    index.tag
                )));
            }
        }
    }
    Ok(())
}
