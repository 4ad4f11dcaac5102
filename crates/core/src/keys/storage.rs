use serde_json::Value;

use crate::index::{IndexDirectory, IndexKind};
use crate::item::Item;

use super::{encode, KeyError};

/// Builds the stored form of `record`: its own fields, the type
/// discriminator and the key attributes of every non-custom index.
///
/// The primary key must encode. Secondary indexes whose hash fields are
/// absent are left out, which keeps them sparse. The source record is not
/// modified and may not carry reserved attributes itself.
pub fn format_for_storage(directory: &IndexDirectory, record: &Item) -> Result<Item, KeyError> {
    let table = directory.table();

    if let Some(attribute) = directory
        .reserved_attributes()
        .into_iter()
        .find(|attribute| record.contains_key(*attribute))
    {
        return Err(KeyError::ReservedAttribute {
            attribute: attribute.to_string(),
        });
    }

    let mut item = record.clone();
    item.insert(
        table.type_attribute.clone(),
        Value::String(directory.type_name().to_string()),
    );

    for index in directory.iter() {
        match index.kind {
            IndexKind::CustomGlobalSecondary => continue,
            IndexKind::Primary => {
                let key = encode(index, record, &table.key_format)?;
                item.extend(key.into_item());
            }
            IndexKind::LocalSecondary | IndexKind::GlobalSecondary => {
                match encode(index, record, &table.key_format) {
                    Ok(key) => item.extend(key.into_item()),
                    Err(KeyError::MissingRequiredField { field, .. }) => {
                        tracing::debug!(
                            type_name = directory.type_name(),
                            index = %index.tag,
                            field = %field,
                            "Skipping sparse index"
                        );
                    }
                    Err(err) => return Err(err),
                }
            }
        }
    }

    Ok(item)
}

/// Builds the physical primary key used by get and delete.
///
/// Unlike query encoding, every sort field must be present.
pub fn primary_key(directory: &IndexDirectory, fields: &Item) -> Result<Item, KeyError> {
    let index = directory.primary();
    let key = encode(index, fields, &directory.table().key_format)?;

    if !key.is_complete() {
        let field = index
            .sort_key_fields
            .iter()
            .find(|field| !fields.contains_key(*field))
            .cloned()
            .unwrap_or_default();
        return Err(KeyError::MissingRequiredField {
            index: index.tag.clone(),
            field,
        });
    }

    Ok(key.into_item())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{IndexSpec, TableConfig};
    use serde_json::json;

    fn item(value: Value) -> Item {
        value.as_object().cloned().unwrap()
    }

    fn users() -> IndexDirectory {
        IndexDirectory::build(
            "User",
            &TableConfig::default(),
            &[
                IndexSpec::primary(&["id"], &[]),
                IndexSpec::global("byTeam", "GSI1", &["teamId"], &["name"]),
                IndexSpec::custom("byEmail", "GSI2", "email", None),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_user_primary_key_only() {
        let stored = format_for_storage(&users(), &item(json!({"id": "1", "name": "jim"}))).unwrap();

        assert_eq!(
            stored,
            item(json!({
                "id": "1",
                "name": "jim",
                "entityType": "User",
                "PK": "User#id-1",
            }))
        );
    }

    #[test]
    fn test_secondary_attributes_are_added_when_present() {
        let stored = format_for_storage(
            &users(),
            &item(json!({"id": "1", "name": "jim", "teamId": "t1", "email": "jim@example.com"})),
        )
        .unwrap();

        assert_eq!(stored["GSI1PK"], json!("User#byTeam#teamId-t1"));
        assert_eq!(stored["GSI1SK"], json!("User#byTeam#name-jim"));
        // Custom index attributes are the record's own fields.
        assert_eq!(stored["email"], json!("jim@example.com"));
        assert!(!stored.contains_key("GSI2PK"));
    }

    #[test]
    fn test_missing_primary_field_fails() {
        let result = format_for_storage(&users(), &item(json!({"name": "jim"})));
        assert_eq!(
            result,
            Err(KeyError::MissingRequiredField {
                index: "primary".to_string(),
                field: "id".to_string(),
            })
        );
    }

    #[test]
    fn test_source_record_cannot_shadow_reserved_attributes() {
        let result = format_for_storage(&users(), &item(json!({"id": "1", "PK": "forged"})));
        assert_eq!(
            result,
            Err(KeyError::ReservedAttribute {
                attribute: "PK".to_string(),
            })
        );
    }

    #[test]
    fn test_primary_key_requires_every_sort_field() {
        let directory = IndexDirectory::build(
            "Purchase",
            &TableConfig::default(),
            &[IndexSpec::primary(&["userId"], &["itemId", "id"])],
        )
        .unwrap();

        let key = primary_key(
            &directory,
            &item(json!({"userId": "1", "itemId": "couch", "id": "9"})),
        )
        .unwrap();
        assert_eq!(
            key,
            item(json!({"PK": "Purchase#userId-1", "SK": "Purchase#itemId-couch#id-9"}))
        );

        let result = primary_key(&directory, &item(json!({"userId": "1", "itemId": "couch"})));
        assert_eq!(
            result,
            Err(KeyError::MissingRequiredField {
                index: "primary".to_string(),
                field: "id".to_string(),
            })
        );
    }
}
