use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::index::{IndexDefinition, IndexKind};
use crate::item::Item;

use super::KeyError;

pub const DEFAULT_SEPARATOR: &str = "#";
pub const DEFAULT_INTEGER_WIDTH: usize = 18;
pub const DEFAULT_FRACTION_WIDTH: usize = 2;

/// Fixed-width rendering of non-negative numbers.
///
/// `12.5` becomes `000000000000000012.50` with the default widths, so plain
/// string comparison agrees with numeric comparison.
///
/// Ordering holds only below `10^integer_width`. Wider integer parts are kept
/// intact and sort before smaller numbers (`10^18` sorts before
/// `999999999999999999` with the default width).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberPadding {
    pub integer_width: usize,
    pub fraction_width: usize,
}

impl Default for NumberPadding {
    fn default() -> Self {
        Self {
            integer_width: DEFAULT_INTEGER_WIDTH,
            fraction_width: DEFAULT_FRACTION_WIDTH,
        }
    }
}

/// How field values are rendered into composite key strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeyFormat {
    pub separator: String,
    /// `None` renders numbers in their natural form.
    pub number_padding: Option<NumberPadding>,
}

impl Default for KeyFormat {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            number_padding: Some(NumberPadding::default()),
        }
    }
}

impl KeyFormat {
    /// Renders a single field value.
    ///
    /// Negative numbers and non-numeric values use their natural string form
    /// and carry no ordering guarantee.
    pub fn encode_value(&self, value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => self.encode_number(n),
            Value::Bool(b) => b.to_string(),
            Value::Null => "null".to_string(),
            other => other.to_string(),
        }
    }

    fn encode_number(&self, number: &Number) -> String {
        // Float `Display` never switches to exponent notation.
        let natural = match number.as_f64() {
            Some(f) if number.is_f64() => format!("{f}"),
            _ => number.to_string(),
        };

        let Some(padding) = self.number_padding else {
            return natural;
        };
        if natural.starts_with('-') {
            return natural;
        }

        let (int_part, frac_part) = natural.split_once('.').unwrap_or((natural.as_str(), ""));
        if int_part.len() > padding.integer_width {
            tracing::warn!(
                value = %natural,
                integer_width = padding.integer_width,
                "Number exceeds padded width; key order no longer matches numeric order"
            );
        }
        format!(
            "{int_part:0>iw$}.{frac_part:0<fw$}",
            iw = padding.integer_width,
            fw = padding.fraction_width
        )
    }

    /// Joins a descriptor with `field-value` pairs.
    pub fn compose<'a, I>(&self, descriptor: &str, fields: I) -> String
    where
        I: IntoIterator<Item = (&'a str, &'a Value)>,
    {
        let mut key = descriptor.to_string();
        for (field, value) in fields {
            key.push_str(&self.separator);
            key.push_str(field);
            key.push('-');
            key.push_str(&self.encode_value(value));
        }
        key
    }
}

/// One physical key attribute and its value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPart {
    pub attribute: String,
    pub value: Value,
}

impl KeyPart {
    pub fn new(attribute: impl Into<String>, value: Value) -> Self {
        Self {
            attribute: attribute.into(),
            value,
        }
    }
}

/// Encoded key attributes for one index.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedKey {
    pub hash: KeyPart,
    pub sort: Option<KeyPart>,
    complete: bool,
}

impl EncodedKey {
    /// Whether every sort field of the index was present.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn into_item(self) -> Item {
        let mut item = Item::new();
        item.insert(self.hash.attribute, self.hash.value);
        if let Some(sort) = self.sort {
            item.insert(sort.attribute, sort.value);
        }
        item
    }
}

/// Encodes the key attributes of `index` from `fields`.
///
/// Sort fields are consumed left to right and encoding stops at the first
/// absent one, which yields a prefix usable for begins-with queries.
pub fn encode(
    index: &IndexDefinition,
    fields: &Item,
    format: &KeyFormat,
) -> Result<EncodedKey, KeyError> {
    if index.kind == IndexKind::CustomGlobalSecondary {
        return encode_custom(index, fields);
    }

    let hash_fields = index
        .hash_key_fields
        .iter()
        .map(|field| {
            fields
                .get(field)
                .map(|value| (field.as_str(), value))
                .ok_or_else(|| KeyError::MissingRequiredField {
                    index: index.tag.clone(),
                    field: field.clone(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let hash = KeyPart::new(
        index.hash_key_attribute.clone(),
        Value::String(format.compose(&index.descriptor, hash_fields)),
    );

    let sort_fields: Vec<_> = index
        .sort_key_fields
        .iter()
        .map_while(|field| fields.get(field).map(|value| (field.as_str(), value)))
        .collect();
    let complete = sort_fields.len() == index.sort_key_fields.len();

    let sort = match &index.sort_key_attribute {
        Some(attribute) if !index.sort_key_fields.is_empty() => Some(KeyPart::new(
            attribute.clone(),
            Value::String(format.compose(&index.descriptor, sort_fields)),
        )),
        _ => None,
    };

    Ok(EncodedKey {
        hash,
        sort,
        complete,
    })
}

/// Custom indexes read their pre-computed attributes straight off the record.
fn encode_custom(index: &IndexDefinition, fields: &Item) -> Result<EncodedKey, KeyError> {
    let hash_value = fields
        .get(&index.hash_key_attribute)
        .cloned()
        .ok_or_else(|| KeyError::MissingRequiredField {
            index: index.tag.clone(),
            field: index.hash_key_attribute.clone(),
        })?;

    let sort = index.sort_key_attribute.as_ref().and_then(|attribute| {
        fields
            .get(attribute)
            .map(|value| KeyPart::new(attribute.clone(), value.clone()))
    });
    let complete = index.sort_key_attribute.is_none() || sort.is_some();

    Ok(EncodedKey {
        hash: KeyPart::new(index.hash_key_attribute.clone(), hash_value),
        sort,
        complete,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(value: Value) -> Item {
        value.as_object().cloned().unwrap()
    }

    fn definition(
        kind: IndexKind,
        descriptor: &str,
        hash: &[&str],
        sort: &[&str],
        sort_attribute: Option<&str>,
    ) -> IndexDefinition {
        IndexDefinition {
            tag: "test".to_string(),
            kind,
            index_name: None,
            hash_key_fields: hash.iter().map(|s| s.to_string()).collect(),
            sort_key_fields: sort.iter().map(|s| s.to_string()).collect(),
            hash_key_attribute: "PK".to_string(),
            sort_key_attribute: sort_attribute.map(str::to_string),
            descriptor: descriptor.to_string(),
        }
    }

    #[test]
    fn test_primary_without_sort_fields_has_no_sort_attribute() {
        let index = definition(IndexKind::Primary, "User", &["id"], &[], Some("SK"));
        let key = encode(
            &index,
            &item(json!({"id": "1", "name": "jim"})),
            &KeyFormat::default(),
        )
        .unwrap();

        assert_eq!(key.hash, KeyPart::new("PK", json!("User#id-1")));
        assert_eq!(key.sort, None);
        assert!(key.is_complete());
    }

    #[test]
    fn test_composite_purchase_keys() {
        let index = definition(
            IndexKind::Primary,
            "Purchase",
            &["userId"],
            &["itemId", "id"],
            Some("SK"),
        );
        let key = encode(
            &index,
            &item(json!({"userId": "1208493", "itemId": "awesomecouch", "id": "1234"})),
            &KeyFormat::default(),
        )
        .unwrap();

        assert_eq!(key.hash.value, json!("Purchase#userId-1208493"));
        assert_eq!(
            key.sort.unwrap().value,
            json!("Purchase#itemId-awesomecouch#id-1234")
        );
    }

    #[test]
    fn test_sort_key_stops_at_first_missing_field() {
        let index = definition(
            IndexKind::Primary,
            "Purchase",
            &["userId"],
            &["itemId", "id"],
            Some("SK"),
        );
        // `id` is present but `itemId` is not, so nothing after the gap counts.
        let key = encode(
            &index,
            &item(json!({"userId": "1", "id": "1234"})),
            &KeyFormat::default(),
        )
        .unwrap();

        assert!(!key.is_complete());
        assert_eq!(key.sort.unwrap().value, json!("Purchase"));
    }

    #[test]
    fn test_missing_hash_field_fails() {
        let index = definition(IndexKind::GlobalSecondary, "User", &["email"], &[], None);
        let result = encode(&index, &item(json!({"id": "1"})), &KeyFormat::default());

        assert_eq!(
            result,
            Err(KeyError::MissingRequiredField {
                index: "test".to_string(),
                field: "email".to_string(),
            })
        );
    }

    #[test]
    fn test_custom_index_is_identity_projection() {
        let mut index = definition(IndexKind::CustomGlobalSecondary, "User", &[], &[], None);
        index.hash_key_attribute = "email".to_string();
        index.sort_key_attribute = Some("createdAt".to_string());

        let key = encode(
            &index,
            &item(json!({"email": "jim@example.com", "createdAt": 17})),
            &KeyFormat::default(),
        )
        .unwrap();

        assert_eq!(key.hash, KeyPart::new("email", json!("jim@example.com")));
        assert_eq!(key.sort, Some(KeyPart::new("createdAt", json!(17))));
        assert!(key.is_complete());
    }

    #[test]
    fn test_number_padding() {
        let format = KeyFormat::default();
        assert_eq!(format.encode_value(&json!(42)), "000000000000000042.00");
        assert_eq!(format.encode_value(&json!(12.5)), "000000000000000012.50");
        assert_eq!(format.encode_value(&json!(0.125)), "000000000000000000.125");
        assert_eq!(format.encode_value(&json!(-3)), "-3");
        assert_eq!(format.encode_value(&json!(true)), "true");
    }

    #[test]
    fn test_padding_disabled_uses_natural_form() {
        let format = KeyFormat {
            number_padding: None,
            ..KeyFormat::default()
        };
        assert_eq!(format.encode_value(&json!(42)), "42");
    }

    #[test]
    fn test_padded_numbers_sort_like_numbers() {
        let format = KeyFormat::default();
        let values = [0.0, 0.5, 1.0, 2.25, 9.99, 10.0, 99.5, 100.0, 12345.67, 1e15];
        for pair in values.windows(2) {
            let a = format.encode_value(&json!(pair[0]));
            let b = format.encode_value(&json!(pair[1]));
            assert!(a < b, "{a} should sort before {b}");
        }
    }

    #[test]
    fn test_integer_wider_than_padding_is_kept_intact() {
        let format = KeyFormat::default();
        let widest = format.encode_value(&json!(999_999_999_999_999_999u64));
        let overflow = format.encode_value(&json!(1_000_000_000_000_000_000u64));

        assert_eq!(widest, "999999999999999999.00");
        assert_eq!(overflow, "1000000000000000000.00");
        // Past the width, string order no longer follows numeric order.
        assert!(overflow < widest);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let index = definition(
            IndexKind::Primary,
            "Purchase",
            &["userId"],
            &["itemId"],
            Some("SK"),
        );
        let fields = item(json!({"userId": "1", "itemId": 7}));
        let first = encode(&index, &fields, &KeyFormat::default()).unwrap();
        let second = encode(&index, &fields, &KeyFormat::default()).unwrap();
        assert_eq!(first, second);
    }
}
