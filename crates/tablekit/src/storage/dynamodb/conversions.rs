//! DynamoDB attribute conversion functions.
//!
//! Pure functions for converting between JSON items and DynamoDB
//! `AttributeValue` maps, and for building expressions. These are testable
//! in isolation without DynamoDB access.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{Number, Value};

use tablekit_core::item::Item;
use tablekit_core::storage::{QueryRequest, RepositoryError, SortCondition};

pub type Attributes = HashMap<String, AttributeValue>;

// ============================================================================
// Values
// ============================================================================

/// Convert a JSON value to a DynamoDB attribute.
pub fn value_to_attribute(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(values) => AttributeValue::L(values.iter().map(value_to_attribute).collect()),
        Value::Object(fields) => AttributeValue::M(item_to_attributes(fields)),
    }
}

/// Convert a DynamoDB attribute to a JSON value.
///
/// Sets become arrays and binary values become base64 strings.
pub fn attribute_to_value(attribute: &AttributeValue) -> Result<Value, RepositoryError> {
    Ok(match attribute {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => Value::Number(parse_number(n)?),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::L(values) => Value::Array(
            values
                .iter()
                .map(attribute_to_value)
                .collect::<Result<_, _>>()?,
        ),
        AttributeValue::M(fields) => Value::Object(attributes_to_item(fields)?),
        AttributeValue::Ss(values) => Value::Array(values.iter().cloned().map(Value::String).collect()),
        AttributeValue::Ns(values) => Value::Array(
            values
                .iter()
                .map(|n| parse_number(n).map(Value::Number))
                .collect::<Result<_, _>>()?,
        ),
        AttributeValue::B(blob) => Value::String(STANDARD.encode(blob.as_ref())),
        AttributeValue::Bs(blobs) => Value::Array(
            blobs
                .iter()
                .map(|blob| Value::String(STANDARD.encode(blob.as_ref())))
                .collect(),
        ),
        other => {
            return Err(RepositoryError::Serialization(format!(
                "Unsupported attribute value: {other:?}"
            )))
        }
    })
}

fn parse_number(raw: &str) -> Result<Number, RepositoryError> {
    if let Ok(n) = raw.parse::<i64>() {
        return Ok(n.into());
    }
    if let Ok(n) = raw.parse::<u64>() {
        return Ok(n.into());
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .ok_or_else(|| RepositoryError::Serialization(format!("Invalid number attribute: {raw}")))
}

// ============================================================================
// Items
// ============================================================================

/// Convert a JSON item to a DynamoDB item.
pub fn item_to_attributes(item: &Item) -> Attributes {
    item.iter()
        .map(|(name, value)| (name.clone(), value_to_attribute(value)))
        .collect()
}

/// Convert a DynamoDB item to a JSON item.
pub fn attributes_to_item(attributes: &Attributes) -> Result<Item, RepositoryError> {
    attributes
        .iter()
        .map(|(name, value)| Ok((name.clone(), attribute_to_value(value)?)))
        .collect()
}

// ============================================================================
// Expressions
// ============================================================================

/// A `ProjectionExpression` with every attribute name aliased, so reserved
/// words can be projected.
pub fn projection_expression(fields: &[String]) -> (String, HashMap<String, String>) {
    let names: Vec<(String, String)> = fields
        .iter()
        .enumerate()
        .map(|(position, field)| (format!("#p{position}"), field.clone()))
        .collect();
    let expression = names
        .iter()
        .map(|(alias, _)| alias.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    (expression, names.into_iter().collect())
}

/// Key condition expression with its attribute names and values.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyCondition {
    pub expression: String,
    pub names: HashMap<String, String>,
    pub values: Attributes,
}

pub fn key_condition(request: &QueryRequest) -> KeyCondition {
    let mut names = HashMap::from([("#pk".to_string(), request.partition.attribute.clone())]);
    let mut values = HashMap::from([(
        ":pk".to_string(),
        value_to_attribute(&request.partition.value),
    )]);

    let expression = match &request.sort {
        None => "#pk = :pk".to_string(),
        Some(sort) => {
            names.insert("#sk".to_string(), sort.attribute.clone());
            match &sort.condition {
                SortCondition::Equals(value) => {
                    values.insert(":sk".to_string(), value_to_attribute(value));
                    "#pk = :pk AND #sk = :sk".to_string()
                }
                SortCondition::BeginsWith(prefix) => {
                    values.insert(":sk".to_string(), AttributeValue::S(prefix.clone()));
                    "#pk = :pk AND begins_with(#sk, :sk)".to_string()
                }
            }
        }
    };

    KeyCondition {
        expression,
        names,
        values,
    }
}
