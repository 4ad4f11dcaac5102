//! Field maps shared by records, physical keys and store responses.

use serde_json::Value;

/// A record or key as a map of attribute names to JSON values.
///
/// `serde_json::Map` keeps its keys sorted, so the JSON rendering of an item
/// is canonical and can be used as an identity.
pub type Item = serde_json::Map<String, Value>;

/// Returns a canonical string identity for an item.
pub fn canonical(item: &Item) -> String {
    Value::Object(item.clone()).to_string()
}

/// Copies the named attributes out of `item`, skipping absent ones.
pub fn pick<'a, I>(item: &Item, attributes: I) -> Item
where
    I: IntoIterator<Item = &'a str>,
{
    attributes
        .into_iter()
        .filter_map(|name| {
            item.get(name)
                .map(|value| (name.to_string(), value.clone()))
        })
        .collect()
}

/// Restricts `item` to a projection. `None` keeps every attribute.
pub fn project(item: &Item, projection: Option<&[String]>) -> Item {
    match projection {
        Some(fields) => pick(item, fields.iter().map(String::as_str)),
        None => item.clone(),
    }
}
