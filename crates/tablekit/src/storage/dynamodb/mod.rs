//! DynamoDB store adapter.
//!
//! This module implements `KeyValueStore` using `aws-sdk-dynamodb`. Key
//! conditions and projections alias every attribute name, so reserved words
//! can be used as field names.

mod conversions;
mod error;
mod store;

pub use conversions::{attributes_to_item, item_to_attributes};
pub use store::DynamoDbStore;
