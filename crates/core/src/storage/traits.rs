use async_trait::async_trait;

use crate::item::Item;

use super::{BatchGetOutput, BatchWriteOutput, QueryPage, QueryRequest, Result};

/// The remote key-value store primitives the repository is built on.
///
/// Batch calls may leave part of their work unprocessed (throttling, size
/// limits); callers are expected to resubmit it.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Gets an item by its physical key.
    async fn get_item(
        &self,
        table: &str,
        key: &Item,
        projection: Option<&[String]>,
    ) -> Result<Option<Item>>;

    /// Writes an item, replacing any item with the same key.
    async fn put_item(&self, table: &str, item: Item) -> Result<()>;

    /// Deletes an item by its physical key. Absent items are not an error.
    async fn delete_item(&self, table: &str, key: &Item) -> Result<()>;

    /// Queries one partition of the table or of a secondary index.
    async fn query(&self, request: &QueryRequest) -> Result<QueryPage>;

    /// Gets several items from one table.
    async fn batch_get(
        &self,
        table: &str,
        keys: Vec<Item>,
        projection: Option<&[String]>,
    ) -> Result<BatchGetOutput>;

    /// Writes and deletes several items in one table.
    async fn batch_write(
        &self,
        table: &str,
        puts: Vec<Item>,
        deletes: Vec<Item>,
    ) -> Result<BatchWriteOutput>;
}

/// Schema validation applied to candidate records before any write.
pub trait Validator: Send + Sync {
    /// Returns the rejection reasons, if any.
    fn validate(&self, candidate: &Item) -> std::result::Result<(), Vec<String>>;
}

impl<F> Validator for F
where
    F: Fn(&Item) -> std::result::Result<(), Vec<String>> + Send + Sync,
{
    fn validate(&self, candidate: &Item) -> std::result::Result<(), Vec<String>> {
        self(candidate)
    }
}
