//! The repository facade: typed records in, composite keys and store calls
//! out.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use tablekit_core::batch::{self, BatchConfig, BatchItemResult, BatchOperation};
use tablekit_core::index::IndexDirectory;
use tablekit_core::item::{canonical, Item};
use tablekit_core::keys::{format_for_storage, primary_key};
use tablekit_core::query::{build_query, encode_cursor, resolve, WhereClause};
use tablekit_core::storage::{KeyValueStore, RepositoryError, Result, Validator};

use crate::hooks::{HookEvent, Hooks};

/// One page of typed query results.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<T> {
    pub items: Vec<T>,
    /// Pass to [`WhereClause::after`] to fetch the next page.
    pub cursor: Option<String>,
}

/// Typed access to one object type stored in a shared table.
///
/// The store handle and index directory are injected; nothing is global.
pub struct Repository<T> {
    store: Arc<dyn KeyValueStore>,
    directory: Arc<IndexDirectory>,
    validator: Option<Arc<dyn Validator>>,
    hooks: Hooks,
    batch_config: BatchConfig,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            directory: self.directory.clone(),
            validator: self.validator.clone(),
            hooks: self.hooks.clone(),
            batch_config: self.batch_config.clone(),
            _record: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("type_name", &self.directory.type_name())
            .field("table", &self.directory.table().name)
            .field("validator", &self.validator.is_some())
            .field("hooks", &self.hooks)
            .finish()
    }
}

impl<T> Repository<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(store: Arc<dyn KeyValueStore>, directory: IndexDirectory) -> Self {
        Self {
            store,
            directory: Arc::new(directory),
            validator: None,
            hooks: Hooks::default(),
            batch_config: BatchConfig::default(),
            _record: PhantomData,
        }
    }

    /// Checks candidate records before every write.
    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_batch_config(mut self, config: BatchConfig) -> Self {
        self.batch_config = config;
        self
    }

    pub fn directory(&self) -> &IndexDirectory {
        &self.directory
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    fn table(&self) -> &str {
        &self.directory.table().name
    }

    fn type_name(&self) -> &str {
        self.directory.type_name()
    }

    // ------------------------------------------------------------------
    // Single-item operations
    // ------------------------------------------------------------------

    /// Gets a record by its primary key fields.
    pub async fn get<K>(&self, key: &K) -> Result<Option<T>>
    where
        K: Serialize + ?Sized,
    {
        let args = to_fields(key)?;
        let physical = primary_key(&self.directory, &args)?;
        tracing::debug!(type_name = self.type_name(), key = %canonical(&physical), "Getting item");

        let stored = self
            .store
            .get_item(self.table(), &physical, None)
            .await?
            .map(|item| self.strip(item));

        self.hooks.fire_get(|| HookEvent {
            type_name: self.type_name().to_string(),
            args: Value::Object(args),
            result: stored.clone().map_or(Value::Null, Value::Object),
            request: json!({ "table": self.table(), "key": physical }),
        });

        stored.map(decode).transpose()
    }

    /// Writes a record, replacing any record with the same primary key.
    pub async fn put(&self, record: &T) -> Result<()> {
        let fields = to_fields(record)?;
        let item = self.prepare(&fields)?;
        tracing::debug!(type_name = self.type_name(), "Putting item");

        self.store.put_item(self.table(), item.clone()).await?;

        self.hooks.fire_put(|| HookEvent {
            type_name: self.type_name().to_string(),
            args: Value::Object(fields),
            result: Value::Null,
            request: json!({ "table": self.table(), "item": item }),
        });
        Ok(())
    }

    /// Applies `patch` to the stored record and writes it back.
    ///
    /// This is a read followed by a write, not an atomic update: a concurrent
    /// writer between the two calls is overwritten. Patches may not change
    /// primary key fields.
    pub async fn update<K, P>(&self, key: &K, patch: &P) -> Result<T>
    where
        K: Serialize + ?Sized,
        P: Serialize + ?Sized,
    {
        let args = to_fields(key)?;
        let patch = to_fields(patch)?;
        let primary = self.directory.primary();
        for field in primary.hash_key_fields.iter().chain(&primary.sort_key_fields) {
            if patch.get(field).is_some_and(|value| args.get(field) != Some(value)) {
                return Err(RepositoryError::InvalidData(format!(
                    "update of {} may not change primary key field `{field}`",
                    self.type_name()
                )));
            }
        }

        let physical = primary_key(&self.directory, &args)?;
        let current = self
            .store
            .get_item(self.table(), &physical, None)
            .await?
            .ok_or_else(|| RepositoryError::NotFound {
                entity_type: self.type_name().to_string(),
                id: canonical(&physical),
            })?;

        let mut merged = self.strip(current);
        merged.extend(patch.clone());
        let item = self.prepare(&merged)?;
        tracing::debug!(type_name = self.type_name(), key = %canonical(&physical), "Updating item");

        self.store.put_item(self.table(), item.clone()).await?;

        self.hooks.fire_update(|| HookEvent {
            type_name: self.type_name().to_string(),
            args: json!({ "key": args, "patch": patch }),
            result: Value::Object(merged.clone()),
            request: json!({ "table": self.table(), "key": physical, "item": item }),
        });

        decode(merged)
    }

    /// Deletes a record by its primary key fields. Absent records are not an
    /// error.
    pub async fn delete<K>(&self, key: &K) -> Result<()>
    where
        K: Serialize + ?Sized,
    {
        let args = to_fields(key)?;
        let physical = primary_key(&self.directory, &args)?;
        tracing::debug!(type_name = self.type_name(), key = %canonical(&physical), "Deleting item");

        self.store.delete_item(self.table(), &physical).await?;

        self.hooks.fire_delete(|| HookEvent {
            type_name: self.type_name().to_string(),
            args: Value::Object(args),
            result: Value::Null,
            request: json!({ "table": self.table(), "key": physical }),
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Runs `clause` against the index that can serve it.
    ///
    /// Items of other object types sharing the partition (possible on
    /// custom indexes) are dropped.
    pub async fn query(&self, clause: &WhereClause) -> Result<QueryResult<T>> {
        let index = resolve(clause, &self.directory)?;
        let request = build_query(clause, index, &self.directory)?;

        let page = self.store.query(&request).await?;

        let type_attribute = &self.directory.table().type_attribute;
        let total = page.items.len();
        let stored: Vec<Item> = page
            .items
            .into_iter()
            .filter(|item| {
                item.get(type_attribute).and_then(Value::as_str) == Some(self.type_name())
            })
            .map(|item| self.strip(item))
            .collect();
        if stored.len() < total {
            tracing::debug!(
                type_name = self.type_name(),
                index = %index.tag,
                dropped = total - stored.len(),
                "Dropped query items of other types"
            );
        }
        let cursor = page.last_evaluated_key.as_ref().map(encode_cursor);

        self.hooks.fire_query(|| HookEvent {
            type_name: self.type_name().to_string(),
            args: serde_json::to_value(clause).unwrap_or_default(),
            result: json!({ "items": stored, "cursor": cursor }),
            request: serde_json::to_value(&request).unwrap_or_default(),
        });

        Ok(QueryResult {
            items: stored.into_iter().map(decode).collect::<Result<_>>()?,
            cursor,
        })
    }

    /// First record matching `clause`, if any.
    pub async fn query_one(&self, clause: &WhereClause) -> Result<Option<T>> {
        Ok(self.query(clause).await?.items.into_iter().next())
    }

    // ------------------------------------------------------------------
    // Batches
    // ------------------------------------------------------------------

    /// Gets several records; the result has one entry per key, in order.
    pub async fn batch_get<K>(&self, keys: &[K]) -> Result<Vec<Option<T>>>
    where
        K: Serialize,
    {
        let operations = keys
            .iter()
            .map(|key| self.get_operation(key, None))
            .collect::<Result<Vec<_>>>()?;
        let results = batch::execute(self.store.as_ref(), &self.batch_config, operations).await?;
        results
            .into_iter()
            .map(|result| self.decode_result(result))
            .collect()
    }

    pub async fn batch_put(&self, records: &[T]) -> Result<()> {
        let operations = records
            .iter()
            .map(|record| self.put_operation(record))
            .collect::<Result<Vec<_>>>()?;
        batch::execute(self.store.as_ref(), &self.batch_config, operations).await?;
        Ok(())
    }

    pub async fn batch_delete<K>(&self, keys: &[K]) -> Result<()>
    where
        K: Serialize,
    {
        let operations = keys
            .iter()
            .map(|key| self.delete_operation(key))
            .collect::<Result<Vec<_>>>()?;
        batch::execute(self.store.as_ref(), &self.batch_config, operations).await?;
        Ok(())
    }

    /// A batch get of this type, for mixing with other types in one batch.
    pub fn get_operation<K>(&self, key: &K, projection: Option<&[&str]>) -> Result<BatchOperation>
    where
        K: Serialize + ?Sized,
    {
        let physical = primary_key(&self.directory, &to_fields(key)?)?;
        Ok(match projection {
            Some(fields) => BatchOperation::get_projected(self.table(), physical, fields),
            None => BatchOperation::get(self.table(), physical),
        })
    }

    /// A validated batch put of this type.
    pub fn put_operation(&self, record: &T) -> Result<BatchOperation> {
        let fields = to_fields(record)?;
        let item = self.prepare(&fields)?;
        let key = primary_key(&self.directory, &fields)?;
        Ok(BatchOperation::put(self.table(), key, item))
    }

    pub fn delete_operation<K>(&self, key: &K) -> Result<BatchOperation>
    where
        K: Serialize + ?Sized,
    {
        let physical = primary_key(&self.directory, &to_fields(key)?)?;
        Ok(BatchOperation::delete(self.table(), physical))
    }

    /// Decodes one entry of a batch result into a record of this type.
    pub fn decode_result(&self, result: BatchItemResult) -> Result<Option<T>> {
        result
            .into_item()
            .map(|item| decode(self.strip(item)))
            .transpose()
    }

    // ------------------------------------------------------------------
    // Storage formatting
    // ------------------------------------------------------------------

    /// The item `record` is stored as, with every computed key attribute.
    pub fn format_for_storage(&self, record: &T) -> Result<Item> {
        Ok(format_for_storage(&self.directory, &to_fields(record)?)?)
    }

    fn prepare(&self, fields: &Item) -> Result<Item> {
        if let Some(validator) = &self.validator {
            validator
                .validate(fields)
                .map_err(|reasons| RepositoryError::ValidationRejected {
                    type_name: self.type_name().to_string(),
                    reasons,
                })?;
        }
        Ok(format_for_storage(&self.directory, fields)?)
    }

    /// Removes the attributes the storage layer computed.
    fn strip(&self, mut item: Item) -> Item {
        for attribute in self.directory.reserved_attributes() {
            item.remove(attribute);
        }
        item
    }
}

fn to_fields<V>(value: &V) -> Result<Item>
where
    V: Serialize + ?Sized,
{
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        other => Err(RepositoryError::InvalidData(format!(
            "expected an object, got `{other}`"
        ))),
    }
}

fn decode<T: DeserializeOwned>(item: Item) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(item))?)
}
