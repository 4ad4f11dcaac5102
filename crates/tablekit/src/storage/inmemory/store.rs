//! In-memory store implementation.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use tablekit_core::index::TableConfig;
use tablekit_core::item::{canonical, pick, project, Item};
use tablekit_core::storage::{
    BatchGetOutput, BatchWriteOutput, KeyValueStore, QueryPage, QueryRequest, RepositoryError,
    Result,
};

#[derive(Debug, Default)]
struct TableData {
    key_attributes: Vec<String>,
    /// Items by the canonical rendering of their primary key.
    items: BTreeMap<String, Item>,
}

impl TableData {
    fn key_of(&self, item: &Item) -> String {
        canonical(&pick(item, self.key_attributes.iter().map(String::as_str)))
    }
}

#[derive(Debug, Default)]
struct CallCounters {
    get_item: AtomicUsize,
    put_item: AtomicUsize,
    delete_item: AtomicUsize,
    query: AtomicUsize,
    batch_get: AtomicUsize,
    batch_write: AtomicUsize,
}

/// Number of calls of each kind the store has received.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub get_item: usize,
    pub put_item: usize,
    pub delete_item: usize,
    pub query: usize,
    pub batch_get: usize,
    pub batch_write: usize,
}

/// In-memory storage backend for testing.
///
/// Clones share the same tables and counters.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<HashMap<String, TableData>>>,
    unprocessed_limit: Option<usize>,
    calls: Arc<CallCounters>,
}

enum PendingWrite {
    Put(Item),
    Delete(Item),
}

impl InMemoryStore {
    /// Creates a store without tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding one empty table laid out as `table`.
    pub fn for_table(table: &TableConfig) -> Self {
        let mut tables = HashMap::new();
        tables.insert(table.name.clone(), table_data(table));
        Self {
            tables: Arc::new(RwLock::new(tables)),
            ..Self::default()
        }
    }

    /// Adds an empty table, replacing any table with the same name.
    pub async fn create_table(&self, table: &TableConfig) {
        let mut tables = self.tables.write().await;
        tables.insert(table.name.clone(), table_data(table));
    }

    /// Processes at most `limit` entries per batch call and reports the rest
    /// as unprocessed. A limit of zero never makes progress.
    pub fn with_unprocessed_limit(mut self, limit: usize) -> Self {
        self.unprocessed_limit = Some(limit);
        self
    }

    pub fn calls(&self) -> CallCounts {
        let load = |counter: &AtomicUsize| counter.load(AtomicOrdering::SeqCst);
        CallCounts {
            get_item: load(&self.calls.get_item),
            put_item: load(&self.calls.put_item),
            delete_item: load(&self.calls.delete_item),
            query: load(&self.calls.query),
            batch_get: load(&self.calls.batch_get),
            batch_write: load(&self.calls.batch_write),
        }
    }

    /// Every item of `table`, in key order.
    pub async fn items(&self, table: &str) -> Vec<Item> {
        let tables = self.tables.read().await;
        tables
            .get(table)
            .map(|data| data.items.values().cloned().collect())
            .unwrap_or_default()
    }

    fn split_budget(&self, len: usize) -> usize {
        self.unprocessed_limit.map_or(len, |limit| limit.min(len))
    }
}

fn table_data(table: &TableConfig) -> TableData {
    TableData {
        key_attributes: table.key_attributes().map(str::to_string).collect(),
        items: BTreeMap::new(),
    }
}

fn table_not_found(table: &str) -> RepositoryError {
    RepositoryError::QueryFailed(format!("Table not found: {table}"))
}

fn check_key(data: &TableData, item: &Item) -> Result<()> {
    match data.key_attributes.first() {
        Some(partition) if !item.contains_key(partition) => Err(RepositoryError::InvalidData(
            format!("item is missing key attribute `{partition}`"),
        )),
        _ => Ok(()),
    }
}

/// Orders sort values the way the remote store does: numbers numerically,
/// strings lexicographically by bytes.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(a), Value::String(b)) => a.as_bytes().cmp(b.as_bytes()),
        (a, b) => a.to_string().cmp(&b.to_string()),
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get_item(
        &self,
        table: &str,
        key: &Item,
        projection: Option<&[String]>,
    ) -> Result<Option<Item>> {
        self.calls.get_item.fetch_add(1, AtomicOrdering::SeqCst);
        let tables = self.tables.read().await;
        let data = tables.get(table).ok_or_else(|| table_not_found(table))?;
        Ok(data
            .items
            .get(&data.key_of(key))
            .map(|item| project(item, projection)))
    }

    async fn put_item(&self, table: &str, item: Item) -> Result<()> {
        self.calls.put_item.fetch_add(1, AtomicOrdering::SeqCst);
        let mut tables = self.tables.write().await;
        let data = tables.get_mut(table).ok_or_else(|| table_not_found(table))?;
        check_key(data, &item)?;
        let key = data.key_of(&item);
        data.items.insert(key, item);
        Ok(())
    }

    async fn delete_item(&self, table: &str, key: &Item) -> Result<()> {
        self.calls.delete_item.fetch_add(1, AtomicOrdering::SeqCst);
        let mut tables = self.tables.write().await;
        let data = tables.get_mut(table).ok_or_else(|| table_not_found(table))?;
        let key = data.key_of(key);
        data.items.remove(&key);
        Ok(())
    }

    async fn query(&self, request: &QueryRequest) -> Result<QueryPage> {
        self.calls.query.fetch_add(1, AtomicOrdering::SeqCst);
        let tables = self.tables.read().await;
        let data = tables
            .get(&request.table)
            .ok_or_else(|| table_not_found(&request.table))?;

        let partition = &request.partition;
        let sort_attribute = request
            .sort
            .as_ref()
            .map(|sort| &sort.attribute)
            .or(request.sort_attribute.as_ref());

        // Items lacking the index's sort attribute are not part of the index.
        let mut matches: Vec<&Item> = data
            .items
            .values()
            .filter(|item| item.get(&partition.attribute) == Some(&partition.value))
            .filter(|item| sort_attribute.map_or(true, |attribute| item.contains_key(attribute)))
            .filter(|item| match &request.sort {
                Some(sort) => item
                    .get(&sort.attribute)
                    .is_some_and(|value| sort.condition.matches(value)),
                None => true,
            })
            .collect();

        // Index order: sort attribute, then table key.
        let order = |a: &Item, b: &Item| {
            let by_sort = match sort_attribute {
                Some(attribute) => match (a.get(attribute), b.get(attribute)) {
                    (Some(a), Some(b)) => compare_values(a, b),
                    (a, b) => a.is_some().cmp(&b.is_some()),
                },
                None => Ordering::Equal,
            };
            by_sort.then_with(|| data.key_of(a).cmp(&data.key_of(b)))
        };

        matches.sort_by(|a, b| order(*a, *b));
        if !request.scan_forward {
            matches.reverse();
        }

        // Attributes identifying a position in this index.
        let mut position_attributes: Vec<&str> =
            data.key_attributes.iter().map(String::as_str).collect();
        position_attributes.push(partition.attribute.as_str());
        position_attributes.extend(sort_attribute.map(String::as_str));
        let position_of = |item: &Item| pick(item, position_attributes.iter().copied());

        // Resume after the start position whether or not its item still exists.
        if let Some(start) = &request.exclusive_start_key {
            let past = if request.scan_forward {
                Ordering::Greater
            } else {
                Ordering::Less
            };
            matches.retain(|item| order(*item, start) == past);
        }

        let limit = request.limit.map_or(usize::MAX, |limit| limit as usize);
        let more = matches.len() > limit;
        matches.truncate(limit);

        let last_evaluated_key = if more {
            matches.last().copied().map(position_of)
        } else {
            None
        };

        Ok(QueryPage {
            items: matches.into_iter().cloned().collect(),
            last_evaluated_key,
        })
    }

    async fn batch_get(
        &self,
        table: &str,
        mut keys: Vec<Item>,
        projection: Option<&[String]>,
    ) -> Result<BatchGetOutput> {
        self.calls.batch_get.fetch_add(1, AtomicOrdering::SeqCst);
        let tables = self.tables.read().await;
        let data = tables.get(table).ok_or_else(|| table_not_found(table))?;

        let unprocessed_keys = keys.split_off(self.split_budget(keys.len()));
        let found = keys
            .iter()
            .filter_map(|key| data.items.get(&data.key_of(key)))
            .map(|item| project(item, projection))
            .collect();

        Ok(BatchGetOutput {
            found,
            unprocessed_keys,
        })
    }

    async fn batch_write(
        &self,
        table: &str,
        puts: Vec<Item>,
        deletes: Vec<Item>,
    ) -> Result<BatchWriteOutput> {
        self.calls.batch_write.fetch_add(1, AtomicOrdering::SeqCst);
        let mut tables = self.tables.write().await;
        let data = tables.get_mut(table).ok_or_else(|| table_not_found(table))?;
        for item in &puts {
            check_key(data, item)?;
        }

        let mut writes: Vec<PendingWrite> = puts
            .into_iter()
            .map(PendingWrite::Put)
            .chain(deletes.into_iter().map(PendingWrite::Delete))
            .collect();
        let held = writes.split_off(self.split_budget(writes.len()));

        for write in writes {
            match write {
                PendingWrite::Put(item) => {
                    let key = data.key_of(&item);
                    data.items.insert(key, item);
                }
                PendingWrite::Delete(key) => {
                    let key = data.key_of(&key);
                    data.items.remove(&key);
                }
            }
        }

        let mut output = BatchWriteOutput::default();
        for write in held {
            match write {
                PendingWrite::Put(item) => output.unprocessed_puts.push(item),
                PendingWrite::Delete(key) => output.unprocessed_deletes.push(key),
            }
        }
        Ok(output)
    }
}
