use std::collections::HashMap;

use futures_util::stream::{self, StreamExt, TryStreamExt};

use crate::item::{canonical, pick, Item};
use crate::storage::{KeyValueStore, RepositoryError, Result};

use super::plan::{BatchPlan, GetChunk, WriteAction, WriteChunk};
use super::{BatchConfig, BatchItemResult, BatchOperation, BatchVerb, UnresolvedKey};

struct GetOutcome {
    found: Vec<(usize, Item)>,
    pending: Vec<usize>,
}

/// Runs a heterogeneous batch against `store`.
///
/// Writes are dispatched before reads, so a read of a key written in the
/// same batch observes the write. Unprocessed keys, and every key of a call
/// the store rejects as throttled, are resubmitted with backoff; if any
/// remain after `max_retries`, the whole call fails with
/// [`RepositoryError::BatchIncomplete`] listing them. Otherwise the result
/// has one entry per operation, in input order.
pub async fn execute(
    store: &dyn KeyValueStore,
    config: &BatchConfig,
    operations: Vec<BatchOperation>,
) -> Result<Vec<BatchItemResult>> {
    let plan = BatchPlan::new(operations);
    if plan.is_empty() {
        return Ok(Vec::new());
    }

    tracing::debug!(
        operations = plan.len(),
        unique_gets = plan.unique_gets(),
        unique_writes = plan.unique_writes(),
        "Executing batch"
    );

    let concurrency = config.concurrency.max(1);
    let mut unresolved: Vec<UnresolvedKey> = Vec::new();

    let pending_writes: Vec<Vec<usize>> = stream::iter(
        plan.write_chunks(config.max_write_items)
            .into_iter()
            .map(|chunk| write_chunk(store, config, &plan, chunk)),
    )
    .buffer_unordered(concurrency)
    .try_collect()
    .await?;

    unresolved.extend(
        pending_writes
            .into_iter()
            .flatten()
            .map(|entry| plan.writes[entry].unresolved()),
    );

    let outcomes: Vec<GetOutcome> = stream::iter(
        plan.get_chunks(config.max_get_items)
            .into_iter()
            .map(|chunk| get_chunk(store, config, &plan, chunk)),
    )
    .buffer_unordered(concurrency)
    .try_collect()
    .await?;

    let mut found: Vec<Option<Item>> = vec![None; plan.unique_gets()];
    for outcome in outcomes {
        for (entry, item) in outcome.found {
            found[entry] = Some(item);
        }
        unresolved.extend(outcome.pending.into_iter().map(|entry| {
            let get = &plan.gets[entry];
            UnresolvedKey {
                verb: BatchVerb::Get,
                table: get.table.clone(),
                key: get.key.clone(),
            }
        }));
    }

    if !unresolved.is_empty() {
        tracing::warn!(unresolved = unresolved.len(), "Batch left keys unprocessed");
        return Err(RepositoryError::BatchIncomplete { unresolved });
    }

    Ok(plan.assemble(&found))
}

/// Key attribute names of a chunk; every key in one table shares them.
fn key_names(key: &Item) -> Vec<&str> {
    key.keys().map(String::as_str).collect()
}

async fn get_chunk(
    store: &dyn KeyValueStore,
    config: &BatchConfig,
    plan: &BatchPlan,
    chunk: GetChunk,
) -> Result<GetOutcome> {
    let mut found = Vec::new();
    let mut pending = chunk.entries;
    let mut attempt = 0;

    loop {
        let by_key: HashMap<String, usize> = pending
            .iter()
            .map(|&entry| (canonical(&plan.gets[entry].key), entry))
            .collect();
        let names = key_names(&plan.gets[pending[0]].key);
        let keys = pending
            .iter()
            .map(|&entry| plan.gets[entry].key.clone())
            .collect();

        match store
            .batch_get(&chunk.table, keys, chunk.projection.as_deref())
            .await
        {
            Ok(output) => {
                for item in output.found {
                    let identity = canonical(&pick(&item, names.iter().copied()));
                    match by_key.get(&identity) {
                        Some(&entry) => found.push((entry, item)),
                        None => tracing::warn!(
                            table = %chunk.table,
                            key = %identity,
                            "Batch get returned an item matching no requested key"
                        ),
                    }
                }

                pending = output
                    .unprocessed_keys
                    .iter()
                    .filter_map(|key| by_key.get(&canonical(key)).copied())
                    .collect();
            }
            // A throttled call leaves every pending key unprocessed.
            Err(RepositoryError::Throttled(reason)) => {
                tracing::warn!(table = %chunk.table, %reason, "Batch get throttled");
            }
            Err(err) => return Err(err),
        }

        if pending.is_empty() || attempt >= config.max_retries {
            return Ok(GetOutcome { found, pending });
        }

        let delay = config.retry_delay(attempt);
        tracing::warn!(
            table = %chunk.table,
            unprocessed = pending.len(),
            attempt = attempt + 1,
            delay_ms = delay.as_millis() as u64,
            "Retrying unprocessed batch get keys"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

async fn write_chunk(
    store: &dyn KeyValueStore,
    config: &BatchConfig,
    plan: &BatchPlan,
    chunk: WriteChunk,
) -> Result<Vec<usize>> {
    let mut pending = chunk.entries;
    let mut attempt = 0;

    loop {
        let by_key: HashMap<String, usize> = pending
            .iter()
            .map(|&entry| (canonical(&plan.writes[entry].key), entry))
            .collect();
        let names = key_names(&plan.writes[pending[0]].key);

        let mut puts = Vec::new();
        let mut deletes = Vec::new();
        for &entry in &pending {
            let write = &plan.writes[entry];
            match &write.action {
                WriteAction::Put(item) => puts.push(item.clone()),
                WriteAction::Delete => deletes.push(write.key.clone()),
            }
        }

        match store.batch_write(&chunk.table, puts, deletes).await {
            Ok(output) => {
                pending = output
                    .unprocessed_puts
                    .iter()
                    .map(|item| pick(item, names.iter().copied()))
                    .chain(output.unprocessed_deletes)
                    .filter_map(|key| by_key.get(&canonical(&key)).copied())
                    .collect();
            }
            Err(RepositoryError::Throttled(reason)) => {
                tracing::warn!(table = %chunk.table, %reason, "Batch write throttled");
            }
            Err(err) => return Err(err),
        }

        if pending.is_empty() || attempt >= config.max_retries {
            return Ok(pending);
        }

        let delay = config.retry_delay(attempt);
        tracing::warn!(
            table = %chunk.table,
            unprocessed = pending.len(),
            attempt = attempt + 1,
            delay_ms = delay.as_millis() as u64,
            "Retrying unprocessed batch writes"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{BatchGetOutput, BatchWriteOutput, QueryPage, QueryRequest};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Serves batch calls from a map and holds back the last `throttle`
    /// entries of each call while `throttle_calls` remain. The first
    /// `rejected_calls` calls fail outright with `Throttled`.
    #[derive(Default)]
    struct ScriptedStore {
        items: Mutex<HashMap<String, Item>>,
        throttle: usize,
        throttle_calls: Mutex<usize>,
        rejected_calls: Mutex<usize>,
        calls: Mutex<Vec<(String, usize)>>,
    }

    impl ScriptedStore {
        fn with_items(items: Vec<Item>) -> Self {
            let store = Self::default();
            {
                let mut map = store.items.lock().unwrap();
                for item in items {
                    map.insert(canonical(&pick(&item, ["PK"])), item);
                }
            }
            store
        }

        fn throttled(mut self, throttle: usize, calls: usize) -> Self {
            self.throttle = throttle;
            *self.throttle_calls.lock().unwrap() = calls;
            self
        }

        fn rejecting(self, calls: usize) -> Self {
            *self.rejected_calls.lock().unwrap() = calls;
            self
        }

        fn reject(&self) -> Result<()> {
            let mut remaining = self.rejected_calls.lock().unwrap();
            if *remaining == 0 {
                return Ok(());
            }
            *remaining -= 1;
            Err(RepositoryError::Throttled("Throughput exceeded, please retry".to_string()))
        }

        fn held_back(&self, len: usize) -> usize {
            let mut remaining = self.throttle_calls.lock().unwrap();
            if *remaining == 0 {
                return 0;
            }
            *remaining -= 1;
            self.throttle.min(len)
        }

        fn calls(&self) -> Vec<(String, usize)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl KeyValueStore for ScriptedStore {
        async fn get_item(&self, _: &str, _: &Item, _: Option<&[String]>) -> Result<Option<Item>> {
            unimplemented!()
        }

        async fn put_item(&self, _: &str, _: Item) -> Result<()> {
            unimplemented!()
        }

        async fn delete_item(&self, _: &str, _: &Item) -> Result<()> {
            unimplemented!()
        }

        async fn query(&self, _: &QueryRequest) -> Result<QueryPage> {
            unimplemented!()
        }

        async fn batch_get(
            &self,
            _table: &str,
            mut keys: Vec<Item>,
            projection: Option<&[String]>,
        ) -> Result<BatchGetOutput> {
            self.calls.lock().unwrap().push(("get".to_string(), keys.len()));
            self.reject()?;
            let held = self.held_back(keys.len());
            let unprocessed_keys = keys.split_off(keys.len() - held);
            let items = self.items.lock().unwrap();
            let found = keys
                .iter()
                .filter_map(|key| items.get(&canonical(key)))
                .map(|item| crate::item::project(item, projection))
                .collect();
            Ok(BatchGetOutput {
                found,
                unprocessed_keys,
            })
        }

        async fn batch_write(
            &self,
            _table: &str,
            mut puts: Vec<Item>,
            deletes: Vec<Item>,
        ) -> Result<BatchWriteOutput> {
            self.calls
                .lock()
                .unwrap()
                .push(("write".to_string(), puts.len() + deletes.len()));
            self.reject()?;
            let held = self.held_back(puts.len());
            let unprocessed_puts = puts.split_off(puts.len() - held);
            let mut items = self.items.lock().unwrap();
            for item in puts {
                items.insert(canonical(&pick(&item, ["PK"])), item);
            }
            for key in deletes {
                items.remove(&canonical(&key));
            }
            Ok(BatchWriteOutput {
                unprocessed_puts,
                unprocessed_deletes: Vec::new(),
            })
        }
    }

    fn item(value: Value) -> Item {
        value.as_object().cloned().unwrap()
    }

    fn key(id: &str) -> Item {
        item(json!({"PK": format!("User#id-{id}")}))
    }

    fn user(id: &str, name: &str) -> Item {
        item(json!({"PK": format!("User#id-{id}"), "name": name, "age": 30}))
    }

    fn fast_config() -> BatchConfig {
        BatchConfig {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            ..BatchConfig::default()
        }
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_calls() {
        let store = ScriptedStore::default();
        let results = execute(&store, &fast_config(), Vec::new()).await.unwrap();
        assert!(results.is_empty());
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_results_follow_input_order_with_duplicates() {
        let store = ScriptedStore::with_items(vec![user("1", "jim"), user("2", "pam")]);

        let results = execute(
            &store,
            &fast_config(),
            vec![
                BatchOperation::get("app", key("2")),
                BatchOperation::get("app", key("missing")),
                BatchOperation::get_projected("app", key("1"), &["name"]),
                BatchOperation::get("app", key("2")),
            ],
        )
        .await
        .unwrap();

        assert_eq!(
            results,
            vec![
                BatchItemResult::Found(user("2", "pam")),
                BatchItemResult::NotFound,
                BatchItemResult::Found(item(json!({"name": "jim"}))),
                BatchItemResult::Found(user("2", "pam")),
            ]
        );
    }

    #[tokio::test]
    async fn test_large_batch_is_chunked_by_provider_limits() {
        let store = ScriptedStore::default();
        let mut operations: Vec<_> = (0..30)
            .map(|i| BatchOperation::put("app", key(&i.to_string()), user(&i.to_string(), "x")))
            .collect();
        operations.extend((0..150).map(|i| BatchOperation::get("app", key(&i.to_string()))));

        let results = execute(&store, &fast_config(), operations).await.unwrap();
        assert_eq!(results.len(), 180);
        assert!(results[..30]
            .iter()
            .all(|result| *result == BatchItemResult::Acknowledged));
        assert!(matches!(results[30], BatchItemResult::Found(_)));
        assert_eq!(results[179], BatchItemResult::NotFound);

        let mut calls = store.calls();
        calls.sort();
        assert_eq!(
            calls,
            vec![
                ("get".to_string(), 50),
                ("get".to_string(), 100),
                ("write".to_string(), 5),
                ("write".to_string(), 25),
            ]
        );
    }

    #[tokio::test]
    async fn test_reads_observe_writes_in_same_batch() {
        let store = ScriptedStore::with_items(vec![user("1", "jim")]);

        let results = execute(
            &store,
            &fast_config(),
            vec![
                BatchOperation::get("app", key("1")),
                BatchOperation::delete("app", key("1")),
            ],
        )
        .await
        .unwrap();

        assert_eq!(
            results,
            vec![BatchItemResult::NotFound, BatchItemResult::Acknowledged]
        );
    }

    #[tokio::test]
    async fn test_unprocessed_items_are_retried() {
        let store = ScriptedStore::with_items(vec![user("1", "jim"), user("2", "pam")])
            .throttled(1, 2);

        let results = execute(
            &store,
            &fast_config(),
            vec![
                BatchOperation::get("app", key("1")),
                BatchOperation::get("app", key("2")),
            ],
        )
        .await
        .unwrap();

        assert_eq!(
            results,
            vec![
                BatchItemResult::Found(user("1", "jim")),
                BatchItemResult::Found(user("2", "pam")),
            ]
        );
        assert_eq!(
            store.calls(),
            vec![
                ("get".to_string(), 2),
                ("get".to_string(), 1),
                ("get".to_string(), 1),
            ]
        );
    }

    #[tokio::test]
    async fn test_exhausted_retries_fail_with_unresolved_keys() {
        let store = ScriptedStore::with_items(vec![user("1", "jim")]).throttled(1, usize::MAX);
        let config = BatchConfig {
            max_retries: 2,
            ..fast_config()
        };

        let error = execute(
            &store,
            &config,
            vec![
                BatchOperation::put("app", key("9"), user("9", "kev")),
                BatchOperation::get("app", key("1")),
            ],
        )
        .await
        .unwrap_err();

        assert_eq!(
            error,
            RepositoryError::BatchIncomplete {
                unresolved: vec![
                    UnresolvedKey {
                        verb: BatchVerb::Put,
                        table: "app".to_string(),
                        key: key("9"),
                    },
                    UnresolvedKey {
                        verb: BatchVerb::Get,
                        table: "app".to_string(),
                        key: key("1"),
                    },
                ],
            }
        );
        // One initial call plus two retries per phase.
        assert_eq!(store.calls().len(), 6);
    }

    #[tokio::test]
    async fn test_throttled_call_is_retried() {
        let store = ScriptedStore::with_items(vec![user("1", "jim")]).rejecting(1);

        let results = execute(
            &store,
            &fast_config(),
            vec![BatchOperation::get("app", key("1"))],
        )
        .await
        .unwrap();

        assert_eq!(results, vec![BatchItemResult::Found(user("1", "jim"))]);
        assert_eq!(
            store.calls(),
            vec![("get".to_string(), 1), ("get".to_string(), 1)]
        );
    }

    #[tokio::test]
    async fn test_throttled_writes_are_retried_before_reads() {
        let store = ScriptedStore::default().rejecting(2);

        let results = execute(
            &store,
            &fast_config(),
            vec![
                BatchOperation::put("app", key("9"), user("9", "kev")),
                BatchOperation::get("app", key("9")),
            ],
        )
        .await
        .unwrap();

        assert_eq!(
            results,
            vec![
                BatchItemResult::Acknowledged,
                BatchItemResult::Found(user("9", "kev")),
            ]
        );
        assert_eq!(
            store.calls(),
            vec![
                ("write".to_string(), 1),
                ("write".to_string(), 1),
                ("write".to_string(), 1),
                ("get".to_string(), 1),
            ]
        );
    }

    #[tokio::test]
    async fn test_persistent_throttling_fails_with_unresolved_keys() {
        let store = ScriptedStore::default().rejecting(usize::MAX);
        let config = BatchConfig {
            max_retries: 1,
            ..fast_config()
        };

        let error = execute(
            &store,
            &config,
            vec![BatchOperation::delete("app", key("1"))],
        )
        .await
        .unwrap_err();

        assert_eq!(
            error,
            RepositoryError::BatchIncomplete {
                unresolved: vec![UnresolvedKey {
                    verb: BatchVerb::Delete,
                    table: "app".to_string(),
                    key: key("1"),
                }],
            }
        );
        assert_eq!(store.calls().len(), 2);
    }
}
