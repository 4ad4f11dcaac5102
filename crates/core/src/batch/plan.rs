use std::collections::{BTreeSet, HashMap};

use crate::item::{canonical, project, Item};

use super::{BatchItemResult, BatchOperation, BatchVerb, UnresolvedKey};

/// Where each input operation reads its result from.
#[derive(Debug, Clone)]
enum Slot {
    Get {
        entry: usize,
        projection: Option<Vec<String>>,
    },
    Write,
}

/// A distinct `(table, key)` read, with the union of requested projections.
#[derive(Debug, Clone)]
pub(super) struct UniqueGet {
    pub table: String,
    pub key: Item,
    /// `None` once any occurrence asked for the whole item.
    pub projection: Option<BTreeSet<String>>,
}

impl UniqueGet {
    fn merge_projection(&mut self, requested: Option<&[String]>) {
        match (&mut self.projection, requested) {
            (Some(fields), Some(requested)) => fields.extend(requested.iter().cloned()),
            (merged, None) => *merged = None,
            (None, Some(_)) => {}
        }
    }

    /// The projection sent to the store. Key attributes are always included
    /// so returned items can be matched back to their keys.
    fn dispatched_projection(&self) -> Option<Vec<String>> {
        self.projection.as_ref().map(|fields| {
            let mut fields = fields.clone();
            fields.extend(self.key.keys().cloned());
            fields.into_iter().collect()
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(super) enum WriteAction {
    Put(Item),
    Delete,
}

/// A distinct `(table, key)` write. The last write in input order wins.
#[derive(Debug, Clone)]
pub(super) struct UniqueWrite {
    pub table: String,
    pub key: Item,
    pub action: WriteAction,
}

impl UniqueWrite {
    pub(super) fn unresolved(&self) -> UnresolvedKey {
        UnresolvedKey {
            verb: match self.action {
                WriteAction::Put(_) => BatchVerb::Put,
                WriteAction::Delete => BatchVerb::Delete,
            },
            table: self.table.clone(),
            key: self.key.clone(),
        }
    }
}

/// Unique reads dispatched together: same table, same projection.
#[derive(Debug, Clone, PartialEq)]
pub struct GetChunk {
    pub table: String,
    pub projection: Option<Vec<String>>,
    /// Positions into the plan's unique reads.
    pub entries: Vec<usize>,
}

/// Unique writes dispatched together against one table.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteChunk {
    pub table: String,
    /// Positions into the plan's unique writes.
    pub entries: Vec<usize>,
}

/// The deduplicated form of a batch request.
///
/// Built once from the caller's operations; dispatch results for unique
/// entries are fanned back out to every original position by
/// [`BatchPlan::assemble`].
#[derive(Debug, Clone)]
pub struct BatchPlan {
    slots: Vec<Slot>,
    pub(super) gets: Vec<UniqueGet>,
    pub(super) writes: Vec<UniqueWrite>,
}

impl BatchPlan {
    pub fn new(operations: Vec<BatchOperation>) -> Self {
        let mut plan = Self {
            slots: Vec::with_capacity(operations.len()),
            gets: Vec::new(),
            writes: Vec::new(),
        };
        let mut get_entries: HashMap<(String, String), usize> = HashMap::new();
        let mut write_entries: HashMap<(String, String), usize> = HashMap::new();

        for operation in operations {
            match operation {
                BatchOperation::Get {
                    table,
                    key,
                    projection,
                } => {
                    let identity = (table.clone(), canonical(&key));
                    let entry = match get_entries.get(&identity) {
                        Some(&entry) => {
                            plan.gets[entry].merge_projection(projection.as_deref());
                            entry
                        }
                        None => {
                            plan.gets.push(UniqueGet {
                                table,
                                key,
                                projection: projection
                                    .as_ref()
                                    .map(|fields| fields.iter().cloned().collect()),
                            });
                            get_entries.insert(identity, plan.gets.len() - 1);
                            plan.gets.len() - 1
                        }
                    };
                    plan.slots.push(Slot::Get { entry, projection });
                }
                BatchOperation::Put { table, key, item } => {
                    plan.push_write(&mut write_entries, table, key, WriteAction::Put(item));
                }
                BatchOperation::Delete { table, key } => {
                    plan.push_write(&mut write_entries, table, key, WriteAction::Delete);
                }
            }
        }

        plan
    }

    fn push_write(
        &mut self,
        entries: &mut HashMap<(String, String), usize>,
        table: String,
        key: Item,
        action: WriteAction,
    ) {
        let identity = (table.clone(), canonical(&key));
        match entries.get(&identity) {
            Some(&entry) => {
                tracing::debug!(table = %table, key = %identity.1, "Collapsing duplicate batch write");
                self.writes[entry].action = action;
            }
            None => {
                self.writes.push(UniqueWrite { table, key, action });
                entries.insert(identity, self.writes.len() - 1);
            }
        }
        self.slots.push(Slot::Write);
    }

    /// Number of operations in the original request.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn unique_gets(&self) -> usize {
        self.gets.len()
    }

    pub fn unique_writes(&self) -> usize {
        self.writes.len()
    }

    /// Groups unique reads by table and projection, at most `max_items` per
    /// chunk.
    pub fn get_chunks(&self, max_items: usize) -> Vec<GetChunk> {
        let mut groups: Vec<GetChunk> = Vec::new();
        let mut positions: HashMap<(&str, Option<Vec<String>>), usize> = HashMap::new();

        for (entry, get) in self.gets.iter().enumerate() {
            let projection = get.dispatched_projection();
            let position = *positions
                .entry((get.table.as_str(), projection.clone()))
                .or_insert_with(|| {
                    groups.push(GetChunk {
                        table: get.table.clone(),
                        projection,
                        entries: Vec::new(),
                    });
                    groups.len() - 1
                });
            groups[position].entries.push(entry);
        }

        groups
            .into_iter()
            .flat_map(|group| {
                group
                    .entries
                    .chunks(max_items.max(1))
                    .map(|entries| GetChunk {
                        table: group.table.clone(),
                        projection: group.projection.clone(),
                        entries: entries.to_vec(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Groups unique writes by table, at most `max_items` per chunk.
    pub fn write_chunks(&self, max_items: usize) -> Vec<WriteChunk> {
        let mut groups: Vec<WriteChunk> = Vec::new();
        let mut positions: HashMap<&str, usize> = HashMap::new();

        for (entry, write) in self.writes.iter().enumerate() {
            let position = *positions.entry(write.table.as_str()).or_insert_with(|| {
                groups.push(WriteChunk {
                    table: write.table.clone(),
                    entries: Vec::new(),
                });
                groups.len() - 1
            });
            groups[position].entries.push(entry);
        }

        groups
            .into_iter()
            .flat_map(|group| {
                group
                    .entries
                    .chunks(max_items.max(1))
                    .map(|entries| WriteChunk {
                        table: group.table.clone(),
                        entries: entries.to_vec(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Fans resolved reads back out to every input position.
    ///
    /// `found[i]` is the item fetched for unique read `i`, if any. Each
    /// position sees only the attributes it asked for.
    pub fn assemble(&self, found: &[Option<Item>]) -> Vec<BatchItemResult> {
        self.slots
            .iter()
            .map(|slot| match slot {
                Slot::Get { entry, projection } => match found.get(*entry).and_then(Option::as_ref) {
                    Some(item) => BatchItemResult::Found(project(item, projection.as_deref())),
                    None => BatchItemResult::NotFound,
                },
                Slot::Write => BatchItemResult::Acknowledged,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn key(id: &str) -> Item {
        json!({"PK": format!("User#id-{id}")}).as_object().cloned().unwrap()
    }

    fn item(value: Value) -> Item {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_duplicate_gets_share_one_entry_and_merge_projections() {
        let plan = BatchPlan::new(vec![
            BatchOperation::get_projected("app", key("1"), &["name"]),
            BatchOperation::get("app", key("2")),
            BatchOperation::get_projected("app", key("1"), &["age"]),
        ]);

        assert_eq!(plan.len(), 3);
        assert_eq!(plan.unique_gets(), 2);

        let chunks = plan.get_chunks(100);
        assert_eq!(
            chunks,
            vec![
                GetChunk {
                    table: "app".to_string(),
                    projection: Some(vec!["PK".into(), "age".into(), "name".into()]),
                    entries: vec![0],
                },
                GetChunk {
                    table: "app".to_string(),
                    projection: None,
                    entries: vec![1],
                },
            ]
        );
    }

    #[test]
    fn test_unprojected_occurrence_widens_merged_projection() {
        let plan = BatchPlan::new(vec![
            BatchOperation::get_projected("app", key("1"), &["name"]),
            BatchOperation::get("app", key("1")),
        ]);

        let chunks = plan.get_chunks(100);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].projection, None);
    }

    #[test]
    fn test_get_chunks_respect_limit_and_table() {
        let mut operations: Vec<_> = (0..250)
            .map(|i| BatchOperation::get("app", key(&i.to_string())))
            .collect();
        operations.push(BatchOperation::get("other", key("x")));

        let chunks = BatchPlan::new(operations).get_chunks(100);
        let sizes: Vec<_> = chunks.iter().map(|c| (c.table.as_str(), c.entries.len())).collect();
        assert_eq!(
            sizes,
            vec![("app", 100), ("app", 100), ("app", 50), ("other", 1)]
        );
    }

    #[test]
    fn test_duplicate_writes_collapse_last_wins() {
        let plan = BatchPlan::new(vec![
            BatchOperation::put("app", key("1"), item(json!({"PK": "User#id-1", "v": 1}))),
            BatchOperation::delete("app", key("2")),
            BatchOperation::put("app", key("1"), item(json!({"PK": "User#id-1", "v": 2}))),
        ]);

        assert_eq!(plan.unique_writes(), 2);
        assert_eq!(
            plan.writes[0].action,
            WriteAction::Put(item(json!({"PK": "User#id-1", "v": 2})))
        );

        let chunks = plan.write_chunks(25);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].entries, vec![0, 1]);
    }

    #[test]
    fn test_write_chunks_respect_limit() {
        let operations = (0..60)
            .map(|i| BatchOperation::delete("app", key(&i.to_string())))
            .collect();
        let chunks = BatchPlan::new(operations).write_chunks(25);
        let sizes: Vec<_> = chunks.iter().map(|c| c.entries.len()).collect();
        assert_eq!(sizes, vec![25, 25, 10]);
    }

    #[test]
    fn test_assemble_preserves_order_duplicates_and_missing() {
        let plan = BatchPlan::new(vec![
            BatchOperation::get_projected("app", key("1"), &["name"]),
            BatchOperation::get("app", key("missing")),
            BatchOperation::delete("app", key("3")),
            BatchOperation::get_projected("app", key("1"), &["age"]),
            BatchOperation::get("app", key("1")),
        ]);

        let fetched = item(json!({"PK": "User#id-1", "name": "jim", "age": 30}));
        let results = plan.assemble(&[Some(fetched.clone()), None]);

        assert_eq!(
            results,
            vec![
                BatchItemResult::Found(item(json!({"name": "jim"}))),
                BatchItemResult::NotFound,
                BatchItemResult::Acknowledged,
                BatchItemResult::Found(item(json!({"age": 30}))),
                BatchItemResult::Found(fetched),
            ]
        );
    }

    #[test]
    fn test_unresolved_write_reports_verb() {
        let plan = BatchPlan::new(vec![BatchOperation::delete("app", key("1"))]);
        assert_eq!(
            plan.writes[0].unresolved(),
            UnresolvedKey {
                verb: BatchVerb::Delete,
                table: "app".to_string(),
                key: key("1"),
            }
        );
    }
}
