use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use super::store::{Collection, DatabaseError, Document, ReplaceOutcome, Store};
use crate::filter::{Filter, FilterData, ID_FIELD};

#[derive(Default)]
struct Table {
    next_id: i64,
    rows: BTreeMap<i64, Document>,
}

impl Table {
    fn push(&mut self, collection: Collection, mut doc: Document) -> Result<i64, DatabaseError> {
        doc.remove(ID_FIELD);
        if let Some(field) = collection.unique_field() {
            let value = doc.get(field);
            if value.is_some() && self.rows.values().any(|row| row.get(field) == value) {
                return Err(DatabaseError::Duplicate(field.to_string()));
            }
        }
        self.next_id += 1;
        let id = self.next_id;
        doc.insert(ID_FIELD.to_string(), Value::from(id));
        self.rows.insert(id, doc);
        Ok(id)
    }

    fn matching_ids(&self, filter: &Filter) -> Vec<i64> {
        self.rows
            .iter()
            .filter(|(_, doc)| filter.matches(doc))
            .map(|(id, _)| *id)
            .collect()
    }
}

/// In-process store used by tests and `STORAGE_BACKEND=memory`.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<Collection, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn filter(collection: Collection, data: FilterData) -> Result<Filter, DatabaseError> {
        Ok(Filter::from_data(collection.table_name(), data)?)
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, collection: Collection, id: i64) -> Result<Option<Document>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.get(&collection).and_then(|t| t.rows.get(&id)).cloned())
    }

    async fn list(&self, collection: Collection, filter: FilterData) -> Result<Vec<Document>, DatabaseError> {
        let filter = Self::filter(collection, filter)?;
        let tables = self.tables.read().await;
        let rows = tables
            .get(&collection)
            .map(|t| t.rows.values().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        Ok(filter.apply(rows))
    }

    async fn count(&self, collection: Collection, filter: FilterData) -> Result<u64, DatabaseError> {
        let filter = Self::filter(collection, FilterData { limit: None, offset: None, ..filter })?;
        let tables = self.tables.read().await;
        Ok(tables
            .get(&collection)
            .map(|t| t.matching_ids(&filter).len() as u64)
            .unwrap_or(0))
    }

    async fn insert(&self, collection: Collection, doc: Document) -> Result<i64, DatabaseError> {
        let mut tables = self.tables.write().await;
        tables.entry(collection).or_default().push(collection, doc)
    }

    async fn insert_first(&self, collection: Collection, doc: Document) -> Result<Option<i64>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let table = tables.entry(collection).or_default();
        if !table.rows.is_empty() {
            return Ok(None);
        }
        table.push(collection, doc).map(Some)
    }

    async fn update_many(
        &self,
        collection: Collection,
        filter: FilterData,
        changes: Document,
    ) -> Result<u64, DatabaseError> {
        let filter = Self::filter(collection, filter)?;
        let mut tables = self.tables.write().await;
        let Some(table) = tables.get_mut(&collection) else { return Ok(0) };

        let ids = table.matching_ids(&filter);
        if let Some(field) = collection.unique_field() {
            if let Some(value) = changes.get(field) {
                let clash = table
                    .rows
                    .iter()
                    .any(|(id, row)| !ids.contains(id) && row.get(field) == Some(value));
                if clash || ids.len() > 1 {
                    return Err(DatabaseError::Duplicate(field.to_string()));
                }
            }
        }

        for id in &ids {
            if let Some(row) = table.rows.get_mut(id) {
                for (key, value) in &changes {
                    if key != ID_FIELD {
                        row.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        Ok(ids.len() as u64)
    }

    async fn delete_many(&self, collection: Collection, filter: FilterData) -> Result<u64, DatabaseError> {
        let filter = Self::filter(collection, filter)?;
        let mut tables = self.tables.write().await;
        let Some(table) = tables.get_mut(&collection) else { return Ok(0) };
        let ids = table.matching_ids(&filter);
        for id in &ids {
            table.rows.remove(id);
        }
        Ok(ids.len() as u64)
    }

    async fn replace_partition(
        &self,
        collection: Collection,
        _partition_key: &str,
        filter: FilterData,
        docs: Vec<Document>,
    ) -> Result<ReplaceOutcome, DatabaseError> {
        let filter = Self::filter(collection, filter)?;
        // Single write guard for the whole replace.
        let mut tables = self.tables.write().await;
        let table = tables.entry(collection).or_default();

        let ids = table.matching_ids(&filter);
        let mut staged = Table { next_id: table.next_id, rows: table.rows.clone() };
        for id in &ids {
            staged.rows.remove(id);
        }
        let mut inserted = 0;
        for doc in docs {
            staged.push(collection, doc)?;
            inserted += 1;
        }
        *table = staged;

        Ok(ReplaceOutcome { deleted: ids.len() as u64, inserted })
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn close(&self) {}
}
