use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::filter::{FilterData, FilterError, ID_FIELD};

/// A stored record: a JSON object whose `id` key is owned by the store.
pub type Document = Map<String, Value>;

/// Errors from any storage adapter
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate value: {0}")]
    Duplicate(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// The collections (tables) the portal stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    AuditLogs,
    PhoneLines,
    Contracts,
    Invoices,
    Credentials,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Collection::Users,
        Collection::AuditLogs,
        Collection::PhoneLines,
        Collection::Contracts,
        Collection::Invoices,
        Collection::Credentials,
    ];

    pub fn table_name(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::AuditLogs => "audit_logs",
            Collection::PhoneLines => "numeros_telefonicos",
            Collection::Contracts => "contratos",
            Collection::Invoices => "faturas",
            Collection::Credentials => "credenciais",
        }
    }

    /// Document field that must be unique across the collection, if any.
    pub fn unique_field(self) -> Option<&'static str> {
        match self {
            Collection::Users => Some("username"),
            _ => None,
        }
    }
}

/// Result of a partition replace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceOutcome {
    pub deleted: u64,
    pub inserted: u64,
}

/// Storage capability set shared by every backend.
#[async_trait]
pub trait Store: Send + Sync {
    /// Short backend name for logs and the health endpoint.
    fn backend(&self) -> &'static str;

    async fn get(&self, collection: Collection, id: i64) -> Result<Option<Document>, DatabaseError>;

    async fn list(&self, collection: Collection, filter: FilterData) -> Result<Vec<Document>, DatabaseError>;

    async fn count(&self, collection: Collection, filter: FilterData) -> Result<u64, DatabaseError>;

    /// Insert one document and return its new id. Any `id` key is ignored.
    async fn insert(&self, collection: Collection, doc: Document) -> Result<i64, DatabaseError>;

    /// Insert `doc` only while the collection is empty; `None` when another row exists.
    /// Concurrent calls on the same collection are serialized.
    async fn insert_first(&self, collection: Collection, doc: Document) -> Result<Option<i64>, DatabaseError>;

    /// Shallow-merge `changes` into every matching document.
    async fn update_many(
        &self,
        collection: Collection,
        filter: FilterData,
        changes: Document,
    ) -> Result<u64, DatabaseError>;

    async fn delete_many(&self, collection: Collection, filter: FilterData) -> Result<u64, DatabaseError>;

    /// Atomically delete every document matching `filter` and insert `docs`.
    ///
    /// Calls sharing a `partition_key` are serialized against each other,
    /// so the survivors are exactly one call's documents.
    async fn replace_partition(
        &self,
        collection: Collection,
        partition_key: &str,
        filter: FilterData,
        docs: Vec<Document>,
    ) -> Result<ReplaceOutcome, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;

    async fn close(&self);
}

/// Serialize a model into a storable document, dropping the `id` key.
pub fn to_document<T: Serialize>(value: &T) -> Result<Document, DatabaseError> {
    match serde_json::to_value(value)? {
        Value::Object(mut map) => {
            map.remove(ID_FIELD);
            Ok(map)
        }
        other => Err(DatabaseError::QueryError(format!("expected a JSON object, got {}", other))),
    }
}

pub fn from_document<T: DeserializeOwned>(doc: Document) -> Result<T, DatabaseError> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}

pub fn from_documents<T: DeserializeOwned>(docs: Vec<Document>) -> Result<Vec<T>, DatabaseError> {
    docs.into_iter().map(from_document).collect()
}
