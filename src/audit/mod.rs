//! Best-effort audit trail written after committed mutations.

use chrono::Utc;
use serde_json::json;
use std::fmt::Display;
use std::sync::Arc;
use tracing::error;

use crate::database::models::AuditLogEntry;
use crate::database::{from_documents, to_document, Collection, DatabaseError, Store};
use crate::filter::FilterData;
use crate::types::{AuditAction, AuditTarget, Role};

pub const MAX_DETAIL_CHARS: usize = 500;

/// Keep the first 500 characters (not bytes) of `detail`.
pub fn truncate_detail(detail: &str) -> String {
    match detail.char_indices().nth(MAX_DETAIL_CHARS) {
        Some((cut, _)) => detail[..cut].to_string(),
        None => detail.to_string(),
    }
}

#[derive(Clone)]
pub struct AuditLog {
    store: Arc<dyn Store>,
}

impl AuditLog {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Append one entry. Storage failures are logged and swallowed.
    pub async fn record(
        &self,
        actor: &str,
        action: AuditAction,
        target: AuditTarget,
        target_id: Option<i64>,
        detail: impl AsRef<str>,
    ) {
        let entry = AuditLogEntry {
            id: 0,
            actor: actor.to_string(),
            action: action.as_str().to_string(),
            target_type: target.as_str().to_string(),
            target_id: target_id.map(|id| id.to_string()),
            detail: truncate_detail(detail.as_ref()),
            timestamp: Utc::now(),
        };

        let result = match to_document(&entry) {
            Ok(doc) => self.store.insert(Collection::AuditLogs, doc).await.map(|_| ()),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            error!(actor, action = %entry.action, target = %entry.target_type, "Audit write failed: {}", e);
        }
    }

    /// Newest entries across every target type.
    pub async fn recent(&self, limit: i32) -> Result<Vec<AuditLogEntry>, DatabaseError> {
        let docs = self
            .store
            .list(Collection::AuditLogs, FilterData::all().order_by("id desc").limit(limit))
            .await?;
        from_documents(docs)
    }

    /// Newest entries visible to `role`.
    pub async fn history_for(&self, role: &str, limit: i32) -> Result<Vec<AuditLogEntry>, DatabaseError> {
        let docs = self.store.list(Collection::AuditLogs, history_filter(role, limit)).await?;
        from_documents(docs)
    }
}

/// Admins see everything; any other role only business targets.
pub fn history_filter(role: &str, limit: i32) -> FilterData {
    let filter = if role == Role::Admin.as_str() {
        FilterData::all()
    } else {
        let visible: Vec<&str> = AuditTarget::BUSINESS.iter().map(|t| t.as_str()).collect();
        FilterData::matching(json!({ "targetType": { "$in": visible } }))
    };
    filter.order_by("id desc").limit(limit)
}

/// Human-readable diff of tracked fields for update entries.
#[derive(Debug, Default)]
pub struct ChangeSet {
    subject: String,
    changes: Vec<String>,
}

impl ChangeSet {
    pub fn new(subject: impl Into<String>) -> Self {
        Self { subject: subject.into(), changes: vec![] }
    }

    pub fn track<T: PartialEq + Display + ?Sized>(&mut self, field: &str, old: &T, new: &T) -> &mut Self {
        if old != new {
            self.changes.push(format!("{}: {}→{}", field, old, new));
        }
        self
    }

    pub fn track_opt<T: PartialEq + Display>(&mut self, field: &str, old: &Option<T>, new: &Option<T>) -> &mut Self {
        if old != new {
            let show = |v: &Option<T>| v.as_ref().map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
            self.changes.push(format!("{}: {}→{}", field, show(old), show(new)));
        }
        self
    }

    /// Record a change without showing values.
    pub fn note_if(&mut self, changed: bool, text: &str) -> &mut Self {
        if changed {
            self.changes.push(text.to_string());
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn detail(&self) -> String {
        if self.changes.is_empty() {
            format!("{} edited (no changes)", self.subject)
        } else {
            format!("{}: {}", self.subject, self.changes.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{Document, MemoryStore, ReplaceOutcome};
    use async_trait::async_trait;

    #[test]
    fn truncates_by_characters() {
        let long = "é".repeat(600);
        let cut = truncate_detail(&long);
        assert_eq!(cut.chars().count(), 500);
        assert_eq!(truncate_detail("short"), "short");
    }

    #[test]
    fn change_set_formats_diff() {
        let mut changes = ChangeSet::new("Link Matriz");
        changes
            .track("name", "Link", "Link Matriz")
            .track("months", &12, &12)
            .track_opt("notes", &None::<String>, &Some("x".to_string()))
            .note_if(true, "file updated");
        assert_eq!(changes.detail(), "Link Matriz: name: Link→Link Matriz, notes: -→x, file updated");
        assert_eq!(ChangeSet::new("Fatura #3").detail(), "Fatura #3 edited (no changes)");
    }

    #[tokio::test]
    async fn stores_truncated_detail() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let audit = AuditLog::new(store);
        audit
            .record("ana", AuditAction::Upload, AuditTarget::Tim, None, "x".repeat(600))
            .await;
        let entries = audit.recent(10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].detail.len(), 500);
        assert_eq!(entries[0].action, "UPLOAD");
        assert_eq!(entries[0].target_type, "TIM");
        assert_eq!(entries[0].target_id, None);
    }

    #[tokio::test]
    async fn history_hides_admin_targets_from_other_roles() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let audit = AuditLog::new(store);
        for target in [AuditTarget::User, AuditTarget::Contrato, AuditTarget::Credencial, AuditTarget::Telefonia] {
            audit.record("root", AuditAction::Create, target, Some(1), "x").await;
        }

        let visible = audit.history_for("tercerizado", 100).await.unwrap();
        let targets: Vec<&str> = visible.iter().map(|e| e.target_type.as_str()).collect();
        assert_eq!(targets, vec!["TELEFONIA", "CONTRATO"]);

        assert_eq!(audit.history_for("admin", 100).await.unwrap().len(), 4);
        assert_eq!(audit.history_for("admin", 2).await.unwrap().len(), 2);
    }

    struct BrokenStore;

    #[async_trait]
    impl Store for BrokenStore {
        fn backend(&self) -> &'static str {
            "broken"
        }
        async fn get(&self, _: Collection, _: i64) -> Result<Option<Document>, DatabaseError> {
            Err(DatabaseError::QueryError("down".into()))
        }
        async fn list(&self, _: Collection, _: FilterData) -> Result<Vec<Document>, DatabaseError> {
            Err(DatabaseError::QueryError("down".into()))
        }
        async fn count(&self, _: Collection, _: FilterData) -> Result<u64, DatabaseError> {
            Err(DatabaseError::QueryError("down".into()))
        }
        async fn insert(&self, _: Collection, _: Document) -> Result<i64, DatabaseError> {
            Err(DatabaseError::QueryError("down".into()))
        }
        async fn insert_first(&self, _: Collection, _: Document) -> Result<Option<i64>, DatabaseError> {
            Err(DatabaseError::QueryError("down".into()))
        }
        async fn update_many(&self, _: Collection, _: FilterData, _: Document) -> Result<u64, DatabaseError> {
            Err(DatabaseError::QueryError("down".into()))
        }
        async fn delete_many(&self, _: Collection, _: FilterData) -> Result<u64, DatabaseError> {
            Err(DatabaseError::QueryError("down".into()))
        }
        async fn replace_partition(
            &self,
            _: Collection,
            _: &str,
            _: FilterData,
            _: Vec<Document>,
        ) -> Result<ReplaceOutcome, DatabaseError> {
            Err(DatabaseError::QueryError("down".into()))
        }
        async fn health_check(&self) -> Result<(), DatabaseError> {
            Err(DatabaseError::QueryError("down".into()))
        }
        async fn close(&self) {}
    }

    #[tokio::test]
    async fn write_failures_are_swallowed() {
        let audit = AuditLog::new(Arc::new(BrokenStore));
        // Completes without panicking or returning an error
        audit.record("ana", AuditAction::Delete, AuditTarget::Fatura, Some(9), "gone").await;
    }
}
