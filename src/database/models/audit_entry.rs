use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Append-only audit record. Action and target are stored as their
/// uppercase labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    #[serde(default)]
    pub id: i64,
    pub actor: String,
    pub action: String,
    pub target_type: String,
    #[serde(default)]
    pub target_id: Option<String>,
    pub detail: String,
    pub timestamp: DateTime<Utc>,
}
