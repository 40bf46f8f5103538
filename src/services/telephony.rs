use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use super::ServiceError;
use crate::audit::{AuditLog, ChangeSet};
use crate::database::models::{PhoneLine, User};
use crate::database::{from_document, from_documents, to_document, Collection, Store};
use crate::filter::FilterData;
use crate::normalize::parse_amount;
use crate::types::{AuditAction, AuditTarget};

/// Carrier filter value meaning "every carrier".
pub const ALL_CARRIERS: &str = "Todos";

/// Manually entered phone line. `monthlyValue` may be a number or a
/// formatted string, but must parse.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneLineInput {
    pub number: String,
    pub carrier: String,
    pub monthly_value: Value,
    pub reference_period: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
}

impl PhoneLineInput {
    fn into_line(self, id: i64) -> Result<PhoneLine, ServiceError> {
        let number = self.number.trim().to_string();
        if number.is_empty() {
            return Err(ServiceError::invalid("number", "This field is required"));
        }
        let carrier = self.carrier.trim().to_string();
        if carrier.is_empty() {
            return Err(ServiceError::invalid("carrier", "This field is required"));
        }
        let reference_period = self.reference_period.trim().to_string();
        if reference_period.is_empty() {
            return Err(ServiceError::invalid("referencePeriod", "This field is required"));
        }

        let raw = match &self.monthly_value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => String::new(),
        };
        let monthly_value = match raw.trim() {
            "" => None,
            text => parse_amount(Some(text)),
        }
        .ok_or_else(|| ServiceError::invalid("monthlyValue", "Must be a valid amount"))?;

        Ok(PhoneLine {
            id,
            number,
            carrier,
            description: non_empty(self.description),
            monthly_value,
            reference_period,
            department: non_empty(self.department),
            branch: non_empty(self.branch),
            active: true,
            uploaded_on: Utc::now().date_naive(),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[derive(Clone)]
pub struct TelephonyService {
    store: Arc<dyn Store>,
    audit: AuditLog,
}

impl TelephonyService {
    pub fn new(store: Arc<dyn Store>, audit: AuditLog) -> Self {
        Self { store, audit }
    }

    pub async fn list(&self, carrier: Option<&str>, period: Option<&str>) -> Result<Vec<PhoneLine>, ServiceError> {
        let mut conditions = Map::new();
        if let Some(carrier) = carrier.map(str::trim).filter(|c| !c.is_empty() && *c != ALL_CARRIERS) {
            conditions.insert("carrier".to_string(), json!(carrier));
        }
        if let Some(period) = period.map(str::trim).filter(|p| !p.is_empty()) {
            conditions.insert("referencePeriod".to_string(), json!(period));
        }

        let docs = self
            .store
            .list(Collection::PhoneLines, FilterData::matching(Value::Object(conditions)).order_by("id"))
            .await?;
        Ok(from_documents(docs)?)
    }

    pub async fn get(&self, id: i64) -> Result<PhoneLine, ServiceError> {
        let doc = self
            .store
            .get(Collection::PhoneLines, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Phone line"))?;
        Ok(from_document(doc)?)
    }

    pub async fn create(&self, actor: &User, input: PhoneLineInput) -> Result<PhoneLine, ServiceError> {
        let mut line = input.into_line(0)?;
        line.id = self.store.insert(Collection::PhoneLines, to_document(&line)?).await?;
        self.audit
            .record(
                &actor.username,
                AuditAction::Create,
                AuditTarget::Telefonia,
                Some(line.id),
                format!("Added {}", line.number),
            )
            .await;
        Ok(line)
    }

    pub async fn update(&self, actor: &User, id: i64, input: PhoneLineInput) -> Result<PhoneLine, ServiceError> {
        let current = self.get(id).await?;
        let mut line = input.into_line(id)?;
        line.uploaded_on = current.uploaded_on;
        line.active = current.active;

        let mut changes = ChangeSet::new(line.number.clone());
        changes
            .track("number", &current.number, &line.number)
            .track("carrier", &current.carrier, &line.carrier)
            .track("value", &current.monthly_value, &line.monthly_value)
            .track("period", &current.reference_period, &line.reference_period)
            .track_opt("department", &current.department, &line.department)
            .track_opt("branch", &current.branch, &line.branch);

        self.store
            .update_many(Collection::PhoneLines, FilterData::by_id(id), to_document(&line)?)
            .await?;
        self.audit
            .record(&actor.username, AuditAction::Update, AuditTarget::Telefonia, Some(id), changes.detail())
            .await;
        Ok(line)
    }

    pub async fn delete(&self, actor: &User, id: i64) -> Result<(), ServiceError> {
        let line = self.get(id).await?;
        self.store.delete_many(Collection::PhoneLines, FilterData::by_id(id)).await?;
        self.audit
            .record(
                &actor.username,
                AuditAction::Delete,
                AuditTarget::Telefonia,
                Some(id),
                format!("Removed {}", line.number),
            )
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::store;
    use crate::types::Role;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn actor() -> User {
        User::new("ana", String::new(), Role::Normal)
    }

    fn input(number: &str, carrier: &str, value: Value, period: &str) -> PhoneLineInput {
        PhoneLineInput {
            number: number.to_string(),
            carrier: carrier.to_string(),
            monthly_value: value,
            reference_period: period.to_string(),
            description: None,
            department: Some("  ".to_string()),
            branch: Some("Matriz".to_string()),
        }
    }

    #[tokio::test]
    async fn filters_by_carrier_and_period() {
        let (store, audit) = store();
        let lines = TelephonyService::new(store, audit);
        lines.create(&actor(), input("1", "Tim", json!(10), "2024-01")).await.unwrap();
        lines.create(&actor(), input("2", "Vivo", json!("20,50"), "2024-01")).await.unwrap();
        lines.create(&actor(), input("3", "Tim", json!(30), "2024-02")).await.unwrap();

        assert_eq!(lines.list(None, None).await.unwrap().len(), 3);
        assert_eq!(lines.list(Some(ALL_CARRIERS), Some("2024-01")).await.unwrap().len(), 2);
        let tim_jan = lines.list(Some("Tim"), Some("2024-01")).await.unwrap();
        assert_eq!(tim_jan.len(), 1);
        assert_eq!(tim_jan[0].number, "1");

        let vivo = lines.list(Some("Vivo"), None).await.unwrap();
        assert_eq!(vivo[0].monthly_value, Decimal::from_str("20.50").unwrap());
        assert_eq!(vivo[0].department, None);
    }

    #[tokio::test]
    async fn rejects_unparseable_amount() {
        let (store, audit) = store();
        let lines = TelephonyService::new(store, audit);
        let err = lines.create(&actor(), input("1", "Tim", json!("abc"), "2024-01")).await;
        assert!(matches!(err, Err(ServiceError::Invalid { field: "monthlyValue", .. })));
        let err = lines.create(&actor(), input("1", "Tim", json!(null), "2024-01")).await;
        assert!(matches!(err, Err(ServiceError::Invalid { field: "monthlyValue", .. })));
    }

    #[tokio::test]
    async fn update_audits_diff_and_delete_requires_existing() {
        let (store, audit) = store();
        let lines = TelephonyService::new(store, audit.clone());
        let created = lines.create(&actor(), input("1", "Tim", json!(10), "2024-01")).await.unwrap();

        lines
            .update(&actor(), created.id, input("1", "Claro", json!(10), "2024-01"))
            .await
            .unwrap();
        let entries = audit.recent(1).await.unwrap();
        assert_eq!(entries[0].detail, "1: carrier: Tim→Claro");

        lines.delete(&actor(), created.id).await.unwrap();
        assert!(matches!(lines.delete(&actor(), created.id).await, Err(ServiceError::NotFound(_))));
    }
}
