use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use super::{optional, required, FormFields, ServiceError};
use crate::audit::{AuditLog, ChangeSet};
use crate::database::models::{adjusted_amount, Invoice, User, DEFAULT_STATUS};
use crate::database::{from_document, from_documents, to_document, Collection, Store};
use crate::filter::FilterData;
use crate::normalize::{normalize_amount, normalize_date, normalize_int, DATE_FORMAT};
use crate::types::{AuditAction, AuditTarget};

const NOTES_PREVIEW_CHARS: usize = 50;

/// Invoice fields as submitted by the invoice form.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceInput {
    pub contract_id: i64,
    pub reference_period: String,
    pub amount: Decimal,
    pub due_date: Option<NaiveDate>,
    pub circuit_number: Option<String>,
    pub status: Option<String>,
    pub discount: Decimal,
    pub surcharge: Decimal,
    pub notes: Option<String>,
}

impl InvoiceInput {
    pub fn from_fields(fields: &FormFields) -> Result<Self, ServiceError> {
        let contract_id = normalize_int(Some(required(fields, "contractId")?.as_str()));
        if contract_id <= 0 {
            return Err(ServiceError::invalid("contractId", "Must reference a contract"));
        }
        Ok(Self {
            contract_id,
            reference_period: required(fields, "referencePeriod")?,
            amount: normalize_amount(fields.get("amount").map(String::as_str)),
            due_date: normalize_date(fields.get("dueDate").map(String::as_str), DATE_FORMAT),
            circuit_number: optional(fields, "circuitNumber"),
            status: optional(fields, "status"),
            discount: normalize_amount(fields.get("discount").map(String::as_str)),
            surcharge: normalize_amount(fields.get("surcharge").map(String::as_str)),
            notes: optional(fields, "notes"),
        })
    }

    fn adjusted(&self) -> Result<Decimal, ServiceError> {
        adjusted_amount(self.amount, self.surcharge, self.discount)
            .ok_or_else(|| ServiceError::invalid("amount", "Amount is out of range"))
    }
}

/// Body of a status change.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub status: String,
    #[serde(default)]
    pub paid_on: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Clone)]
pub struct InvoiceService {
    store: Arc<dyn Store>,
    audit: AuditLog,
}

impl InvoiceService {
    pub fn new(store: Arc<dyn Store>, audit: AuditLog) -> Self {
        Self { store, audit }
    }

    pub async fn list_active(&self) -> Result<Vec<Invoice>, ServiceError> {
        let docs = self
            .store
            .list(Collection::Invoices, FilterData::matching(json!({ "active": true })).order_by("id"))
            .await?;
        Ok(from_documents(docs)?)
    }

    pub async fn get(&self, id: i64) -> Result<Invoice, ServiceError> {
        let doc = self
            .store
            .get(Collection::Invoices, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Invoice"))?;
        Ok(from_document(doc)?)
    }

    pub async fn create(
        &self,
        actor: &User,
        input: InvoiceInput,
        attachment_path: String,
        fiscal_note_path: Option<String>,
    ) -> Result<Invoice, ServiceError> {
        let adjusted = input.adjusted()?;
        let mut invoice = Invoice {
            id: 0,
            contract_id: input.contract_id,
            reference_period: input.reference_period,
            amount: input.amount,
            due_date: input.due_date,
            paid_on: None,
            circuit_number: input.circuit_number,
            status: input.status.unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            discount: input.discount,
            surcharge: input.surcharge,
            adjusted_amount: adjusted,
            notes: input.notes,
            attachment_path,
            fiscal_note_path,
            uploaded_on: Utc::now().date_naive(),
            active: true,
        };
        invoice.id = self.store.insert(Collection::Invoices, to_document(&invoice)?).await?;
        self.audit
            .record(
                &actor.username,
                AuditAction::Create,
                AuditTarget::Fatura,
                Some(invoice.id),
                format!("Posted invoice {}", invoice.reference_period),
            )
            .await;
        Ok(invoice)
    }

    /// Status and creation date are left as they are; files are replaced only when given.
    pub async fn update(
        &self,
        actor: &User,
        id: i64,
        input: InvoiceInput,
        attachment_path: Option<String>,
        fiscal_note_path: Option<String>,
    ) -> Result<Invoice, ServiceError> {
        let adjusted = input.adjusted()?;
        let current = self.get(id).await?;

        let mut changes = ChangeSet::new(format!("Fatura #{}", id));
        changes
            .track("contract", &current.contract_id, &input.contract_id)
            .track("period", &current.reference_period, &input.reference_period)
            .track("value", &current.amount, &input.amount)
            .track("discount", &current.discount, &input.discount)
            .track("surcharge", &current.surcharge, &input.surcharge)
            .track_opt("due", &current.due_date, &input.due_date)
            .track_opt("circuit", &current.circuit_number, &input.circuit_number)
            .note_if(current.notes != input.notes, "notes changed")
            .note_if(attachment_path.is_some(), "bill updated")
            .note_if(fiscal_note_path.is_some(), "fiscal note updated");

        let mut invoice = current;
        invoice.contract_id = input.contract_id;
        invoice.reference_period = input.reference_period;
        invoice.amount = input.amount;
        invoice.due_date = input.due_date;
        invoice.circuit_number = input.circuit_number;
        invoice.discount = input.discount;
        invoice.surcharge = input.surcharge;
        invoice.adjusted_amount = adjusted;
        invoice.notes = input.notes;
        if let Some(path) = attachment_path {
            invoice.attachment_path = path;
        }
        if fiscal_note_path.is_some() {
            invoice.fiscal_note_path = fiscal_note_path;
        }

        self.store
            .update_many(Collection::Invoices, FilterData::by_id(id), to_document(&invoice)?)
            .await?;
        self.audit
            .record(&actor.username, AuditAction::Update, AuditTarget::Fatura, Some(id), changes.detail())
            .await;
        Ok(invoice)
    }

    pub async fn update_status(&self, actor: &User, id: i64, change: StatusChange) -> Result<Invoice, ServiceError> {
        let status = change.status.trim();
        if status.is_empty() {
            return Err(ServiceError::invalid("status", "This field is required"));
        }
        let mut invoice = self.get(id).await?;

        let mut detail = format!("Fatura #{}: {}→{}", id, invoice.status, status);
        let mut updates = Map::new();
        updates.insert("status".to_string(), json!(status));

        let paid_on = change.paid_on.as_deref().map(str::trim).filter(|d| !d.is_empty());
        if let Some(raw) = paid_on {
            let date = normalize_date(Some(raw), DATE_FORMAT)
                .ok_or_else(|| ServiceError::invalid("paidOn", "Expected a YYYY-MM-DD date"))?;
            detail.push_str(&format!(", paid on {}", date));
            updates.insert("paidOn".to_string(), json!(date));
            invoice.paid_on = Some(date);
        }
        if let Some(notes) = change.notes.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            let preview: String = notes.chars().take(NOTES_PREVIEW_CHARS).collect();
            detail.push_str(&format!(", notes: {}", preview));
            updates.insert("notes".to_string(), json!(notes));
            invoice.notes = Some(notes.to_string());
        }
        invoice.status = status.to_string();

        self.store
            .update_many(Collection::Invoices, FilterData::by_id(id), updates)
            .await?;
        self.audit
            .record(&actor.username, AuditAction::Update, AuditTarget::Fatura, Some(id), detail)
            .await;
        Ok(invoice)
    }

    pub async fn set_active(&self, actor: &User, id: i64, active: bool) -> Result<Invoice, ServiceError> {
        let mut invoice = self.get(id).await?;
        invoice.active = active;
        let mut updates = Map::new();
        updates.insert("active".to_string(), Value::Bool(active));
        self.store
            .update_many(Collection::Invoices, FilterData::by_id(id), updates)
            .await?;

        let (action, verb) = if active {
            (AuditAction::Ativar, "Activated")
        } else {
            (AuditAction::Inativar, "Deactivated")
        };
        self.audit
            .record(&actor.username, action, AuditTarget::Fatura, Some(id), format!("{} invoice #{}", verb, id))
            .await;
        Ok(invoice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{STATUS_PAID, STATUS_PENDING};
    use crate::services::test_support::{fields, store};
    use crate::types::Role;
    use std::str::FromStr;

    fn actor() -> User {
        User::new("ana", String::new(), Role::Normal)
    }

    fn form(amount: &str) -> FormFields {
        fields(&[
            ("contractId", "1"),
            ("referencePeriod", "2024-01"),
            ("amount", amount),
            ("discount", "10"),
            ("surcharge", "5,50"),
            ("dueDate", "2024-02-10"),
        ])
    }

    #[test]
    fn requires_contract_reference() {
        let mut f = form("100");
        f.insert("contractId".into(), "abc".into());
        assert!(matches!(InvoiceInput::from_fields(&f), Err(ServiceError::Invalid { field: "contractId", .. })));
        f.remove("contractId");
        assert!(matches!(InvoiceInput::from_fields(&f), Err(ServiceError::Invalid { field: "contractId", .. })));
    }

    #[tokio::test]
    async fn create_computes_adjusted_amount() {
        let (store, audit) = store();
        let invoices = InvoiceService::new(store, audit.clone());
        let invoice = invoices
            .create(&actor(), InvoiceInput::from_fields(&form("100,00")).unwrap(), "uploads/b.pdf".into(), None)
            .await
            .unwrap();

        assert_eq!(invoice.adjusted_amount, Decimal::from_str("95.50").unwrap());
        assert_eq!(invoice.status, DEFAULT_STATUS);
        let stored = invoices.get(invoice.id).await.unwrap();
        assert_eq!(stored, invoice);
        assert_eq!(audit.recent(1).await.unwrap()[0].detail, "Posted invoice 2024-01");
    }

    #[tokio::test]
    async fn out_of_range_amount_is_rejected() {
        let (store, audit) = store();
        let invoices = InvoiceService::new(store, audit.clone());
        let input = InvoiceInput::from_fields(&form("79228162514264337593543950335")).unwrap();

        let err = invoices.create(&actor(), input.clone(), "uploads/b.pdf".into(), None).await;
        assert!(matches!(err, Err(ServiceError::Invalid { field: "amount", .. })));
        assert!(invoices.list_active().await.unwrap().is_empty());

        let invoice = invoices
            .create(&actor(), InvoiceInput::from_fields(&form("100")).unwrap(), "uploads/b.pdf".into(), None)
            .await
            .unwrap();
        let err = invoices.update(&actor(), invoice.id, input, None, None).await;
        assert!(matches!(err, Err(ServiceError::Invalid { field: "amount", .. })));
        assert_eq!(invoices.get(invoice.id).await.unwrap().amount, Decimal::from(100));
    }

    #[tokio::test]
    async fn update_keeps_files_unless_replaced() {
        let (store, audit) = store();
        let invoices = InvoiceService::new(store, audit.clone());
        let invoice = invoices
            .create(&actor(), InvoiceInput::from_fields(&form("100")).unwrap(), "uploads/b.pdf".into(), None)
            .await
            .unwrap();

        let updated = invoices
            .update(&actor(), invoice.id, InvoiceInput::from_fields(&form("120")).unwrap(), None, Some("uploads/nf.pdf".into()))
            .await
            .unwrap();
        assert_eq!(updated.attachment_path, "uploads/b.pdf");
        assert_eq!(updated.fiscal_note_path.as_deref(), Some("uploads/nf.pdf"));
        assert_eq!(updated.adjusted_amount, Decimal::from_str("115.50").unwrap());
        assert_eq!(
            audit.recent(1).await.unwrap()[0].detail,
            format!("Fatura #{}: value: 100→120, fiscal note updated", invoice.id)
        );
    }

    #[tokio::test]
    async fn status_change_records_payment() {
        let (store, audit) = store();
        let invoices = InvoiceService::new(store, audit.clone());
        let invoice = invoices
            .create(&actor(), InvoiceInput::from_fields(&form("100")).unwrap(), "uploads/b.pdf".into(), None)
            .await
            .unwrap();

        let change = StatusChange {
            status: STATUS_PENDING.to_string(),
            paid_on: None,
            notes: None,
        };
        invoices.update_status(&actor(), invoice.id, change).await.unwrap();

        let change = StatusChange {
            status: STATUS_PAID.to_string(),
            paid_on: Some("2024-02-09".to_string()),
            notes: Some("x".repeat(80)),
        };
        let paid = invoices.update_status(&actor(), invoice.id, change).await.unwrap();
        assert_eq!(paid.paid_on, NaiveDate::from_ymd_opt(2024, 2, 9));

        let stored = invoices.get(invoice.id).await.unwrap();
        assert_eq!(stored.status, STATUS_PAID);
        assert_eq!(stored.notes.map(|n| n.len()), Some(80));

        let detail = &audit.recent(1).await.unwrap()[0].detail;
        assert_eq!(
            detail,
            &format!("Fatura #{}: Pendente→Pago, paid on 2024-02-09, notes: {}", invoice.id, "x".repeat(50))
        );
    }

    #[tokio::test]
    async fn inactive_invoices_are_hidden() {
        let (store, audit) = store();
        let invoices = InvoiceService::new(store, audit);
        let invoice = invoices
            .create(&actor(), InvoiceInput::from_fields(&form("100")).unwrap(), "uploads/b.pdf".into(), None)
            .await
            .unwrap();
        invoices.set_active(&actor(), invoice.id, false).await.unwrap();
        assert!(invoices.list_active().await.unwrap().is_empty());
        assert!(matches!(invoices.set_active(&actor(), 99, true).await, Err(ServiceError::NotFound(_))));
    }
}
