use serde_json::json;
use std::sync::Arc;

use super::{flag, optional, required, FormFields, ServiceError};
use crate::audit::{AuditLog, ChangeSet};
use crate::database::models::{Contract, User};
use crate::database::{from_document, from_documents, to_document, Collection, Store};
use crate::filter::FilterData;
use crate::normalize::{normalize_amount, normalize_date, normalize_int, DATE_FORMAT};
use crate::types::{AuditAction, AuditTarget};

/// Contract fields as submitted by the contract form.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractInput {
    pub display_name: String,
    pub branch: String,
    pub supplier_name: String,
    pub supplier_tax_id: String,
    pub secondary_supplier_name: Option<String>,
    pub secondary_supplier_tax_id: Option<String>,
    pub cost_center: String,
    pub kind: String,
    pub total_value: rust_decimal::Decimal,
    pub term_months: Option<i64>,
    pub billing_start: Option<chrono::NaiveDate>,
    pub due_day: i64,
    pub identifiers: Option<String>,
    pub notes: Option<String>,
    pub cost_sharing: bool,
    pub cost_sharing_companies: Option<String>,
}

impl ContractInput {
    pub fn from_fields(fields: &FormFields) -> Result<Self, ServiceError> {
        let term = normalize_int(fields.get("termMonths").map(String::as_str));
        Ok(Self {
            display_name: required(fields, "displayName")?,
            branch: required(fields, "branch")?,
            supplier_name: required(fields, "supplierName")?,
            supplier_tax_id: required(fields, "supplierTaxId")?,
            secondary_supplier_name: optional(fields, "secondarySupplierName"),
            secondary_supplier_tax_id: optional(fields, "secondarySupplierTaxId"),
            cost_center: required(fields, "costCenter")?,
            kind: required(fields, "kind")?,
            total_value: normalize_amount(fields.get("totalValue").map(String::as_str)),
            term_months: (term > 0).then_some(term),
            billing_start: normalize_date(fields.get("billingStart").map(String::as_str), DATE_FORMAT),
            due_day: normalize_int(fields.get("dueDay").map(String::as_str)),
            identifiers: optional(fields, "identifiers"),
            notes: optional(fields, "notes"),
            cost_sharing: flag(fields, "costSharing"),
            cost_sharing_companies: optional(fields, "costSharingCompanies"),
        })
    }

    fn apply(self, contract: &mut Contract) {
        contract.display_name = self.display_name;
        contract.branch = self.branch;
        contract.supplier_name = self.supplier_name;
        contract.supplier_tax_id = self.supplier_tax_id;
        contract.secondary_supplier_name = self.secondary_supplier_name;
        contract.secondary_supplier_tax_id = self.secondary_supplier_tax_id;
        contract.cost_center = self.cost_center;
        contract.kind = self.kind;
        contract.total_value = self.total_value;
        contract.term_months = self.term_months;
        contract.billing_start = self.billing_start;
        contract.due_day = self.due_day;
        contract.identifiers = self.identifiers;
        contract.notes = self.notes;
        contract.cost_sharing = self.cost_sharing;
        contract.cost_sharing_companies = self.cost_sharing_companies;
    }

    fn into_contract(self, attachment_path: Option<String>) -> Contract {
        let mut contract = Contract {
            id: 0,
            display_name: String::new(),
            branch: String::new(),
            supplier_name: String::new(),
            supplier_tax_id: String::new(),
            secondary_supplier_name: None,
            secondary_supplier_tax_id: None,
            cost_center: String::new(),
            kind: String::new(),
            total_value: rust_decimal::Decimal::ZERO,
            term_months: None,
            billing_start: None,
            due_day: 0,
            identifiers: None,
            notes: None,
            cost_sharing: false,
            cost_sharing_companies: None,
            attachment_path,
            cancelled_on: None,
            active: true,
        };
        self.apply(&mut contract);
        contract
    }
}

#[derive(Clone)]
pub struct ContractService {
    store: Arc<dyn Store>,
    audit: AuditLog,
}

impl ContractService {
    pub fn new(store: Arc<dyn Store>, audit: AuditLog) -> Self {
        Self { store, audit }
    }

    /// Active contracts, newest first.
    pub async fn list_active(&self) -> Result<Vec<Contract>, ServiceError> {
        let docs = self
            .store
            .list(Collection::Contracts, FilterData::matching(json!({ "active": true })).order_by("id desc"))
            .await?;
        Ok(from_documents(docs)?)
    }

    pub async fn get(&self, id: i64) -> Result<Contract, ServiceError> {
        let doc = self
            .store
            .get(Collection::Contracts, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Contract"))?;
        Ok(from_document(doc)?)
    }

    pub async fn create(
        &self,
        actor: &User,
        input: ContractInput,
        attachment_path: Option<String>,
    ) -> Result<Contract, ServiceError> {
        let mut contract = input.into_contract(attachment_path);
        contract.id = self.store.insert(Collection::Contracts, to_document(&contract)?).await?;
        self.audit
            .record(
                &actor.username,
                AuditAction::Create,
                AuditTarget::Contrato,
                Some(contract.id),
                format!("Created contract {}", contract.display_name),
            )
            .await;
        Ok(contract)
    }

    pub async fn update(
        &self,
        actor: &User,
        id: i64,
        input: ContractInput,
        attachment_path: Option<String>,
    ) -> Result<Contract, ServiceError> {
        let current = self.get(id).await?;

        let mut contract = current.clone();
        input.apply(&mut contract);
        let file_replaced = attachment_path.is_some();
        if attachment_path.is_some() {
            contract.attachment_path = attachment_path;
        }

        let mut changes = ChangeSet::new(contract.display_name.clone());
        changes
            .track("name", &current.display_name, &contract.display_name)
            .track("value", &current.total_value, &contract.total_value)
            .track_opt("months", &current.term_months, &contract.term_months)
            .track("supplier", &current.supplier_name, &contract.supplier_name)
            .note_if(current.branch != contract.branch, "branch changed")
            .note_if(current.cost_center != contract.cost_center, "cost center changed")
            .note_if(file_replaced, "file updated");

        self.store
            .update_many(Collection::Contracts, FilterData::by_id(id), to_document(&contract)?)
            .await?;
        self.audit
            .record(&actor.username, AuditAction::Update, AuditTarget::Contrato, Some(id), changes.detail())
            .await;
        Ok(contract)
    }

    pub async fn delete(&self, actor: &User, id: i64) -> Result<(), ServiceError> {
        let contract = self.get(id).await?;
        self.store.delete_many(Collection::Contracts, FilterData::by_id(id)).await?;
        self.audit
            .record(
                &actor.username,
                AuditAction::Delete,
                AuditTarget::Contrato,
                Some(id),
                format!("Deleted {}", contract.display_name),
            )
            .await;
        Ok(())
    }

    /// Soft activate or deactivate.
    pub async fn set_active(&self, actor: &User, id: i64, active: bool) -> Result<Contract, ServiceError> {
        let mut contract = self.get(id).await?;
        contract.active = active;
        let changes = json!({ "active": active }).as_object().cloned().unwrap_or_default();
        self.store
            .update_many(Collection::Contracts, FilterData::by_id(id), changes)
            .await?;

        let (action, verb) = if active {
            (AuditAction::Ativar, "Activated")
        } else {
            (AuditAction::Inativar, "Deactivated")
        };
        self.audit
            .record(
                &actor.username,
                action,
                AuditTarget::Contrato,
                Some(id),
                format!("{} contract: {}", verb, contract.display_name),
            )
            .await;
        Ok(contract)
    }
}
