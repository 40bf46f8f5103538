use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use super::ServiceError;
use crate::database::models::{Contract, Invoice, User, STATUS_PAID, STATUS_PENDING};
use crate::database::{from_documents, Collection, Store};
use crate::filter::FilterData;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub username: String,
    pub role: String,
    pub active_contracts: u64,
    pub total_invoices: u64,
    pub active_phone_lines: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub active_contracts: u64,
    pub pending_invoices: u64,
    pub total_invoices: u64,
    pub monthly_contract_forecast: Decimal,
    pub pending_amount: Decimal,
    pub paid_amount: Decimal,
}

/// Read-only aggregates for the landing page.
#[derive(Clone)]
pub struct DashboardService {
    store: Arc<dyn Store>,
}

impl DashboardService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn summary(&self, user: &User) -> Result<DashboardSummary, ServiceError> {
        let active = || FilterData::matching(json!({ "active": true }));
        Ok(DashboardSummary {
            username: user.username.clone(),
            role: user.role.clone(),
            active_contracts: self.store.count(Collection::Contracts, active()).await?,
            total_invoices: self.store.count(Collection::Invoices, FilterData::all()).await?,
            active_phone_lines: self.store.count(Collection::PhoneLines, active()).await?,
        })
    }

    pub async fn stats(&self) -> Result<DashboardStats, ServiceError> {
        let contracts: Vec<Contract> = from_documents(
            self.store
                .list(Collection::Contracts, FilterData::matching(json!({ "active": true })))
                .await?,
        )?;
        let invoices: Vec<Invoice> = from_documents(self.store.list(Collection::Invoices, FilterData::all()).await?)?;

        let total_with = |status: &'static str| {
            checked_total(
                invoices.iter().filter(|i| i.status == status).map(|i| i.adjusted_amount),
                status,
            )
        };

        Ok(DashboardStats {
            active_contracts: contracts.len() as u64,
            pending_invoices: invoices.iter().filter(|i| i.status == STATUS_PENDING).count() as u64,
            total_invoices: invoices.len() as u64,
            monthly_contract_forecast: checked_total(
                contracts.iter().map(Contract::monthly_value),
                "monthly contract forecast",
            )?,
            pending_amount: total_with(STATUS_PENDING)?,
            paid_amount: total_with(STATUS_PAID)?,
        })
    }
}

fn checked_total(mut values: impl Iterator<Item = Decimal>, what: &'static str) -> Result<Decimal, ServiceError> {
    values
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
        .ok_or(ServiceError::Overflow(what))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::to_document;
    use crate::services::test_support::store;
    use crate::types::Role;
    use serde_json::Value;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    async fn seed(store: &Arc<dyn Store>, collection: Collection, doc: Value) {
        let doc = doc.as_object().cloned().unwrap();
        store.insert(collection, doc).await.unwrap();
    }

    fn contract(total: &str, months: Option<i64>, active: bool) -> Value {
        json!({
            "displayName": "c", "branch": "b", "supplierName": "s", "supplierTaxId": "t",
            "costCenter": "cc", "kind": "k", "totalValue": total, "termMonths": months,
            "dueDay": 10, "active": active
        })
    }

    fn invoice(amount: &str, status: &str) -> Value {
        json!({
            "contractId": 1, "referencePeriod": "2024-01", "amount": amount, "status": status,
            "adjustedAmount": amount, "attachmentPath": "uploads/b.pdf", "uploadedOn": "2024-01-05"
        })
    }

    #[tokio::test]
    async fn stats_aggregate_contracts_and_invoices() {
        let (store, _) = store();
        seed(&store, Collection::Contracts, contract("1200", Some(12), true)).await;
        seed(&store, Collection::Contracts, contract("300", None, true)).await;
        seed(&store, Collection::Contracts, contract("0", Some(0), true)).await;
        seed(&store, Collection::Contracts, contract("999", Some(1), false)).await;
        seed(&store, Collection::Invoices, invoice("50.25", STATUS_PENDING)).await;
        seed(&store, Collection::Invoices, invoice("10", STATUS_PENDING)).await;
        seed(&store, Collection::Invoices, invoice("40", STATUS_PAID)).await;
        seed(&store, Collection::Invoices, invoice("7", "Pendente envio do boleto")).await;

        let stats = DashboardService::new(store).stats().await.unwrap();
        assert_eq!(stats.active_contracts, 3);
        assert_eq!(stats.monthly_contract_forecast, dec("400"));
        assert_eq!(stats.pending_invoices, 2);
        assert_eq!(stats.total_invoices, 4);
        assert_eq!(stats.pending_amount, dec("60.25"));
        assert_eq!(stats.paid_amount, dec("40"));
    }

    #[tokio::test]
    async fn invoice_totals_report_overflow() {
        let (store, _) = store();
        let max = Decimal::MAX.to_string();
        seed(&store, Collection::Invoices, invoice(&max, STATUS_PAID)).await;
        seed(&store, Collection::Invoices, invoice(&max, STATUS_PAID)).await;

        match DashboardService::new(store).stats().await {
            Err(ServiceError::Overflow(what)) => assert_eq!(what, STATUS_PAID),
            other => panic!("expected overflow, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn forecast_reports_overflow() {
        let (store, _) = store();
        let max = Decimal::MAX.to_string();
        seed(&store, Collection::Contracts, contract(&max, None, true)).await;
        seed(&store, Collection::Contracts, contract(&max, Some(1), true)).await;

        let err = DashboardService::new(store).stats().await;
        assert!(matches!(err, Err(ServiceError::Overflow("monthly contract forecast"))));
    }

    #[tokio::test]
    async fn summary_counts_active_rows() {
        let (store, _) = store();
        seed(&store, Collection::Contracts, contract("1", None, false)).await;
        let line = crate::database::models::PhoneLine {
            id: 0,
            number: "11999990000".into(),
            carrier: "Tim".into(),
            description: None,
            monthly_value: dec("10"),
            reference_period: "2024-01".into(),
            department: None,
            branch: None,
            active: true,
            uploaded_on: chrono::NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
        };
        store.insert(Collection::PhoneLines, to_document(&line).unwrap()).await.unwrap();

        let user = User::new("ana", String::new(), Role::Tercerizado);
        let summary = DashboardService::new(store).summary(&user).await.unwrap();
        assert_eq!(summary.role, "tercerizado");
        assert_eq!(summary.active_contracts, 0);
        assert_eq!(summary.total_invoices, 0);
        assert_eq!(summary.active_phone_lines, 1);
    }
}
