use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const DEFAULT_STATUS: &str = "Pendente envio do boleto";
pub const STATUS_PENDING: &str = "Pendente";
pub const STATUS_PAID: &str = "Pago";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    #[serde(default)]
    pub id: i64,
    pub contract_id: i64,
    pub reference_period: String,
    pub amount: Decimal,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub paid_on: Option<NaiveDate>,
    #[serde(default)]
    pub circuit_number: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub surcharge: Decimal,
    pub adjusted_amount: Decimal,
    #[serde(default)]
    pub notes: Option<String>,
    pub attachment_path: String,
    #[serde(default)]
    pub fiscal_note_path: Option<String>,
    pub uploaded_on: NaiveDate,
    #[serde(default = "super::default_true")]
    pub active: bool,
}

fn default_status() -> String {
    DEFAULT_STATUS.to_string()
}

/// `amount + surcharge - discount`, or `None` when the result leaves the `Decimal` range.
pub fn adjusted_amount(amount: Decimal, surcharge: Decimal, discount: Decimal) -> Option<Decimal> {
    amount.checked_add(surcharge)?.checked_sub(discount)
}
