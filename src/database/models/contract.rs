use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    #[serde(default)]
    pub id: i64,
    pub display_name: String,
    pub branch: String,
    pub supplier_name: String,
    pub supplier_tax_id: String,
    #[serde(default)]
    pub secondary_supplier_name: Option<String>,
    #[serde(default)]
    pub secondary_supplier_tax_id: Option<String>,
    pub cost_center: String,
    pub kind: String,
    pub total_value: Decimal,
    #[serde(default)]
    pub term_months: Option<i64>,
    #[serde(default)]
    pub billing_start: Option<NaiveDate>,
    #[serde(default)]
    pub due_day: i64,
    #[serde(default)]
    pub identifiers: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub cost_sharing: bool,
    #[serde(default)]
    pub cost_sharing_companies: Option<String>,
    #[serde(default)]
    pub attachment_path: Option<String>,
    #[serde(default)]
    pub cancelled_on: Option<NaiveDate>,
    #[serde(default = "super::default_true")]
    pub active: bool,
}

impl Contract {
    /// Monthly share of the total value; a missing or zero term counts as one month.
    pub fn monthly_value(&self) -> Decimal {
        match self.term_months {
            Some(months) if months > 0 => self.total_value / Decimal::from(months),
            _ => self.total_value,
        }
    }
}
