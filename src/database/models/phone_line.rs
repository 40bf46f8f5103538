use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneLine {
    #[serde(default)]
    pub id: i64,
    pub number: String,
    pub carrier: String,
    #[serde(default)]
    pub description: Option<String>,
    pub monthly_value: Decimal,
    pub reference_period: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default = "super::default_true")]
    pub active: bool,
    pub uploaded_on: NaiveDate,
}
