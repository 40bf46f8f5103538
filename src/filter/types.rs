use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Column holding the storage-assigned record id. Every other field lives
/// inside the JSON document.
pub const ID_FIELD: &str = "id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "$eq")] Eq,
    #[serde(rename = "$ne")] Ne,
    #[serde(rename = "$in")] In,
    #[serde(rename = "$nin")] NIn,
}

/// Query description shared by every storage adapter.
///
/// `where_clause` uses the `{ field: value }` / `{ field: { "$in": [...] } }`
/// shape; `order` accepts `"id desc"`, `["a asc", "b desc"]` or `{ "a": "desc" }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterData {
    pub where_clause: Option<Value>,
    pub order: Option<Value>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

impl FilterData {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn matching(where_clause: Value) -> Self {
        Self { where_clause: Some(where_clause), ..Default::default() }
    }

    pub fn by_id(id: i64) -> Self {
        Self::matching(json!({ ID_FIELD: id }))
    }

    pub fn order_by(mut self, order: impl Into<String>) -> Self {
        self.order = Some(Value::String(order.into()));
        self
    }

    pub fn limit(mut self, limit: i32) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone)]
pub struct FilterWhereInfo {
    pub column: String,
    pub operator: FilterOp,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterOrderInfo {
    pub column: String,
    pub sort: SortDirection,
}

/// Typed bind parameter; the id column is BIGINT, everything else JSONB.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Json(Value),
    BigInt(i64),
    BigIntList(Vec<i64>),
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<SqlParam>,
}
