use serde_json::{Map, Value};

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::{FilterWhere, DOC_COLUMN};
use super::types::{FilterData, FilterOrderInfo, FilterWhereInfo, SqlParam, SqlResult, ID_FIELD};

/// A validated query against one collection. Renders to SQL for the
/// Postgres adapter and evaluates directly for the in-memory adapter.
pub struct Filter {
    table_name: String,
    where_data: Vec<FilterWhereInfo>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i32>,
    offset: Option<i32>,
}

impl Filter {
    pub fn new(table_name: impl Into<String>) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        Self::validate_table_name(&table_name)?;
        Ok(Self {
            table_name,
            where_data: vec![],
            order_data: vec![],
            limit: None,
            offset: None,
        })
    }

    pub fn from_data(table_name: impl Into<String>, data: FilterData) -> Result<Self, FilterError> {
        let mut filter = Self::new(table_name)?;
        filter.assign(data)?;
        Ok(filter)
    }

    pub fn assign(&mut self, data: FilterData) -> Result<&mut Self, FilterError> {
        if let Some(where_clause) = data.where_clause { self.where_clause(where_clause)?; }
        if let Some(order) = data.order { self.order(order)?; }
        if let Some(limit) = data.limit { self.limit(limit, data.offset)?; }
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        FilterWhere::validate(&conditions)?;
        self.where_data = FilterWhere::parse(&conditions)?;
        Ok(self)
    }

    pub fn order(&mut self, order_spec: Value) -> Result<&mut Self, FilterError> {
        self.order_data = FilterOrder::validate_and_parse(&order_spec)?;
        Ok(self)
    }

    pub fn limit(&mut self, limit: i32, offset: Option<i32>) -> Result<&mut Self, FilterError> {
        if limit < 0 { return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string())); }
        if let Some(off) = offset { if off < 0 { return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string())); } }
        self.limit = Some(limit);
        self.offset = offset;
        Ok(self)
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = FilterWhere::generate(&self.where_data, 0)?;
        let order_clause = FilterOrder::generate(&self.order_data);
        let limit_clause = self.build_limit_clause();

        let query = [
            format!("SELECT \"{}\", \"{}\"", ID_FIELD, DOC_COLUMN),
            format!("FROM \"{}\"", self.table_name),
            format!("WHERE {}", where_clause),
            order_clause,
            limit_clause,
        ].into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ");

        Ok(SqlResult { query, params })
    }

    pub fn to_count_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = FilterWhere::generate(&self.where_data, 0)?;
        let query = format!("SELECT COUNT(*) AS count FROM \"{}\" WHERE {}", self.table_name, where_clause);
        Ok(SqlResult { query, params })
    }

    pub fn to_delete_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = FilterWhere::generate(&self.where_data, 0)?;
        let query = format!("DELETE FROM \"{}\" WHERE {}", self.table_name, where_clause);
        Ok(SqlResult { query, params })
    }

    /// Shallow-merge `changes` into every matching document.
    pub fn to_update_sql(&self, changes: Value) -> Result<SqlResult, FilterError> {
        let (where_clause, where_params) = FilterWhere::generate(&self.where_data, 1)?;
        let query = format!(
            "UPDATE \"{0}\" SET \"{1}\" = \"{1}\" || $1 WHERE {2}",
            self.table_name, DOC_COLUMN, where_clause
        );
        let mut params = vec![SqlParam::Json(changes)];
        params.extend(where_params);
        Ok(SqlResult { query, params })
    }

    pub fn matches(&self, doc: &Map<String, Value>) -> bool {
        FilterWhere::matches(&self.where_data, doc)
    }

    /// Filter, sort and page a set of in-memory documents.
    pub fn apply<I>(&self, docs: I) -> Vec<Map<String, Value>>
    where
        I: IntoIterator<Item = Map<String, Value>>,
    {
        let mut selected: Vec<_> = docs.into_iter().filter(|d| self.matches(d)).collect();
        FilterOrder::sort(&self.order_data, &mut selected);
        let offset = self.offset.unwrap_or(0).max(0) as usize;
        let iter = selected.into_iter().skip(offset);
        match self.limit {
            Some(l) => iter.take(l.max(0) as usize).collect(),
            None => iter.collect(),
        }
    }

    fn validate_table_name(name: &str) -> Result<(), FilterError> {
        let valid_start = name.chars().next().map(|c| c.is_ascii_alphabetic() || c == '_').unwrap_or(false);
        if !valid_start || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(FilterError::InvalidTableName(format!("Invalid table name format: {}", name)));
        }
        Ok(())
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            (None, Some(o)) => format!("OFFSET {}", o),
            (None, None) => String::new(),
        }
    }
}
