use serde_json::{json, Map, Value};

use super::error::FilterError;
use super::types::{FilterOp, FilterWhereInfo, SqlParam, ID_FIELD};

/// Column storing the JSON document in every collection table.
pub const DOC_COLUMN: &str = "doc";

pub struct FilterWhere {
    param_values: Vec<SqlParam>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null | Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    /// Flatten `{ field: value | { "$op": value } }` into conditions.
    pub fn parse(where_data: &Value) -> Result<Vec<FilterWhereInfo>, FilterError> {
        let obj = match where_data {
            Value::Null => return Ok(vec![]),
            Value::Object(obj) => obj,
            _ => return Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        };

        let mut conditions = vec![];
        for (field, value) in obj {
            validate_column(field)?;
            match value {
                Value::Object(ops) if ops.keys().all(|k| k.starts_with('$')) && !ops.is_empty() => {
                    for (op_key, op_val) in ops {
                        let operator = Self::map_operator(op_key)?;
                        if matches!(operator, FilterOp::In | FilterOp::NIn) && !op_val.is_array() {
                            return Err(FilterError::InvalidOperatorData(format!("{} requires array", op_key)));
                        }
                        conditions.push(FilterWhereInfo { column: field.clone(), operator, data: op_val.clone() });
                    }
                }
                // Implicit equality: { field: value }
                _ => conditions.push(FilterWhereInfo { column: field.clone(), operator: FilterOp::Eq, data: value.clone() }),
            }
        }
        Ok(conditions)
    }

    /// Generate the SQL predicate for `conditions`, numbering bind
    /// parameters after `starting_param_index`.
    pub fn generate(
        conditions: &[FilterWhereInfo],
        starting_param_index: usize,
    ) -> Result<(String, Vec<SqlParam>), FilterError> {
        let mut filter_where = Self::new(starting_param_index);
        let mut sql_conditions = vec![];
        for condition in conditions {
            sql_conditions.push(filter_where.build_sql_condition(condition)?);
        }
        let where_clause = if sql_conditions.is_empty() { "1=1".to_string() } else { sql_conditions.join(" AND ") };
        Ok((where_clause, filter_where.param_values))
    }

    /// Evaluate `conditions` against an in-memory document.
    pub fn matches(conditions: &[FilterWhereInfo], doc: &Map<String, Value>) -> bool {
        conditions.iter().all(|condition| {
            let actual = doc.get(&condition.column).unwrap_or(&Value::Null);
            match condition.operator {
                FilterOp::Eq => actual == &condition.data,
                FilterOp::Ne => actual != &condition.data,
                FilterOp::In => contains(&condition.data, actual),
                FilterOp::NIn => !contains(&condition.data, actual),
            }
        })
    }

    fn map_operator(op_key: &str) -> Result<FilterOp, FilterError> {
        Ok(match op_key {
            "$eq" => FilterOp::Eq,
            "$ne" | "$neq" => FilterOp::Ne,
            "$in" => FilterOp::In,
            "$nin" => FilterOp::NIn,
            other => return Err(FilterError::UnsupportedOperator(other.to_string())),
        })
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> Result<String, FilterError> {
        if condition.column == ID_FIELD {
            return self.build_id_condition(condition);
        }

        let field_path = format!("\"{}\"->'{}'", DOC_COLUMN, condition.column);
        match condition.operator {
            FilterOp::Eq => {
                if condition.data.is_null() {
                    Ok(format!("({0} IS NULL OR {0} = 'null'::jsonb)", field_path))
                } else {
                    let p = self.param(SqlParam::Json(json!({ condition.column.clone(): condition.data.clone() })));
                    Ok(format!("\"{}\" @> {}", DOC_COLUMN, p))
                }
            }
            FilterOp::Ne => {
                if condition.data.is_null() {
                    Ok(format!("({0} IS NOT NULL AND {0} <> 'null'::jsonb)", field_path))
                } else {
                    let p = self.param(SqlParam::Json(json!({ condition.column.clone(): condition.data.clone() })));
                    Ok(format!("NOT (\"{}\" @> {})", DOC_COLUMN, p))
                }
            }
            FilterOp::In => {
                if is_empty_array(&condition.data) { return Ok("1=0".to_string()); }
                let p = self.param(SqlParam::Json(condition.data.clone()));
                Ok(format!("COALESCE({} @> ({}), false)", p, field_path))
            }
            FilterOp::NIn => {
                if is_empty_array(&condition.data) { return Ok("1=1".to_string()); }
                let p = self.param(SqlParam::Json(condition.data.clone()));
                Ok(format!("NOT COALESCE({} @> ({}), false)", p, field_path))
            }
        }
    }

    fn build_id_condition(&mut self, condition: &FilterWhereInfo) -> Result<String, FilterError> {
        let column = format!("\"{}\"", ID_FIELD);
        match condition.operator {
            FilterOp::Eq => {
                let p = self.param(SqlParam::BigInt(id_value(&condition.data)?));
                Ok(format!("{} = {}", column, p))
            }
            FilterOp::Ne => {
                let p = self.param(SqlParam::BigInt(id_value(&condition.data)?));
                Ok(format!("{} <> {}", column, p))
            }
            FilterOp::In | FilterOp::NIn => {
                let ids = condition
                    .data
                    .as_array()
                    .map(|values| values.iter().map(id_value).collect::<Result<Vec<_>, _>>())
                    .transpose()?
                    .unwrap_or_default();
                let p = self.param(SqlParam::BigIntList(ids));
                if condition.operator == FilterOp::In {
                    Ok(format!("{} = ANY({})", column, p))
                } else {
                    Ok(format!("NOT ({} = ANY({}))", column, p))
                }
            }
        }
    }

    fn param(&mut self, value: SqlParam) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}

pub(crate) fn validate_column(column: &str) -> Result<(), FilterError> {
    let mut chars = column.chars();
    let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    if !valid_start || !column.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(FilterError::InvalidColumn(format!("Invalid column name format: {}", column)));
    }
    Ok(())
}

fn id_value(value: &Value) -> Result<i64, FilterError> {
    value
        .as_i64()
        .ok_or_else(|| FilterError::InvalidOperatorData(format!("id must be an integer, got {}", value)))
}

fn is_empty_array(value: &Value) -> bool {
    value.as_array().map(|a| a.is_empty()).unwrap_or(false)
}

fn contains(haystack: &Value, needle: &Value) -> bool {
    haystack.as_array().map(|values| values.contains(needle)).unwrap_or(false)
}
