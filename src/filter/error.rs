use thiserror::Error;

/// Rejections raised while turning a `FilterData` into SQL or a document predicate.
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("invalid collection: {0}")]
    InvalidTableName(String),

    #[error("invalid field: {0}")]
    InvalidColumn(String),

    #[error("invalid where clause: {0}")]
    InvalidWhereClause(String),

    #[error("unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("invalid operand: {0}")]
    InvalidOperatorData(String),

    #[error("invalid limit: {0}")]
    InvalidLimit(String),

    #[error("invalid offset: {0}")]
    InvalidOffset(String),
}
