pub mod contracts;
pub mod credentials;
pub mod dashboard;
pub mod invoices;
pub mod telephony;
pub mod users;

use std::collections::HashMap;
use thiserror::Error;

use crate::auth::JwtError;
use crate::database::DatabaseError;
use crate::error::ApiError;

pub use contracts::ContractService;
pub use credentials::CredentialService;
pub use dashboard::DashboardService;
pub use invoices::InvoiceService;
pub use telephony::TelephonyService;
pub use users::UserService;

/// Text fields of a submitted form, keyed by field name.
pub type FormFields = HashMap<String, String>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{field}: {message}")]
    Invalid { field: &'static str, message: String },

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error(transparent)]
    Storage(#[from] DatabaseError),

    #[error(transparent)]
    Hash(#[from] bcrypt::BcryptError),

    #[error(transparent)]
    Token(#[from] JwtError),

    #[error("{0} exceeds the supported decimal range")]
    Overflow(&'static str),
}

impl ServiceError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        ServiceError::Invalid { field, message: message.into() }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        ServiceError::NotFound(what.into())
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(what) => ApiError::not_found(format!("{} not found", what)),
            ServiceError::Invalid { field, message } => ApiError::invalid_field(field, message),
            ServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            ServiceError::Conflict(msg) => ApiError::conflict(msg),
            ServiceError::InvalidCredentials => ApiError::unauthorized("Invalid username or password"),
            ServiceError::Storage(e) => e.into(),
            ServiceError::Hash(e) => e.into(),
            ServiceError::Token(e) => e.into(),
            ServiceError::Overflow(what) => {
                tracing::error!("Decimal overflow computing {}", what);
                ApiError::internal_server_error("Stored amounts are too large to total")
            }
        }
    }
}

/// Trimmed, non-empty value of `name`.
pub(crate) fn optional(fields: &FormFields, name: &str) -> Option<String> {
    fields.get(name).map(|v| v.trim()).filter(|v| !v.is_empty()).map(str::to_string)
}

pub(crate) fn required(fields: &FormFields, name: &'static str) -> Result<String, ServiceError> {
    optional(fields, name).ok_or_else(|| ServiceError::invalid(name, "This field is required"))
}

/// Form checkbox semantics: `true`/`1`/`on`, case-insensitive.
pub(crate) fn flag(fields: &FormFields, name: &str) -> bool {
    optional(fields, name)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "on"))
        .unwrap_or(false)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::audit::AuditLog;
    use crate::database::{MemoryStore, Store};

    pub fn store() -> (Arc<dyn Store>, AuditLog) {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let audit = AuditLog::new(store.clone());
        (store, audit)
    }

    pub fn fields(pairs: &[(&str, &str)]) -> super::FormFields {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }
}
