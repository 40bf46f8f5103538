pub mod audit_entry;
pub mod contract;
pub mod credential;
pub mod invoice;
pub mod phone_line;
pub mod user;

pub use audit_entry::AuditLogEntry;
pub use contract::Contract;
pub use credential::Credential;
pub use invoice::{adjusted_amount, Invoice, DEFAULT_STATUS, STATUS_PAID, STATUS_PENDING};
pub use phone_line::PhoneLine;
pub use user::{User, UserView};

fn default_true() -> bool {
    true
}
