// handlers/protected/mod.rs - endpoints behind jwt_auth_middleware
//
// Every handler takes the CurrentUser extractor and calls `require` with its
// resource tag as the first statement. Mutations are audited by the services
// after the storage write commits.
pub mod contracts;
pub mod credentials;
pub mod dashboard;
pub mod history;
pub mod invoices;
pub mod me;
pub mod telephony;
pub mod users;
