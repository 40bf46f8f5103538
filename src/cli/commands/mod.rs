pub mod import;
pub mod users;
