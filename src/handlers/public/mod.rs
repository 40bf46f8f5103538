// handlers/public/mod.rs - endpoints that do not require a JWT
pub mod auth;
pub mod system;
