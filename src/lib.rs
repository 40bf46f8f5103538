pub mod audit;
pub mod auth;
pub mod cli;
pub mod config;
pub mod context;
pub mod database;
pub mod error;
pub mod files;
pub mod filter;
pub mod handlers;
pub mod ingest;
pub mod middleware;
pub mod normalize;
pub mod permissions;
pub mod router;
pub mod services;
pub mod types;

pub use context::AppContext;
pub use router::app;
