//! Query description shared by both storage backends: a JSON where-clause,
//! ordering and paging, compiled to SQL for Postgres and evaluated in place
//! for the in-memory store.

pub mod error;
pub mod filter;
pub mod filter_order;
pub mod filter_where;
pub mod types;

pub use error::FilterError;
pub use filter::Filter;
pub use types::*;
