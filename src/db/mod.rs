//! Database access layer.
//!
//! - Connection management (one connection per backing service)
//! - Statement execution with timeout and cancellation
//! - Value coercion and row projection
//! - Schema introspection

pub mod executor;
mod params;
pub mod pool;
pub mod row;
pub mod schema;
pub mod types;

pub use executor::QueryExecutor;
pub use pool::{DbConnection, DbPool};
pub use row::project;
pub use schema::SchemaIntrospector;
pub use types::{CoercionOptions, RawValue, coerce};
