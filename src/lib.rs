//! Generic database-adapter surface for Microsoft SQL Server.
//!
//! This crate sits between a caller speaking the generic "run this query
//! with these parameters" contract and the Tiberius TDS driver. It infers
//! wire types for raw parameter values, rewrites positional placeholders
//! into the named form the protocol requires, expands array parameters into
//! synthesized named parameters, and folds the driver's per-request event
//! stream back into one materialized [`ResultSnapshot`].
//!
//! ```rust,no_run
//! use mssql_adapter::{Connection, ConnectionConfig, ParamValues, SqlValue};
//!
//! # async fn demo() -> Result<(), mssql_adapter::AdapterError> {
//! let mut conn = Connection::connect(&ConnectionConfig::default()).await?;
//! let query = conn
//!     .query((
//!         "SELECT name FROM users WHERE id IN (@id)",
//!         ParamValues::named([("id", SqlValue::Array(vec![
//!             SqlValue::Int(1),
//!             SqlValue::Int(2),
//!         ]))]),
//!         |result: Result<&mssql_adapter::ResultSnapshot, &mssql_adapter::AdapterError>| {
//!             if let Ok(snapshot) = result {
//!                 println!("{} rows", snapshot.rows.len());
//!             }
//!         },
//!     ))
//!     .await;
//! # let _ = query;
//! # Ok(())
//! # }
//! ```
//!
//! Whole result sets are buffered; the driver exposes no backpressure-aware
//! read interface, and this crate does not simulate one.

pub mod connection;
pub mod driver;
pub mod error;
mod executor;
pub mod params;
pub mod prelude;
pub mod query;
pub mod results;
pub mod rewrite;
pub mod types;

pub use connection::{Connection, ConnectionConfig, DEFAULT_PORT};
pub use error::AdapterError;
pub use query::{ParamValues, Parameter, Query, QueryCallback, QueryInput};
pub use results::{FieldMeta, OutputValue, ResultSnapshot, Row};
pub use types::{SqlValue, WireType, infer_wire_type};

/// Adapter's schema name.
pub const ADAPTER_NAME: &str = "mssql";

/// Prefix callers use for named placeholders in query text.
pub const NAMED_PARAMETER_PREFIX: &str = "@";

/// Token callers use for positional placeholders in query text.
pub const POSITIONAL_PARAMETER_PREFIX: &str = "?";

/// Map a generic type name to a concrete wire type.
///
/// See [`WireType::from_name`]; unrecognized names fall back to
/// [`WireType::VarBinary`].
#[must_use]
pub fn get_type(name: &str) -> WireType {
    WireType::from_name(name)
}

/// Build a [`Query`] from text, `(text, values)`, `(text, values,
/// callback)`, or an already-built query. Idempotent in the last case: the
/// query comes back unchanged.
pub fn create_query(input: impl Into<QueryInput>) -> Query {
    input.into().into_query()
}

/// Open a connection to SQL Server.
///
/// # Errors
///
/// Returns `AdapterError` when connecting fails.
pub async fn create_connection(config: &ConnectionConfig) -> Result<Connection, AdapterError> {
    Connection::connect(config).await
}
