//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::connection::{Connection, ConnectionConfig, DEFAULT_PORT};
pub use crate::driver::{BoundParameter, DriverEvent, Request, TdsSession};
pub use crate::error::AdapterError;
pub use crate::query::{ParamValues, Parameter, Query, QueryCallback, QueryInput};
pub use crate::results::{FieldMeta, OutputValue, ResultSnapshot, Row};
pub use crate::rewrite::rewrite;
pub use crate::types::{SqlValue, WireType, infer_wire_type};

pub use crate::{
    ADAPTER_NAME, NAMED_PARAMETER_PREFIX, POSITIONAL_PARAMETER_PREFIX, create_connection,
    create_query, get_type,
};
