//! Boundary to the underlying TDS driver.
//!
//! The adapter core never talks to Tiberius directly; it hands a [`Request`]
//! to a [`TdsSession`] and consumes the typed [`DriverEvent`] stream the
//! session produces. Anything that can speak this contract can sit behind a
//! connection, which is also how the lifecycle tests drive the adapter
//! without a server.

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use crate::error::AdapterError;
use crate::results::FieldMeta;
use crate::types::{SqlValue, WireType};

pub mod mssql;

/// One named, typed parameter attached to a request.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundParameter {
    pub name: String,
    pub ty: WireType,
    pub value: SqlValue,
}

/// The execution unit handed to a session: final query text plus the bound
/// parameters. Owned by the query lifecycle for the duration of one
/// execution and dropped when the request completes.
#[derive(Debug)]
pub struct Request {
    text: String,
    parameters: Vec<BoundParameter>,
}

impl Request {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Request {
            text: text.into(),
            parameters: Vec::new(),
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Attach one named, typed parameter. Binding is by name, so attachment
    /// order does not affect correctness.
    pub fn add_parameter(&mut self, name: impl Into<String>, ty: WireType, value: SqlValue) {
        self.parameters.push(BoundParameter {
            name: name.into(),
            ty,
            value,
        });
    }

    #[must_use]
    pub fn parameters(&self) -> &[BoundParameter] {
        &self.parameters
    }
}

/// Notifications a session raises while executing one request.
///
/// For one request the session sends `Columns* , Row* , ReturnValue* ,
/// [Error] , Done` — column/row waves may repeat for multi-statement
/// batches, and `Row` values align positionally with the most recent
/// `Columns` wave.
#[derive(Debug)]
pub enum DriverEvent {
    /// Column metadata for the statement whose rows follow
    Columns(Vec<FieldMeta>),
    /// One row, values in column order
    Row(Vec<SqlValue>),
    /// An output-parameter value reported by the server
    ReturnValue {
        name: String,
        value: SqlValue,
        meta: Option<FieldMeta>,
    },
    /// An execution error; may be raised more than once per request
    Error(AdapterError),
    /// Terminal completion with the final row count
    Done { row_count: u64 },
}

/// Channel on which a session delivers its events.
pub type DriverEvents = UnboundedSender<DriverEvent>;

/// One driver connection, able to execute requests and to be shut down.
#[async_trait]
pub trait TdsSession: Send {
    /// Execute a request, delivering all notifications on `events`. Failures
    /// are reported as [`DriverEvent::Error`] rather than returned, so the
    /// caller observes one uniform stream.
    async fn exec_sql(&mut self, request: &Request, events: DriverEvents);

    /// Terminate the connection. Called at most once per session.
    ///
    /// # Errors
    ///
    /// Returns the driver's error if the shutdown handshake fails.
    async fn close(&mut self) -> Result<(), AdapterError>;
}
