//! Connection bridge: driver lifecycle on one side, the generic
//! `close`/`error` contract on the other.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::driver::TdsSession;
use crate::driver::mssql::MssqlSession;
use crate::error::AdapterError;
use crate::executor;
use crate::query::{Query, QueryInput};

/// Default SQL Server port, used when neither a port nor an instance name is
/// configured.
pub const DEFAULT_PORT: u16 = 1433;

/// Connection configuration with documented fallbacks.
///
/// Every field is optional in serialized form; missing fields take the
/// defaults below. A present `instance_name` disables the explicit `port`
/// and resolves the port through the SQL Browser instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Login name, default `sa`
    pub user: String,
    /// Password, default `Password123`
    pub password: String,
    /// Server address, default `localhost`
    pub host: String,
    /// Database name, default `myDataBase`
    pub database: String,
    /// Named instance, e.g. `SQLEXPRESS`
    pub instance_name: Option<String>,
    /// Server port; ignored when `instance_name` is set
    pub port: Option<u16>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            user: "sa".to_string(),
            password: "Password123".to_string(),
            host: "localhost".to_string(),
            database: "myDataBase".to_string(),
            instance_name: None,
            port: None,
        }
    }
}

type CloseListener = Box<dyn FnMut() + Send>;
type ErrorListener = Box<dyn FnMut(&AdapterError) + Send>;

/// One adapter connection wrapping one driver session.
///
/// The session handle is released exactly once: `end` takes it out of its
/// slot, so a second `end` (or the self-closing path after one) is a no-op.
/// A connection is not safe for overlapping self-closing queries; `&mut
/// self` on [`Connection::query`] makes that unrepresentable.
pub struct Connection {
    session: Option<Box<dyn TdsSession>>,
    close_listeners: Vec<CloseListener>,
    error_listeners: Vec<ErrorListener>,
}

impl Connection {
    /// Open a connection to SQL Server.
    ///
    /// # Errors
    ///
    /// Returns `AdapterError` when the connection attempt fails; there is no
    /// connection object to listen on in that case, so the error arrives
    /// here rather than as an event.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self, AdapterError> {
        let session = MssqlSession::connect(config).await?;
        Ok(Connection::from_session(Box::new(session)))
    }

    /// Wrap an already-established driver session. This is also the seam the
    /// lifecycle tests use to substitute a scripted session.
    #[must_use]
    pub fn from_session(session: Box<dyn TdsSession>) -> Self {
        Connection {
            session: Some(session),
            close_listeners: Vec::new(),
            error_listeners: Vec::new(),
        }
    }

    /// Whether the driver session has been released.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.session.is_none()
    }

    /// Listen for the connection's `close` event.
    pub fn on_close(&mut self, listener: impl FnMut() + Send + 'static) -> &mut Self {
        self.close_listeners.push(Box::new(listener));
        self
    }

    /// Listen for connection-level errors (failures while shutting the
    /// driver session down). Errors raised during a query go to that query's
    /// own `error` event instead.
    pub fn on_error(&mut self, listener: impl FnMut(&AdapterError) + Send + 'static) -> &mut Self {
        self.error_listeners.push(Box::new(listener));
        self
    }

    /// Execute a query on this connection and drive it to completion.
    ///
    /// Accepts text, `(text, values)`, `(text, values, callback)`, or a
    /// pre-built [`Query`]. Text-derived queries run in self-closing mode:
    /// the connection is released when the query completes, error or not.
    /// Pre-built queries leave the connection open.
    pub async fn query(&mut self, input: impl Into<QueryInput>) -> Query {
        let input = input.into();
        let self_closing = input.from_text();
        let mut query = input.into_query();

        match self.session.as_mut() {
            Some(session) => executor::run_query(&mut query, session.as_mut()).await,
            None => {
                query.gate_error(AdapterError::ConnectionError(
                    "connection is closed".to_string(),
                ));
                query.complete(None);
            }
        }

        if self_closing {
            self.end().await;
        }
        query
    }

    /// Release the driver session and emit `close`. Idempotent: only the
    /// call that actually takes the session emits events.
    pub async fn end(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(error) = session.close().await {
                tracing::warn!(%error, "driver close failed");
                for listener in &mut self.error_listeners {
                    listener(&error);
                }
            }
            for listener in &mut self.close_listeners {
                listener();
            }
        }
    }

    /// Like [`Connection::end`], with a callback invoked once on `close`.
    pub async fn end_with(&mut self, callback: impl FnOnce() + Send + 'static) {
        let mut callback = Some(callback);
        self.on_close(move || {
            if let Some(callback) = callback.take() {
                callback();
            }
        });
        self.end().await;
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("closed", &self.session.is_none())
            .finish()
    }
}
