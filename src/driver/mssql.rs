//! Tiberius-backed session: the real TDS driver behind the boundary.
//!
//! Translates the adapter's named parameters into Tiberius' positional
//! `@PN` form, drives the query stream, and converts driver rows and column
//! metadata into [`DriverEvent`]s.

use std::borrow::Cow;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use futures_util::TryStreamExt;
use tiberius::{AuthMethod, Client, ColumnData, IntoSql, QueryItem, SqlBrowser};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use crate::connection::{ConnectionConfig, DEFAULT_PORT};
use crate::driver::{BoundParameter, DriverEvent, DriverEvents, Request, TdsSession};
use crate::error::AdapterError;
use crate::results::FieldMeta;
use crate::rewrite::scanner::{self, TokenKind};
use crate::types::{SqlValue, WireType};

/// Type alias for the underlying SQL Server client
pub type MssqlClient = Client<Compat<TcpStream>>;

/// A live connection to a SQL Server instance.
pub struct MssqlSession {
    client: Option<MssqlClient>,
}

impl MssqlSession {
    /// Open a connection. Named instances are resolved through the SQL
    /// Browser service; otherwise the configured (or default) port is used.
    ///
    /// # Errors
    ///
    /// Returns `AdapterError` when the TCP connection or the TDS handshake
    /// fails.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self, AdapterError> {
        let driver_config = build_driver_config(config);

        let tcp = if config.instance_name.is_some() {
            TcpStream::connect_named(&driver_config).await?
        } else {
            TcpStream::connect(driver_config.get_addr())
                .await
                .map_err(|e| AdapterError::ConnectionError(format!("TCP connection error: {e}")))?
        };
        tcp.set_nodelay(true).ok();

        let client = Client::connect(driver_config, tcp.compat_write()).await?;
        tracing::debug!(host = %config.host, database = %config.database, "connected");

        Ok(MssqlSession {
            client: Some(client),
        })
    }
}

#[async_trait]
impl TdsSession for MssqlSession {
    async fn exec_sql(&mut self, request: &Request, events: DriverEvents) {
        let Some(client) = self.client.as_mut() else {
            let _ = events.send(DriverEvent::Error(AdapterError::ConnectionError(
                "connection is closed".to_string(),
            )));
            let _ = events.send(DriverEvent::Done { row_count: 0 });
            return;
        };

        let text = positional_text(request);
        let mut query = tiberius::Query::new(text);
        for parameter in request.parameters() {
            query.bind(to_sql_param(parameter));
        }

        let mut stream = match query.query(client).await {
            Ok(stream) => stream,
            Err(e) => {
                let _ = events.send(DriverEvent::Error(e.into()));
                let _ = events.send(DriverEvent::Done { row_count: 0 });
                return;
            }
        };

        let mut row_count = 0u64;
        loop {
            match stream.try_next().await {
                Ok(Some(QueryItem::Metadata(meta))) => {
                    let fields: Vec<FieldMeta> = meta
                        .columns()
                        .iter()
                        .filter(|column| !column.name().is_empty())
                        .map(|column| FieldMeta {
                            name: column.name().to_string(),
                            type_name: Some(format!("{:?}", column.column_type())),
                            nullable: None,
                            size: None,
                        })
                        .collect();
                    let _ = events.send(DriverEvent::Columns(fields));
                }
                Ok(Some(QueryItem::Row(row))) => {
                    row_count += 1;
                    let values = (0..row.len()).map(|idx| extract_value(&row, idx)).collect();
                    let _ = events.send(DriverEvent::Row(values));
                }
                Ok(None) => break,
                Err(e) => {
                    let _ = events.send(DriverEvent::Error(e.into()));
                    break;
                }
            }
        }

        let _ = events.send(DriverEvent::Done { row_count });
    }

    async fn close(&mut self) -> Result<(), AdapterError> {
        if let Some(client) = self.client.take() {
            client.close().await?;
            tracing::debug!("connection closed");
        }
        Ok(())
    }
}

/// Build the Tiberius config from the adapter's connection config. An
/// `instance_name` takes precedence over any explicit port.
fn build_driver_config(config: &ConnectionConfig) -> tiberius::Config {
    let mut driver_config = tiberius::Config::new();
    driver_config.host(&config.host);
    driver_config.database(&config.database);
    driver_config.authentication(AuthMethod::sql_server(&config.user, &config.password));
    if let Some(instance) = &config.instance_name {
        driver_config.instance_name(instance);
    } else {
        driver_config.port(config.port.unwrap_or(DEFAULT_PORT));
    }
    driver_config.trust_cert();
    driver_config
}

/// Tiberius has no named-parameter API, so the request's `@name` tokens are
/// renumbered to the `@PN` form matching the bind order. Repeated uses of
/// one name share one slot.
fn positional_text(request: &Request) -> String {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    for (idx, parameter) in request.parameters().iter().enumerate() {
        slots.entry(parameter.name.as_str()).or_insert(idx);
    }

    scanner::replace_placeholders(request.text(), |token| match &token.kind {
        TokenKind::Named(name) => slots.get(name.as_str()).map(|idx| format!("@P{}", idx + 1)),
        TokenKind::Positional => None,
    })
    .into_owned()
}

/// Parameter wrapper bridging adapter values into Tiberius column data.
enum SqlParam<'a> {
    Int(i64),
    Float(f64),
    Text(Cow<'a, str>),
    Bool(bool),
    Binary(Cow<'a, [u8]>),
    Null(WireType),
}

impl<'a> IntoSql<'a> for SqlParam<'a> {
    fn into_sql(self) -> ColumnData<'a> {
        match self {
            SqlParam::Int(i) => ColumnData::I64(Some(i)),
            SqlParam::Float(f) => ColumnData::F64(Some(f)),
            SqlParam::Text(s) => ColumnData::String(Some(s)),
            SqlParam::Bool(b) => ColumnData::Bit(Some(b)),
            SqlParam::Binary(b) => ColumnData::Binary(Some(b)),
            SqlParam::Null(WireType::VarBinary) => ColumnData::Binary(None),
            SqlParam::Null(WireType::Bit) => ColumnData::Bit(None),
            SqlParam::Null(WireType::BigInt) => ColumnData::I64(None),
            SqlParam::Null(WireType::Real) => ColumnData::F64(None),
            SqlParam::Null(_) => ColumnData::String(None),
        }
    }
}

/// Convert a bound parameter to a Tiberius-bindable value. The wire type
/// nudges the encoding where the value shape alone is ambiguous; timestamps
/// and JSON travel as their textual form.
fn to_sql_param(parameter: &BoundParameter) -> SqlParam<'_> {
    match (&parameter.value, parameter.ty) {
        (SqlValue::Null, ty) => SqlParam::Null(ty),
        (SqlValue::Bool(b), _) => SqlParam::Bool(*b),
        (SqlValue::Int(i), WireType::Bit) => SqlParam::Bool(*i != 0),
        (SqlValue::Int(i), WireType::Real) => SqlParam::Float(*i as f64),
        (SqlValue::Int(i), _) => SqlParam::Int(*i),
        (SqlValue::Float(f), _) => SqlParam::Float(*f),
        (SqlValue::Text(s), WireType::VarBinary) => SqlParam::Binary(Cow::Borrowed(s.as_bytes())),
        (SqlValue::Text(s), _) => SqlParam::Text(Cow::Borrowed(s.as_str())),
        (SqlValue::Bytes(b), _) => SqlParam::Binary(Cow::Borrowed(b.as_slice())),
        (SqlValue::Timestamp(dt), _) => {
            SqlParam::Text(Cow::Owned(dt.format("%Y-%m-%d %H:%M:%S%.f").to_string()))
        }
        (SqlValue::Json(v), _) => SqlParam::Text(Cow::Owned(v.to_string())),
        // arrays never reach the driver; the binder skips them
        (SqlValue::Array(_), ty) => SqlParam::Null(ty),
    }
}

/// Extract a value from a row at a specific index, trying the narrow types
/// first and falling back to NULL when nothing converts.
fn extract_value(row: &tiberius::Row, idx: usize) -> SqlValue {
    if let Ok(Some(v)) = row.try_get::<i32, _>(idx) {
        return SqlValue::Int(i64::from(v));
    }
    if let Ok(Some(v)) = row.try_get::<i64, _>(idx) {
        return SqlValue::Int(v);
    }
    if let Ok(Some(v)) = row.try_get::<f32, _>(idx) {
        return SqlValue::Float(f64::from(v));
    }
    if let Ok(Some(v)) = row.try_get::<f64, _>(idx) {
        return SqlValue::Float(v);
    }
    if let Ok(Some(v)) = row.try_get::<bool, _>(idx) {
        return SqlValue::Bool(v);
    }
    if let Ok(Some(v)) = row.try_get::<NaiveDateTime, _>(idx) {
        return SqlValue::Timestamp(v);
    }
    if let Ok(Some(v)) = row.try_get::<&str, _>(idx) {
        return SqlValue::Text(v.to_string());
    }
    if let Ok(Some(v)) = row.try_get::<&[u8], _>(idx) {
        return SqlValue::Bytes(v.to_vec());
    }
    SqlValue::Null
}
