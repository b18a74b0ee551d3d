use std::fmt;

use crate::error::AdapterError;
use crate::results::{FieldMeta, ResultSnapshot, Row};
use crate::types::{SqlValue, WireType, infer_wire_type};

/// A parameter attached to a query.
///
/// Either a raw value whose wire type is inferred at bind time, or a value
/// paired with an explicit wire type that overrides inference.
#[derive(Debug, Clone, PartialEq)]
pub enum Parameter {
    /// Value with an explicit wire type
    Explicit { ty: WireType, value: SqlValue },
    /// Value whose wire type is inferred from its shape
    Inferred(SqlValue),
}

impl Parameter {
    /// A parameter with an explicit wire type.
    #[must_use]
    pub fn explicit(ty: WireType, value: SqlValue) -> Self {
        Parameter::Explicit { ty, value }
    }

    /// The parameter's value, regardless of typing mode.
    #[must_use]
    pub fn value(&self) -> &SqlValue {
        match self {
            Parameter::Explicit { value, .. } => value,
            Parameter::Inferred(value) => value,
        }
    }

    /// The wire type this parameter binds as: the explicit type if given,
    /// otherwise the inferred one.
    #[must_use]
    pub fn wire_type(&self) -> WireType {
        match self {
            Parameter::Explicit { ty, .. } => *ty,
            Parameter::Inferred(value) => infer_wire_type(value),
        }
    }

    pub(crate) fn into_parts(self) -> (Option<WireType>, SqlValue) {
        match self {
            Parameter::Explicit { ty, value } => (Some(ty), value),
            Parameter::Inferred(value) => (None, value),
        }
    }

    pub(crate) fn from_parts(ty: Option<WireType>, value: SqlValue) -> Self {
        match ty {
            Some(ty) => Parameter::Explicit { ty, value },
            None => Parameter::Inferred(value),
        }
    }
}

impl From<SqlValue> for Parameter {
    fn from(value: SqlValue) -> Self {
        Parameter::Inferred(value)
    }
}

/// The parameters of a query: either a name-to-value mapping or an ordered
/// sequence of positional values. The two modes are mutually exclusive, and
/// the rewriter always converts positional mode to named mode because the
/// underlying protocol has no positional-parameter concept.
///
/// Entries keep their declared order in both modes; rewriting and binding
/// iterate in that order, so output is deterministic.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValues {
    /// Named parameters in declaration order
    Named(Vec<(String, Parameter)>),
    /// Positional parameters in declaration order
    Positional(Vec<Parameter>),
}

impl ParamValues {
    /// Named parameters from `(name, value)` pairs; wire types are inferred.
    pub fn named<N, I>(entries: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, SqlValue)>,
    {
        ParamValues::Named(
            entries
                .into_iter()
                .map(|(name, value)| (name.into(), Parameter::Inferred(value)))
                .collect(),
        )
    }

    /// Named parameters from `(name, parameter)` pairs, for callers that mix
    /// explicit and inferred typing.
    pub fn named_params<N, I>(entries: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, Parameter)>,
    {
        ParamValues::Named(
            entries
                .into_iter()
                .map(|(name, param)| (name.into(), param))
                .collect(),
        )
    }

    /// Positional parameters; wire types are inferred.
    pub fn positional<I>(values: I) -> Self
    where
        I: IntoIterator<Item = SqlValue>,
    {
        ParamValues::Positional(values.into_iter().map(Parameter::Inferred).collect())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            ParamValues::Named(entries) => entries.len(),
            ParamValues::Positional(entries) => entries.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Completion callback for a query.
///
/// Invoked exactly once: with `Ok` and the materialized snapshot on success,
/// or with `Err` and the first driver error otherwise. Registered behind the
/// query's error gate, so repeated driver errors never reach it twice.
pub type QueryCallback = Box<dyn FnOnce(Result<&ResultSnapshot, &AdapterError>) + Send>;

type FieldsListener = Box<dyn FnMut(&[FieldMeta]) + Send>;
type DataListener = Box<dyn FnMut(&Row) + Send>;
type ErrorListener = Box<dyn FnMut(&AdapterError) + Send>;
type UnitListener = Box<dyn FnMut() + Send>;

/// One query: its text, parameters, event listeners and, once executed, its
/// materialized result.
///
/// Events fire in the order `fields* , data* , [error] , close , end`. The
/// `fields`/`data` pairs repeat once per statement for multi-statement
/// batches; an error, if any, always precedes the terminal `close`/`end`
/// pair, and `close` always precedes `end`.
pub struct Query {
    /// Query text; rewritten in place when parameters are attached
    pub text: String,
    values: Option<ParamValues>,
    callback: Option<QueryCallback>,
    snapshot: Option<ResultSnapshot>,
    error: Option<AdapterError>,
    emitted_error: bool,
    fields_listeners: Vec<FieldsListener>,
    data_listeners: Vec<DataListener>,
    error_listeners: Vec<ErrorListener>,
    close_listeners: Vec<UnitListener>,
    end_listeners: Vec<UnitListener>,
}

impl Query {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Query {
            text: text.into(),
            values: None,
            callback: None,
            snapshot: None,
            error: None,
            emitted_error: false,
            fields_listeners: Vec::new(),
            data_listeners: Vec::new(),
            error_listeners: Vec::new(),
            close_listeners: Vec::new(),
            end_listeners: Vec::new(),
        }
    }

    /// Attach parameters.
    #[must_use]
    pub fn with_values(mut self, values: ParamValues) -> Self {
        self.values = Some(values);
        self
    }

    /// Attach a completion callback. A callback is what makes the query
    /// buffer rows: without one, no snapshot is allocated and `data` events
    /// are the only way to observe rows.
    #[must_use]
    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(Result<&ResultSnapshot, &AdapterError>) + Send + 'static,
    {
        self.callback = Some(Box::new(callback));
        self
    }

    #[must_use]
    pub fn values(&self) -> Option<&ParamValues> {
        self.values.as_ref()
    }

    pub fn set_values(&mut self, values: ParamValues) {
        self.values = Some(values);
    }

    pub(crate) fn take_values(&mut self) -> Option<ParamValues> {
        self.values.take()
    }

    #[must_use]
    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    /// The materialized result, present once the query has completed and a
    /// callback was registered. Partial on error.
    #[must_use]
    pub fn result(&self) -> Option<&ResultSnapshot> {
        self.snapshot.as_ref()
    }

    /// The first error the driver raised for this query, if any.
    #[must_use]
    pub fn error(&self) -> Option<&AdapterError> {
        self.error.as_ref()
    }

    /// Whether an error has been delivered for this query. Once set, the
    /// flag never reverts; it is the only gate for error delivery.
    #[must_use]
    pub fn error_emitted(&self) -> bool {
        self.emitted_error
    }

    /// Listen for column-descriptor waves, one per executed statement.
    pub fn on_fields(&mut self, listener: impl FnMut(&[FieldMeta]) + Send + 'static) -> &mut Self {
        self.fields_listeners.push(Box::new(listener));
        self
    }

    /// Listen for rows as they arrive.
    pub fn on_data(&mut self, listener: impl FnMut(&Row) + Send + 'static) -> &mut Self {
        self.data_listeners.push(Box::new(listener));
        self
    }

    /// Listen for the (at most one) error of this query.
    pub fn on_error(&mut self, listener: impl FnMut(&AdapterError) + Send + 'static) -> &mut Self {
        self.error_listeners.push(Box::new(listener));
        self
    }

    /// Listen for the `close` event, fired after the request is released.
    pub fn on_close(&mut self, listener: impl FnMut() + Send + 'static) -> &mut Self {
        self.close_listeners.push(Box::new(listener));
        self
    }

    /// Listen for the terminal `end` event.
    pub fn on_end(&mut self, listener: impl FnMut() + Send + 'static) -> &mut Self {
        self.end_listeners.push(Box::new(listener));
        self
    }

    pub(crate) fn emit_fields(&mut self, fields: &[FieldMeta]) {
        for listener in &mut self.fields_listeners {
            listener(fields);
        }
    }

    pub(crate) fn emit_data(&mut self, row: &Row) {
        for listener in &mut self.data_listeners {
            listener(row);
        }
    }

    /// Deliver a driver error through the gate: the first error is emitted
    /// and consumes the callback, every later one is suppressed entirely.
    pub(crate) fn gate_error(&mut self, error: AdapterError) {
        if self.emitted_error {
            return;
        }
        self.emitted_error = true;
        for listener in &mut self.error_listeners {
            listener(&error);
        }
        if let Some(callback) = self.callback.take() {
            callback(Err(&error));
        }
        self.error = Some(error);
    }

    /// Finalize the query: store the snapshot, invoke the callback unless an
    /// error already consumed it, then emit `close` followed by `end`. The
    /// terminal pair fires unconditionally, error or not.
    pub(crate) fn complete(&mut self, snapshot: Option<ResultSnapshot>) {
        self.snapshot = snapshot;
        if !self.emitted_error {
            if let Some(callback) = self.callback.take() {
                if let Some(snapshot) = self.snapshot.as_ref() {
                    callback(Ok(snapshot));
                }
            }
        }
        for listener in &mut self.close_listeners {
            listener();
        }
        for listener in &mut self.end_listeners {
            listener();
        }
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("text", &self.text)
            .field("values", &self.values)
            .field("has_callback", &self.callback.is_some())
            .field("emitted_error", &self.emitted_error)
            .finish()
    }
}

/// Input accepted wherever a query can be started: bare text, text plus
/// parameters, text plus parameters plus completion callback, or an
/// already-built [`Query`] (returned unchanged — the conversion is
/// idempotent).
///
/// Queries built from text through a connection's `query` entry point run in
/// self-closing mode; pre-built queries do not.
pub struct QueryInput {
    query: Query,
    from_text: bool,
}

impl QueryInput {
    #[must_use]
    pub fn into_query(self) -> Query {
        self.query
    }

    /// Whether this input was built from text rather than a pre-built query.
    #[must_use]
    pub fn from_text(&self) -> bool {
        self.from_text
    }
}

impl From<Query> for QueryInput {
    fn from(query: Query) -> Self {
        QueryInput {
            query,
            from_text: false,
        }
    }
}

impl From<&str> for QueryInput {
    fn from(text: &str) -> Self {
        QueryInput {
            query: Query::new(text),
            from_text: true,
        }
    }
}

impl From<String> for QueryInput {
    fn from(text: String) -> Self {
        QueryInput {
            query: Query::new(text),
            from_text: true,
        }
    }
}

impl<S: Into<String>> From<(S, ParamValues)> for QueryInput {
    fn from((text, values): (S, ParamValues)) -> Self {
        QueryInput {
            query: Query::new(text).with_values(values),
            from_text: true,
        }
    }
}

impl<S, F> From<(S, ParamValues, F)> for QueryInput
where
    S: Into<String>,
    F: FnOnce(Result<&ResultSnapshot, &AdapterError>) + Send + 'static,
{
    fn from((text, values, callback): (S, ParamValues, F)) -> Self {
        QueryInput {
            query: Query::new(text).with_values(values).with_callback(callback),
            from_text: true,
        }
    }
}
