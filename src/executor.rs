//! The per-query lifecycle: rewrite, bind, execute, aggregate, finalize.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::driver::{DriverEvent, Request, TdsSession};
use crate::params;
use crate::query::Query;
use crate::results::{OutputValue, ResultSnapshot, Row};
use crate::rewrite;

/// Folds a request's event stream into a result snapshot while re-emitting
/// the generic `fields`/`data` events on the query.
///
/// The snapshot is only allocated when the query has a callback; without
/// one, no memory is committed to row buffering and events are the sole
/// output.
struct ResultAggregator {
    snapshot: Option<ResultSnapshot>,
    columns: Arc<Vec<String>>,
    row_count: Option<u64>,
}

impl ResultAggregator {
    fn new(collect: bool) -> Self {
        ResultAggregator {
            snapshot: collect.then(ResultSnapshot::default),
            columns: Arc::new(Vec::new()),
            row_count: None,
        }
    }

    fn apply(&mut self, event: DriverEvent, query: &mut Query) {
        match event {
            DriverEvent::Columns(fields) => {
                self.columns = Arc::new(fields.iter().map(|f| f.name.clone()).collect());
                query.emit_fields(&fields);
                if let Some(snapshot) = &mut self.snapshot {
                    snapshot.fields.extend(fields);
                }
            }
            DriverEvent::Row(values) => {
                let row = Row::new(self.columns.clone(), values);
                query.emit_data(&row);
                if let Some(snapshot) = &mut self.snapshot {
                    snapshot.rows.push(row);
                }
            }
            DriverEvent::ReturnValue { name, value, meta } => {
                if let Some(snapshot) = &mut self.snapshot {
                    snapshot.output_values.push(OutputValue { name, value, meta });
                }
            }
            DriverEvent::Error(error) => query.gate_error(error),
            DriverEvent::Done { row_count } => self.row_count = Some(row_count),
        }
    }

    fn finish(mut self, query: &mut Query) {
        if let Some(snapshot) = &mut self.snapshot {
            snapshot.row_count = self.row_count;
        }
        query.complete(self.snapshot);
    }
}

/// Run one query against a session, from rewrite to the terminal
/// `close`/`end` pair. The request handle lives only for the duration of
/// this call and is dropped before the terminal events fire.
pub(crate) async fn run_query(query: &mut Query, session: &mut dyn TdsSession) {
    rewrite::rewrite(query);

    let mut request = Request::new(query.text.clone());
    if let Some(values) = query.values() {
        params::bind_parameters(&mut request, values);
    }
    tracing::debug!(
        text = %request.text(),
        parameters = request.parameters().len(),
        "executing query"
    );

    let mut aggregator = ResultAggregator::new(query.has_callback());
    let (events, mut inbox) = mpsc::unbounded_channel();

    let exec = session.exec_sql(&request, events);
    let drain = async {
        while let Some(event) = inbox.recv().await {
            aggregator.apply(event, query);
        }
    };
    let ((), ()) = tokio::join!(exec, drain);

    drop(request);
    aggregator.finish(query);
}
