//! Scripted driver session for exercising the query lifecycle without a
//! server.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mssql_adapter::driver::{BoundParameter, DriverEvent, DriverEvents, Request, TdsSession};
use mssql_adapter::error::AdapterError;

/// Replays a fixed event script for the first request it executes and
/// records what was handed to it.
pub struct ScriptedSession {
    script: Vec<DriverEvent>,
    pub requests: Arc<Mutex<Vec<(String, Vec<BoundParameter>)>>>,
    pub closed: Arc<AtomicBool>,
}

impl ScriptedSession {
    pub fn new(script: Vec<DriverEvent>) -> Self {
        ScriptedSession {
            script,
            requests: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl TdsSession for ScriptedSession {
    async fn exec_sql(&mut self, request: &Request, events: DriverEvents) {
        self.requests
            .lock()
            .unwrap()
            .push((request.text().to_string(), request.parameters().to_vec()));
        for event in self.script.drain(..) {
            let _ = events.send(event);
        }
    }

    async fn close(&mut self) -> Result<(), AdapterError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
