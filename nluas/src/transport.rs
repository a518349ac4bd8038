//! Transport boundary.
//!
//! The solver only ever sends to a named destination; delivery is assumed
//! reliable and in order. Two adapters ship with the crate: an in-memory bus
//! for tests and embedding, and a JSON-lines writer used by the agent binary.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;
use std::sync::Mutex;

use crate::error::{SolverError, SolverResult};

pub trait Transport: Send + Sync {
    fn send(&self, destination: &str, message: Value) -> SolverResult<()>;
}

/// One outbound message as written by [`JsonLinesTransport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub destination: String,
    pub message: Value,
}

/// Records every message sent through it.
#[derive(Debug, Default)]
pub struct InMemoryTransport {
    sent: Mutex<Vec<Envelope>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Envelope> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn messages_to(&self, destination: &str) -> Vec<Value> {
        self.sent()
            .into_iter()
            .filter(|e| e.destination == destination)
            .map(|e| e.message)
            .collect()
    }

    /// Messages of the given `type` across all destinations.
    pub fn messages_of_type(&self, kind: &str) -> Vec<Value> {
        self.sent()
            .into_iter()
            .filter(|e| e.message.get("type").and_then(Value::as_str) == Some(kind))
            .map(|e| e.message)
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.clear();
        }
    }
}

impl Transport for InMemoryTransport {
    fn send(&self, destination: &str, message: Value) -> SolverResult<()> {
        let mut sent = self
            .sent
            .lock()
            .map_err(|_| SolverError::Transport("in-memory transport poisoned".to_string()))?;
        sent.push(Envelope {
            destination: destination.to_string(),
            message,
        });
        Ok(())
    }
}

/// Writes each message as one `{"destination": .., "message": ..}` line.
pub struct JsonLinesTransport<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesTransport<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> SolverResult<W> {
        self.writer
            .into_inner()
            .map_err(|_| SolverError::Transport("json-lines writer poisoned".to_string()))
    }
}

impl<W: Write + Send> Transport for JsonLinesTransport<W> {
    fn send(&self, destination: &str, message: Value) -> SolverResult<()> {
        let envelope = Envelope {
            destination: destination.to_string(),
            message,
        };
        let line = serde_json::to_string(&envelope)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| SolverError::Transport("json-lines writer poisoned".to_string()))?;
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }
}
