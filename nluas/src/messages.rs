//! Outbound messages to the UI agent.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::transport::Transport;

pub const INCAPABLE_MESSAGE: &str = "I cannot do that yet.";

/// Message shapes understood by the UI agent, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiMessage {
    Clarification {
        ntuple: Value,
        message: String,
        tag: String,
    },
    IdFailure {
        message: String,
        tag: String,
    },
    Response {
        message: Value,
        tag: String,
    },
    ErrorDescriptor {
        message: Value,
        tag: String,
    },
}

impl UiMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            UiMessage::Clarification { .. } => "clarification",
            UiMessage::IdFailure { .. } => "id_failure",
            UiMessage::Response { .. } => "response",
            UiMessage::ErrorDescriptor { .. } => "error_descriptor",
        }
    }
}

pub fn unknown_capability_message(predicate: &str, action: &str) -> String {
    format!("I cannot solve the '{}_{}' action", predicate, action)
}

pub fn unknown_predicate_message(predicate_type: &str) -> String {
    format!("I cannot solve a(n) {}.", predicate_type)
}

/// Sends UI messages on behalf of the solver. Fire-and-forget: a failed send
/// is logged and never interrupts dispatch.
#[derive(Clone)]
pub struct UiNotifier {
    transport: Arc<dyn Transport>,
    ui_address: String,
    tag: String,
}

impl std::fmt::Debug for UiNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiNotifier")
            .field("ui_address", &self.ui_address)
            .field("tag", &self.tag)
            .finish()
    }
}

impl UiNotifier {
    pub fn new(
        transport: Arc<dyn Transport>,
        ui_address: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            ui_address: ui_address.into(),
            tag: tag.into(),
        }
    }

    pub fn request_clarification(&self, ntuple: &Value, message: impl Into<String>) {
        self.send(UiMessage::Clarification {
            ntuple: ntuple.clone(),
            message: message.into(),
            tag: self.tag.clone(),
        });
    }

    pub fn identification_failure(&self, message: impl Into<String>) {
        self.send(UiMessage::IdFailure {
            message: message.into(),
            tag: self.tag.clone(),
        });
    }

    pub fn respond_to_query(&self, message: Value) {
        self.send(UiMessage::Response {
            message,
            tag: self.tag.clone(),
        });
    }

    pub fn return_error_descriptor(&self, message: Value) {
        self.send(UiMessage::ErrorDescriptor {
            message,
            tag: self.tag.clone(),
        });
    }

    fn send(&self, message: UiMessage) {
        let kind = message.kind();
        let payload = match serde_json::to_value(&message) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(kind, error = %e, "failed to encode UI message");
                return;
            }
        };
        match self.transport.send(&self.ui_address, payload) {
            Ok(()) => debug!(kind, destination = %self.ui_address, "sent UI message"),
            Err(e) => warn!(kind, destination = %self.ui_address, error = %e, "failed to send UI message"),
        }
    }
}
