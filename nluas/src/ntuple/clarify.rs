//! Clarification gate and marked-slot filling.
//!
//! The specializer marks a slot it could not resolve by putting `*` in the
//! key (e.g. `"*referent"`). A gate decides whether an ntuple must go back
//! to the UI for clarification; [`clarify_ntuple`] fills the marked slots
//! with the user's answer so the ntuple can be solved again.

use serde_json::{Map, Value};

pub const DEFAULT_CLARIFICATION_MESSAGE: &str = "This ntuple requires clarification.";

/// Decides whether an inbound ntuple needs clarification before dispatch.
pub trait ClarificationGate: Send + Sync {
    /// Returns the message to send with the clarification request, or `None`
    /// when the ntuple can be dispatched as is.
    fn check(&self, ntuple: &Value) -> Option<String>;
}

/// Never asks for clarification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverClarify;

impl ClarificationGate for NeverClarify {
    fn check(&self, _ntuple: &Value) -> Option<String> {
        None
    }
}

/// Asks for clarification whenever a key anywhere in the tree carries `*`.
#[derive(Debug, Clone)]
pub struct MarkedSlotGate {
    message: String,
}

impl Default for MarkedSlotGate {
    fn default() -> Self {
        Self {
            message: DEFAULT_CLARIFICATION_MESSAGE.to_string(),
        }
    }
}

impl MarkedSlotGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl ClarificationGate for MarkedSlotGate {
    fn check(&self, ntuple: &Value) -> Option<String> {
        if marked_slots(ntuple).is_empty() {
            None
        } else {
            Some(self.message.clone())
        }
    }
}

/// Keys containing `*`, depth first.
pub fn marked_slots(value: &Value) -> Vec<String> {
    let mut found = Vec::new();
    collect_marked(value, &mut found);
    found
}

fn collect_marked(value: &Value, found: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if key.contains('*') {
                    found.push(key.clone());
                }
                collect_marked(child, found);
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_marked(item, found)),
        _ => {}
    }
}

/// Replaces every marked slot with `descriptor`, dropping the `*` from its key.
/// Nested objects are rewritten recursively; other values are copied.
pub fn clarify_ntuple(ntuple: &Value, descriptor: &Value) -> Value {
    match ntuple {
        Value::Object(map) => {
            let mut clarified = Map::with_capacity(map.len());
            for (key, value) in map {
                if key.contains('*') {
                    clarified.insert(key.replace('*', ""), descriptor.clone());
                } else {
                    clarified.insert(key.clone(), clarify_ntuple(value, descriptor));
                }
            }
            Value::Object(clarified)
        }
        other => other.clone(),
    }
}
