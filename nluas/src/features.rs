//! Call-scoped feature bags.
//!
//! Event-level features (`e_features.eventFeatures`) and process-level
//! features (`p_features.processFeatures`) are carried in a [`FeatureContext`]
//! that is passed down the Event Router -> Action Router -> Dispatcher chain.
//! Each router builds a child context for its own call, so nothing leaks into
//! sibling actions or into the next ntuple.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{SolverError, SolverResult};

/// Ordered mapping of semantic feature name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureBag(IndexMap<String, Value>);

impl FeatureBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a bag from a JSON object. `null` yields `None`; any other
    /// non-object value is malformed.
    pub fn from_value(value: &Value, field: &str) -> SolverResult<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::Object(map) => Ok(Some(Self(
                map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            ))),
            other => Err(SolverError::malformed(format!(
                "'{}' must be an object, found {}",
                field,
                json_type_name(other)
            ))),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(name.into(), value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Feature context visible to one handler invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureContext {
    event: Option<FeatureBag>,
    process: Option<FeatureBag>,
}

impl FeatureContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Child context carrying the given event-level features.
    pub fn with_event(&self, event: Option<FeatureBag>) -> Self {
        Self {
            event,
            process: self.process.clone(),
        }
    }

    /// Child context carrying the given process-level features.
    pub fn with_process(&self, process: Option<FeatureBag>) -> Self {
        Self {
            event: self.event.clone(),
            process,
        }
    }

    pub fn event(&self) -> Option<&FeatureBag> {
        self.event.as_ref()
    }

    pub fn process(&self) -> Option<&FeatureBag> {
        self.process.as_ref()
    }

    /// Looks a feature up in the process bag first, then the event bag.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.process
            .as_ref()
            .and_then(|bag| bag.get(name))
            .or_else(|| self.event.as_ref().and_then(|bag| bag.get(name)))
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
