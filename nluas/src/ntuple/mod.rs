//! Ntuple data model
//!
//! An ntuple is the JSON tree handed to the solver by the specializer. This
//! module validates it into typed nodes before anything is dispatched, so a
//! missing key surfaces as [`SolverError::MalformedNtuple`] instead of a
//! fault halfway through a composite action.

pub mod clarify;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{SolverError, SolverResult};
use crate::features::{json_type_name, FeatureBag};

/// Predicate under which actions are routed and capabilities are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Command,
    Query,
    Assertion,
}

impl Predicate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Predicate::Command => "command",
            Predicate::Query => "query",
            Predicate::Assertion => "assertion",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "command" => Some(Predicate::Command),
            "query" => Some(Predicate::Query),
            "assertion" => Some(Predicate::Assertion),
            _ => None,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level classification of an ntuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateType {
    Plain(Predicate),
    Conditional(Predicate),
}

impl PredicateType {
    pub fn parse(text: &str) -> Option<Self> {
        match text.strip_prefix("conditional_") {
            Some(rest) => Predicate::parse(rest).map(PredicateType::Conditional),
            None => Predicate::parse(text).map(PredicateType::Plain),
        }
    }

    pub fn predicate(&self) -> Predicate {
        match self {
            PredicateType::Plain(p) | PredicateType::Conditional(p) => *p,
        }
    }
}

impl fmt::Display for PredicateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredicateType::Plain(p) => write!(f, "{}", p),
            PredicateType::Conditional(p) => write!(f, "conditional_{}", p),
        }
    }
}

/// Returns true for the distinguished shutdown message.
pub fn is_quit(message: &Value) -> bool {
    message.get("text").and_then(Value::as_str) == Some("QUIT")
        || message.get("type").and_then(Value::as_str) == Some("quit")
}

/// An inbound ntuple with its predicate type extracted.
#[derive(Debug, Clone, PartialEq)]
pub struct Ntuple {
    predicate_type: String,
    raw: Value,
}

impl Ntuple {
    pub fn from_value(raw: Value) -> SolverResult<Self> {
        let predicate_type = match raw.get("predicate_type") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => {
                return Err(SolverError::malformed(format!(
                    "'predicate_type' must be a string, found {}",
                    json_type_name(other)
                )))
            }
            None => return Err(SolverError::malformed("missing 'predicate_type'")),
        };
        Ok(Self {
            predicate_type,
            raw,
        })
    }

    pub fn predicate_type(&self) -> &str {
        &self.predicate_type
    }

    /// Classifies the predicate type; unknown names fail with `UnknownPredicateType`.
    pub fn classify(&self) -> SolverResult<PredicateType> {
        PredicateType::parse(&self.predicate_type)
            .ok_or_else(|| SolverError::UnknownPredicateType(self.predicate_type.clone()))
    }

    pub fn event_descriptor(&self) -> SolverResult<EventDescriptor> {
        let descriptor = self
            .raw
            .get("eventDescriptor")
            .ok_or_else(|| SolverError::malformed("missing 'eventDescriptor'"))?;
        EventDescriptor::from_value(descriptor)
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

/// Event-level node of an ntuple.
#[derive(Debug, Clone, PartialEq)]
pub enum EventDescriptor {
    Simple {
        features: Option<FeatureBag>,
        process: ActionNode,
    },
    /// `complexKind == "conditional"`; the body is kept uninterpreted.
    Conditional(Map<String, Value>),
}

impl EventDescriptor {
    pub fn from_value(value: &Value) -> SolverResult<Self> {
        let map = as_object(value, "eventDescriptor")?;
        if map.get("complexKind").and_then(Value::as_str) == Some("conditional") {
            return Ok(EventDescriptor::Conditional(map.clone()));
        }

        let features = match map.get("e_features") {
            None | Some(Value::Null) => None,
            Some(Value::Object(e_features)) if e_features.is_empty() => None,
            Some(Value::Object(e_features)) => {
                let event_features = e_features
                    .get("eventFeatures")
                    .ok_or_else(|| SolverError::malformed("'e_features' lacks 'eventFeatures'"))?;
                FeatureBag::from_value(event_features, "eventFeatures")?
            }
            Some(other) => {
                return Err(SolverError::malformed(format!(
                    "'e_features' must be an object, found {}",
                    json_type_name(other)
                )))
            }
        };

        let process = map
            .get("eventProcess")
            .ok_or_else(|| SolverError::malformed("missing 'eventProcess'"))?;
        Ok(EventDescriptor::Simple {
            features,
            process: ActionNode::from_value(process)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeKind {
    Serial,
    Causal,
}

impl CompositeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompositeKind::Serial => "serial",
            CompositeKind::Causal => "causal",
        }
    }
}

/// A simple or composite process node.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionNode {
    Simple(SimpleAction),
    Composite {
        kind: CompositeKind,
        process1: Box<ActionNode>,
        process2: Box<ActionNode>,
    },
}

impl ActionNode {
    pub fn from_value(value: &Value) -> SolverResult<Self> {
        let map = as_object(value, "eventProcess")?;
        let kind = match map.get("complexKind") {
            None | Some(Value::Null) => None,
            Some(Value::String(kind)) if kind == "serial" => Some(CompositeKind::Serial),
            Some(Value::String(kind)) if kind == "causal" => Some(CompositeKind::Causal),
            Some(other) => {
                return Err(SolverError::malformed(format!(
                    "unrecognised process complexKind {}",
                    other
                )))
            }
        };

        match kind {
            Some(kind) => {
                let child = |name: &str| -> SolverResult<Box<ActionNode>> {
                    let node = map.get(name).ok_or_else(|| {
                        SolverError::malformed(format!("{} process lacks '{}'", kind.as_str(), name))
                    })?;
                    Ok(Box::new(ActionNode::from_value(node)?))
                };
                Ok(ActionNode::Composite {
                    kind,
                    process1: child("process1")?,
                    process2: child("process2")?,
                })
            }
            None => Ok(ActionNode::Simple(SimpleAction::from_map(map)?)),
        }
    }

    /// True if this node or any node below it is a `kind` composite.
    pub fn contains_kind(&self, kind: CompositeKind) -> bool {
        match self {
            ActionNode::Simple(_) => false,
            ActionNode::Composite {
                kind: own,
                process1,
                process2,
            } => *own == kind || process1.contains_kind(kind) || process2.contains_kind(kind),
        }
    }
}

/// A single action: name, semantic template and its payload fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimpleAction {
    pub actionary: String,
    pub template: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<FeatureBag>,
    /// Remaining fields, specific to the actionary.
    pub payload: Map<String, Value>,
}

impl SimpleAction {
    fn from_map(map: &Map<String, Value>) -> SolverResult<Self> {
        let actionary = required_str(map, "actionary")?;
        let template = required_str(map, "template")?;
        let features = match map.get("p_features") {
            None | Some(Value::Null) => None,
            Some(Value::Object(p_features)) if p_features.is_empty() => None,
            Some(Value::Object(p_features)) => {
                let process_features = p_features.get("processFeatures").ok_or_else(|| {
                    SolverError::malformed("'p_features' lacks 'processFeatures'")
                })?;
                FeatureBag::from_value(process_features, "processFeatures")?
            }
            Some(other) => {
                return Err(SolverError::malformed(format!(
                    "'p_features' must be an object, found {}",
                    json_type_name(other)
                )))
            }
        };
        let payload = map
            .iter()
            .filter(|(k, _)| !matches!(k.as_str(), "actionary" | "template" | "p_features"))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(Self {
            actionary,
            template,
            features,
            payload,
        })
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.payload.get(name)
    }
}

fn as_object<'a>(value: &'a Value, field: &str) -> SolverResult<&'a Map<String, Value>> {
    value.as_object().ok_or_else(|| {
        SolverError::malformed(format!(
            "'{}' must be an object, found {}",
            field,
            json_type_name(value)
        ))
    })
}

fn required_str(map: &Map<String, Value>, field: &str) -> SolverResult<String> {
    match map.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(SolverError::malformed(format!(
            "'{}' must be a string, found {}",
            field,
            json_type_name(other)
        ))),
        None => Err(SolverError::malformed(format!("missing '{}'", field))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn move_ntuple() -> Value {
        json!({
            "predicate_type": "command",
            "eventDescriptor": {
                "e_features": null,
                "eventProcess": {
                    "actionary": "move",
                    "template": "MotionPath",
                    "p_features": {"processFeatures": {"speed": 0.5}},
                    "heading": "north"
                }
            }
        })
    }

    #[test]
    fn test_predicate_type_classification() {
        assert_eq!(
            PredicateType::parse("query"),
            Some(PredicateType::Plain(Predicate::Query))
        );
        assert_eq!(
            PredicateType::parse("conditional_assertion"),
            Some(PredicateType::Conditional(Predicate::Assertion))
        );
        assert_eq!(PredicateType::parse("teleport"), None);
        assert_eq!(PredicateType::parse("conditional_teleport"), None);
        assert_eq!(
            PredicateType::Conditional(Predicate::Command).to_string(),
            "conditional_command"
        );
    }

    #[test]
    fn test_simple_event_parsing() {
        let ntuple = Ntuple::from_value(move_ntuple()).unwrap();
        assert_eq!(ntuple.predicate_type(), "command");
        match ntuple.event_descriptor().unwrap() {
            EventDescriptor::Simple {
                features,
                process: ActionNode::Simple(action),
            } => {
                assert!(features.is_none());
                assert_eq!(action.actionary, "move");
                assert_eq!(action.template, "MotionPath");
                assert_eq!(action.features.unwrap().get("speed"), Some(&json!(0.5)));
                assert_eq!(action.payload.get("heading"), Some(&json!("north")));
                assert!(!action.payload.contains_key("actionary"));
            }
            other => panic!("unexpected descriptor: {:?}", other),
        }
    }

    #[test]
    fn test_missing_event_process_is_malformed() {
        let value = json!({"predicate_type": "command", "eventDescriptor": {"e_features": null}});
        let err = Ntuple::from_value(value)
            .unwrap()
            .event_descriptor()
            .unwrap_err();
        assert!(matches!(err, SolverError::MalformedNtuple(ref m) if m.contains("eventProcess")));
    }

    #[test]
    fn test_missing_predicate_type_is_malformed() {
        let err = Ntuple::from_value(json!({"eventDescriptor": {}})).unwrap_err();
        assert!(matches!(err, SolverError::MalformedNtuple(_)));
    }

    #[test]
    fn test_nested_causal_is_found() {
        let value = json!({
            "complexKind": "serial",
            "process1": {"actionary": "move", "template": "MotionPath", "p_features": null},
            "process2": {
                "complexKind": "causal",
                "process1": {"actionary": "push", "template": "Push"},
                "process2": {"actionary": "fall", "template": "Fall"}
            }
        });
        let node = ActionNode::from_value(&value).unwrap();
        assert!(node.contains_kind(CompositeKind::Causal));
        assert!(node.contains_kind(CompositeKind::Serial));

        let simple = ActionNode::from_value(&json!({"actionary": "move", "template": "MotionPath"})).unwrap();
        assert!(!simple.contains_kind(CompositeKind::Causal));
    }

    #[test]
    fn test_empty_feature_objects_mean_no_features() {
        let descriptor = EventDescriptor::from_value(&json!({
            "e_features": {},
            "eventProcess": {"actionary": "move", "template": "MotionPath", "p_features": {}}
        }))
        .unwrap();
        match descriptor {
            EventDescriptor::Simple {
                features,
                process: ActionNode::Simple(action),
            } => {
                assert_eq!(features, None);
                assert_eq!(action.features, None);
                assert!(action.payload.is_empty());
            }
            other => panic!("unexpected descriptor: {:?}", other),
        }
    }

    #[test]
    fn test_composite_missing_child_is_malformed() {
        let value = json!({"complexKind": "causal", "process1": {"actionary": "push", "template": "T"}});
        let err = ActionNode::from_value(&value).unwrap_err();
        assert!(err.to_string().contains("causal process lacks 'process2'"));
    }

    #[test]
    fn test_unknown_complex_kind_is_malformed() {
        let err = ActionNode::from_value(&json!({"complexKind": "parallel"})).unwrap_err();
        assert!(matches!(err, SolverError::MalformedNtuple(_)));
    }

    #[test]
    fn test_conditional_descriptor_is_kept_opaque() {
        let value = json!({"complexKind": "conditional", "cond": {}, "core": {}});
        assert!(matches!(
            EventDescriptor::from_value(&value).unwrap(),
            EventDescriptor::Conditional(_)
        ));
    }

    #[test]
    fn test_quit_detection() {
        assert!(is_quit(&json!({"text": "QUIT"})));
        assert!(is_quit(&json!({"type": "quit"})));
        assert!(!is_quit(&move_ntuple()));
    }
}
