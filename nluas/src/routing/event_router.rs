//! Event Router: interprets one event descriptor and reports its result.

use serde_json::Value;
use tracing::debug;

use super::action_router::{ActionOutcome, ActionRouter};
use crate::error::{SolverError, SolverResult};
use crate::features::FeatureContext;
use crate::ntuple::{CompositeKind, EventDescriptor, Predicate, PredicateType};

pub struct EventRouter<'a> {
    actions: ActionRouter<'a>,
}

impl<'a> EventRouter<'a> {
    pub fn new(actions: ActionRouter<'a>) -> Self {
        Self { actions }
    }

    /// Routes the event's process with the event-level features in scope,
    /// then translates a result into a UI message: `response` for queries,
    /// `error_descriptor` for commands. Assertion results are not reported.
    pub fn route_event(
        &mut self,
        descriptor: &EventDescriptor,
        predicate: Predicate,
    ) -> SolverResult<ActionOutcome> {
        let (features, process) = match descriptor {
            EventDescriptor::Conditional(_) => {
                return Err(SolverError::unsupported(
                    PredicateType::Conditional(predicate).to_string(),
                ))
            }
            EventDescriptor::Simple { features, process } => (features, process),
        };
        // rejected before any step runs, so a serial prefix has no side effects
        if process.contains_kind(CompositeKind::Causal) {
            return Err(SolverError::unsupported(CompositeKind::Causal.as_str()));
        }

        let scoped = FeatureContext::new().with_event(features.clone());
        let outcome = self.actions.route_action(process, predicate, &scoped)?;

        if let Some(result) = outcome.result() {
            self.report(predicate, result.clone());
        }
        Ok(outcome)
    }

    fn report(&self, predicate: Predicate, result: Value) {
        match predicate {
            Predicate::Query => self.actions.ui().respond_to_query(result),
            Predicate::Command => self.actions.ui().return_error_descriptor(result),
            Predicate::Assertion => debug!("assertion produced a result, not reported"),
        }
    }

    pub fn into_discovered(self) -> Vec<Value> {
        self.actions.into_discovered()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{ActionOutput, CapabilityRegistry};
    use crate::history::HistoryLedger;
    use crate::messages::UiNotifier;
    use crate::templates::TemplateCatalog;
    use crate::transport::InMemoryTransport;
    use crate::world::WorldState;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn route(
        registry: &CapabilityRegistry,
        descriptor: Value,
        predicate: Predicate,
    ) -> (SolverResult<ActionOutcome>, Arc<InMemoryTransport>, Vec<Value>) {
        let transport = Arc::new(InMemoryTransport::new());
        let ui = UiNotifier::new(transport.clone(), "FED1_AgentUI", "FED1_ProblemSolver");
        let templates = TemplateCatalog::new();
        let world = WorldState::new();
        let mut history = HistoryLedger::new();
        let descriptor = EventDescriptor::from_value(&descriptor).unwrap();

        let mut router = EventRouter::new(ActionRouter::new(
            registry,
            &ui,
            &templates,
            &world,
            &mut history,
        ));
        let outcome = router.route_event(&descriptor, predicate);
        let discovered = router.into_discovered();
        (outcome, transport, discovered)
    }

    fn answering_registry() -> CapabilityRegistry {
        CapabilityRegistry::with_handlers(|r| {
            r.register(Predicate::Query, "where", |_| {
                Ok(ActionOutput::value(json!("in the kitchen")))
            });
            r.register(Predicate::Command, "move", |_| {
                Ok(ActionOutput::value(json!("cannot reach goal")))
            });
            r.register(Predicate::Assertion, "exist", |_| {
                Ok(ActionOutput {
                    result: Some(json!("noted")),
                    discovered: vec![json!({"id": "box1"})],
                })
            });
        })
    }

    #[test]
    fn test_query_result_becomes_response() {
        let (outcome, transport, _) = route(
            &answering_registry(),
            json!({"e_features": null, "eventProcess": {"actionary": "where", "template": "WH"}}),
            Predicate::Query,
        );
        assert_eq!(outcome.unwrap(), ActionOutcome::Handled(Some(json!("in the kitchen"))));
        assert_eq!(
            transport.messages_to("FED1_AgentUI"),
            vec![json!({"type": "response", "message": "in the kitchen", "tag": "FED1_ProblemSolver"})]
        );
    }

    #[test]
    fn test_command_result_becomes_error_descriptor() {
        let (_, transport, _) = route(
            &answering_registry(),
            json!({"eventProcess": {"actionary": "move", "template": "MotionPath"}}),
            Predicate::Command,
        );
        assert_eq!(
            transport.messages_of_type("error_descriptor"),
            vec![json!({
                "type": "error_descriptor",
                "message": "cannot reach goal",
                "tag": "FED1_ProblemSolver"
            })]
        );
    }

    #[test]
    fn test_assertion_result_is_not_reported_but_discoveries_are_kept() {
        let (outcome, transport, discovered) = route(
            &answering_registry(),
            json!({"eventProcess": {"actionary": "exist", "template": "Existence"}}),
            Predicate::Assertion,
        );
        assert!(outcome.unwrap().is_resolved());
        assert!(transport.sent().is_empty());
        assert_eq!(discovered, vec![json!({"id": "box1"})]);
    }

    #[test]
    fn test_event_features_visible_to_handler() {
        let seen = Arc::new(Mutex::new(None));
        let log = seen.clone();
        let registry = CapabilityRegistry::with_handlers(move |r| {
            r.register(Predicate::Command, "move", move |call| {
                *log.lock().unwrap() = call.features.event().and_then(|e| e.get("tense").cloned());
                Ok(ActionOutput::none())
            });
        });
        let (_, transport, _) = route(
            &registry,
            json!({
                "e_features": {"eventFeatures": {"tense": "present", "negated": false}},
                "eventProcess": {"actionary": "move", "template": "MotionPath"}
            }),
            Predicate::Command,
        );
        assert_eq!(*seen.lock().unwrap(), Some(json!("present")));
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn test_conditional_event_is_unsupported() {
        let (outcome, transport, _) = route(
            &answering_registry(),
            json!({"complexKind": "conditional", "cond": {}, "core": {}}),
            Predicate::Query,
        );
        match outcome {
            Err(SolverError::Unsupported { structure }) => {
                assert_eq!(structure, "conditional_query")
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn test_nested_causal_rejected_before_any_step_runs() {
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();
        let registry = CapabilityRegistry::with_handlers(move |r| {
            r.register(Predicate::Command, "move", move |_| {
                *counter.lock().unwrap() += 1;
                Ok(ActionOutput::none())
            });
        });
        let (outcome, transport, _) = route(
            &registry,
            json!({"eventProcess": {
                "complexKind": "serial",
                "process1": {"actionary": "move", "template": "MotionPath"},
                "process2": {
                    "complexKind": "causal",
                    "process1": {"actionary": "move", "template": "MotionPath"},
                    "process2": {"actionary": "move", "template": "MotionPath"}
                }
            }}),
            Predicate::Command,
        );
        assert!(matches!(outcome, Err(SolverError::Unsupported { ref structure }) if structure == "causal"));
        assert_eq!(*calls.lock().unwrap(), 0);
        assert!(transport.sent().is_empty());
    }
}
