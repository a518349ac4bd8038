//! Action Router: interprets one process node under a predicate.

use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::capabilities::registry::{invoke, ActionCall, CapabilityKey, CapabilityRegistry, Lookup};
use crate::error::{SolverError, SolverResult};
use crate::features::FeatureContext;
use crate::history::HistoryLedger;
use crate::messages::{unknown_capability_message, UiNotifier};
use crate::ntuple::{ActionNode, CompositeKind, Predicate, SimpleAction};
use crate::templates::TemplateCatalog;
use crate::world::WorldState;

/// Outcome of routing one node.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// A handler ran; `None` means it produced no output.
    Handled(Option<Value>),
    /// No capability was registered for the key; already reported to the UI.
    Unresolved(CapabilityKey),
}

impl ActionOutcome {
    pub fn result(&self) -> Option<&Value> {
        match self {
            ActionOutcome::Handled(result) => result.as_ref(),
            ActionOutcome::Unresolved(_) => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ActionOutcome::Handled(_))
    }
}

/// Borrowed view of the solver state needed to route actions. Discovered
/// items are buffered and handed back to the solver, which owns the merge.
pub struct ActionRouter<'a> {
    registry: &'a CapabilityRegistry,
    ui: &'a UiNotifier,
    templates: &'a TemplateCatalog,
    world: &'a WorldState,
    history: &'a mut HistoryLedger,
    slow_handler_warn: Duration,
    discovered: Vec<Value>,
}

impl<'a> ActionRouter<'a> {
    pub fn new(
        registry: &'a CapabilityRegistry,
        ui: &'a UiNotifier,
        templates: &'a TemplateCatalog,
        world: &'a WorldState,
        history: &'a mut HistoryLedger,
    ) -> Self {
        Self {
            registry,
            ui,
            templates,
            world,
            history,
            slow_handler_warn: Duration::from_millis(500),
            discovered: Vec::new(),
        }
    }

    pub fn with_slow_handler_warning(mut self, threshold: Duration) -> Self {
        self.slow_handler_warn = threshold;
        self
    }

    pub(crate) fn ui(&self) -> &UiNotifier {
        self.ui
    }

    /// Routes `node` under `predicate`.
    ///
    /// Serial nodes run `process1` then `process2` and yield the outcome of
    /// `process2`; an unresolved `process1` does not stop `process2`. Causal
    /// nodes fail with `Unsupported`.
    pub fn route_action(
        &mut self,
        node: &ActionNode,
        predicate: Predicate,
        features: &FeatureContext,
    ) -> SolverResult<ActionOutcome> {
        match node {
            ActionNode::Composite {
                kind: CompositeKind::Serial,
                process1,
                process2,
            } => self.solve_serial(process1, process2, predicate, features),
            ActionNode::Composite {
                kind: CompositeKind::Causal,
                ..
            } => Err(SolverError::unsupported(CompositeKind::Causal.as_str())),
            ActionNode::Simple(action) => self.route_simple(action, predicate, features),
        }
    }

    fn solve_serial(
        &mut self,
        process1: &ActionNode,
        process2: &ActionNode,
        predicate: Predicate,
        features: &FeatureContext,
    ) -> SolverResult<ActionOutcome> {
        let first = self.route_action(process1, predicate, features)?;
        if !first.is_resolved() {
            debug!("serial process1 unresolved, continuing with process2");
        }
        self.route_action(process2, predicate, features)
    }

    fn route_simple(
        &mut self,
        action: &SimpleAction,
        predicate: Predicate,
        features: &FeatureContext,
    ) -> SolverResult<ActionOutcome> {
        let handler = match self.registry.lookup(predicate, &action.actionary) {
            Lookup::Found(handler) => handler,
            Lookup::NotFound(key) => {
                debug!(capability = %key, "no capability registered");
                self.history.record(action.clone(), key.to_string(), false);
                self.ui.identification_failure(unknown_capability_message(
                    predicate.as_str(),
                    &action.actionary,
                ));
                return Ok(ActionOutcome::Unresolved(key));
            }
        };

        let key = CapabilityKey::new(predicate, action.actionary.clone());
        let scoped = features.with_process(action.features.clone());
        let call = ActionCall {
            predicate,
            action,
            features: &scoped,
            world: self.world,
            template: self.templates.get(&action.template),
        };

        let started = Instant::now();
        let outcome = invoke(&handler, &call);
        let elapsed = started.elapsed();
        if elapsed > self.slow_handler_warn {
            warn!(capability = %key, elapsed_ms = elapsed.as_millis() as u64, "slow capability handler");
        }

        match outcome {
            Ok(output) => {
                debug!(capability = %key, "capability succeeded");
                self.history.record(action.clone(), key.to_string(), true);
                self.discovered.extend(output.discovered);
                // only null is "no result"; false, 0 and empty values are reported
                Ok(ActionOutcome::Handled(
                    output.result.filter(|value| !value.is_null()),
                ))
            }
            Err(e) => {
                self.history.record(action.clone(), key.to_string(), false);
                Err(e)
            }
        }
    }

    /// Items discovered by handlers during this routing pass.
    pub fn into_discovered(self) -> Vec<Value> {
        self.discovered
    }
}
