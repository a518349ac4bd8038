//! Core problem solver.
//!
//! `CoreSolver` takes one ntuple at a time through
//! `Idle -> Clarifying -> Dispatching -> Idle`:
//!
//! 1. a quit message stops the solver;
//! 2. the clarification gate may send the ntuple back to the UI;
//! 3. the predicate type selects the event-router entry point;
//! 4. after routing, discovered items are merged into the world state and
//!    the broadcast hook runs.
//!
//! `solve` takes `&mut self`, so each ntuple is handled to completion before
//! the next one is accepted. Feature context lives only inside one call.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::capabilities::CapabilityRegistry;
use crate::config::{ClarificationMode, SolverConfig};
use crate::error::{SolverError, SolverResult};
use crate::history::HistoryLedger;
use crate::messages::{unknown_predicate_message, UiNotifier, INCAPABLE_MESSAGE};
use crate::ntuple::clarify::{ClarificationGate, MarkedSlotGate, NeverClarify};
use crate::ntuple::{is_quit, Ntuple, PredicateType};
use crate::routing::{ActionOutcome, ActionRouter, EventRouter};
use crate::templates::TemplateCatalog;
use crate::transport::Transport;
use crate::world::WorldState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverState {
    Idle,
    Clarifying,
    Dispatching,
    Stopped,
}

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveOutcome {
    Dispatched(ActionOutcome),
    ClarificationRequested,
    Quit,
}

/// Summary handed to the broadcast hook after a successful dispatch.
#[derive(Debug, Clone, Copy)]
pub struct DispatchReport<'a> {
    pub dispatch_id: &'a Uuid,
    pub predicate_type: PredicateType,
    pub outcome: &'a ActionOutcome,
    pub discovered: &'a [Value],
}

/// Propagates dispatch results to other agents.
pub trait BroadcastHook: Send + Sync {
    fn broadcast(&self, report: &DispatchReport<'_>);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoBroadcast;

impl BroadcastHook for NoBroadcast {
    fn broadcast(&self, _report: &DispatchReport<'_>) {}
}

pub struct CoreSolver {
    config: SolverConfig,
    registry: CapabilityRegistry,
    ui: UiNotifier,
    gate: Box<dyn ClarificationGate>,
    broadcast: Box<dyn BroadcastHook>,
    templates: TemplateCatalog,
    history: HistoryLedger,
    world: WorldState,
    state: SolverState,
}

impl std::fmt::Debug for CoreSolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreSolver")
            .field("address", &self.config.address())
            .field("registry", &self.registry)
            .field("history_len", &self.history.len())
            .field("world_len", &self.world.len())
            .field("state", &self.state)
            .finish()
    }
}

impl CoreSolver {
    pub fn new(
        config: SolverConfig,
        registry: CapabilityRegistry,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let ui = UiNotifier::new(transport, config.ui_address(), config.address());
        let gate: Box<dyn ClarificationGate> = match config.clarification {
            ClarificationMode::Never => Box::new(NeverClarify),
            ClarificationMode::MarkedSlots => Box::new(MarkedSlotGate::new()),
        };
        Self {
            config,
            registry,
            ui,
            gate,
            broadcast: Box::new(NoBroadcast),
            templates: TemplateCatalog::new(),
            history: HistoryLedger::new(),
            world: WorldState::new(),
            state: SolverState::Idle,
        }
    }

    /// Validates the configuration and loads the template catalog it names.
    pub fn from_config(
        config: SolverConfig,
        registry: CapabilityRegistry,
        transport: Arc<dyn Transport>,
    ) -> SolverResult<Self> {
        config.validate_config()?;
        let templates = match &config.templates_path {
            Some(path) => TemplateCatalog::load(path)?,
            None => TemplateCatalog::new(),
        };
        info!(
            address = %config.address(),
            complexity = config.complexity,
            capabilities = registry.len(),
            "core problem solver ready"
        );
        Ok(Self::new(config, registry, transport).with_templates(templates))
    }

    pub fn with_clarification_gate(mut self, gate: impl ClarificationGate + 'static) -> Self {
        self.gate = Box::new(gate);
        self
    }

    pub fn with_broadcast_hook(mut self, hook: impl BroadcastHook + 'static) -> Self {
        self.broadcast = Box::new(hook);
        self
    }

    pub fn with_templates(mut self, templates: TemplateCatalog) -> Self {
        self.templates = templates;
        self
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn history(&self) -> &HistoryLedger {
        &self.history
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    pub fn state(&self) -> SolverState {
        self.state
    }

    pub fn is_stopped(&self) -> bool {
        self.state == SolverState::Stopped
    }

    /// Appends discovered items to the world state.
    pub fn update_world<I>(&mut self, discovered: I)
    where
        I: IntoIterator<Item = Value>,
    {
        let added = self.world.merge(discovered);
        if added > 0 {
            debug!(added, total = self.world.len(), "world updated");
        }
    }

    /// Top-level message boundary. Logs and reports any failure so the loop
    /// can move on to the next ntuple. Returns false once the solver stopped.
    pub fn handle_message(&mut self, message: Value) -> bool {
        match self.solve(message) {
            Ok(SolveOutcome::Quit) => false,
            Ok(_) => true,
            Err(SolverError::Stopped) => {
                warn!("message received after shutdown, ignoring");
                false
            }
            Err(e) => {
                match &e {
                    // already reported by the routers
                    SolverError::UnknownPredicateType(_) => debug!(error = %e, "ntuple dropped"),
                    SolverError::Unsupported { .. } => {
                        warn!(error = %e, "unsupported ntuple structure");
                        self.ui.identification_failure(INCAPABLE_MESSAGE);
                    }
                    SolverError::MalformedNtuple(_) => {
                        warn!(error = %e, "malformed ntuple");
                        self.ui.identification_failure(e.to_string());
                    }
                    _ => error!(error = %e, "failed to solve ntuple"),
                }
                self.state = SolverState::Idle;
                true
            }
        }
    }

    /// Solves one inbound ntuple.
    pub fn solve(&mut self, message: Value) -> SolverResult<SolveOutcome> {
        if self.is_stopped() {
            return Err(SolverError::Stopped);
        }
        if is_quit(&message) {
            info!("quit received, shutting down");
            self.state = SolverState::Stopped;
            return Ok(SolveOutcome::Quit);
        }

        self.state = SolverState::Clarifying;
        if let Some(request) = self.gate.check(&message) {
            debug!("ntuple needs clarification");
            self.ui.request_clarification(&message, request);
            self.state = SolverState::Idle;
            return Ok(SolveOutcome::ClarificationRequested);
        }

        self.state = SolverState::Dispatching;
        let result = self.dispatch(message);
        self.state = SolverState::Idle;
        result.map(SolveOutcome::Dispatched)
    }

    fn dispatch(&mut self, message: Value) -> SolverResult<ActionOutcome> {
        let ntuple = Ntuple::from_value(message)?;
        let dispatch_id = Uuid::new_v4();
        let span = info_span!(
            "dispatch",
            id = %dispatch_id,
            predicate_type = %ntuple.predicate_type()
        );
        let _guard = span.enter();

        let predicate_type = match ntuple.classify() {
            Ok(predicate_type) => predicate_type,
            Err(e) => {
                self.ui
                    .identification_failure(unknown_predicate_message(ntuple.predicate_type()));
                return Err(e);
            }
        };
        let predicate = match predicate_type {
            PredicateType::Plain(predicate) => predicate,
            PredicateType::Conditional(_) => {
                return Err(SolverError::unsupported(predicate_type.to_string()))
            }
        };

        let descriptor = ntuple.event_descriptor()?;
        let actions = ActionRouter::new(
            &self.registry,
            &self.ui,
            &self.templates,
            &self.world,
            &mut self.history,
        )
        .with_slow_handler_warning(Duration::from_millis(self.config.slow_handler_warn_ms));
        let mut router = EventRouter::new(actions);
        let routed = router.route_event(&descriptor, predicate);
        let discovered = router.into_discovered();

        // discoveries from handlers that completed still count when a later one failed
        self.update_world(discovered.iter().cloned());
        let outcome = routed?;

        self.broadcast.broadcast(&DispatchReport {
            dispatch_id: &dispatch_id,
            predicate_type,
            outcome: &outcome,
            discovered: &discovered,
        });

        if self.config.verbose {
            match serde_json::to_string_pretty(ntuple.raw()) {
                Ok(pretty) => info!("solved ntuple:\n{}", pretty),
                Err(e) => warn!(error = %e, "failed to render ntuple"),
            }
        }
        Ok(outcome)
    }
}
