// NLUAS Capability Registry
// Maps (predicate, action) pairs to handlers registered at startup.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use itertools::Itertools;

use crate::error::{SolverError, SolverResult};
use crate::features::FeatureContext;
use crate::ntuple::{Predicate, SimpleAction};
use crate::world::WorldState;

/// Registry key, rendered as `{predicate}_{action}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CapabilityKey {
    pub predicate: Predicate,
    pub action: String,
}

impl CapabilityKey {
    pub fn new(predicate: Predicate, action: impl Into<String>) -> Self {
        Self {
            predicate,
            action: action.into(),
        }
    }
}

impl fmt::Display for CapabilityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.predicate, self.action)
    }
}

/// Everything a handler may read for one invocation.
#[derive(Debug, Clone, Copy)]
pub struct ActionCall<'a> {
    pub predicate: Predicate,
    pub action: &'a SimpleAction,
    pub features: &'a FeatureContext,
    pub world: &'a WorldState,
    /// Catalog entry for `action.template`, if one was loaded.
    pub template: Option<&'a Value>,
}

/// What a handler hands back to the router.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionOutput {
    pub result: Option<Value>,
    /// Items for the solver to merge into the world state.
    pub discovered: Vec<Value>,
}

impl ActionOutput {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn value(result: Value) -> Self {
        Self {
            result: Some(result),
            discovered: Vec::new(),
        }
    }

    pub fn discovered(items: Vec<Value>) -> Self {
        Self {
            result: None,
            discovered: items,
        }
    }
}

pub trait CapabilityHandler: Send + Sync {
    fn handle(&self, call: &ActionCall<'_>) -> anyhow::Result<ActionOutput>;
}

impl<F> CapabilityHandler for F
where
    F: Fn(&ActionCall<'_>) -> anyhow::Result<ActionOutput> + Send + Sync,
{
    fn handle(&self, call: &ActionCall<'_>) -> anyhow::Result<ActionOutput> {
        self(call)
    }
}

pub type ArcCapabilityHandler = Arc<dyn CapabilityHandler>;

/// Result of a registry lookup.
pub enum Lookup {
    Found(ArcCapabilityHandler),
    NotFound(CapabilityKey),
}

impl fmt::Debug for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookup::Found(_) => f.write_str("Found(<handler>)"),
            Lookup::NotFound(key) => write!(f, "NotFound({})", key),
        }
    }
}

/// Registry of capability handlers keyed by `(predicate, action)`.
#[derive(Default, Clone)]
pub struct CapabilityRegistry {
    handlers: HashMap<CapabilityKey, ArcCapabilityHandler>,
}

impl fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("capabilities", &self.capability_names())
            .finish()
    }
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry populated by `builder`.
    pub fn with_handlers<F>(builder: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut registry = Self::new();
        builder(&mut registry);
        registry
    }

    /// Registers a closure handler, replacing any previous one for the same key.
    /// Returns true if a handler was replaced.
    pub fn register<F>(&mut self, predicate: Predicate, action: impl Into<String>, handler: F) -> bool
    where
        F: Fn(&ActionCall<'_>) -> anyhow::Result<ActionOutput> + Send + Sync + 'static,
    {
        self.register_handler(predicate, action, Arc::new(handler))
    }

    /// Registers a shared handler object.
    pub fn register_handler(
        &mut self,
        predicate: Predicate,
        action: impl Into<String>,
        handler: ArcCapabilityHandler,
    ) -> bool {
        let key = CapabilityKey::new(predicate, action);
        tracing::debug!(capability = %key, "registering capability");
        self.handlers.insert(key, handler).is_some()
    }

    /// Returns true if a handler was removed.
    pub fn unregister(&mut self, predicate: Predicate, action: &str) -> bool {
        self.handlers
            .remove(&CapabilityKey::new(predicate, action))
            .is_some()
    }

    pub fn lookup(&self, predicate: Predicate, action: &str) -> Lookup {
        let key = CapabilityKey::new(predicate, action);
        match self.handlers.get(&key) {
            Some(handler) => Lookup::Found(handler.clone()),
            None => Lookup::NotFound(key),
        }
    }

    pub fn contains(&self, predicate: Predicate, action: &str) -> bool {
        self.handlers
            .contains_key(&CapabilityKey::new(predicate, action))
    }

    /// Resolves and invokes the handler for `call.predicate` and `call.action`.
    ///
    /// Fails with `UnknownCapability` when nothing is registered; a handler's
    /// own error is wrapped as `HandlerFailed`.
    pub fn dispatch(&self, call: &ActionCall<'_>) -> SolverResult<ActionOutput> {
        match self.lookup(call.predicate, &call.action.actionary) {
            Lookup::Found(handler) => invoke(&handler, call),
            Lookup::NotFound(key) => Err(SolverError::UnknownCapability {
                predicate: key.predicate,
                action: key.action,
            }),
        }
    }

    /// Registered capability names, sorted.
    pub fn capability_names(&self) -> Vec<String> {
        self.handlers.keys().map(|k| k.to_string()).sorted().collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

pub(crate) fn invoke(
    handler: &ArcCapabilityHandler,
    call: &ActionCall<'_>,
) -> SolverResult<ActionOutput> {
    handler
        .handle(call)
        .map_err(|source| SolverError::HandlerFailed {
            capability: CapabilityKey::new(call.predicate, call.action.actionary.clone())
                .to_string(),
            source,
        })
}
