// Error handling for the NLUAS core solver

use crate::ntuple::Predicate;
use thiserror::Error;

pub type SolverResult<T> = Result<T, SolverError>;

/// Errors raised while interpreting and dispatching an ntuple.
///
/// Only `UnknownPredicateType` and `UnknownCapability` are routing conditions;
/// everything else reaching the top-level boundary is logged and reported.
#[derive(Debug, Error)]
pub enum SolverError {
    /// No event-router entry point exists for the ntuple's `predicate_type`.
    #[error("unknown predicate type: {0}")]
    UnknownPredicateType(String),

    /// No handler registered for `{predicate}_{action}`.
    #[error("no capability registered for '{predicate}_{action}'")]
    UnknownCapability { predicate: Predicate, action: String },

    /// Required keys absent or of the wrong shape.
    #[error("malformed ntuple: {0}")]
    MalformedNtuple(String),

    /// Composite structure whose semantics are not defined yet (causal, conditional).
    #[error("{structure} structures are not yet supported")]
    Unsupported { structure: String },

    /// A handler body returned an error. Never reinterpreted as a routing failure.
    #[error("capability '{capability}' failed: {source}")]
    HandlerFailed {
        capability: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("solver has been shut down")]
    Stopped,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SolverError {
    pub fn malformed(message: impl Into<String>) -> Self {
        SolverError::MalformedNtuple(message.into())
    }

    pub fn unsupported(structure: impl Into<String>) -> Self {
        SolverError::Unsupported {
            structure: structure.into(),
        }
    }

    /// True for the two lookup failures the routers recover from locally.
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            SolverError::UnknownPredicateType(_) | SolverError::UnknownCapability { .. }
        )
    }
}
