// NLUAS Core Solver Library
// Routes decoded ntuples to registered capabilities and reports results to the UI agent

pub mod capabilities;
pub mod config;
pub mod error;
pub mod features;
pub mod history;
pub mod messages;
pub mod ntuple;
pub mod routing;
pub mod solver;
pub mod templates;
pub mod transport;
pub mod world;

pub use crate::capabilities::{ActionCall, ActionOutput, CapabilityRegistry};
pub use crate::config::SolverConfig;
pub use crate::error::{SolverError, SolverResult};
pub use crate::ntuple::{Predicate, PredicateType};
pub use crate::solver::{CoreSolver, SolveOutcome, SolverState};
