//! Event and action routing.
//!
//! The Event Router scopes event-level features and hands the event's
//! process to the Action Router, which applies composite rules and
//! dispatches simple actions through the capability registry.

pub mod action_router;
pub mod event_router;

pub use action_router::{ActionOutcome, ActionRouter};
pub use event_router::EventRouter;
