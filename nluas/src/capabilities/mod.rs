//! Capability registry and dispatcher.
//!
//! Handlers are registered at startup under `(predicate, action)` keys and
//! resolved with a typed [`Lookup`]; no name reflection is involved.

pub mod defaults;
pub mod registry;

pub use registry::{
    ActionCall, ActionOutput, ArcCapabilityHandler, CapabilityHandler, CapabilityKey,
    CapabilityRegistry, Lookup,
};
