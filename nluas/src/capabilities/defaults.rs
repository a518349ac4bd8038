// Built-in capabilities available to every solver process.

use anyhow::bail;
use serde_json::Value;

use super::registry::{ActionCall, ActionOutput, CapabilityRegistry};
use crate::ntuple::Predicate;

/// Registers the default world capabilities:
/// - `query_world`: answers with every discovered item as a JSON array
/// - `assertion_discover`: reports the node's `items` array as discovered
pub fn register_default_capabilities(registry: &mut CapabilityRegistry) {
    registry.register(Predicate::Query, "world", query_world);
    registry.register(Predicate::Assertion, "discover", assertion_discover);
}

fn query_world(call: &ActionCall<'_>) -> anyhow::Result<ActionOutput> {
    Ok(ActionOutput::value(Value::Array(call.world.snapshot())))
}

fn assertion_discover(call: &ActionCall<'_>) -> anyhow::Result<ActionOutput> {
    match call.action.field("items") {
        Some(Value::Array(items)) => Ok(ActionOutput::discovered(items.clone())),
        Some(Value::Null) | None => Ok(ActionOutput::none()),
        Some(other) => bail!("'items' must be an array, found {}", other),
    }
}
