//! Discovered-world state.

use serde_json::Value;

/// Ordered, append-only collection of items discovered while solving.
/// No identity or dedup rules; handlers decide what they report.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct WorldState {
    items: Vec<Value>,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn merge<I>(&mut self, discovered: I) -> usize
    where
        I: IntoIterator<Item = Value>,
    {
        let before = self.items.len();
        self.items.extend(discovered);
        self.items.len() - before
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn snapshot(&self) -> Vec<Value> {
        self.items.clone()
    }
}
