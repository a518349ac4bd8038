//! History ledger of attempted actions.
//!
//! Entries are prepended, so iteration yields the most recent attempt first.
//! The ledger never evicts; callers needing bounded memory cap it themselves
//! (see [`HistoryLedger::truncate`]).

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

use crate::ntuple::SimpleAction;

/// One attempted action and its outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub parameters: SimpleAction,
    pub succeeded: bool,
    /// `{predicate}_{actionary}` as resolved.
    pub capability: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Default, Clone)]
pub struct HistoryLedger {
    entries: VecDeque<HistoryEntry>,
}

impl HistoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(
        &mut self,
        parameters: SimpleAction,
        capability: impl Into<String>,
        succeeded: bool,
    ) {
        self.entries.push_front(HistoryEntry {
            parameters,
            succeeded,
            capability: capability.into(),
            recorded_at: Utc::now(),
        });
    }

    /// Most recent first.
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn failures(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter().filter(|e| !e.succeeded)
    }

    /// Owned copy for readers outside the dispatch thread.
    pub fn snapshot(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Keeps only the `max` most recent entries.
    pub fn truncate(&mut self, max: usize) {
        self.entries.truncate(max);
    }
}
