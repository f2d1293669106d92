//! Append-only bounded in-memory log store.
//!
//! Entries are immutable once constructed; the only mutations are appends,
//! explicit clears (scoped by instance or global), and whole-instance
//! removal when the reaper evicts a registry entry. Total retention is
//! capped so a long-running session cannot grow without bound — once at the
//! cap the oldest entry is dropped on append.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::LogLevel;

// =============================================================================
// Entries
// =============================================================================

/// Which stream produced an entry: launcher-level messages or game output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSource {
    Launcher,
    Game,
}

/// A single immutable log entry. Entries without an `instance_id` belong to
/// the launcher-global stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub instance_id: Option<String>,
    pub source: LogSource,
}

// =============================================================================
// Store
// =============================================================================

/// Shared append-only store for launcher and game log entries.
#[derive(Debug)]
pub struct LogStore {
    entries: VecDeque<LogEntry>,
    max_entries: usize,
}

impl LogStore {
    /// Create a store retaining at most `max_entries` entries.
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        assert!(max_entries > 0, "max_entries must be > 0");
        Self {
            entries: VecDeque::new(),
            max_entries,
        }
    }

    /// Append an entry, dropping the oldest one when at capacity.
    pub fn append(&mut self, entry: LogEntry) {
        if self.entries.len() == self.max_entries {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// All entries for an instance from the given source, oldest first.
    #[must_use]
    pub fn for_instance(&self, instance_id: &str, source: LogSource) -> Vec<LogEntry> {
        self.entries
            .iter()
            .filter(|e| e.source == source && e.instance_id.as_deref() == Some(instance_id))
            .cloned()
            .collect()
    }

    /// All launcher-global entries (no instance id), oldest first.
    #[must_use]
    pub fn global(&self) -> Vec<LogEntry> {
        self.entries
            .iter()
            .filter(|e| e.instance_id.is_none())
            .cloned()
            .collect()
    }

    /// Every entry attributed to an instance, both streams, oldest first.
    #[must_use]
    pub fn all_for_instance(&self, instance_id: &str) -> Vec<LogEntry> {
        self.entries
            .iter()
            .filter(|e| e.instance_id.as_deref() == Some(instance_id))
            .cloned()
            .collect()
    }

    /// A snapshot of every retained entry, oldest first.
    #[must_use]
    pub fn all(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Clear entries: scoped to one instance, or the whole store.
    pub fn clear(&mut self, instance_id: Option<&str>) {
        match instance_id {
            Some(id) => self.entries.retain(|e| e.instance_id.as_deref() != Some(id)),
            None => self.entries.clear(),
        }
    }

    /// Remove every entry for an instance (reaper registry eviction).
    pub fn remove_instance(&mut self, instance_id: &str) {
        self.entries
            .retain(|e| e.instance_id.as_deref() != Some(instance_id));
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
