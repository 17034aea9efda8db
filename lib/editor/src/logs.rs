//! Execution log entries and the bounded, deduplicating log buffer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use wireflow_core::{LogEntryId, NodeId};

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => f.write_str("info"),
            Self::Warn => f.write_str("warn"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// One line of execution telemetry from the Debug Log Service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionLogEntry {
    /// Deduplication key. Entries delivered without one get a fresh id.
    #[serde(default)]
    pub id: LogEntryId,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
}

impl ExecutionLogEntry {
    /// Creates an info entry with a fresh id.
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            id: LogEntryId::new(),
            timestamp,
            level: LogLevel::Info,
            message: message.into(),
            node_id: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<LogEntryId>) -> Self {
        self.id = id.into();
        self
    }

    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn for_node(mut self, node_id: NodeId) -> Self {
        self.node_id = Some(node_id);
        self
    }
}

/// Log entries shown in the editor, newest first.
///
/// Holds at most `capacity` entries; merging beyond that evicts the
/// oldest. Entries are unique by id.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    entries: Vec<ExecutionLogEntry>,
    capacity: usize,
}

impl LogBuffer {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Merges a batch, skipping entries whose id is already buffered.
    ///
    /// Returns the number of new entries still buffered afterwards; a new
    /// entry evicted by the capacity limit in the same merge is not counted.
    pub fn merge<I>(&mut self, batch: I) -> usize
    where
        I: IntoIterator<Item = ExecutionLogEntry>,
    {
        let mut seen: HashSet<LogEntryId> = self.entries.iter().map(|e| e.id.clone()).collect();
        let mut fresh = HashSet::new();
        for entry in batch {
            if seen.insert(entry.id.clone()) {
                fresh.insert(entry.id.clone());
                self.entries.push(entry);
            }
        }
        if fresh.is_empty() {
            return 0;
        }

        // Stable: entries with equal timestamps keep arrival order.
        self.entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        self.entries.truncate(self.capacity);
        self.entries.iter().filter(|e| fresh.contains(&e.id)).count()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns the buffered entries, newest first.
    #[must_use]
    pub fn entries(&self) -> &[ExecutionLogEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
