//! Capacity-bounded, newest-first generation history.
//!
//! This module holds the pure collection logic. Persistence lives in the
//! application layer, which writes the whole truncated sequence after every
//! mutation.

use serde::{Deserialize, Serialize};

use crate::request::{GenerationMode, GenerationParams};
use crate::result::GenerationResult;
use crate::types::{EntryId, Timestamp};

/// Maximum number of entries kept; older entries are dropped on insert.
pub const HISTORY_CAPACITY: usize = 50;

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// One successful generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredEntry", into = "StoredEntry")]
pub struct HistoryEntry {
    /// Millisecond creation timestamp, unique within the history.
    pub id: EntryId,
    pub timestamp: Timestamp,
    pub params: GenerationParams,
    pub result: GenerationResult,
}

impl HistoryEntry {
    pub fn mode(&self) -> GenerationMode {
        self.params.mode()
    }

    /// First image of the result, used as a thumbnail.
    pub fn preview_image(&self) -> Option<&str> {
        self.result.images.first().map(String::as_str)
    }
}

/// Persisted layout: `{id, type, timestamp, params, result}`. The `type`
/// decides how `params` is decoded.
#[derive(Serialize, Deserialize)]
struct StoredEntry {
    id: EntryId,
    #[serde(rename = "type")]
    mode: GenerationMode,
    timestamp: Timestamp,
    params: serde_json::Value,
    #[serde(default)]
    result: GenerationResult,
}

impl TryFrom<StoredEntry> for HistoryEntry {
    type Error = serde_json::Error;

    fn try_from(stored: StoredEntry) -> Result<Self, Self::Error> {
        Ok(Self {
            id: stored.id,
            timestamp: stored.timestamp,
            params: GenerationParams::from_value(stored.mode, stored.params)?,
            result: stored.result,
        })
    }
}

impl From<HistoryEntry> for StoredEntry {
    fn from(entry: HistoryEntry) -> Self {
        Self {
            id: entry.id,
            mode: entry.params.mode(),
            timestamp: entry.timestamp,
            params: serde_json::to_value(&entry.params).unwrap_or(serde_json::Value::Null),
            result: entry.result,
        }
    }
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

/// Newest-first list of at most [`HISTORY_CAPACITY`] entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    /// Wrap entries loaded from storage (assumed newest-first), dropping
    /// anything past the capacity.
    pub fn from_entries(mut entries: Vec<HistoryEntry>) -> Self {
        entries.truncate(HISTORY_CAPACITY);
        Self { entries }
    }

    /// Id for an entry created at `now_ms`.
    ///
    /// Normally the timestamp itself; bumped past the newest id when two
    /// entries land in the same millisecond (or the clock went backwards),
    /// so ids stay unique and non-decreasing.
    pub fn next_id(&self, now_ms: i64) -> EntryId {
        match self.entries.first() {
            Some(newest) if newest.id >= now_ms => newest.id + 1,
            _ => now_ms,
        }
    }

    /// Prepend an entry and truncate to capacity.
    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.insert(0, entry);
        self.entries.truncate(HISTORY_CAPACITY);
    }

    /// Create, prepend and return a new entry stamped with `now`.
    pub fn record(
        &mut self,
        params: GenerationParams,
        result: GenerationResult,
        now: Timestamp,
    ) -> HistoryEntry {
        let entry = HistoryEntry {
            id: self.next_id(now.timestamp_millis()),
            timestamp: now,
            params,
            result,
        };
        self.push(entry.clone());
        entry
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn find(&self, id: EntryId) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
