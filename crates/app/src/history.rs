//! Persisted generation history.

use std::sync::{Arc, Mutex};

use aimg_core::history::{History, HistoryEntry};
use aimg_core::request::GenerationParams;
use aimg_core::result::GenerationResult;
use aimg_core::types::{EntryId, Timestamp};
use aimg_store::{keys, load_json, save_json, LocalStore};

/// The bounded history plus its `generationHistory` persistence.
///
/// The whole truncated sequence is written after every mutation.
pub struct HistoryStore {
    store: Arc<dyn LocalStore>,
    history: Mutex<History>,
}

impl HistoryStore {
    /// Load the persisted history. Unreadable data resets to empty.
    pub fn load(store: Arc<dyn LocalStore>) -> Self {
        let history = match load_json::<Vec<HistoryEntry>>(store.as_ref(), keys::GENERATION_HISTORY) {
            Ok(Some(entries)) => History::from_entries(entries),
            Ok(None) => History::default(),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable generation history");
                History::default()
            }
        };
        tracing::debug!(entries = history.len(), "Loaded generation history");
        Self {
            store,
            history: Mutex::new(history),
        }
    }

    fn with_history<R>(&self, f: impl FnOnce(&mut History) -> R) -> R {
        let mut guard = self.history.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    /// Record a successful generation and persist the history.
    ///
    /// A failed write is logged; the in-memory entry is kept.
    pub fn append(
        &self,
        params: GenerationParams,
        result: GenerationResult,
        now: Timestamp,
    ) -> HistoryEntry {
        let (entry, snapshot) = self.with_history(|h| {
            let entry = h.record(params, result, now);
            (entry, h.entries().to_vec())
        });
        if let Err(e) = save_json(self.store.as_ref(), keys::GENERATION_HISTORY, &snapshot) {
            tracing::warn!(error = %e, "Could not persist generation history");
        }
        tracing::debug!(id = entry.id, mode = %entry.mode(), "Recorded history entry");
        entry
    }

    /// Entries, newest first.
    pub fn list(&self) -> Vec<HistoryEntry> {
        self.with_history(|h| h.entries().to_vec())
    }

    pub fn find_by_id(&self, id: EntryId) -> Option<HistoryEntry> {
        self.with_history(|h| h.find(id).cloned())
    }

    pub fn len(&self) -> usize {
        self.with_history(|h| h.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
