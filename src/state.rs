//! Top-level application state.
//!
//! `AppState` owns the layout store, rank cache, undo stack, clipboard and
//! the deferral slots. Every operation takes it by reference; there is no
//! global state.

use std::time::Duration;

use tracing::{debug, info};

use crate::error::LayoutResult;
use crate::models::{ClassRanks, LayoutKey, RankAvailabilityCache, RankObservation, Snapshot};
use crate::services::clipboard::LayoutClipboard;
use crate::services::derivation;
use crate::services::layout_store::LayoutStore;
use crate::services::live::{ApplyRequest, CaptureRequest};
use crate::services::scheduler::{Debouncer, LockdownGate};
use crate::services::undo::{UndoEntry, UndoStack};

/// Default capture debounce window.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Result of a successful undo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoOutcome {
    /// Description of the undone operation
    pub description: String,
    /// Key that was restored (its level is where the UI should focus)
    pub key: LayoutKey,
    /// True if the key was deleted because it did not exist before
    pub deleted: bool,
}

/// Application state shared by every layout operation.
#[derive(Debug)]
pub struct AppState {
    /// Class of the current character (partitions the rank cache)
    pub class_tag: String,
    /// Stored layouts
    pub store: LayoutStore,
    /// Account-wide rank availability
    pub ranks: RankAvailabilityCache,
    /// Undo history
    pub undo: UndoStack,
    /// Copied layout
    pub clipboard: LayoutClipboard,
    /// Pending capture request
    pub capture_debounce: Debouncer<CaptureRequest>,
    /// Pending apply request held during lockdown
    pub apply_gate: LockdownGate<ApplyRequest>,
}

impl AppState {
    /// Creates empty state for a class.
    pub fn new(class_tag: impl Into<String>) -> Self {
        Self::with_parts(class_tag, LayoutStore::new(), RankAvailabilityCache::new())
    }

    /// Creates state from loaded parts.
    pub fn with_parts(
        class_tag: impl Into<String>,
        store: LayoutStore,
        ranks: RankAvailabilityCache,
    ) -> Self {
        Self {
            class_tag: class_tag.into(),
            store,
            ranks,
            undo: UndoStack::new(),
            clipboard: LayoutClipboard::new(),
            capture_debounce: Debouncer::new(DEFAULT_DEBOUNCE),
            apply_gate: LockdownGate::new(),
        }
    }

    /// Sets the capture debounce window.
    #[must_use]
    pub fn with_debounce(mut self, window: Duration) -> Self {
        self.capture_debounce = Debouncer::new(window);
        self
    }

    /// Ranks known for the current class.
    #[must_use]
    pub fn class_ranks(&self) -> Option<&ClassRanks> {
        self.ranks.class(&self.class_tag)
    }

    /// Feeds one rank observation for the current class.
    ///
    /// Memoized resolutions are dropped when the cache changes.
    pub fn observe(&mut self, observation: RankObservation) -> bool {
        let changed = self.ranks.observe(&self.class_tag, observation);
        if changed {
            self.store.clear_session();
        }
        changed
    }

    /// Returns the effective layout at (spec, level).
    ///
    /// Derived results are memoized in the session overlay until the spec is
    /// written or the rank cache changes.
    pub fn resolve(&mut self, spec: u8, level: u8) -> LayoutResult<Option<Snapshot>> {
        let key = LayoutKey::new(spec, level)?;
        if let Some(memo) = self.store.session_get(key) {
            return Ok(Some(memo.clone()));
        }
        let resolved = derivation::resolve(&self.store, self.class_ranks(), key);
        if let Some(snapshot) = &resolved {
            if snapshot.is_derived {
                self.store.session_put(key, snapshot.clone());
            }
        }
        Ok(resolved)
    }

    /// Resolves without touching the session overlay.
    pub fn resolve_fresh(&self, spec: u8, level: u8) -> LayoutResult<Option<Snapshot>> {
        let key = LayoutKey::new(spec, level)?;
        Ok(derivation::resolve(&self.store, self.class_ranks(), key))
    }

    /// Writes a snapshot after recording the key's prior state for undo.
    ///
    /// Writing the same slots that are already stored is a no-op and records
    /// nothing. Returns true if the store changed.
    pub fn write(
        &mut self,
        key: LayoutKey,
        snapshot: Snapshot,
        description: impl Into<String>,
    ) -> LayoutResult<bool> {
        LayoutKey::new(key.spec, key.level)?;
        let prior = self.store.get(key).cloned();
        if prior
            .as_ref()
            .is_some_and(|existing| existing.same_slots(&snapshot))
        {
            return Ok(false);
        }
        self.undo.push(UndoEntry::new(key, prior, description));
        self.store.put(key, snapshot)?;
        Ok(true)
    }

    /// Deletes the snapshot at a key after recording it for undo.
    ///
    /// Returns true if something was deleted.
    pub fn delete(&mut self, key: LayoutKey, description: impl Into<String>) -> LayoutResult<bool> {
        LayoutKey::new(key.spec, key.level)?;
        let Some(prior) = self.store.get(key).cloned() else {
            return Ok(false);
        };
        self.undo.push(UndoEntry::new(key, Some(prior), description));
        self.store.remove(key)?;
        Ok(true)
    }

    /// Reverts the most recent recorded change.
    pub fn undo(&mut self) -> LayoutResult<Option<UndoOutcome>> {
        let Some(entry) = self.undo.pop() else {
            debug!("Nothing to undo");
            return Ok(None);
        };

        let deleted = match entry.prior {
            Some(snapshot) => {
                self.store.put(entry.key, snapshot)?;
                false
            }
            None => {
                self.store.remove(entry.key)?;
                true
            }
        };

        info!(
            spec = entry.key.spec,
            level = entry.key.level,
            "Undid: {}",
            entry.description
        );
        Ok(Some(UndoOutcome {
            description: entry.description,
            key: entry.key,
            deleted,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SlotAssignment;

    fn key(level: u8) -> LayoutKey {
        LayoutKey::new(1, level).unwrap()
    }

    #[test]
    fn test_write_records_undo_once() {
        let mut state = AppState::new("MAGE");
        let snapshot = Snapshot::from_slots(10, [(1, SlotAssignment::item(1, "Rock"))]).unwrap();

        assert!(state.write(key(10), snapshot.clone(), "capture").unwrap());
        assert_eq!(state.undo.len(), 1);

        // Same content again: nothing recorded
        assert!(!state.write(key(10), snapshot, "capture").unwrap());
        assert_eq!(state.undo.len(), 1);
    }

    #[test]
    fn test_undo_deletes_key_that_did_not_exist() {
        let mut state = AppState::new("MAGE");
        state.write(key(10), Snapshot::new(10), "capture").unwrap();

        let outcome = state.undo().unwrap().unwrap();
        assert!(outcome.deleted);
        assert_eq!(outcome.key.level, 10);
        assert_eq!(outcome.description, "capture");
        assert!(!state.store.contains(key(10)));
        assert!(state.undo().unwrap().is_none());
    }

    #[test]
    fn test_undo_restores_prior_snapshot() {
        let mut state = AppState::new("MAGE");
        let before = Snapshot::from_slots(10, [(1, SlotAssignment::item(1, "Rock"))]).unwrap();
        let after = Snapshot::from_slots(10, [(1, SlotAssignment::item(2, "Gem"))]).unwrap();
        state.write(key(10), before.clone(), "first").unwrap();
        state.write(key(10), after, "second").unwrap();

        state.undo().unwrap();
        assert!(state.store.get(key(10)).unwrap().same_slots(&before));
    }

    #[test]
    fn test_delete_is_undoable() {
        let mut state = AppState::new("MAGE");
        state.write(key(10), Snapshot::new(10), "capture").unwrap();
        assert!(state.delete(key(10), "delete").unwrap());
        assert!(!state.delete(key(10), "delete").unwrap());

        let outcome = state.undo().unwrap().unwrap();
        assert!(!outcome.deleted);
        assert!(state.store.contains(key(10)));
    }

    #[test]
    fn test_resolve_memo_dropped_on_observe() {
        let mut state = AppState::new("MAGE");
        state.observe(RankObservation::new("Fireball", "Rank 1", 10));
        let keyframe =
            Snapshot::from_slots(10, [(5, SlotAssignment::spell("Fireball", "Rank 1"))]).unwrap();
        state.write(key(10), keyframe, "capture").unwrap();
        state.store.set_keyframe(key(10), true).unwrap();

        let at_25 = state.resolve(1, 25).unwrap().unwrap();
        assert_eq!(at_25.get(5).rank(), Some("Rank 1"));
        assert_eq!(state.store.session_len(), 1);

        state.observe(RankObservation::new("Fireball", "Rank 2", 20));
        assert_eq!(state.store.session_len(), 0);
        let at_25 = state.resolve(1, 25).unwrap().unwrap();
        assert_eq!(at_25.get(5).rank(), Some("Rank 2"));
    }

    #[test]
    fn test_resolve_rejects_bad_key() {
        let mut state = AppState::new("MAGE");
        assert!(state.resolve(9, 10).is_err());
        assert!(state.resolve(1, 0).is_err());
    }
}
