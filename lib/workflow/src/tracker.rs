//! Dirty/clean tracking for an open flow.
//!
//! Every mutation bumps a revision counter. A save snapshots the revision
//! it serialized, and only returns the tracker to clean if nothing was
//! edited after that snapshot; edits made while a save is in flight keep
//! the flow dirty.

use serde::{Deserialize, Serialize};

/// Whether the graph has unsaved edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditState {
    #[default]
    Clean,
    Dirty,
}

/// Monotonic edit counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Revision(u64);

impl Revision {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct EditTracker {
    revision: Revision,
    saved: Revision,
}

impl EditTracker {
    /// Creates a clean tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an edit.
    pub fn mark_dirty(&mut self) {
        self.revision.0 += 1;
    }

    /// Records that the graph was replaced by a fresh Load.
    pub fn mark_loaded(&mut self) {
        self.revision.0 += 1;
        self.saved = self.revision;
    }

    /// Returns the current revision, for snapshotting before a save.
    #[must_use]
    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// Records a successful save of the graph as of `snapshot`.
    ///
    /// Returns true if the tracker is now clean.
    pub fn mark_saved(&mut self, snapshot: Revision) -> bool {
        if snapshot > self.saved {
            self.saved = snapshot;
        }
        !self.is_dirty()
    }

    #[must_use]
    pub fn state(&self) -> EditState {
        if self.is_dirty() {
            EditState::Dirty
        } else {
            EditState::Clean
        }
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.revision != self.saved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_clean() {
        let tracker = EditTracker::new();
        assert_eq!(tracker.state(), EditState::Clean);
    }

    #[test]
    fn any_edit_dirties_and_load_cleans() {
        let mut tracker = EditTracker::new();
        tracker.mark_dirty();
        assert!(tracker.is_dirty());
        tracker.mark_dirty();
        assert!(tracker.is_dirty());

        tracker.mark_loaded();
        assert_eq!(tracker.state(), EditState::Clean);
    }

    #[test]
    fn save_of_latest_revision_cleans() {
        let mut tracker = EditTracker::new();
        tracker.mark_dirty();
        let snapshot = tracker.revision();
        assert!(tracker.mark_saved(snapshot));
        assert!(!tracker.is_dirty());
    }

    #[test]
    fn edits_during_save_stay_dirty() {
        let mut tracker = EditTracker::new();
        tracker.mark_dirty();
        let snapshot = tracker.revision();
        tracker.mark_dirty();

        assert!(!tracker.mark_saved(snapshot));
        assert_eq!(tracker.state(), EditState::Dirty);

        let later = tracker.revision();
        assert!(tracker.mark_saved(later));
    }

    #[test]
    fn stale_save_does_not_regress() {
        let mut tracker = EditTracker::new();
        tracker.mark_dirty();
        let first = tracker.revision();
        tracker.mark_dirty();
        let second = tracker.revision();

        assert!(tracker.mark_saved(second));
        assert!(tracker.mark_saved(first));
    }

    #[test]
    fn failed_save_leaves_dirty() {
        let mut tracker = EditTracker::new();
        tracker.mark_dirty();
        let _snapshot = tracker.revision();
        // No mark_saved: the save failed.
        assert!(tracker.is_dirty());
    }
}
