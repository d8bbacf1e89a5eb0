//! Unsaved-change tracking.

use std::time::Instant;

/// What kind of edit made a workspace dirty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Change {
    /// A roster, code or patch edit in the project model.
    Project,
    /// A file written to or hidden in the overlay.
    Files,
    /// The workspace was rebound to another source image.
    Source,
    /// Assets baked by an export were stored back.
    Baked,
}

/// Tracks unsaved changes in a workspace, by kind.
#[derive(Debug, Clone, Default)]
pub struct DirtyTracker {
    pending: Vec<Change>,
    edits: u64,
    since: Option<Instant>,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Records one change of `kind`.
    pub fn record(&mut self, kind: Change) {
        self.edits += 1;
        self.since.get_or_insert_with(Instant::now);
        if let Err(slot) = self.pending.binary_search(&kind) {
            self.pending.insert(slot, kind);
        }
    }

    /// Change kinds recorded since the last save, in a stable order.
    pub fn pending(&self) -> &[Change] {
        &self.pending
    }

    /// Number of edits recorded since the last save.
    pub fn edits(&self) -> u64 {
        self.edits
    }

    /// Milliseconds since the first unsaved change.
    pub fn ms_since_first_unsaved(&self) -> Option<u64> {
        self.since
            .map(|t| u64::try_from(t.elapsed().as_millis()).unwrap_or(u64::MAX))
    }

    /// Mark that a save has completed successfully.
    pub fn save_complete(&mut self) {
        self.pending.clear();
        self.edits = 0;
        self.since = None;
    }
}
