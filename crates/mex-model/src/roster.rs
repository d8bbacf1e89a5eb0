//! Generic ordered roster collection.
//!
//! The position of an entry in a [`Roster`] is its internal ID. All four
//! slot-mapped kinds share this type, so the slot rules are enforced once.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::ids::{ExternalId, RosterKind};
use crate::slots::SlotLayout;

/// An entry that lives in a slot-mapped roster.
pub trait RosterEntry {
    const KIND: RosterKind;

    /// Display name.
    fn name(&self) -> &str;

    /// Image paths this entry references.
    fn file_refs(&self) -> Vec<&str>;
}

/// Ordered collection of one roster kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roster<T> {
    entries: Vec<T>,
}

impl<T> Default for Roster<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: RosterEntry> Roster<T> {
    #[must_use]
    pub fn from_entries(entries: Vec<T>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub const fn layout() -> SlotLayout {
        SlotLayout::for_kind(T::KIND)
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
    pub fn get(&self, index: usize) -> Option<&T> {
        self.entries.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.entries.get_mut(index)
    }

    /// Like [`Roster::get`], but a missing entry is an error.
    pub fn try_get(&self, index: usize) -> Result<&T> {
        self.entries.get(index).ok_or(ModelError::EntryNotFound {
            kind: T::KIND,
            index,
            len: self.entries.len(),
        })
    }

    pub(crate) fn try_get_mut(&mut self, index: usize) -> Result<&mut T> {
        let len = self.entries.len();
        self.entries.get_mut(index).ok_or(ModelError::EntryNotFound {
            kind: T::KIND,
            index,
            len,
        })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.entries.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.entries.iter_mut()
    }

    #[must_use]
    pub fn vanilla_count(&self) -> usize {
        Self::layout().vanilla_count.min(self.entries.len())
    }

    #[must_use]
    pub fn extended_count(&self) -> usize {
        self.entries.len().saturating_sub(Self::layout().vanilla_count)
    }

    /// External ID of the entry at `internal`.
    ///
    /// # Panics
    ///
    /// Panics when `internal` is not a current index.
    #[must_use]
    pub fn external_id(&self, internal: usize) -> ExternalId {
        Self::layout().to_external_id(internal, self.entries.len())
    }

    /// Internal index addressed by `external`.
    ///
    /// # Panics
    ///
    /// Panics when no entry holds `external`.
    #[must_use]
    pub fn internal_id(&self, external: ExternalId) -> usize {
        Self::layout().to_internal_id(external, self.entries.len())
    }

    #[must_use]
    pub fn checked_internal_id(&self, external: ExternalId) -> Option<usize> {
        Self::layout().checked_to_internal_id(external, self.entries.len())
    }

    /// # Panics
    ///
    /// Panics when `internal` is not a current index.
    #[must_use]
    pub fn is_extended(&self, internal: usize) -> bool {
        Self::layout().is_extended_slot(internal, self.entries.len())
    }

    /// `(external id, entry)` pairs in internal order.
    pub fn with_external_ids(&self) -> impl Iterator<Item = (ExternalId, &T)> {
        let size = self.entries.len();
        let layout = Self::layout();
        self.entries
            .iter()
            .enumerate()
            .map(move |(i, entry)| (layout.to_external_id(i, size), entry))
    }

    /// Checks the size against the vanilla count and table capacity.
    pub fn validate_size(&self) -> Result<()> {
        let layout = Self::layout();
        if self.entries.len() < layout.vanilla_count {
            return Err(ModelError::RosterTruncated {
                kind: T::KIND,
                len: self.entries.len(),
                vanilla: layout.vanilla_count,
            });
        }
        if self.entries.len() > layout.capacity {
            return Err(ModelError::RosterFull {
                kind: T::KIND,
                capacity: layout.capacity,
            });
        }
        Ok(())
    }

    /// Appends an extended entry and returns its internal index.
    pub(crate) fn push(&mut self, entry: T) -> Result<usize> {
        let layout = Self::layout();
        if self.entries.len() >= layout.capacity {
            return Err(ModelError::RosterFull {
                kind: T::KIND,
                capacity: layout.capacity,
            });
        }
        self.entries.push(entry);
        Ok(self.entries.len() - 1)
    }

    fn check_extended(&self, index: usize, operation: &'static str) -> Result<()> {
        if index >= self.entries.len() {
            return Err(ModelError::EntryNotFound {
                kind: T::KIND,
                index,
                len: self.entries.len(),
            });
        }
        if index < Self::layout().vanilla_count {
            return Err(ModelError::VanillaImmutable {
                kind: T::KIND,
                index,
                operation,
            });
        }
        Ok(())
    }

    /// Removes an extended entry. Vanilla entries are rejected and the
    /// roster is left unchanged.
    pub(crate) fn remove(&mut self, index: usize) -> Result<T> {
        self.check_extended(index, "removed")?;
        Ok(self.entries.remove(index))
    }

    /// Moves an extended entry to another extended position.
    pub(crate) fn move_entry(&mut self, from: usize, to: usize) -> Result<()> {
        self.check_extended(from, "moved")?;
        self.check_extended(to, "replaced")?;
        let entry = self.entries.remove(from);
        self.entries.insert(to, entry);
        Ok(())
    }
}

impl<'a, T> IntoIterator for &'a Roster<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
