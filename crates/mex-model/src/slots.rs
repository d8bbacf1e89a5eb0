//! Slot/identity registry.
//!
//! A roster entry's *internal ID* is its position in the project collection.
//! Its *external ID* is the value the patched executable's fixed-width
//! tables address it by. The mapping between the two is recomputed from the
//! current roster size on every call and never cached: inserting or removing
//! an extended entry shifts every extended entry above it.
//!
//! Vanilla entries keep `external == internal`, so the low ID range that
//! existing patches hardcode stays valid at any roster size. Extended entries
//! take the free external IDs above the vanilla range in internal order. A
//! per-kind `reserved` list names IDs inside that range the executable uses
//! for something else; those are skipped.
//!
//! Couplings between specific vanilla entries are listed in
//! [`SLOT_OVERRIDES`] and are never consulted by the mapping itself.

use crate::ids::{ExternalId, RosterKind};
use crate::vanilla;

/// Width of one ID in the executable's tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdWidth {
    Byte,
    Half,
}

impl IdWidth {
    /// Largest ID value the width can hold.
    #[must_use]
    pub const fn max_value(self) -> u16 {
        match self {
            Self::Byte => 0xFF,
            Self::Half => 0xFFFF,
        }
    }
}

/// Slot layout of one roster kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotLayout {
    pub kind: RosterKind,
    /// Number of entries the unmodified game ships.
    pub vanilla_count: usize,
    /// External IDs above the vanilla range that are never handed out.
    /// Sorted ascending.
    pub reserved: &'static [u16],
    /// Largest roster size the fixed-width table can hold.
    pub capacity: usize,
    pub width: IdWidth,
}

pub const FIGHTER_LAYOUT: SlotLayout = SlotLayout {
    kind: RosterKind::Fighter,
    vanilla_count: vanilla::FIGHTERS.len(),
    reserved: &[],
    // 0xFF is the executable's "no fighter" marker.
    capacity: 0xFF,
    width: IdWidth::Byte,
};

pub const STAGE_LAYOUT: SlotLayout = SlotLayout {
    kind: RosterKind::Stage,
    vanilla_count: vanilla::STAGES.len(),
    reserved: &[],
    capacity: 0x400,
    width: IdWidth::Half,
};

pub const MUSIC_LAYOUT: SlotLayout = SlotLayout {
    kind: RosterKind::Music,
    vanilla_count: vanilla::MUSIC.len(),
    reserved: &[],
    capacity: 0x400,
    width: IdWidth::Half,
};

pub const SOUND_GROUP_LAYOUT: SlotLayout = SlotLayout {
    kind: RosterKind::SoundGroup,
    vanilla_count: vanilla::SOUND_GROUPS.len(),
    reserved: &[],
    capacity: 0xFF,
    width: IdWidth::Byte,
};

impl SlotLayout {
    /// Layout for a roster kind.
    #[must_use]
    pub const fn for_kind(kind: RosterKind) -> Self {
        match kind {
            RosterKind::Fighter => FIGHTER_LAYOUT,
            RosterKind::Stage => STAGE_LAYOUT,
            RosterKind::Music => MUSIC_LAYOUT,
            RosterKind::SoundGroup => SOUND_GROUP_LAYOUT,
        }
    }

    fn size_is_valid(&self, roster_size: usize) -> bool {
        roster_size >= self.vanilla_count && roster_size <= self.capacity
    }

    /// External ID of `internal`, or `None` when the index or size is impossible.
    #[must_use]
    pub fn checked_to_external_id(&self, internal: usize, roster_size: usize) -> Option<ExternalId> {
        if !self.size_is_valid(roster_size) || internal >= roster_size {
            return None;
        }
        if internal < self.vanilla_count {
            return u16::try_from(internal).ok().map(ExternalId);
        }

        let mut candidate = internal;
        for &reserved in self.reserved {
            if usize::from(reserved) <= candidate {
                candidate += 1;
            } else {
                break;
            }
        }

        u16::try_from(candidate)
            .ok()
            .filter(|&value| value <= self.width.max_value())
            .map(ExternalId)
    }

    /// Internal ID addressed by `external`, or `None` when no entry holds it.
    #[must_use]
    pub fn checked_to_internal_id(&self, external: ExternalId, roster_size: usize) -> Option<usize> {
        if !self.size_is_valid(roster_size) {
            return None;
        }
        let value = usize::from(external);
        if value < self.vanilla_count {
            return (value < roster_size).then_some(value);
        }
        if self.reserved.binary_search(&external.0).is_ok() {
            return None;
        }

        let skipped = self.reserved.partition_point(|&r| r < external.0);
        let internal = value - skipped;
        (internal < roster_size).then_some(internal)
    }

    /// External ID of `internal` at the given roster size.
    ///
    /// # Panics
    ///
    /// Panics when `internal >= roster_size` or the size is outside the
    /// layout's bounds. Either means the caller is holding a stale index.
    #[must_use]
    pub fn to_external_id(&self, internal: usize, roster_size: usize) -> ExternalId {
        match self.checked_to_external_id(internal, roster_size) {
            Some(id) => id,
            None => panic!(
                "{} internal id {internal} is out of range for roster size {roster_size}",
                self.kind
            ),
        }
    }

    /// Internal ID addressed by `external` at the given roster size.
    ///
    /// # Panics
    ///
    /// Panics when no entry holds `external` at this roster size.
    #[must_use]
    pub fn to_internal_id(&self, external: ExternalId, roster_size: usize) -> usize {
        match self.checked_to_internal_id(external, roster_size) {
            Some(id) => id,
            None => panic!(
                "{} external id {external} is out of range for roster size {roster_size}",
                self.kind
            ),
        }
    }

    /// Whether `internal` sits beyond the vanilla roster.
    ///
    /// # Panics
    ///
    /// Panics when `internal >= roster_size`.
    #[must_use]
    pub fn is_extended_slot(&self, internal: usize, roster_size: usize) -> bool {
        assert!(
            internal < roster_size,
            "{} internal id {internal} is out of range for roster size {roster_size}",
            self.kind
        );
        internal >= self.vanilla_count
    }
}

/// A coupling between vanilla entries the generic mapping does not model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideRule {
    /// The entry spawns a second fighter that has no slot of its own.
    Follower { follower_file: &'static str },
    /// The entry can transform into `partner` mid-match, so both must load together.
    TransformPartner { partner: u16 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotOverride {
    pub kind: RosterKind,
    /// Vanilla external ID the rule is attached to.
    pub external: u16,
    pub rule: OverrideRule,
    pub note: &'static str,
}

/// Known couplings between specific vanilla slots.
///
/// Keyed by vanilla external ID, which never moves.
pub const SLOT_OVERRIDES: &[SlotOverride] = &[
    SlotOverride {
        kind: RosterKind::Fighter,
        external: 0x0E,
        rule: OverrideRule::Follower {
            follower_file: "PlNn.dat",
        },
        note: "Ice Climbers load Nana next to Popo",
    },
    SlotOverride {
        kind: RosterKind::Fighter,
        external: 0x12,
        rule: OverrideRule::TransformPartner { partner: 0x13 },
        note: "Zelda transforms into Sheik",
    },
    SlotOverride {
        kind: RosterKind::Fighter,
        external: 0x13,
        rule: OverrideRule::TransformPartner { partner: 0x12 },
        note: "Sheik transforms into Zelda",
    },
];

/// Overrides attached to one external ID.
pub fn overrides_for(
    kind: RosterKind,
    external: ExternalId,
) -> impl Iterator<Item = &'static SlotOverride> {
    SLOT_OVERRIDES
        .iter()
        .filter(move |o| o.kind == kind && o.external == external.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOLEY: SlotLayout = SlotLayout {
        kind: RosterKind::Stage,
        vanilla_count: 4,
        reserved: &[5, 6, 9],
        capacity: 16,
        width: IdWidth::Half,
    };

    #[test]
    fn identity_at_vanilla_size() {
        let layout = FIGHTER_LAYOUT;
        let size = layout.vanilla_count;
        for internal in 0..size {
            assert_eq!(usize::from(layout.to_external_id(internal, size)), internal);
            assert!(!layout.is_extended_slot(internal, size));
        }
    }

    #[test]
    fn first_extended_fighter_takes_vanilla_count() {
        let layout = FIGHTER_LAYOUT;
        let size = layout.vanilla_count + 1;
        let id = layout.to_external_id(layout.vanilla_count, size);
        assert_eq!(usize::from(id), layout.vanilla_count);
        assert!(layout.is_extended_slot(layout.vanilla_count, size));
    }

    #[test]
    fn reserved_ids_are_skipped() {
        let size = 9;
        let ids: Vec<u16> = (0..size)
            .map(|i| HOLEY.to_external_id(i, size).value())
            .collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4, 7, 8, 10, 11]);
        assert_eq!(HOLEY.checked_to_internal_id(ExternalId(5), size), None);
        assert_eq!(HOLEY.checked_to_internal_id(ExternalId(10), size), Some(7));
    }

    #[test]
    fn checked_rejects_out_of_range() {
        assert_eq!(HOLEY.checked_to_external_id(5, 5), None);
        assert_eq!(HOLEY.checked_to_external_id(0, 3), None);
        assert_eq!(HOLEY.checked_to_internal_id(ExternalId(12), 9), None);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn stale_index_panics() {
        let _ = FIGHTER_LAYOUT.to_external_id(40, 33);
    }

    #[test]
    fn capacity_fits_table_width() {
        for kind in RosterKind::ALL {
            let layout = SlotLayout::for_kind(kind);
            let last = layout.to_external_id(layout.capacity - 1, layout.capacity);
            assert!(last.value() <= layout.width.max_value());
        }
    }

    #[test]
    fn overrides_are_vanilla_fighters() {
        for o in SLOT_OVERRIDES {
            assert!(usize::from(o.external) < SlotLayout::for_kind(o.kind).vanilla_count);
        }
        assert_eq!(
            overrides_for(RosterKind::Fighter, ExternalId(0x12)).count(),
            1
        );
        assert_eq!(overrides_for(RosterKind::Stage, ExternalId(0x12)).count(), 0);
    }
}
