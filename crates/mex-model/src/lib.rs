//! Project model and slot/identity registry for mex workspaces.
//!
//! # Overview
//!
//! A [`Project`] is the typed graph of everything a build changes:
//! fighters, stages, music, sound groups, series, user codes and raw patch
//! blobs. The four slot-mapped collections are [`Roster`]s, whose order is
//! the internal ID space. [`SlotLayout`] turns internal IDs into the
//! fixed-width external IDs the game's tables use.
//!
//! # Architecture
//!
//! - `ids.rs` - Roster kinds and external IDs
//! - `slots.rs` - Slot layouts, ID mapping and the override table
//! - `roster.rs` - Generic roster collection
//! - `entries.rs` - Fighter, costume, stage, music, sound group, series
//! - `code.rs` - User codes, patch blobs, asset kinds
//! - `path.rs` - Disc path normalization
//! - `project.rs` - Project graph and its mutations
//! - `vanilla.rs` - Manifest of the unmodified game
//! - `error.rs` - Shared error taxonomy and warnings

mod code;
mod entries;
mod error;
mod ids;
mod path;
mod project;
mod roster;
mod slots;
pub mod vanilla;

pub use code::{AssetKind, CodeEntry, PatchBlob};
pub use entries::{Costume, Fighter, MusicTrack, Series, SkinLink, SoundGroup, Stage};
pub use error::{ErrorKind, ModelError, Result, Warning, WarningKind};
pub use ids::{ExternalId, RosterKind};
pub use path::normalize_path;
pub use project::{BuildInfo, Project};
pub use roster::{Roster, RosterEntry};
pub use slots::{
    FIGHTER_LAYOUT, IdWidth, MUSIC_LAYOUT, OverrideRule, SLOT_OVERRIDES, SOUND_GROUP_LAYOUT,
    STAGE_LAYOUT, SlotLayout, SlotOverride, overrides_for,
};
