use std::fmt;

use serde::{Deserialize, Serialize};

/// The four slot-mapped roster collections.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RosterKind {
    Fighter,
    Stage,
    Music,
    SoundGroup,
}

impl RosterKind {
    /// Every roster kind, in table order.
    pub const ALL: [RosterKind; 4] = [
        RosterKind::Fighter,
        RosterKind::Stage,
        RosterKind::Music,
        RosterKind::SoundGroup,
    ];

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Fighter => "fighter",
            Self::Stage => "stage",
            Self::Music => "music track",
            Self::SoundGroup => "sound group",
        }
    }

    /// One-byte tag used in the ID table file.
    #[must_use]
    pub const fn tag(&self) -> u8 {
        match self {
            Self::Fighter => 0,
            Self::Stage => 1,
            Self::Music => 2,
            Self::SoundGroup => 3,
        }
    }

    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Fighter),
            1 => Some(Self::Stage),
            2 => Some(Self::Music),
            3 => Some(Self::SoundGroup),
            _ => None,
        }
    }
}

impl fmt::Display for RosterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Fixed-width numeric ID baked into the patched executable's tables.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ExternalId(pub u16);

impl ExternalId {
    #[must_use]
    pub const fn value(self) -> u16 {
        self.0
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

impl From<ExternalId> for usize {
    fn from(id: ExternalId) -> Self {
        usize::from(id.0)
    }
}
