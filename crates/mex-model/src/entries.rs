//! Roster entry shapes.
//!
//! Cross references between entries are internal indices. The project
//! rewrites them whenever a structural mutation shifts the target roster.

use serde::{Deserialize, Serialize};

use crate::ids::RosterKind;
use crate::roster::RosterEntry;

/// A costume that borrows its skin from another fighter's costume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SkinLink {
    pub fighter: usize,
    pub costume: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Costume {
    pub name: String,
    /// Model/visibility file.
    pub file: String,
    /// Character select portrait.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csp: Option<String>,
    /// Stock icon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_skin: Option<SkinLink>,
}

impl Costume {
    pub fn new(name: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
            csp: None,
            icon: None,
            shared_skin: None,
        }
    }

    pub(crate) fn file_refs(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.file.as_str())
            .chain(self.csp.as_deref())
            .chain(self.icon.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fighter {
    pub name: String,
    /// Fighter data file (`PlXx.dat`).
    pub file: String,
    #[serde(default)]
    pub costumes: Vec<Costume>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound_bank: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub victory_theme: Option<usize>,
}

impl Fighter {
    pub fn new(name: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
            costumes: Vec::new(),
            series: None,
            sound_bank: None,
            victory_theme: None,
        }
    }
}

impl RosterEntry for Fighter {
    const KIND: RosterKind = RosterKind::Fighter;

    fn name(&self) -> &str {
        &self.name
    }

    fn file_refs(&self) -> Vec<&str> {
        std::iter::once(self.file.as_str())
            .chain(self.costumes.iter().flat_map(Costume::file_refs))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    /// Stage data file (`GrXx.dat`).
    pub file: String,
    /// Music played on this stage, by music index.
    #[serde(default)]
    pub playlist: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound_bank: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<usize>,
}

impl Stage {
    pub fn new(name: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
            playlist: Vec::new(),
            sound_bank: None,
            series: None,
        }
    }
}

impl RosterEntry for Stage {
    const KIND: RosterKind = RosterKind::Stage;

    fn name(&self) -> &str {
        &self.name
    }

    fn file_refs(&self) -> Vec<&str> {
        vec![self.file.as_str()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MusicTrack {
    pub name: String,
    pub file: String,
}

impl MusicTrack {
    pub fn new(name: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
        }
    }
}

impl RosterEntry for MusicTrack {
    const KIND: RosterKind = RosterKind::Music;

    fn name(&self) -> &str {
        &self.name
    }

    fn file_refs(&self) -> Vec<&str> {
        vec![self.file.as_str()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundGroup {
    pub name: String,
    pub file: String,
}

impl SoundGroup {
    pub fn new(name: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
        }
    }
}

impl RosterEntry for SoundGroup {
    const KIND: RosterKind = RosterKind::SoundGroup;

    fn name(&self) -> &str {
        &self.name
    }

    fn file_refs(&self) -> Vec<&str> {
        vec![self.file.as_str()]
    }
}

/// Franchise grouping. Ordered but not slot-mapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Series {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: None,
        }
    }
}
