//! User codes and raw patch blobs.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A user-authored Gecko code kept in the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeEntry {
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    /// Code lines in Gecko text form.
    pub source: String,
}

fn enabled_default() -> bool {
    true
}

impl CodeEntry {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            author: String::new(),
            description: String::new(),
            enabled: true,
            source: source.into(),
        }
    }
}

/// Raw binary patch (a GCT blob), stored hex-encoded in the descriptor.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct PatchBlob(pub Vec<u8>);

impl PatchBlob {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PatchBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PatchBlob({} bytes)", self.0.len())
    }
}

impl Serialize for PatchBlob {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for PatchBlob {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        hex::decode(text.trim())
            .map(PatchBlob)
            .map_err(serde::de::Error::custom)
    }
}

/// Codec family of an overlay file that still needs encoding before export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Portrait,
    Icon,
    Banner,
    Audio,
    Model,
    Video,
}

impl AssetKind {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Portrait => "portrait",
            Self::Icon => "icon",
            Self::Banner => "banner",
            Self::Audio => "audio",
            Self::Model => "model",
            Self::Video => "video",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
