//! Descriptor file type.

use chrono::{DateTime, Utc};
use mex_model::Project;
use serde::{Deserialize, Serialize};

/// Current schema version.
///
/// Increment this when making breaking changes to the descriptor format.
/// The loader will reject files with version > CURRENT_SCHEMA_VERSION.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Value of the descriptor's `format` field.
pub const FORMAT_TAG: &str = "mex-workspace";

/// Where the workspace's source image lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Path of the vanilla image, as given at creation.
    pub path: String,
    /// SHA-256 of the image file, when it is a single file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// Root descriptor structure.
///
/// This is the top-level type that gets serialized to the descriptor file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFile {
    /// Always [`FORMAT_TAG`].
    pub format: String,

    /// Schema version (for future migrations).
    pub schema_version: u32,

    /// When the workspace was created.
    pub created_at: String,

    /// When the descriptor was last saved.
    pub last_saved_at: String,

    pub source: SourceRef,

    pub project: Project,
}

impl ProjectFile {
    /// Create a new descriptor for a project bound to a source image.
    pub fn new(source: SourceRef, project: Project) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            format: FORMAT_TAG.to_string(),
            schema_version: CURRENT_SCHEMA_VERSION,
            created_at: now.clone(),
            last_saved_at: now,
            source,
            project,
        }
    }

    /// Update the last saved timestamp.
    pub fn touch(&mut self) {
        self.last_saved_at = Utc::now().to_rfc3339();
    }

    /// Parse the created_at timestamp.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.created_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Parse the last_saved_at timestamp.
    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.last_saved_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}
