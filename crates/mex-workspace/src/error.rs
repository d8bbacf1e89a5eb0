//! Workspace error types.

use std::path::PathBuf;

use mex_build::BuildError;
use mex_model::{ErrorKind, ModelError};
use mex_persistence::PersistenceError;
use mex_vfs::VfsError;
use thiserror::Error;

/// Error raised by a workspace operation.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// The descriptor loaded, but the source image it names is gone.
    #[error("Source image not found: {path}")]
    SourceImageMissing { descriptor: PathBuf, path: PathBuf },

    /// `mex.toml` exists but cannot be parsed.
    #[error("Invalid settings file: {path}")]
    InvalidSettings {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Settings could not be serialized.
    #[error("Failed to serialize settings")]
    SettingsSerialization {
        #[source]
        source: toml::ser::Error,
    },

    /// File I/O error.
    #[error("Failed to {operation} file: {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Vfs(#[from] VfsError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl WorkspaceError {
    /// Whether reopening with another source image could succeed.
    #[must_use]
    pub fn is_source_image_missing(&self) -> bool {
        matches!(self, Self::SourceImageMissing { .. })
    }

    /// Taxonomy category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SourceImageMissing { .. } => ErrorKind::NotFound,
            Self::InvalidSettings { .. } => ErrorKind::Corrupt,
            Self::SettingsSerialization { .. } | Self::Io { .. } => ErrorKind::Io,
            Self::Persistence(e) => e.kind(),
            Self::Vfs(e) => e.kind(),
            Self::Build(e) => e.kind(),
            Self::Model(e) => e.kind(),
        }
    }

    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::SourceImageMissing { path, .. } => format!(
                "The source image '{}' could not be found. It may have been moved or deleted.",
                path.display()
            ),
            Self::InvalidSettings { path, source } => {
                format!("The settings file {} is invalid: {}", path.display(), source.message())
            }
            Self::SettingsSerialization { .. } => {
                "An error occurred while writing the workspace settings.".to_string()
            }
            Self::Io {
                operation, path, ..
            } => format!("Could not {} the file at {}", operation, path.display()),
            Self::Persistence(e) => e.user_message(),
            Self::Vfs(e) => e.user_message(),
            Self::Build(e) => e.user_message(),
            Self::Model(e) => e.to_string(),
        }
    }

    /// Get a suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::SourceImageMissing { .. } => {
                Some("Locate the source image and open the workspace with it.".into())
            }
            Self::InvalidSettings { .. } => {
                Some("Fix or delete mex.toml to use the default settings.".into())
            }
            Self::SettingsSerialization { .. } | Self::Model(_) => None,
            Self::Io { .. } => {
                Some("Check that you have permission to write to this location.".into())
            }
            Self::Persistence(e) => e.suggestion(),
            Self::Vfs(e) => e.suggestion(),
            Self::Build(e) => e.suggestion(),
        }
    }
}

/// Result type alias for workspace operations.
pub type Result<T> = std::result::Result<T, WorkspaceError>;
