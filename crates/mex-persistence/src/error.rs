//! Persistence error types.
//!
//! All persistence operations return structured errors that provide
//! user-friendly messages and optional remediation hints.

use std::path::PathBuf;

use mex_model::{ErrorKind, ModelError};
use thiserror::Error;

/// Persistence operation error.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// File I/O error.
    #[error("Failed to {operation} file: {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No descriptor exists at the path.
    #[error("Workspace descriptor not found: {path}")]
    DescriptorMissing { path: PathBuf },

    /// The descriptor exists but is not a readable workspace descriptor.
    #[error("Invalid workspace descriptor: {path}")]
    InvalidFormat { path: PathBuf, reason: String },

    /// Unsupported schema version.
    #[error("Descriptor version {found} is not supported (maximum: {max_supported})")]
    UnsupportedVersion {
        found: u32,
        max_supported: u32,
        path: PathBuf,
    },

    /// The descriptor parsed but its project breaks a model invariant.
    #[error("Descriptor contains an invalid project: {path}")]
    InvalidProject {
        path: PathBuf,
        #[source]
        source: ModelError,
    },

    /// Descriptor and overlay store do not exist together.
    #[error("Inconsistent workspace: {missing} is missing")]
    InconsistentLayout {
        descriptor: PathBuf,
        store: PathBuf,
        missing: &'static str,
    },

    /// A new workspace would overwrite existing files.
    #[error("Workspace files already exist: {path}")]
    LayoutOccupied { path: PathBuf },

    /// The source image recorded in the descriptor is gone.
    #[error("Source image not found: {path}")]
    SourceFileMissing { path: PathBuf },

    /// Serialization error.
    #[error("Failed to serialize workspace descriptor")]
    Serialization {
        #[source]
        source: serde_json::Error,
    },

    /// Atomic write failed (temp file couldn't be renamed).
    #[error("Failed to complete save operation")]
    AtomicWriteFailed {
        temp_path: PathBuf,
        target_path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PersistenceError {
    /// Taxonomy category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DescriptorMissing { .. } | Self::SourceFileMissing { .. } => ErrorKind::NotFound,
            Self::InvalidFormat { .. }
            | Self::UnsupportedVersion { .. }
            | Self::InvalidProject { .. }
            | Self::InconsistentLayout { .. } => ErrorKind::Corrupt,
            Self::LayoutOccupied { .. } => ErrorKind::Conflict,
            Self::Io { .. } | Self::Serialization { .. } | Self::AtomicWriteFailed { .. } => {
                ErrorKind::Io
            }
        }
    }

    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::Io {
                operation, path, ..
            } => {
                format!("Could not {} the file at {}", operation, path.display())
            }
            Self::DescriptorMissing { path } => {
                format!("There is no workspace at {}.", path.display())
            }
            Self::InvalidFormat { path, reason } => {
                format!(
                    "The file at {} is not a valid workspace descriptor: {}",
                    path.display(),
                    reason
                )
            }
            Self::UnsupportedVersion {
                found,
                max_supported,
                ..
            } => {
                format!(
                    "This workspace was created with a newer version of mex \
                    (descriptor version {found}, your version supports up to {max_supported}). \
                    Please update the application."
                )
            }
            Self::InvalidProject { source, .. } => {
                format!("The workspace descriptor is damaged: {source}.")
            }
            Self::InconsistentLayout {
                descriptor,
                store,
                missing,
            } => {
                format!(
                    "The workspace is incomplete: the {} is missing (descriptor {}, file store {}).",
                    missing,
                    descriptor.display(),
                    store.display()
                )
            }
            Self::LayoutOccupied { path } => {
                format!("A workspace already exists at {}.", path.display())
            }
            Self::SourceFileMissing { path } => {
                format!(
                    "The source image '{}' could not be found. It may have been moved or deleted.",
                    path.display()
                )
            }
            Self::Serialization { .. } => {
                "An error occurred while writing the workspace descriptor.".to_string()
            }
            Self::AtomicWriteFailed { target_path, .. } => {
                format!(
                    "Could not save the file to {}. Please check disk space and permissions.",
                    target_path.display()
                )
            }
        }
    }

    /// Get a suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::Io { operation, .. } => {
                if *operation == "read" {
                    Some("Check that the file exists and you have permission to read it.".into())
                } else {
                    Some("Check that you have permission to write to this location.".into())
                }
            }
            Self::DescriptorMissing { .. } => {
                Some("Create a new workspace from a vanilla disc image.".into())
            }
            Self::InvalidFormat { .. } => {
                Some("Make sure you selected a workspace descriptor (.json) file.".into())
            }
            Self::UnsupportedVersion { .. } => Some("Install the latest version of mex.".into()),
            Self::InvalidProject { .. } => Some("Try opening a backup if you have one.".into()),
            Self::InconsistentLayout { .. } => Some(
                "Keep the descriptor and its .overlay folder together when moving a workspace."
                    .into(),
            ),
            Self::LayoutOccupied { .. } => {
                Some("Choose another location or delete the old workspace first.".into())
            }
            Self::SourceFileMissing { .. } => {
                Some("Locate the source image and open the workspace with it.".into())
            }
            Self::Serialization { .. } => None,
            Self::AtomicWriteFailed { .. } => {
                Some("Free up disk space or try saving to a different location.".into())
            }
        }
    }
}

/// Result type alias for persistence operations.
pub type Result<T> = std::result::Result<T, PersistenceError>;
