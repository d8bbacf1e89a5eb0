//! File manager error types.

use std::path::PathBuf;

use mex_model::ErrorKind;
use thiserror::Error;

/// Error raised by the overlay, the overlay store or an image backend.
#[derive(Debug, Error)]
pub enum VfsError {
    /// The path is absent from both the overlay and the source image.
    #[error("File not found in image: {path}")]
    NotFound { path: String },

    /// The path is not a valid disc-relative path.
    #[error("Invalid image path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },

    /// File I/O error.
    #[error("Failed to {operation} file: {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The disc image could not be parsed.
    #[error("Invalid disc image: {path}")]
    CorruptImage { path: PathBuf, reason: String },

    /// The overlay store index or one of its blobs is damaged.
    #[error("Invalid overlay store: {path}")]
    CorruptStore { path: PathBuf, reason: String },

    /// An image writer was given the same path twice.
    #[error("File written twice to image: {path}")]
    DuplicateEntry { path: String },
}

impl VfsError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Taxonomy category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidPath { .. } | Self::CorruptImage { .. } | Self::CorruptStore { .. } => {
                ErrorKind::Corrupt
            }
            Self::Io { .. } => ErrorKind::Io,
            Self::DuplicateEntry { .. } => ErrorKind::Conflict,
        }
    }

    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { path } => {
                format!("The file '{path}' does not exist in the workspace or the source image.")
            }
            Self::InvalidPath { path, reason } => {
                format!("'{path}' is not a usable image path: {reason}.")
            }
            Self::Io {
                operation, path, ..
            } => format!("Could not {} the file at {}", operation, path.display()),
            Self::CorruptImage { path, reason } => {
                format!("The disc image at {} could not be read: {}", path.display(), reason)
            }
            Self::CorruptStore { path, reason } => format!(
                "The workspace file store at {} is damaged: {}",
                path.display(),
                reason
            ),
            Self::DuplicateEntry { path } => {
                format!("The file '{path}' was written to the output image more than once.")
            }
        }
    }

    /// Get a suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::NotFound { .. } => {
                Some("Import the file again or check the path stored in the project.".into())
            }
            Self::InvalidPath { .. } => {
                Some("Use a '/'-separated path relative to the disc root.".into())
            }
            Self::Io { operation, .. } => {
                if *operation == "read" || *operation == "open" {
                    Some("Check that the file exists and you have permission to read it.".into())
                } else {
                    Some("Check that you have permission to write to this location.".into())
                }
            }
            Self::CorruptImage { .. } => {
                Some("Make sure you selected an unmodified disc image.".into())
            }
            Self::CorruptStore { .. } => Some("Restore the workspace from a backup.".into()),
            Self::DuplicateEntry { .. } => None,
        }
    }
}

/// Result type alias for file manager operations.
pub type Result<T> = std::result::Result<T, VfsError>;
