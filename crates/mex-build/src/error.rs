//! Build pipeline error types.

use std::path::PathBuf;

use mex_model::{AssetKind, ErrorKind, ModelError};
use mex_persistence::PersistenceError;
use mex_vfs::VfsError;
use thiserror::Error;

use crate::codec::CodecError;

/// Error raised while patching, extracting or exporting.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The base executable is not a usable DOL.
    #[error("Invalid executable: {reason}")]
    InvalidExecutable { reason: String },

    /// A code list could not be parsed or contains an unsupported code type.
    #[error("Malformed code '{code}' at line {line}: {reason}")]
    MalformedCode {
        code: String,
        line: usize,
        reason: String,
    },

    /// A code writes to memory no executable section backs.
    #[error("Code '{code}' writes {len} bytes at {address:#010X} outside the executable")]
    UnmappedWrite {
        code: String,
        address: u32,
        len: usize,
    },

    /// The main code file given to a new workspace does not exist.
    #[error("Main code file not found: {path}")]
    MainCodeMissing { path: PathBuf },

    /// A roster entry references a file the image does not hold.
    #[error("Missing asset for {owner}: {path}")]
    MissingAsset {
        owner: String,
        path: String,
        #[source]
        source: VfsError,
    },

    /// An unbaked asset could not be encoded.
    #[error("Failed to encode {kind} '{path}'")]
    Codec {
        path: String,
        kind: AssetKind,
        #[source]
        source: CodecError,
    },

    /// The ID tables file could not be parsed.
    #[error("Invalid ID tables: {reason}")]
    InvalidTables { reason: String },

    /// The export target would replace a file the workspace depends on.
    #[error("Export target {output} would overwrite {protected}")]
    OutputConflict { output: PathBuf, protected: PathBuf },

    /// The export was cancelled before it finished.
    #[error("Export cancelled")]
    Cancelled,

    /// The export thread ended without reporting a result.
    #[error("Export thread stopped unexpectedly")]
    WorkerStopped,

    /// File I/O error.
    #[error("Failed to {operation} file: {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Vfs(#[from] VfsError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl BuildError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(code: &str, line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedCode {
            code: code.to_string(),
            line,
            reason: reason.into(),
        }
    }

    /// Taxonomy category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidExecutable { .. }
            | Self::MalformedCode { .. }
            | Self::UnmappedWrite { .. }
            | Self::Codec { .. }
            | Self::InvalidTables { .. } => ErrorKind::Corrupt,
            Self::MainCodeMissing { .. } | Self::MissingAsset { .. } => ErrorKind::NotFound,
            Self::Cancelled | Self::OutputConflict { .. } => ErrorKind::Conflict,
            Self::Io { .. } | Self::WorkerStopped => ErrorKind::Io,
            Self::Vfs(e) => e.kind(),
            Self::Model(e) => e.kind(),
            Self::Persistence(e) => e.kind(),
        }
    }

    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidExecutable { reason } => {
                format!("The game executable could not be read: {reason}.")
            }
            Self::MalformedCode { code, line, reason } => {
                format!("The code '{code}' could not be applied (line {line}): {reason}.")
            }
            Self::UnmappedWrite { code, address, .. } => format!(
                "The code '{code}' writes to {address:#010X}, which is not part of the game executable."
            ),
            Self::MainCodeMissing { path } => {
                format!("The main code file {} does not exist.", path.display())
            }
            Self::MissingAsset { owner, path, .. } => {
                format!("{owner} uses '{path}', but that file is not in the workspace.")
            }
            Self::Codec { path, kind, source } => {
                format!("The {kind} '{path}' could not be encoded: {source}")
            }
            Self::InvalidTables { reason } => format!("The ID tables are damaged: {reason}."),
            Self::OutputConflict { output, protected } => format!(
                "Exporting to {} would overwrite {}, which this workspace needs.",
                output.display(),
                protected.display()
            ),
            Self::Cancelled => "The export was cancelled.".to_string(),
            Self::WorkerStopped => "The export stopped before it finished.".to_string(),
            Self::Io {
                operation, path, ..
            } => format!("Could not {} the file at {}", operation, path.display()),
            Self::Vfs(e) => e.user_message(),
            Self::Model(e) => e.to_string(),
            Self::Persistence(e) => e.user_message(),
        }
    }

    /// Get a suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::InvalidExecutable { .. } => {
                Some("Make sure the source image is an unmodified copy of the game.".into())
            }
            Self::MalformedCode { .. } | Self::UnmappedWrite { .. } => {
                Some("Disable or fix the code, then export again.".into())
            }
            Self::MainCodeMissing { .. } => Some("Check the path to the main code file.".into()),
            Self::MissingAsset { .. } => {
                Some("Import the file again or remove the entry that uses it.".into())
            }
            Self::Codec { .. } => Some("Replace the asset with a supported file.".into()),
            Self::OutputConflict { .. } => Some("Choose a different output path.".into()),
            Self::InvalidTables { .. } | Self::Cancelled => None,
            Self::WorkerStopped => Some("Run the export again.".into()),
            Self::Io { operation, .. } => {
                if *operation == "read" || *operation == "open" {
                    Some("Check that the file exists and you have permission to read it.".into())
                } else {
                    Some("Check that you have permission to write to this location.".into())
                }
            }
            Self::Vfs(e) => e.suggestion(),
            Self::Model(_) => None,
            Self::Persistence(e) => e.suggestion(),
        }
    }
}

/// Result type alias for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_errors_are_corrupt() {
        let err = BuildError::malformed("Skip Intro", 3, "unsupported code type C2");
        assert_eq!(err.kind(), ErrorKind::Corrupt);
        insta::assert_snapshot!(
            err.user_message(),
            @"The code 'Skip Intro' could not be applied (line 3): unsupported code type C2."
        );
    }

    #[test]
    fn wrapped_errors_keep_their_kind() {
        let err = BuildError::from(VfsError::NotFound {
            path: "PlWf.dat".to_string(),
        });
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.suggestion().is_some());
    }
}
