//! Error taxonomy shared by every mex crate.
//!
//! Each crate keeps its own error enum, but every one of them maps onto
//! [`ErrorKind`] so a presentation layer can choose remediation without
//! matching on crate-specific variants.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::RosterKind;

/// Category of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A path, file or roster entry is absent.
    NotFound,
    /// A descriptor, code list or image is structurally unreadable.
    Corrupt,
    /// Slot arithmetic was given an impossible index.
    OutOfRange,
    /// A mutation would violate a project invariant.
    Conflict,
    /// Underlying storage is unavailable or unwritable.
    Io,
    /// An optional collaborator is missing; the operation continued.
    PartialResource,
}

impl ErrorKind {
    /// Short lowercase label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::NotFound => "not-found",
            Self::Corrupt => "corrupt",
            Self::OutOfRange => "out-of-range",
            Self::Conflict => "conflict",
            Self::Io => "io-failure",
            Self::PartialResource => "partial-resource",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Errors raised by project model mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// Vanilla entries are fixed identities.
    #[error("{kind} {index} is a vanilla slot and cannot be {operation}")]
    VanillaImmutable {
        kind: RosterKind,
        index: usize,
        operation: &'static str,
    },

    #[error("{kind} {index} does not exist (roster has {len} entries)")]
    EntryNotFound {
        kind: RosterKind,
        index: usize,
        len: usize,
    },

    #[error("{kind} roster is full ({capacity} slots)")]
    RosterFull { kind: RosterKind, capacity: usize },

    /// A roster holds fewer entries than the vanilla game ships.
    #[error("{kind} roster has {len} entries but the vanilla game has {vanilla}")]
    RosterTruncated {
        kind: RosterKind,
        len: usize,
        vanilla: usize,
    },

    #[error("costume {costume} does not exist on fighter {fighter}")]
    CostumeNotFound { fighter: usize, costume: usize },

    #[error("series {index} does not exist")]
    SeriesNotFound { index: usize },

    #[error("{owner} refers to missing {target} {index}")]
    DanglingReference {
        owner: String,
        target: &'static str,
        index: usize,
    },

    #[error("a code named '{name}' already exists")]
    DuplicateCode { name: String },

    #[error("no code named '{name}'")]
    CodeNotFound { name: String },

    #[error("no patch named '{name}'")]
    PatchNotFound { name: String },

    #[error("'{path}' is not a usable image path: {reason}")]
    InvalidPath { path: String, reason: &'static str },
}

impl ModelError {
    /// Taxonomy category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EntryNotFound { .. }
            | Self::CostumeNotFound { .. }
            | Self::SeriesNotFound { .. }
            | Self::CodeNotFound { .. }
            | Self::PatchNotFound { .. } => ErrorKind::NotFound,
            Self::RosterTruncated { .. } | Self::InvalidPath { .. } => ErrorKind::Corrupt,
            Self::VanillaImmutable { .. }
            | Self::RosterFull { .. }
            | Self::DanglingReference { .. }
            | Self::DuplicateCode { .. } => ErrorKind::Conflict,
        }
    }
}

/// What kind of soft failure a [`Warning`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// An addon code file could not be found.
    MissingAddonCode,
    /// An addon code file exists but could not be parsed.
    UnreadableAddonCode,
    /// The source image differs from the one the workspace was created from.
    SourceImageChanged,
    /// A later code overwrote bytes written by an earlier one.
    CodeOverride,
    /// A code in a code list had no lines and was skipped.
    EmptyCode,
}

/// A non-fatal problem recorded while an operation continued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub kind: WarningKind,
    /// Path or name the warning is about.
    pub subject: String,
    pub message: String,
}

impl Warning {
    pub fn new(kind: WarningKind, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
            message: message.into(),
        }
    }

    /// Warnings are always partial-resource failures.
    #[must_use]
    pub fn error_kind(&self) -> ErrorKind {
        ErrorKind::PartialResource
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.subject, self.message)
    }
}

/// Result type alias for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
