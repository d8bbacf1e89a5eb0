//! Workspace engine for mex projects.
//!
//! # Overview
//!
//! A [`Workspace`] ties a [`Project`](mex_model::Project) descriptor to the
//! file overlay over its source image and is the one place edits, saves and
//! exports go through:
//!
//! ```text
//! create ──► edit / import ──► save ──► export ──► apply_export ──► save
//!   ▲                                                                 │
//!   └──────────────────────────── try_open ◄──────────────────────────┘
//! ```
//!
//! # Architecture
//!
//! - `workspace.rs` - The workspace aggregate
//! - `settings.rs` - Optional `mex.toml` settings
//! - `info.rs` - Summary counts for status output
//! - `error.rs` - Error types with user-friendly messages

mod error;
mod info;
mod settings;
mod workspace;

pub use error::{Result, WorkspaceError};
pub use info::{RosterCounts, WorkspaceInfo};
pub use settings::WorkspaceSettings;
pub use workspace::Workspace;
