//! Command-line driver components for mex workspaces.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod summary;
