//! CLI argument definitions.

use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::{ColorChoice, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use tracing::level_filters::LevelFilter;

use crate::logging::{LogConfig, LogFormat};

#[derive(Parser)]
#[command(
    name = "mex",
    version,
    about = "Build and export extended Melee workspaces",
    long_about = "Create a workspace from an unmodified game image, edit its rosters and \
                  files, and export a patched image.\n\n\
                  A workspace is a descriptor file plus a `<name>.overlay` directory next to it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a workspace from an unmodified game image.
    Create(CreateArgs),

    /// Show what a workspace holds.
    Info(InfoArgs),

    /// Export the workspace as a patched image.
    Export(ExportArgs),

    /// Add a costume to a fighter.
    ImportCostume(ImportCostumeArgs),

    /// Re-encode every costume portrait at the next export.
    RecompileCsps(WorkspaceArgs),

    /// Point a workspace at a moved source image.
    Relocate(RelocateArgs),
}

#[derive(Parser)]
pub struct WorkspaceArgs {
    /// Workspace descriptor file.
    #[arg(value_name = "WORKSPACE")]
    pub workspace: PathBuf,
}

#[derive(Parser)]
pub struct CreateArgs {
    /// Descriptor file to create.
    #[arg(value_name = "WORKSPACE")]
    pub workspace: PathBuf,

    /// Unmodified game image.
    #[arg(long = "source", value_name = "IMAGE")]
    pub source: PathBuf,

    /// Main code list (text or GCT) installed into every export.
    #[arg(long = "main-code", value_name = "FILE")]
    pub main_code: PathBuf,

    /// Additional code lists to add as project codes. May be repeated.
    #[arg(long = "addon", value_name = "FILE")]
    pub addons: Vec<PathBuf>,
}

#[derive(Parser)]
pub struct InfoArgs {
    #[arg(value_name = "WORKSPACE")]
    pub workspace: PathBuf,

    /// Print JSON instead of a table.
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Parser)]
pub struct ExportArgs {
    #[arg(value_name = "WORKSPACE")]
    pub workspace: PathBuf,

    /// Image file to write. An existing file is replaced only on success.
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,
}

#[derive(Parser)]
pub struct ImportCostumeArgs {
    #[arg(value_name = "WORKSPACE")]
    pub workspace: PathBuf,

    /// Internal index of the fighter.
    #[arg(long = "fighter", value_name = "INDEX")]
    pub fighter: usize,

    /// Costume name.
    #[arg(long = "name")]
    pub name: String,

    /// Costume model file.
    #[arg(long = "model", value_name = "FILE")]
    pub model: PathBuf,

    /// Character select portrait, encoded at the next export.
    #[arg(long = "portrait", value_name = "FILE")]
    pub portrait: Option<PathBuf>,
}

#[derive(Parser)]
pub struct RelocateArgs {
    #[arg(value_name = "WORKSPACE")]
    pub workspace: PathBuf,

    /// New location of the source image.
    #[arg(long = "source", value_name = "IMAGE")]
    pub source: PathBuf,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

impl From<LogLevelArg> for LevelFilter {
    fn from(level: LogLevelArg) -> Self {
        match level {
            LogLevelArg::Error => Self::ERROR,
            LogLevelArg::Warn => Self::WARN,
            LogLevelArg::Info => Self::INFO,
            LogLevelArg::Debug => Self::DEBUG,
            LogLevelArg::Trace => Self::TRACE,
        }
    }
}

impl From<LogFormatArg> for LogFormat {
    fn from(format: LogFormatArg) -> Self {
        match format {
            LogFormatArg::Pretty => Self::Pretty,
            LogFormatArg::Compact => Self::Compact,
            LogFormatArg::Json => Self::Json,
        }
    }
}

impl Cli {
    /// Logging setup implied by the global flags. An explicit level on
    /// the command line overrides `RUST_LOG`.
    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        let explicit = self.verbosity.is_present() || self.log_level.is_some();
        let with_ansi = match self.color.color {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => self.log_file.is_none() && io::stderr().is_terminal(),
        };
        LogConfig {
            level_filter: self
                .log_level
                .map_or_else(|| self.verbosity.tracing_level_filter(), LevelFilter::from),
            use_env_filter: !explicit,
            format: self.log_format.into(),
            log_file: self.log_file.clone(),
            with_ansi,
            ..LogConfig::default()
        }
    }
}
