use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use mex_build::{ExportSummary, PassthroughCodec, spawn_export};
use mex_model::Warning;
use mex_vfs::{DiscBackend, PackedDiscBackend};
use mex_workspace::{Workspace, WorkspaceError, WorkspaceInfo};
use tracing::{info, info_span};

use crate::cli::{CreateArgs, ExportArgs, ImportCostumeArgs, InfoArgs, RelocateArgs, WorkspaceArgs};
use crate::summary::{print_export_summary, print_info};

fn backend() -> Arc<dyn DiscBackend> {
    Arc::new(PackedDiscBackend)
}

/// Wraps a workspace error so the message the user sees carries its
/// remediation.
fn explain(error: WorkspaceError) -> anyhow::Error {
    let message = error.user_message();
    let hint = if error.is_source_image_missing() {
        Some("Run `mex relocate <WORKSPACE> --source <IMAGE>` to point the workspace at it.".into())
    } else {
        error.suggestion()
    };
    let context = match hint {
        Some(hint) => format!("{message}\nhint: {hint}"),
        None => message,
    };
    anyhow::Error::new(error).context(context)
}

fn export_progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(100);
    if let Ok(style) = ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}% {msg}") {
        bar.set_style(style.progress_chars("=> "));
    }
    bar
}

fn print_warnings(warnings: &[Warning]) {
    for warning in warnings {
        eprintln!("warning: {warning}");
    }
}

fn open(path: &Path) -> Result<Workspace> {
    let (workspace, warnings) = Workspace::try_open(path, backend()).map_err(explain)?;
    print_warnings(&warnings);
    Ok(workspace)
}

pub fn run_create(args: &CreateArgs) -> Result<WorkspaceInfo> {
    let _span = info_span!("create", workspace = %args.workspace.display()).entered();
    let (workspace, warnings) = Workspace::create(
        &args.workspace,
        &args.source,
        &args.main_code,
        &args.addons,
        backend(),
    )
    .map_err(explain)?;
    print_warnings(&warnings);
    println!("Created {}", args.workspace.display());
    Ok(workspace.info())
}

pub fn run_info(args: &InfoArgs) -> Result<WorkspaceInfo> {
    let workspace = open(&args.workspace)?;
    let info = workspace.info();
    if args.json {
        let json = serde_json::to_string_pretty(&info).context("serialize workspace info")?;
        println!("{json}");
    } else {
        print_info(&args.workspace, &info);
    }
    Ok(info)
}

pub fn run_export(args: &ExportArgs) -> Result<ExportSummary> {
    let _span = info_span!("export_command", output = %args.output.display()).entered();
    let mut workspace = open(&args.workspace)?;
    let job = workspace.export_job(&args.output, Arc::new(PassthroughCodec));

    let bar = export_progress_bar();
    let outcome = spawn_export(job).wait_with_progress(|progress| {
        bar.set_position(u64::from(progress.percent));
        bar.set_message(progress.label());
    });
    bar.finish_and_clear();
    let summary = outcome.map_err(|e| explain(e.into()))?;

    if !summary.baked.is_empty() {
        workspace.apply_export(&summary).map_err(explain)?;
        workspace.save(None).map_err(explain)?;
        info!(baked = summary.baked.len(), "stored baked assets in workspace");
    }
    print_export_summary(&summary);
    Ok(summary)
}

pub fn run_import_costume(args: &ImportCostumeArgs) -> Result<usize> {
    let mut workspace = open(&args.workspace)?;
    let model = fs::read(&args.model)
        .with_context(|| format!("read costume model {}", args.model.display()))?;
    let portrait = match &args.portrait {
        Some(path) => Some(
            fs::read(path).with_context(|| format!("read portrait {}", path.display()))?,
        ),
        None => None,
    };

    let index = workspace
        .import_costume(args.fighter, &args.name, &model, portrait.as_deref())
        .map_err(explain)?;
    workspace.save(None).map_err(explain)?;
    println!(
        "Added costume {index} '{}' to fighter {}",
        args.name, args.fighter
    );
    Ok(index)
}

pub fn run_recompile_csps(args: &WorkspaceArgs) -> Result<usize> {
    let mut workspace = open(&args.workspace)?;
    let count = workspace.recompile_csps().map_err(explain)?;
    if workspace.is_dirty() {
        workspace.save(None).map_err(explain)?;
    }
    println!("{count} portraits will be re-encoded at the next export");
    Ok(count)
}

pub fn run_relocate(args: &RelocateArgs) -> Result<()> {
    let mut workspace = Workspace::open_with_source_image(&args.workspace, &args.source, backend())
        .map_err(explain)?;
    workspace.save(None).map_err(explain)?;
    println!(
        "{} now uses {}",
        args.workspace.display(),
        args.source.display()
    );
    Ok(())
}
