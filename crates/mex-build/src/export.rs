//! Image export.
//!
//! Export runs in four steps: patch the executable, resolve (and bake)
//! assets, write the ID tables, then assemble the image. The image is
//! written to `<output>.tmp` and renamed into place only after the sink
//! finalizes, so a failed or cancelled export never leaves a partial image
//! at `output`.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{Receiver, unbounded};
use mex_persistence::{ProjectFile, parse_project_bytes, serialize_project};
use mex_vfs::{DiscBackend, ImageSink, VfsError, VfsSnapshot};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};

use crate::codec::AssetCodec;
use crate::error::{BuildError, Result};
use crate::gecko;
use crate::install::{CodeSet, InstallReport, install, project_codes};
use crate::progress::{CancelToken, ExportProgress, ExportStep, ProgressReporter};
use crate::tables::write_id_tables;

// ============================================================================
// Image Layout
// ============================================================================

/// Where the engine's own files live inside an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageLayout {
    pub executable: String,
    pub main_code: String,
    pub id_tables: String,
    pub embedded_descriptor: String,
    /// Fail the export when a roster entry references a missing file.
    pub verify_references: bool,
}

impl Default for ImageLayout {
    fn default() -> Self {
        Self {
            executable: "sys/main.dol".to_string(),
            main_code: "codes.gct".to_string(),
            id_tables: "MxDt.dat".to_string(),
            embedded_descriptor: "mex/project.json".to_string(),
            verify_references: true,
        }
    }
}

// ============================================================================
// Job and Result
// ============================================================================

/// Everything an export reads. Owned so it can move to a worker thread.
pub struct ExportJob {
    pub descriptor: ProjectFile,
    pub files: VfsSnapshot,
    pub backend: Arc<dyn DiscBackend>,
    pub codec: Arc<dyn AssetCodec>,
    pub layout: ImageLayout,
    pub output: PathBuf,
    /// Files and directories the output must not replace, such as the
    /// source image the workspace reads from.
    pub protected: Vec<PathBuf>,
}

impl std::fmt::Debug for ExportJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportJob")
            .field("files", &self.files)
            .field("layout", &self.layout)
            .field("output", &self.output)
            .field("protected", &self.protected)
            .finish_non_exhaustive()
    }
}

/// Successful export result.
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub output: PathBuf,
    pub files_written: usize,
    pub bytes_written: u64,
    /// Encoded bytes of every asset that was unbaked, by path.
    pub baked: BTreeMap<String, Vec<u8>>,
    pub install: InstallReport,
    /// Total elapsed time in milliseconds.
    pub elapsed_ms: u64,
}

// ============================================================================
// Pipeline
// ============================================================================

fn check_cancel(cancel: &CancelToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(BuildError::Cancelled);
    }
    Ok(())
}

fn temp_path(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    output.with_file_name(format!("{name}.tmp"))
}

/// Absolute form of `path` with symlinks resolved as far as it exists.
fn resolved(path: &Path) -> PathBuf {
    if let Ok(path) = fs::canonicalize(path) {
        return path;
    }
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    if let (Some(parent), Some(name)) = (absolute.parent(), absolute.file_name())
        && let Ok(parent) = fs::canonicalize(parent)
    {
        return parent.join(name);
    }
    absolute
}

/// Rejects an output that is, or lies inside, a protected path. The
/// temporary image next to the output is checked too.
fn check_output(job: &ExportJob) -> Result<()> {
    let targets = [resolved(&job.output), resolved(&temp_path(&job.output))];
    for protected in &job.protected {
        let protected = resolved(protected);
        if targets.iter().any(|t| t.starts_with(&protected)) {
            return Err(BuildError::OutputConflict {
                output: job.output.clone(),
                protected,
            });
        }
    }
    Ok(())
}

fn patch_executable(job: &ExportJob) -> Result<(Vec<u8>, InstallReport)> {
    let base = job.files.get(&job.layout.executable)?;
    let main_bytes = job.files.get(&job.layout.main_code)?;
    let main = CodeSet::new(
        job.layout.main_code.clone(),
        gecko::parse_code_file(&job.layout.main_code, &main_bytes)?,
    );
    let addons = project_codes(&job.descriptor.project)?;
    install(&base, &main, &addons)
}

fn resolve_assets(
    job: &ExportJob,
    cancel: &CancelToken,
    progress: &mut ProgressReporter<'_>,
) -> Result<BTreeMap<String, Vec<u8>>> {
    let project = &job.descriptor.project;
    let refs = if job.layout.verify_references {
        project.file_refs()
    } else {
        Vec::new()
    };
    let total = project.unbaked().len() + refs.len();
    let mut done = 0;
    progress.begin(ExportStep::Resolving);

    let mut baked = BTreeMap::new();
    for (path, kind) in project.unbaked() {
        check_cancel(cancel)?;
        let raw = job.files.get(path).map_err(|source| BuildError::MissingAsset {
            owner: format!("unbaked {kind}"),
            path: path.clone(),
            source,
        })?;
        let encoded = job
            .codec
            .encode(*kind, &raw)
            .map_err(|source| BuildError::Codec {
                path: path.clone(),
                kind: *kind,
                source,
            })?;
        debug!(path = %path, kind = %kind, size = encoded.len(), "baked asset");
        baked.insert(path.clone(), encoded);
        done += 1;
        progress.report(ExportStep::Resolving, done, total);
    }

    for (owner, path) in refs {
        check_cancel(cancel)?;
        if !baked.contains_key(path) && !job.files.exists(path) {
            return Err(BuildError::MissingAsset {
                owner,
                path: path.to_string(),
                source: VfsError::NotFound {
                    path: path.to_string(),
                },
            });
        }
        done += 1;
        progress.report(ExportStep::Resolving, done, total);
    }
    Ok(baked)
}

struct Assembled {
    files_written: usize,
    bytes_written: u64,
}

fn assemble(
    job: &ExportJob,
    target: &Path,
    generated: &[(&str, Vec<u8>)],
    baked: &BTreeMap<String, Vec<u8>>,
    cancel: &CancelToken,
    progress: &mut ProgressReporter<'_>,
) -> Result<Assembled> {
    let replaced: BTreeSet<&str> = generated.iter().map(|(path, _)| *path).collect();
    let listing: Vec<String> = job
        .files
        .files()
        .into_iter()
        .filter(|p| !replaced.contains(p.as_str()))
        .collect();
    let total = listing.len() + generated.len();
    progress.begin(ExportStep::Assembling);

    let mut sink: Box<dyn ImageSink> = job.backend.begin_image(target)?;
    let mut stats = Assembled {
        files_written: 0,
        bytes_written: 0,
    };

    for path in &listing {
        check_cancel(cancel)?;
        if let Some(bytes) = baked.get(path) {
            sink.write_file(path, bytes)?;
            stats.bytes_written += bytes.len() as u64;
        } else {
            let mut reader = job.files.get_stream(path)?;
            stats.bytes_written += sink.write_stream(path, &mut reader)?;
        }
        stats.files_written += 1;
        progress.report(ExportStep::Assembling, stats.files_written, total);
    }

    for (path, bytes) in generated {
        check_cancel(cancel)?;
        sink.write_file(path, bytes)?;
        stats.bytes_written += bytes.len() as u64;
        stats.files_written += 1;
        progress.report(ExportStep::Assembling, stats.files_written, total);
    }

    sink.finalize()?;
    Ok(stats)
}

/// Runs an export on the calling thread.
///
/// `on_progress` receives non-decreasing percentages. Cancellation is
/// checked between files and returns [`BuildError::Cancelled`].
pub fn export(
    job: &ExportJob,
    cancel: &CancelToken,
    on_progress: &mut dyn FnMut(ExportProgress),
) -> Result<ExportSummary> {
    let span = info_span!("export", output = %job.output.display());
    let _guard = span.enter();
    let start = Instant::now();
    let mut progress = ProgressReporter::new(on_progress);
    check_output(job)?;

    progress.begin(ExportStep::Patching);
    let (executable, install_report) = patch_executable(job)?;
    progress.report(ExportStep::Patching, 1, 1);
    check_cancel(cancel)?;

    let baked = resolve_assets(job, cancel, &mut progress)?;
    check_cancel(cancel)?;

    progress.begin(ExportStep::WritingTables);
    let tables = write_id_tables(&job.descriptor.project)?;
    let mut embedded = job.descriptor.clone();
    embedded.project.take_unbaked();
    let descriptor_bytes = serialize_project(&embedded)?;
    progress.report(ExportStep::WritingTables, 1, 1);
    check_cancel(cancel)?;

    let generated = [
        (job.layout.executable.as_str(), executable),
        (job.layout.id_tables.as_str(), tables),
        (job.layout.embedded_descriptor.as_str(), descriptor_bytes),
    ];
    let temp = temp_path(&job.output);
    let assembled = assemble(job, &temp, &generated, &baked, cancel, &mut progress)
        .and_then(|stats| {
            fs::rename(&temp, &job.output)
                .map_err(|e| BuildError::io("rename", &job.output, e))?;
            Ok(stats)
        });
    let stats = match assembled {
        Ok(stats) => stats,
        Err(e) => {
            if temp.exists()
                && let Err(cleanup) = fs::remove_file(&temp)
            {
                warn!(path = %temp.display(), error = %cleanup, "failed to remove partial image");
            }
            return Err(e);
        }
    };
    progress.begin(ExportStep::Done);

    let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    info!(
        files = stats.files_written,
        bytes = stats.bytes_written,
        baked = baked.len(),
        elapsed_ms,
        "export complete"
    );
    Ok(ExportSummary {
        output: job.output.clone(),
        files_written: stats.files_written,
        bytes_written: stats.bytes_written,
        baked,
        install: install_report,
        elapsed_ms,
    })
}

/// Reads the descriptor embedded in an exported image.
pub fn read_embedded_project(
    backend: &dyn DiscBackend,
    image: &Path,
    layout: &ImageLayout,
) -> Result<ProjectFile> {
    let source = backend.open_source(image)?;
    let bytes = source.read_file(&layout.embedded_descriptor)?;
    Ok(parse_project_bytes(
        &bytes,
        Path::new(&layout.embedded_descriptor),
    )?)
}

// ============================================================================
// Background Export
// ============================================================================

/// Message sent from an export thread.
#[derive(Debug)]
pub enum ExportUpdate {
    Progress(ExportProgress),
    Complete(ExportSummary),
    Failed(BuildError),
    Cancelled,
}

/// Handle for a running background export.
pub struct ExportHandle {
    updates: Receiver<ExportUpdate>,
    cancel: CancelToken,
    thread: JoinHandle<()>,
}

impl ExportHandle {
    /// Updates from the worker. The last one is always `Complete`,
    /// `Failed` or `Cancelled`.
    #[must_use]
    pub fn updates(&self) -> &Receiver<ExportUpdate> {
        &self.updates
    }

    /// Request cancellation of the export.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Check if cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Blocks until the export ends, discarding progress updates.
    pub fn wait(self) -> Result<ExportSummary> {
        self.wait_with_progress(|_| {})
    }

    /// Blocks until the export ends, passing each progress update to
    /// `on_progress` on the calling thread.
    pub fn wait_with_progress(
        self,
        mut on_progress: impl FnMut(ExportProgress),
    ) -> Result<ExportSummary> {
        let outcome = self
            .updates
            .iter()
            .find_map(|update| match update {
                ExportUpdate::Progress(progress) => {
                    on_progress(progress);
                    None
                }
                ExportUpdate::Complete(summary) => Some(Ok(summary)),
                ExportUpdate::Failed(error) => Some(Err(error)),
                ExportUpdate::Cancelled => Some(Err(BuildError::Cancelled)),
            });
        if self.thread.join().is_err() {
            warn!("export thread panicked");
        }
        outcome.unwrap_or(Err(BuildError::WorkerStopped))
    }
}

impl std::fmt::Debug for ExportHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportHandle")
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Runs `job` on a new thread.
pub fn spawn_export(job: ExportJob) -> ExportHandle {
    let (sender, receiver) = unbounded();
    let cancel = CancelToken::new();
    let worker_cancel = cancel.clone();

    let thread = std::thread::spawn(move || {
        let progress_sender = sender.clone();
        let mut on_progress = move |progress: ExportProgress| {
            let _ = progress_sender.send(ExportUpdate::Progress(progress));
        };
        let update = match export(&job, &worker_cancel, &mut on_progress) {
            Ok(summary) => ExportUpdate::Complete(summary),
            Err(BuildError::Cancelled) => {
                info!(output = %job.output.display(), "export cancelled");
                ExportUpdate::Cancelled
            }
            Err(error) => ExportUpdate::Failed(error),
        };
        let _ = sender.send(update);
    });

    ExportHandle {
        updates: receiver,
        cancel,
        thread,
    }
}
