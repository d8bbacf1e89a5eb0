//! The workspace aggregate.
//!
//! A [`Workspace`] owns one project descriptor and one file overlay bound to
//! one source image. Every mutation goes through it, so unsaved state is
//! tracked in one place.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use mex_build::{
    AssetCodec, CancelToken, ExportJob, ExportProgress, ExportSummary, export, extract_vanilla,
    load_addon_codes, load_main_code,
};
use mex_model::{AssetKind, Costume, Project, Warning, WarningKind};
use mex_persistence::{
    Change, DirtyTracker, ProjectFile, SourceRef, WorkspaceLayout, compute_file_hash, load_project,
    save_project,
};
use mex_vfs::{DiscBackend, OverlayStore, SourceImage, VirtualFileManager};
use tracing::{debug, info, warn};

use crate::error::{Result, WorkspaceError};
use crate::info::WorkspaceInfo;
use crate::settings::WorkspaceSettings;

/// A project bound to its file overlay and source image.
pub struct Workspace {
    layout: WorkspaceLayout,
    settings: WorkspaceSettings,
    descriptor: ProjectFile,
    files: VirtualFileManager,
    backend: Arc<dyn DiscBackend>,
    dirty: DirtyTracker,
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("layout", &self.layout)
            .field("source", &self.descriptor.source)
            .field("files", &self.files)
            .field("dirty", &self.is_dirty())
            .finish_non_exhaustive()
    }
}

/// Fingerprint of a single-file source image. Directory images are not
/// hashed.
fn fingerprint(source_image: &Path) -> Result<Option<String>> {
    if source_image.is_file() {
        Ok(Some(compute_file_hash(source_image)?))
    } else {
        Ok(None)
    }
}

/// Path recorded in the descriptor for a source image given on the command
/// line or in a dialog.
fn recorded_path(source_image: &Path) -> Result<String> {
    let absolute = std::path::absolute(source_image).map_err(|source| WorkspaceError::Io {
        operation: "resolve",
        path: source_image.to_path_buf(),
        source,
    })?;
    Ok(absolute.display().to_string())
}

fn discard_partial(descriptor: &Path, store: &Path) {
    if descriptor.exists()
        && let Err(e) = std::fs::remove_file(descriptor)
    {
        warn!(path = %descriptor.display(), error = %e, "failed to remove partial descriptor");
    }
    if let Err(e) = std::fs::remove_dir_all(store) {
        warn!(path = %store.display(), error = %e, "failed to remove partial overlay store");
    }
}

/// Relative source paths are relative to the descriptor's directory.
fn resolve_source(layout: &WorkspaceLayout, recorded: &str) -> PathBuf {
    let path = PathBuf::from(recorded);
    if path.is_absolute() {
        return path;
    }
    match layout.descriptor.parent() {
        Some(dir) => dir.join(path),
        None => path,
    }
}

impl Workspace {
    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Creates a workspace from an unmodified source image.
    ///
    /// Fails if a descriptor or overlay store already exists at the target,
    /// if the source image has no valid executable, or if the main code is
    /// missing or malformed. Addon codes that cannot be read are skipped and
    /// returned as warnings.
    pub fn create(
        descriptor: &Path,
        source_image: &Path,
        main_code: &Path,
        addon_codes: &[PathBuf],
        backend: Arc<dyn DiscBackend>,
    ) -> Result<(Self, Vec<Warning>)> {
        let layout = WorkspaceLayout::for_descriptor(descriptor);
        layout.require_vacant()?;
        let settings = WorkspaceSettings::load(&layout.settings_path())?;

        let source = backend.open_source(source_image)?;
        let mut project = extract_vanilla(source.as_ref(), &settings.image.executable)?;
        let main_gct = load_main_code(main_code)?;

        let (codes, mut warnings) = load_addon_codes(addon_codes);
        for code in codes {
            let name = code.name.clone();
            if let Err(e) = project.add_code(code) {
                let warning = Warning::new(WarningKind::UnreadableAddonCode, name, e.to_string());
                warn!(%warning, "skipping addon code");
                warnings.push(warning);
            }
        }

        let source_ref = SourceRef {
            path: recorded_path(source_image)?,
            sha256: fingerprint(source_image)?,
        };

        let store = OverlayStore::create(&layout.store)?;
        let store_root = layout.store.clone();
        let descriptor_path = layout.descriptor.clone();
        let mut files = VirtualFileManager::new(source, store);
        let written = files
            .set(&settings.image.main_code, main_gct)
            .map_err(WorkspaceError::from)
            .and_then(|()| {
                let mut workspace = Self {
                    layout,
                    settings,
                    descriptor: ProjectFile::new(source_ref, project),
                    files,
                    backend,
                    dirty: DirtyTracker::new(),
                };
                workspace.save(None).map(|()| workspace)
            });
        let workspace = match written {
            Ok(workspace) => workspace,
            Err(e) => {
                discard_partial(&descriptor_path, &store_root);
                return Err(e);
            }
        };

        info!(
            descriptor = %workspace.layout.descriptor.display(),
            codes = workspace.project().codes().len(),
            warnings = warnings.len(),
            "created workspace"
        );
        Ok((workspace, warnings))
    }

    /// Opens an existing workspace.
    ///
    /// A missing descriptor, a corrupt descriptor, a descriptor without its
    /// overlay store (or the reverse) and a missing source image are all
    /// distinct errors; see [`WorkspaceError::is_source_image_missing`].
    pub fn try_open(descriptor: &Path, backend: Arc<dyn DiscBackend>) -> Result<(Self, Vec<Warning>)> {
        let layout = WorkspaceLayout::for_descriptor(descriptor);
        layout.require_complete()?;
        let loaded = load_project(&layout.descriptor)?;

        let source_path = resolve_source(&layout, &loaded.source.path);
        if !source_path.exists() {
            return Err(WorkspaceError::SourceImageMissing {
                descriptor: layout.descriptor,
                path: source_path,
            });
        }

        let mut warnings = Vec::new();
        if let Some(expected) = &loaded.source.sha256
            && fingerprint(&source_path)?.as_deref() != Some(expected.as_str())
        {
            let warning = Warning::new(
                WarningKind::SourceImageChanged,
                source_path.display().to_string(),
                "the source image differs from the one this workspace was created from",
            );
            warn!(%warning, "opening workspace anyway");
            warnings.push(warning);
        }

        let source = backend.open_source(&source_path)?;
        let workspace = Self::bind(layout, loaded, source, backend)?;
        Ok((workspace, warnings))
    }

    /// Opens an existing workspace against a different source image, for
    /// when the recorded one was moved.
    pub fn open_with_source_image(
        descriptor: &Path,
        source_image: &Path,
        backend: Arc<dyn DiscBackend>,
    ) -> Result<Self> {
        let layout = WorkspaceLayout::for_descriptor(descriptor);
        layout.require_complete()?;
        let mut loaded = load_project(&layout.descriptor)?;
        loaded.source = SourceRef {
            path: recorded_path(source_image)?,
            sha256: fingerprint(source_image)?,
        };

        let source = backend.open_source(source_image)?;
        let mut workspace = Self::bind(layout, loaded, source, backend)?;
        workspace.dirty.record(Change::Source);
        info!(source = %source_image.display(), "rebound workspace to new source image");
        Ok(workspace)
    }

    fn bind(
        layout: WorkspaceLayout,
        descriptor: ProjectFile,
        source: Arc<dyn SourceImage>,
        backend: Arc<dyn DiscBackend>,
    ) -> Result<Self> {
        let settings = WorkspaceSettings::load(&layout.settings_path())?;
        let store = OverlayStore::open(&layout.store)?;
        let files = VirtualFileManager::open(source, store)?;
        info!(
            descriptor = %layout.descriptor.display(),
            fighters = descriptor.project.fighters().len(),
            overlay = files.modified_paths().len(),
            "opened workspace"
        );
        Ok(Self {
            layout,
            settings,
            descriptor,
            files,
            backend,
            dirty: DirtyTracker::new(),
        })
    }

    /// Saves in place, or to a new location when `target` is given.
    ///
    /// The overlay store is written before the descriptor that refers to it.
    /// Saving elsewhere rebinds the workspace to the new location.
    pub fn save(&mut self, target: Option<&Path>) -> Result<()> {
        match target {
            Some(path) if path != self.layout.descriptor => {
                let layout = WorkspaceLayout::for_descriptor(path);
                layout.require_vacant()?;
                self.files.save_to(&layout.store)?;
                save_project(&mut self.descriptor, &layout.descriptor)?;
                if self.settings != WorkspaceSettings::default() {
                    self.settings.save(&layout.settings_path())?;
                }
                info!(
                    from = %self.layout.descriptor.display(),
                    to = %layout.descriptor.display(),
                    "saved workspace to new location"
                );
                self.layout = layout;
            }
            _ => {
                self.files.save()?;
                save_project(&mut self.descriptor, &self.layout.descriptor)?;
                info!(descriptor = %self.layout.descriptor.display(), "saved workspace");
            }
        }
        self.dirty.save_complete();
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[must_use]
    pub fn project(&self) -> &Project {
        &self.descriptor.project
    }

    #[must_use]
    pub fn descriptor(&self) -> &ProjectFile {
        &self.descriptor
    }

    #[must_use]
    pub fn files(&self) -> &VirtualFileManager {
        &self.files
    }

    #[must_use]
    pub fn settings(&self) -> &WorkspaceSettings {
        &self.settings
    }

    #[must_use]
    pub fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }

    /// Whether anything changed since the last save.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.is_dirty() || self.files.is_dirty()
    }

    #[must_use]
    pub fn dirty_tracker(&self) -> &DirtyTracker {
        &self.dirty
    }

    #[must_use]
    pub fn info(&self) -> WorkspaceInfo {
        WorkspaceInfo::collect(self.project(), self.files.modified_paths().len())
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Applies a project mutation as one step. If `edit` fails, the project
    /// is restored to its state before the call, including any changes the
    /// closure made before failing.
    pub fn edit<R>(&mut self, edit: impl FnOnce(&mut Project) -> mex_model::Result<R>) -> Result<R> {
        let before = self.descriptor.project.clone();
        match edit(&mut self.descriptor.project) {
            Ok(result) => {
                self.dirty.record(Change::Project);
                Ok(result)
            }
            Err(e) => {
                self.descriptor.project = before;
                debug!(error = %e, "rolled back failed project edit");
                Err(e.into())
            }
        }
    }

    /// Writes a file into the overlay.
    pub fn set_file(&mut self, path: &str, bytes: impl Into<Vec<u8>>) -> Result<()> {
        self.files.set(path, bytes)?;
        self.dirty.record(Change::Files);
        Ok(())
    }

    /// Hides a file from the merged image.
    pub fn remove_file(&mut self, path: &str) -> Result<()> {
        self.files.remove(path)?;
        self.dirty.record(Change::Files);
        Ok(())
    }

    /// Adds a costume to `fighter` from a model file and an optional
    /// portrait. Files land at fresh paths derived from the fighter's data
    /// file; the portrait is encoded at the next export.
    pub fn import_costume(
        &mut self,
        fighter: usize,
        name: &str,
        model: &[u8],
        portrait: Option<&[u8]>,
    ) -> Result<usize> {
        let owner = self.project().fighters().try_get(fighter)?;
        let stem = owner
            .file
            .strip_suffix(".dat")
            .unwrap_or(&owner.file)
            .to_string();
        let label: String = name.chars().filter(char::is_ascii_alphanumeric).collect();

        let file = self.files.get_unique_file_path(&format!("{stem}{label}.dat"))?;
        let mut costume = Costume::new(name, file.clone());
        let csp = match portrait {
            Some(_) => Some(
                self.files
                    .get_unique_file_path(&format!("csp/{stem}{label}.png"))?,
            ),
            None => None,
        };
        costume.csp.clone_from(&csp);

        let index = self.descriptor.project.add_costume(fighter, costume)?;
        self.files.set(&file, model)?;
        if let (Some(path), Some(bytes)) = (csp, portrait) {
            self.files.set(&path, bytes)?;
            self.descriptor.project.mark_unbaked(&path, AssetKind::Portrait)?;
        }
        self.dirty.record(Change::Project);
        debug!(fighter, costume = index, file = %file, "imported costume");
        Ok(index)
    }

    /// Schedules every costume portrait for re-encoding at the next export.
    /// Returns how many were scheduled.
    pub fn recompile_csps(&mut self) -> Result<usize> {
        let portraits: Vec<String> = self
            .project()
            .fighters()
            .iter()
            .flat_map(|f| f.costumes.iter())
            .filter_map(|c| c.csp.clone())
            .filter(|path| self.files.exists(path))
            .collect();
        let count = portraits.len();
        for path in &portraits {
            self.descriptor.project.mark_unbaked(path, AssetKind::Portrait)?;
        }
        if count > 0 {
            self.dirty.record(Change::Project);
        }
        info!(count, "scheduled portraits for re-encoding");
        Ok(count)
    }

    // ========================================================================
    // Export
    // ========================================================================

    /// Snapshot of everything an export needs, for running it elsewhere.
    ///
    /// Do not save the workspace while the job is running.
    #[must_use]
    pub fn export_job(&self, output: &Path, codec: Arc<dyn AssetCodec>) -> ExportJob {
        ExportJob {
            descriptor: self.descriptor.clone(),
            files: self.files.snapshot(),
            backend: Arc::clone(&self.backend),
            codec,
            layout: self.settings.image.clone(),
            output: output.to_path_buf(),
            protected: vec![
                resolve_source(&self.layout, &self.descriptor.source.path),
                self.layout.descriptor.clone(),
                self.layout.store.clone(),
            ],
        }
    }

    /// Stores the assets an export baked, so later exports reuse them.
    pub fn apply_export(&mut self, summary: &ExportSummary) -> Result<()> {
        if summary.baked.is_empty() {
            return Ok(());
        }
        for (path, bytes) in &summary.baked {
            self.files.set(path, bytes.clone())?;
        }
        let pending = self.descriptor.project.take_unbaked();
        for (path, kind) in pending {
            if !summary.baked.contains_key(&path) {
                self.descriptor.project.mark_unbaked(&path, kind)?;
            }
        }
        self.dirty.record(Change::Baked);
        debug!(baked = summary.baked.len(), "applied baked assets");
        Ok(())
    }

    /// Exports the merged image to `output` on the calling thread.
    pub fn export_iso(
        &mut self,
        output: &Path,
        codec: Arc<dyn AssetCodec>,
        cancel: &CancelToken,
        on_progress: &mut dyn FnMut(ExportProgress),
    ) -> Result<ExportSummary> {
        let job = self.export_job(output, codec);
        let summary = export(&job, cancel, on_progress)?;
        self.apply_export(&summary)?;
        Ok(summary)
    }
}
