//! End-to-end export tests against the packed image backend.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use mex_build::dol::{HEADER_SIZE, build_dol};
use mex_build::gecko::{CodeLine, encode_gct};
use mex_build::{
    AssetCodec, BuildError, CancelToken, CodecError, ExportJob, ExportStep, ImageLayout,
    PassthroughCodec, export, extract_vanilla, read_embedded_project,
    read_id_tables, spawn_export,
};
use mex_model::{AssetKind, CodeEntry, ErrorKind, Fighter, RosterKind};
use mex_persistence::{ProjectFile, SourceRef};
use mex_vfs::{
    MemoryImage, OverlayStore, PackedDiscBackend, PackedImage, SourceImage, VirtualFileManager,
};
use tempfile::{TempDir, tempdir};

struct Fixture {
    dir: TempDir,
    vfm: VirtualFileManager,
    descriptor: ProjectFile,
}

fn fixture() -> Fixture {
    let dir = tempdir().unwrap();
    let dol = build_dol(&[(0x8000_3100, &[0u8; 0x100][..])], &[], 0x8000_3100).unwrap();
    let main = encode_gct(&[CodeLine::new(0x0400_3100, 0x6000_0000)]);

    let mut image = MemoryImage::new();
    image.insert("sys/main.dol", dol).unwrap();
    image.insert("codes.gct", main).unwrap();
    image.insert("PlMrNr.dat", b"mario red".to_vec()).unwrap();
    let seeded = mex_model::vanilla::seed_project().unwrap();
    for (_, path) in seeded.file_refs() {
        image.insert(path, b"vanilla".to_vec()).unwrap();
    }

    let source: Arc<dyn SourceImage> = Arc::new(image);
    let project = extract_vanilla(source.as_ref(), "sys/main.dol").unwrap();
    let store = OverlayStore::create(&dir.path().join("build.overlay")).unwrap();
    let vfm = VirtualFileManager::new(source, store);
    let descriptor = ProjectFile::new(
        SourceRef {
            path: "melee.mexi".to_string(),
            sha256: None,
        },
        project,
    );
    Fixture {
        dir,
        vfm,
        descriptor,
    }
}

fn job(fixture: &Fixture, output: &Path) -> ExportJob {
    ExportJob {
        descriptor: fixture.descriptor.clone(),
        files: fixture.vfm.snapshot(),
        backend: Arc::new(PackedDiscBackend),
        codec: Arc::new(PassthroughCodec),
        layout: ImageLayout::default(),
        output: output.to_path_buf(),
        protected: vec![
            fixture.dir.path().join("melee.mexi"),
            fixture.dir.path().join("build.overlay"),
        ],
    }
}

fn add_wolf(fixture: &mut Fixture) -> usize {
    fixture.vfm.set("PlWf.dat", b"wolf".to_vec()).unwrap();
    fixture
        .descriptor
        .project
        .add_fighter(Fighter::new("Wolf", "PlWf.dat"))
        .unwrap()
}

#[test]
fn export_writes_patched_image() {
    let mut fixture = fixture();
    let wolf = add_wolf(&mut fixture);
    assert_eq!(wolf, 33);
    let output = fixture.dir.path().join("out.mexi");

    let mut seen = Vec::new();
    let summary = export(&job(&fixture, &output), &CancelToken::new(), &mut |p| {
        seen.push((p.step, p.percent));
    })
    .unwrap();

    assert!(seen.windows(2).all(|w| w[0].1 <= w[1].1));
    assert_eq!(seen.last(), Some(&(ExportStep::Done, 100)));
    assert_eq!(summary.install.applied, vec!["codes.gct"]);

    let image = PackedImage::open(&output).unwrap();
    let dol = image.read_file("sys/main.dol").unwrap();
    assert_eq!(&dol[HEADER_SIZE..HEADER_SIZE + 4], &[0x60, 0, 0, 0]);
    assert_eq!(image.read_file("PlWf.dat").unwrap(), b"wolf");

    let tables = read_id_tables(&image.read_file("MxDt.dat").unwrap()).unwrap();
    let fighters = tables.table(RosterKind::Fighter).unwrap();
    assert_eq!(fighters.entry_count(), 34);

    let embedded =
        read_embedded_project(&PackedDiscBackend, &output, &ImageLayout::default()).unwrap();
    assert_eq!(embedded.project.fighters().len(), 34);
    assert_eq!(embedded.project.fighters().external_id(33).value(), 33);
    assert!(!output.with_file_name("out.mexi.tmp").exists());
}

#[test]
fn failed_export_leaves_existing_output_untouched() {
    let mut fixture = fixture();
    fixture
        .descriptor
        .project
        .add_fighter(Fighter::new("Ghost", "PlGh.dat"))
        .unwrap();
    let output = fixture.dir.path().join("out.mexi");
    fs::write(&output, b"previous image").unwrap();

    let err = export(&job(&fixture, &output), &CancelToken::new(), &mut |_| {}).unwrap_err();

    assert!(matches!(err, BuildError::MissingAsset { ref path, .. } if path == "PlGh.dat"));
    assert_eq!(fs::read(&output).unwrap(), b"previous image");
    assert!(!output.with_file_name("out.mexi.tmp").exists());
}

#[test]
fn cancel_during_assembly_removes_partial_image() {
    let fixture = fixture();
    let output = fixture.dir.path().join("out.mexi");
    let cancel = CancelToken::new();
    let trigger = cancel.clone();

    let err = export(&job(&fixture, &output), &cancel, &mut |p| {
        if p.step == ExportStep::Assembling {
            trigger.cancel();
        }
    })
    .unwrap_err();

    assert!(matches!(err, BuildError::Cancelled));
    assert!(!output.exists());
    assert!(!output.with_file_name("out.mexi.tmp").exists());
}

#[test]
fn export_never_replaces_protected_paths() {
    let fixture = fixture();
    let source = fixture.dir.path().join("melee.mexi");
    fs::write(&source, b"vanilla image").unwrap();

    let err = export(&job(&fixture, &source), &CancelToken::new(), &mut |_| {}).unwrap_err();
    assert!(matches!(err, BuildError::OutputConflict { .. }));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(fs::read(&source).unwrap(), b"vanilla image");

    let relative = fixture.dir.path().join("sub").join("..").join("melee.mexi");
    fs::create_dir(fixture.dir.path().join("sub")).unwrap();
    let err = export(&job(&fixture, &relative), &CancelToken::new(), &mut |_| {}).unwrap_err();
    assert!(matches!(err, BuildError::OutputConflict { .. }));

    let inside_store = fixture.dir.path().join("build.overlay").join("image.mexi");
    let err =
        export(&job(&fixture, &inside_store), &CancelToken::new(), &mut |_| {}).unwrap_err();
    assert!(matches!(err, BuildError::OutputConflict { .. }));
    assert!(!inside_store.exists());
}

#[test]
fn malformed_code_aborts_before_writing() {
    let mut fixture = fixture();
    fixture
        .descriptor
        .project
        .add_code(CodeEntry::new("Hook", "C2003100 00000001"))
        .unwrap();
    let output = fixture.dir.path().join("out.mexi");

    let err = export(&job(&fixture, &output), &CancelToken::new(), &mut |_| {}).unwrap_err();
    assert!(matches!(err, BuildError::MalformedCode { ref code, .. } if code == "Hook"));
    assert!(!output.exists());
}

struct Reverse;

impl AssetCodec for Reverse {
    fn encode(&self, _kind: AssetKind, input: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(input.iter().rev().copied().collect())
    }

    fn decode(&self, _kind: AssetKind, input: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(input.iter().rev().copied().collect())
    }
}

#[test]
fn unbaked_assets_are_encoded_into_the_image() {
    let mut fixture = fixture();
    fixture.vfm.set("csp/wolf.tex", b"abc".to_vec()).unwrap();
    fixture
        .descriptor
        .project
        .mark_unbaked("csp/wolf.tex", AssetKind::Portrait)
        .unwrap();
    let output = fixture.dir.path().join("out.mexi");
    let mut job = job(&fixture, &output);
    job.codec = Arc::new(Reverse);

    let summary = export(&job, &CancelToken::new(), &mut |_| {}).unwrap();

    assert_eq!(summary.baked.get("csp/wolf.tex").map(Vec::as_slice), Some(&b"cba"[..]));
    let image = PackedImage::open(&output).unwrap();
    assert_eq!(image.read_file("csp/wolf.tex").unwrap(), b"cba");
    let embedded =
        read_embedded_project(&PackedDiscBackend, &output, &ImageLayout::default()).unwrap();
    assert!(embedded.project.unbaked().is_empty());
}

#[test]
fn background_export_reports_completion() {
    let fixture = fixture();
    let output = fixture.dir.path().join("out.mexi");

    let handle = spawn_export(job(&fixture, &output));
    let mut steps = Vec::new();
    let summary = handle
        .wait_with_progress(|p| {
            if steps.last() != Some(&p.step) {
                steps.push(p.step);
            }
        })
        .unwrap();

    assert_eq!(steps.first(), Some(&ExportStep::Patching));
    assert_eq!(steps.last(), Some(&ExportStep::Done));

    assert_eq!(summary.output, output);
    assert!(summary.files_written > 0);
    assert!(output.exists());
}
