//! Round-trip tests for workspace descriptors.

use std::fs;

use mex_model::vanilla::seed_project;
use mex_model::{AssetKind, CodeEntry, Costume, Fighter, MusicTrack, PatchBlob, SkinLink, Stage};
use mex_persistence::{
    PersistenceError, ProjectFile, SourceRef, load_project, parse_project_bytes, save_project,
    serialize_project,
};
use tempfile::tempdir;

fn busy_project() -> ProjectFile {
    let mut project = seed_project().unwrap();
    project.build.name = "Round Trip".to_string();
    project.build.maker = "tester".to_string();

    let mut wolf = Fighter::new("Wolf", "PlWf.dat");
    wolf.costumes.push(Costume::new("Default", "PlWfNr.dat"));
    let mut alt = Costume::new("Alt", "PlWfRe.dat");
    alt.csp = Some("csp/wolf_re.tex".to_string());
    alt.shared_skin = Some(SkinLink {
        fighter: 33,
        costume: 0,
    });
    wolf.costumes.push(alt);
    let music = project
        .add_music(MusicTrack::new("Wolf Theme", "audio/wolf.hps"))
        .unwrap();
    wolf.victory_theme = Some(music);
    project.add_fighter(wolf).unwrap();

    let mut stage = Stage::new("Lylat", "GrLy.dat");
    stage.playlist = vec![music, 0];
    project.add_stage(stage).unwrap();

    let mut code = CodeEntry::new("Skip Intro", "04000000 00000000");
    code.author = "someone".to_string();
    code.enabled = false;
    project.add_code(code).unwrap();
    project.set_patch("boot", PatchBlob(vec![0x00, 0xD0, 0xC0, 0xDE]));
    project
        .mark_unbaked("csp/wolf_re.tex", AssetKind::Portrait)
        .unwrap();

    ProjectFile::new(
        SourceRef {
            path: "melee.mexi".to_string(),
            sha256: None,
        },
        project,
    )
}

#[test]
fn save_then_load_preserves_everything() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("build.json");
    let mut descriptor = busy_project();

    save_project(&mut descriptor, &path).unwrap();
    let loaded = load_project(&path).unwrap();

    assert_eq!(loaded, descriptor);
    assert_eq!(loaded.project.fighters().len(), 34);
    assert_eq!(loaded.project.fighters().external_id(33).value(), 33);
}

#[test]
fn descriptor_is_human_readable() {
    let bytes = serialize_project(&busy_project()).unwrap();
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.contains("\"name\": \"Wolf\""));
    assert!(text.contains("\"boot\": \"00d0c0de\""));
}

#[test]
fn dangling_reference_in_file_is_corrupt() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("build.json");
    let bytes = serialize_project(&busy_project()).unwrap();
    let mut value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    value["project"]["stages"][29]["playlist"][0] = serde_json::json!(9999);
    fs::write(&path, serde_json::to_vec(&value).unwrap()).unwrap();

    let err = load_project(&path).unwrap_err();
    assert!(matches!(err, PersistenceError::InvalidProject { .. }));
}

#[test]
fn embedded_bytes_parse_like_files() {
    let descriptor = busy_project();
    let bytes = serialize_project(&descriptor).unwrap();
    let parsed = parse_project_bytes(&bytes, std::path::Path::new("mex/project.json")).unwrap();
    assert_eq!(parsed, descriptor);
}
