//! Command tests against packed images in a temp directory.

use std::fs;
use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use mex_build::dol::build_dol;
use mex_build::gecko::{CodeLine, encode_gct};
use mex_cli::cli::{
    Cli, Command, CreateArgs, ExportArgs, ImportCostumeArgs, InfoArgs, RelocateArgs, WorkspaceArgs,
};
use mex_cli::commands::{
    run_create, run_export, run_import_costume, run_info, run_recompile_csps, run_relocate,
};
use mex_cli::logging::LogFormat;
use mex_cli::summary::info_table;
use mex_vfs::{MemoryImage, PackedImage, SourceImage, write_packed};
use tempfile::{TempDir, tempdir};
use tracing::level_filters::LevelFilter;

struct Paths {
    dir: TempDir,
    source: PathBuf,
    main_code: PathBuf,
    workspace: PathBuf,
}

fn paths() -> Paths {
    let dir = tempdir().unwrap();
    let dol = build_dol(&[(0x8000_3100, &[0u8; 0x40][..])], &[], 0x8000_3100).unwrap();
    let mut image = MemoryImage::new();
    image.insert("sys/main.dol", dol).unwrap();
    image.insert("PlMrNr.dat", b"mario".to_vec()).unwrap();
    for (_, path) in mex_model::vanilla::seed_project().unwrap().file_refs() {
        image.insert(path, b"vanilla".to_vec()).unwrap();
    }
    let source = dir.path().join("melee.mexi");
    write_packed(&image, &source).unwrap();

    let main_code = dir.path().join("main.txt");
    fs::write(&main_code, "$Main\n04003100 60000000\n").unwrap();
    let workspace = dir.path().join("build.json");
    Paths {
        dir,
        source,
        main_code,
        workspace,
    }
}

fn create(paths: &Paths) {
    run_create(&CreateArgs {
        workspace: paths.workspace.clone(),
        source: paths.source.clone(),
        main_code: paths.main_code.clone(),
        addons: Vec::new(),
    })
    .unwrap();
}

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn parses_import_costume_flags() {
    let cli = Cli::try_parse_from([
        "mex",
        "-v",
        "import-costume",
        "build.json",
        "--fighter",
        "8",
        "--name",
        "Gold",
        "--model",
        "gold.dat",
    ])
    .unwrap();
    let Command::ImportCostume(args) = cli.command else {
        panic!("wrong command");
    };
    assert_eq!(args.fighter, 8);
    assert!(args.portrait.is_none());
}

#[test]
fn explicit_log_level_overrides_environment() {
    let cli = Cli::try_parse_from(["mex", "--log-level", "debug", "info", "build.json"]).unwrap();
    let config = cli.log_config();
    assert_eq!(config.level_filter, LevelFilter::DEBUG);
    assert!(!config.use_env_filter);

    let cli = Cli::try_parse_from(["mex", "--log-format", "json", "info", "build.json"]).unwrap();
    let config = cli.log_config();
    assert!(config.use_env_filter);
    assert_eq!(config.format, LogFormat::Json);
}

#[test]
fn create_then_info_reports_vanilla_counts() {
    let paths = paths();
    create(&paths);

    let info = run_info(&InfoArgs {
        workspace: paths.workspace.clone(),
        json: true,
    })
    .unwrap();
    assert_eq!(info.fighters.extended, 0);
    assert_eq!(info.overlay_entries, 1);

    let rendered = info_table(&info).to_string();
    assert!(rendered.contains("Fighters"));
    assert!(rendered.contains("Sound groups"));
}

#[test]
fn imported_costume_reaches_the_export() {
    let paths = paths();
    create(&paths);
    let model = paths.dir.path().join("gold.dat");
    fs::write(&model, b"gold").unwrap();
    let portrait = paths.dir.path().join("gold.png");
    fs::write(&portrait, b"png").unwrap();

    let index = run_import_costume(&ImportCostumeArgs {
        workspace: paths.workspace.clone(),
        fighter: 8,
        name: "Gold".to_string(),
        model,
        portrait: Some(portrait),
    })
    .unwrap();
    assert_eq!(index, 1);

    let output = paths.dir.path().join("out.mexi");
    let summary = run_export(&ExportArgs {
        workspace: paths.workspace.clone(),
        output: output.clone(),
    })
    .unwrap();
    assert_eq!(summary.baked.len(), 1);
    assert_eq!(summary.install.applied, vec!["codes.gct"]);

    let image = PackedImage::open(&output).unwrap();
    assert_eq!(image.read_file("PlMrGold.dat").unwrap(), b"gold");

    let info = run_info(&InfoArgs {
        workspace: paths.workspace.clone(),
        json: false,
    })
    .unwrap();
    assert_eq!(info.unbaked, 0);
    assert_eq!(info.costumes, 2);

    let scheduled = run_recompile_csps(&WorkspaceArgs {
        workspace: paths.workspace.clone(),
    })
    .unwrap();
    assert_eq!(scheduled, 1);
}

#[test]
fn missing_source_image_suggests_relocate() {
    let paths = paths();
    create(&paths);
    let moved = paths.dir.path().join("moved.mexi");
    fs::rename(&paths.source, &moved).unwrap();

    let err = run_info(&InfoArgs {
        workspace: paths.workspace.clone(),
        json: false,
    })
    .unwrap_err();
    assert!(err.to_string().contains("mex relocate"));

    run_relocate(&RelocateArgs {
        workspace: paths.workspace.clone(),
        source: moved,
    })
    .unwrap();
    run_info(&InfoArgs {
        workspace: paths.workspace.clone(),
        json: false,
    })
    .unwrap();
}
