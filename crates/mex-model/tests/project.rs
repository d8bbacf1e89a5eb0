//! Tests for project mutations and cross-reference upkeep.

use mex_model::vanilla::{self, seed_project};
use mex_model::{
    AssetKind, CodeEntry, Costume, ErrorKind, ExternalId, Fighter, ModelError, MusicTrack, PatchBlob,
    Project, Series, SkinLink, SoundGroup, Stage,
};

fn project() -> Project {
    seed_project().expect("vanilla project is valid")
}

fn extended_fighter(name: &str) -> Fighter {
    let mut fighter = Fighter::new(name, format!("Pl{name}.dat"));
    fighter.costumes.push(Costume::new("Default", format!("Pl{name}Nr.dat")));
    fighter
}

#[test]
fn fresh_project_is_identity_mapped() {
    let project = project();
    let fighters = project.fighters();
    assert_eq!(fighters.len(), vanilla::FIGHTERS.len());
    for (internal, (external, _)) in fighters.with_external_ids().enumerate() {
        assert_eq!(usize::from(external), internal);
    }
    assert_eq!(project.stages().len(), vanilla::STAGES.len());
    assert_eq!(project.music().len(), vanilla::MUSIC.len());
    assert_eq!(project.sound_groups().len(), vanilla::SOUND_GROUPS.len());
}

#[test]
fn first_extended_fighter_gets_vanilla_count() {
    let mut project = project();
    let index = project.add_fighter(extended_fighter("Wolf")).unwrap();
    assert_eq!(index, vanilla::FIGHTERS.len());
    assert_eq!(
        project.fighters().external_id(index),
        ExternalId(vanilla::FIGHTERS.len() as u16)
    );
    assert!(project.fighters().is_extended(index));
}

#[test]
fn removing_vanilla_fighter_is_a_conflict() {
    let mut project = project();
    let before = project.clone();
    let err = project.remove_fighter(8).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(project, before);
}

#[test]
fn removing_extended_fighter_shifts_the_rest() {
    let mut project = project();
    let v = vanilla::FIGHTERS.len();
    project.add_fighter(extended_fighter("Wolf")).unwrap();
    project.add_fighter(extended_fighter("Lucas")).unwrap();
    project.add_fighter(extended_fighter("Knuckles")).unwrap();

    let lucas_before = project.fighters().external_id(v + 1);
    project.remove_fighter(v).unwrap();

    assert_eq!(project.fighters().get(v).unwrap().name, "Lucas");
    assert_eq!(project.fighters().external_id(v).value(), lucas_before.value() - 1);
    assert_eq!(project.fighters().len(), v + 2);
}

#[test]
fn skin_links_follow_fighter_removal() {
    let mut project = project();
    let v = vanilla::FIGHTERS.len();
    project.add_fighter(extended_fighter("Wolf")).unwrap();
    project.add_fighter(extended_fighter("Lucas")).unwrap();

    let mut shared = Costume::new("Borrowed", "PlMrNr.dat");
    shared.shared_skin = Some(SkinLink {
        fighter: v + 1,
        costume: 0,
    });
    project.add_costume(8, shared.clone()).unwrap();
    shared.shared_skin = Some(SkinLink {
        fighter: v,
        costume: 0,
    });
    project.add_costume(8, shared).unwrap();

    project.remove_fighter(v).unwrap();

    let mario = project.fighters().get(8).unwrap();
    assert_eq!(
        mario.costumes[0].shared_skin,
        Some(SkinLink {
            fighter: v,
            costume: 0
        })
    );
    assert_eq!(mario.costumes[1].shared_skin, None);
    assert!(project.dangling_references().is_empty());
}

#[test]
fn costume_removal_fixes_links() {
    let mut project = project();
    project.add_costume(0, Costume::new("A", "PlCaNr.dat")).unwrap();
    project.add_costume(0, Costume::new("B", "PlCaRe.dat")).unwrap();
    let mut linked = Costume::new("Link", "PlMrNr.dat");
    linked.shared_skin = Some(SkinLink {
        fighter: 0,
        costume: 1,
    });
    project.add_costume(8, linked).unwrap();

    project.remove_costume(0, 0).unwrap();
    let link = project.fighters().get(8).unwrap().costumes[0].shared_skin;
    assert_eq!(
        link,
        Some(SkinLink {
            fighter: 0,
            costume: 0
        })
    );

    project.remove_costume(0, 0).unwrap();
    assert_eq!(project.fighters().get(8).unwrap().costumes[0].shared_skin, None);
}

#[test]
fn dangling_costume_link_is_rejected() {
    let mut project = project();
    let mut costume = Costume::new("Ghost", "PlMrNr.dat");
    costume.shared_skin = Some(SkinLink {
        fighter: 500,
        costume: 0,
    });
    let err = project.add_costume(8, costume).unwrap_err();
    assert!(matches!(err, ModelError::DanglingReference { .. }));
}

#[test]
fn music_removal_updates_playlists_and_themes() {
    let mut project = project();
    let m = vanilla::MUSIC.len();
    project.add_music(MusicTrack::new("One", "audio/one.hps")).unwrap();
    project.add_music(MusicTrack::new("Two", "audio/two.hps")).unwrap();

    let mut stage = Stage::new("Custom", "GrCustom.dat");
    stage.playlist = vec![0, m, m + 1];
    let stage_index = project.add_stage(stage).unwrap();

    let mut fighter = extended_fighter("Wolf");
    fighter.victory_theme = Some(m + 1);
    let fighter_index = project.add_fighter(fighter).unwrap();

    project.remove_music(m).unwrap();

    assert_eq!(project.stages().get(stage_index).unwrap().playlist, vec![0, m]);
    assert_eq!(
        project.fighters().get(fighter_index).unwrap().victory_theme,
        Some(m)
    );
}

#[test]
fn move_applies_permutation_to_references() {
    let mut project = project();
    let s = vanilla::SOUND_GROUPS.len();
    for name in ["a", "b", "c"] {
        project
            .add_sound_group(SoundGroup::new(name, format!("audio/us/{name}.ssm")))
            .unwrap();
    }
    let mut fighter = extended_fighter("Wolf");
    fighter.sound_bank = Some(s);
    let index = project.add_fighter(fighter).unwrap();

    project.move_sound_group(s, s + 2).unwrap();
    assert_eq!(project.sound_groups().get(s + 2).unwrap().name, "a");
    assert_eq!(project.fighters().get(index).unwrap().sound_bank, Some(s + 2));

    let err = project.move_sound_group(s, 0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[test]
fn series_removal_clears_references() {
    let mut project = project();
    let index = project.add_series(Series::new("Custom"));
    let mut fighter = extended_fighter("Wolf");
    fighter.series = Some(index);
    let f = project.add_fighter(fighter).unwrap();

    project.remove_series(index).unwrap();
    assert_eq!(project.fighters().get(f).unwrap().series, None);
    // Mario's series sits below the removed one.
    assert_eq!(project.fighters().get(8).unwrap().series, Some(0));
}

#[test]
fn roster_capacity_is_enforced() {
    let mut project = project();
    let capacity = mex_model::FIGHTER_LAYOUT.capacity;
    for i in project.fighters().len()..capacity {
        project.add_fighter(Fighter::new(format!("F{i}"), "PlXx.dat")).unwrap();
    }
    let err = project
        .add_fighter(Fighter::new("Overflow", "PlXx.dat"))
        .unwrap_err();
    assert!(matches!(err, ModelError::RosterFull { .. }));
}

#[test]
fn codes_are_unique_by_name() {
    let mut project = project();
    project.add_code(CodeEntry::new("Skip Intro", "04000000 00000000")).unwrap();
    let err = project
        .add_code(CodeEntry::new("Skip Intro", ""))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    project.set_code_enabled("Skip Intro", false).unwrap();
    assert!(!project.codes()[0].enabled);
    assert_eq!(
        project.remove_code("Missing").unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn project_json_round_trip() {
    let mut project = project();
    project.add_fighter(extended_fighter("Wolf")).unwrap();
    project.add_code(CodeEntry::new("A", "04000000 00000001")).unwrap();
    project.set_patch("boot", PatchBlob(vec![0x00, 0xD0, 0xC0, 0xDE]));
    project
        .mark_unbaked("csp/wolf.tex", mex_model::AssetKind::Portrait)
        .unwrap();

    let json = serde_json::to_string_pretty(&project).unwrap();
    let back: Project = serde_json::from_str(&json).unwrap();
    assert_eq!(back, project);
}

#[test]
fn unbaked_keys_are_normalized() {
    let mut project = project();
    project
        .mark_unbaked("\\csp\\PlWfGold.png", AssetKind::Portrait)
        .unwrap();
    assert!(project.unbaked().contains_key("csp/PlWfGold.png"));

    let err = project
        .mark_unbaked("./csp/PlWfGold.png", AssetKind::Portrait)
        .unwrap_err();
    assert!(matches!(err, ModelError::InvalidPath { .. }));
    assert_eq!(err.kind(), ErrorKind::Corrupt);
    assert_eq!(project.unbaked().len(), 1);
}

#[test]
fn removed_entries_release_pending_encodes() {
    let mut project = project();
    let mut wolf = extended_fighter("Wolf");
    wolf.costumes[0].csp = Some("csp/PlWfNr.png".to_string());
    let mut gold = Costume::new("Gold", "PlWfGold.dat");
    gold.csp = Some("csp/PlWfGold.png".to_string());
    wolf.costumes.push(gold);
    let index = project.add_fighter(wolf).unwrap();
    project
        .mark_unbaked("csp/PlWfNr.png", AssetKind::Portrait)
        .unwrap();
    project
        .mark_unbaked("csp/PlWfGold.png", AssetKind::Portrait)
        .unwrap();
    project.mark_unbaked("banner.png", AssetKind::Banner).unwrap();

    project.remove_costume(index, 1).unwrap();
    assert!(!project.unbaked().contains_key("csp/PlWfGold.png"));
    assert!(project.unbaked().contains_key("csp/PlWfNr.png"));

    project.remove_fighter(index).unwrap();
    let left: Vec<&str> = project.unbaked().keys().map(String::as_str).collect();
    assert_eq!(left, vec!["banner.png"]);
}

#[test]
fn shared_files_stay_pending_while_referenced() {
    let mut project = project();
    let mut wolf = extended_fighter("Wolf");
    wolf.costumes[0].csp = Some("csp/shared.png".to_string());
    let mut fox = extended_fighter("Fox2");
    fox.costumes[0].csp = Some("csp/shared.png".to_string());
    project.add_fighter(fox).unwrap();
    let wolf = project.add_fighter(wolf).unwrap();
    project
        .mark_unbaked("csp/shared.png", AssetKind::Portrait)
        .unwrap();

    project.remove_fighter(wolf).unwrap();
    assert!(project.unbaked().contains_key("csp/shared.png"));
}

#[test]
fn truncated_roster_fails_validation() {
    let project = project();
    let mut value = serde_json::to_value(&project).unwrap();
    value["stages"].as_array_mut().unwrap().pop();
    let broken: Project = serde_json::from_value(value).unwrap();
    let err = broken.validate().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Corrupt);
}
