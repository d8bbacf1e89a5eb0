//! Manifest of the unmodified game's rosters.
//!
//! Table order is external ID order. A fresh project copies these tables
//! verbatim, so at vanilla size every internal ID equals its external ID.

use crate::entries::{Fighter, MusicTrack, Series, SoundGroup, Stage};
use crate::error::Result;
use crate::project::{BuildInfo, Project};

/// Vanilla fighter slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VanillaFighter {
    pub name: &'static str,
    /// Two-letter file code, as in `Pl{code}.dat`.
    pub code: &'static str,
    pub series: usize,
    /// Sound bank file stem.
    pub sound_bank: &'static str,
}

impl VanillaFighter {
    #[must_use]
    pub fn file(&self) -> String {
        format!("Pl{}.dat", self.code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VanillaStage {
    pub name: &'static str,
    /// File code, as in `Gr{code}.dat`.
    pub code: &'static str,
    /// Music file stem of the stage's default track.
    pub music: &'static str,
    pub series: usize,
}

impl VanillaStage {
    #[must_use]
    pub fn file(&self) -> String {
        format!("Gr{}.dat", self.code)
    }
}

pub const SERIES: &[&str] = &[
    "Super Mario",
    "Donkey Kong",
    "The Legend of Zelda",
    "Metroid",
    "Yoshi",
    "Kirby",
    "Star Fox",
    "Pokemon",
    "F-Zero",
    "EarthBound",
    "Fire Emblem",
    "Game & Watch",
    "Ice Climber",
    "Super Smash Bros.",
];

const fn fighter(
    name: &'static str,
    code: &'static str,
    series: usize,
    sound_bank: &'static str,
) -> VanillaFighter {
    VanillaFighter {
        name,
        code,
        series,
        sound_bank,
    }
}

pub const FIGHTERS: &[VanillaFighter] = &[
    fighter("Captain Falcon", "Ca", 8, "captain"),
    fighter("Donkey Kong", "Dk", 1, "donkey"),
    fighter("Fox", "Fx", 6, "fox"),
    fighter("Mr. Game & Watch", "Gw", 11, "gamewatch"),
    fighter("Kirby", "Kb", 5, "kirby"),
    fighter("Bowser", "Kp", 0, "koopa"),
    fighter("Link", "Lk", 2, "link"),
    fighter("Luigi", "Lg", 0, "luigi"),
    fighter("Mario", "Mr", 0, "mario"),
    fighter("Marth", "Ms", 10, "mars"),
    fighter("Mewtwo", "Mt", 7, "mewtwo"),
    fighter("Ness", "Ns", 9, "ness"),
    fighter("Peach", "Pe", 0, "peach"),
    fighter("Pikachu", "Pk", 7, "pikachu"),
    fighter("Ice Climbers", "Pp", 12, "popo"),
    fighter("Jigglypuff", "Pr", 7, "purin"),
    fighter("Samus", "Ss", 3, "samus"),
    fighter("Yoshi", "Ys", 4, "yoshi"),
    fighter("Zelda", "Zd", 2, "zelda"),
    fighter("Sheik", "Sk", 2, "seak"),
    fighter("Falco", "Fc", 6, "falco"),
    fighter("Young Link", "Cl", 2, "clink"),
    fighter("Dr. Mario", "Dr", 0, "drmario"),
    fighter("Roy", "Fe", 10, "emblem"),
    fighter("Pichu", "Pc", 7, "pichu"),
    fighter("Ganondorf", "Gn", 2, "ganon"),
    fighter("Master Hand", "Mh", 13, "boss"),
    fighter("Wireframe Male", "Bo", 13, "main"),
    fighter("Wireframe Female", "Gl", 13, "main"),
    fighter("Giga Bowser", "Gk", 0, "gkoopa"),
    fighter("Crazy Hand", "Ch", 13, "boss"),
    fighter("Sandbag", "Sb", 13, "main"),
    fighter("Popo", "Pp", 12, "popo"),
];

const fn stage(
    name: &'static str,
    code: &'static str,
    music: &'static str,
    series: usize,
) -> VanillaStage {
    VanillaStage {
        name,
        code,
        music,
        series,
    }
}

pub const STAGES: &[VanillaStage] = &[
    stage("Princess Peach's Castle", "Cs", "castle", 0),
    stage("Rainbow Cruise", "Rc", "rcruise", 0),
    stage("Kongo Jungle", "Kg", "kongo", 1),
    stage("Jungle Japes", "Gd", "garden", 1),
    stage("Great Bay", "Gb", "greatbay", 2),
    stage("Temple", "Sh", "shrine", 2),
    stage("Brinstar", "Ze", "zebes", 3),
    stage("Brinstar Depths", "Kr", "kraid", 3),
    stage("Yoshi's Story", "St", "ystory", 4),
    stage("Yoshi's Island", "Yt", "yorster", 4),
    stage("Fountain of Dreams", "Iz", "izumi", 5),
    stage("Green Greens", "Gr", "greens", 5),
    stage("Corneria", "Cn", "corneria", 6),
    stage("Venom", "Ve", "venom", 6),
    stage("Pokemon Stadium", "Ps", "pstadium", 7),
    stage("Poke Floats", "Pu", "pura", 7),
    stage("Mute City", "Mc", "mutecity", 8),
    stage("Big Blue", "Bb", "bigblue", 8),
    stage("Onett", "On", "onett", 9),
    stage("Fourside", "Fs", "fourside", 9),
    stage("Icicle Mountain", "Im", "icemt", 12),
    stage("Mushroom Kingdom", "I1", "inis1_01", 0),
    stage("Mushroom Kingdom II", "I2", "inis2_01", 0),
    stage("Flat Zone", "Fz", "flatzone", 11),
    stage("Dream Land N64", "Op", "old_kb", 5),
    stage("Yoshi's Island N64", "Oy", "old_ys", 4),
    stage("Kongo Jungle N64", "Ok", "old_dk", 1),
    stage("Battlefield", "NBa", "hyaku", 13),
    stage("Final Destination", "NLa", "last", 13),
];

/// Music tracks as `(name, file stem)`.
pub const MUSIC: &[(&str, &str)] = &[
    ("Princess Peach's Castle", "castle"),
    ("Rainbow Cruise", "rcruise"),
    ("Kongo Jungle", "kongo"),
    ("Jungle Japes", "garden"),
    ("Great Bay", "greatbay"),
    ("Temple", "shrine"),
    ("Brinstar", "zebes"),
    ("Brinstar Depths", "kraid"),
    ("Yoshi's Story", "ystory"),
    ("Yoshi's Island", "yorster"),
    ("Fountain of Dreams", "izumi"),
    ("Green Greens", "greens"),
    ("Corneria", "corneria"),
    ("Venom", "venom"),
    ("Pokemon Stadium", "pstadium"),
    ("Poke Floats", "pura"),
    ("Mute City", "mutecity"),
    ("Big Blue", "bigblue"),
    ("Onett", "onett"),
    ("Fourside", "fourside"),
    ("Icicle Mountain", "icemt"),
    ("Mushroom Kingdom", "inis1_01"),
    ("Mushroom Kingdom II", "inis2_01"),
    ("Flat Zone", "flatzone"),
    ("Dream Land N64", "old_kb"),
    ("Yoshi's Island N64", "old_ys"),
    ("Kongo Jungle N64", "old_dk"),
    ("Multi-Man Melee", "hyaku"),
    ("Final Destination", "last"),
    ("Menu 1", "menu01"),
    ("Menu 2", "menu02"),
    ("Opening", "opening"),
    ("Trophy", "fgetfanfare"),
    ("How to Play", "howto"),
];

/// Sound bank file stems.
pub const SOUND_GROUPS: &[&str] = &[
    "main",
    "nr_name",
    "nr_select",
    "nr_title",
    "nr_vs",
    "nr_1p",
    "smash2",
    "pokemon",
    "captain",
    "clink",
    "donkey",
    "drmario",
    "emblem",
    "falco",
    "fox",
    "gamewatch",
    "ganon",
    "gkoopa",
    "kirby",
    "koopa",
    "link",
    "luigi",
    "mario",
    "mars",
    "mewtwo",
    "ness",
    "peach",
    "pichu",
    "pikachu",
    "popo",
    "purin",
    "samus",
    "seak",
    "yoshi",
    "zelda",
    "boss",
    "end",
];

#[must_use]
pub fn music_path(stem: &str) -> String {
    format!("audio/{stem}.hps")
}

#[must_use]
pub fn sound_group_path(stem: &str) -> String {
    format!("audio/us/{stem}.ssm")
}

fn music_index(stem: &str) -> Option<usize> {
    MUSIC.iter().position(|(_, s)| *s == stem)
}

fn sound_group_index(stem: &str) -> Option<usize> {
    SOUND_GROUPS.iter().position(|s| *s == stem)
}

/// Builds the identity-mapped project of the unmodified game.
///
/// Costumes are left empty; extraction discovers them from the image.
pub fn seed_project() -> Result<Project> {
    let fighters = FIGHTERS
        .iter()
        .map(|v| Fighter {
            series: Some(v.series),
            sound_bank: sound_group_index(v.sound_bank),
            ..Fighter::new(v.name, v.file())
        })
        .collect();

    let stages = STAGES
        .iter()
        .map(|v| Stage {
            playlist: music_index(v.music).into_iter().collect(),
            series: Some(v.series),
            ..Stage::new(v.name, v.file())
        })
        .collect();

    let music = MUSIC
        .iter()
        .map(|(name, stem)| MusicTrack::new(*name, music_path(stem)))
        .collect();

    let sound_groups = SOUND_GROUPS
        .iter()
        .map(|stem| SoundGroup::new(*stem, sound_group_path(stem)))
        .collect();

    let series = SERIES.iter().map(|name| Series::new(*name)).collect();

    Project::from_rosters(
        BuildInfo::default(),
        fighters,
        stages,
        music,
        sound_groups,
        series,
    )
}
