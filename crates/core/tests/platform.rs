mod common;

use std::fs;

use common::{monogame_framework, stardew_valley, v, windows_monogame, write, write_game_dir};
use modshim_core::model::{ModuleBuilder, TypeBuilder};
use modshim_core::services::platform::{
    GameFramework, Platform, PlatformError, PlatformProfile, PlatformTargetMap,
};
use tempfile::tempdir;

#[test]
fn builtin_profiles_cover_supported_combinations() {
    let all = PlatformProfile::builtin_all();
    // Every platform runs MonoGame; only Windows also has the XNA build.
    assert_eq!(all.len(), Platform::ALL.len() + 1);

    let xna = PlatformProfile::builtin(Platform::Windows, GameFramework::Xna).expect("windows xna");
    assert!(xna.remove.contains(&"StardewValley".to_string()));
    assert!(xna.targets.contains(&"Stardew Valley".to_string()));
    assert!(xna.facades.is_empty());

    let mono = windows_monogame();
    assert_eq!(mono.name, "windows-monogame");
    assert_eq!(mono.targets, vec!["StardewValley".to_string(), "MonoGame.Framework".to_string()]);
    assert_eq!(mono.facades.len(), 1);
}

#[test]
fn unsupported_combination_is_an_error() {
    let err = PlatformProfile::builtin(Platform::Linux, GameFramework::Xna).expect_err("linux xna");
    assert!(matches!(err, PlatformError::UnsupportedCombination { .. }));
    assert_eq!(err.to_string(), "Framework xna is not available on linux");
}

#[test]
fn platform_names_parse_case_insensitively() {
    assert_eq!("Android".parse::<Platform>().expect("parse"), Platform::Android);
    assert_eq!("MONOGAME".parse::<GameFramework>().expect("parse"), GameFramework::MonoGame);
    assert!("amiga".parse::<Platform>().is_err());
}

#[test]
fn target_map_indexes_public_types_only() {
    let map = PlatformTargetMap::build(windows_monogame(), &[stardew_valley(), monogame_framework()])
        .expect("build");
    assert_eq!(map.owner_of("StardewValley.Farmer"), Some("StardewValley"));
    assert_eq!(map.owner_of("Microsoft.Xna.Framework.Vector2"), Some("MonoGame.Framework"));
    assert_eq!(map.owner_of("StardewValley.InternalHelper"), None);
    assert!(map.is_removed("Netcode"));
    assert!(!map.is_removed("StardewValley"));
    let targets: Vec<_> = map.targets().map(|t| t.name.clone()).collect();
    assert_eq!(targets, vec!["MonoGame.Framework".to_string(), "StardewValley".to_string()]);
}

#[test]
fn build_requires_every_target() {
    let err = PlatformTargetMap::build(windows_monogame(), &[stardew_valley()]).expect_err("missing");
    assert!(matches!(err, PlatformError::TargetModuleNotProvided { ref name } if name == "MonoGame.Framework"));
}

#[test]
fn locate_reads_targets_from_game_dir() {
    let dir = tempdir().expect("tempdir");
    write_game_dir(dir.path());
    let (map, modules) = PlatformTargetMap::locate(windows_monogame(), dir.path()).expect("locate");
    assert_eq!(modules.len(), 2);
    assert!(map.indexed_type_count() >= 7);
}

#[test]
fn locate_reports_missing_and_mismatched_modules() {
    let dir = tempdir().expect("tempdir");
    write(dir.path(), &stardew_valley());
    let err = PlatformTargetMap::locate(windows_monogame(), dir.path()).expect_err("missing");
    assert!(matches!(err, PlatformError::MissingTargetModule { .. }));

    // A file named for the target that contains some other module.
    let impostor = ModuleBuilder::new("Impostor", v(1, 0)).build();
    fs::write(dir.path().join("MonoGame.Framework.dll"), modshim_core::codec::write_module(&impostor))
        .expect("write impostor");
    let err = PlatformTargetMap::locate(windows_monogame(), dir.path()).expect_err("mismatch");
    assert!(matches!(err, PlatformError::MismatchedTargetModule { ref found, .. } if found == "Impostor"));
}

#[test]
fn profile_loads_from_yaml_and_rejects_conflicts() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("profile.yaml");
    fs::write(
        &path,
        "name: custom\nremove:\n  - OldEngine\ntargets:\n  - NewEngine\n",
    )
    .expect("write yaml");
    let profile = PlatformProfile::from_path(&path).expect("yaml profile");
    assert_eq!(profile.name, "custom");
    assert_eq!(profile.remove, vec!["OldEngine".to_string()]);
    assert!(profile.facades.is_empty());

    let json = dir.path().join("bad.json");
    fs::write(&json, r#"{"name":"bad","remove":["Same"],"targets":["Same"]}"#).expect("write json");
    let err = PlatformProfile::from_path(&json).expect_err("conflict");
    assert!(err.to_string().contains("both removes and targets 'Same'"));
}

#[test]
fn custom_profile_targets_are_indexed() {
    let mut b = ModuleBuilder::new("NewEngine", v(2, 0));
    b.add_type(TypeBuilder::new("Engine", "Renderer").public());
    let profile = PlatformProfile {
        name: "custom".into(),
        remove: vec!["OldEngine".into()],
        targets: vec!["NewEngine".into()],
        facades: Vec::new(),
    };
    let map = PlatformTargetMap::build(profile, &[b.build()]).expect("build");
    assert_eq!(map.owner_of("Engine.Renderer"), Some("NewEngine"));
    assert_eq!(map.target_reference("NewEngine").map(|r| r.version), Some(v(2, 0)));
}
