mod common;

use std::fs;

use common::{farmer_mod, init_game_dir, write};
use modshim_core::db::HostLayout;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn platforms_lists_builtin_profiles() {
    assert_cmd::cargo::cargo_bin_cmd!("modshim")
        .arg("platforms")
        .assert()
        .success()
        .stdout(predicate::str::contains("windows-xna:"))
        .stdout(predicate::str::contains("android-monogame:"))
        .stdout(predicate::str::contains("SpriteBatchFacade"));
}

#[test]
fn platforms_json_is_parseable() {
    let output = assert_cmd::cargo::cargo_bin_cmd!("modshim")
        .arg("platforms")
        .arg("--json")
        .output()
        .expect("run platforms");
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    let entries = value.as_array().expect("array");
    assert_eq!(entries.len(), 5);
    assert!(entries.iter().any(|e| e["profile"]["name"] == "mac-monogame"));
}

#[test]
fn init_writes_settings_and_ledger() {
    let dir = tempdir().expect("tempdir");
    let root = dir.path();

    assert_cmd::cargo::cargo_bin_cmd!("modshim")
        .current_dir(root)
        .arg("init")
        .arg("--name")
        .arg("MyGame")
        .arg("--platform")
        .arg("linux")
        .arg("--paranoid")
        .arg("--host-module")
        .arg("StardewValley")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized modshim for 'MyGame'"));

    let layout = HostLayout::new(root);
    assert!(layout.ledger_path.exists(), "ledger should exist at {}", layout.ledger_path.display());
    assert!(layout.mods_dir.is_dir());
    let settings: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&layout.settings_path).expect("settings")).expect("json");
    assert_eq!(settings["platform"], "linux");
    assert_eq!(settings["framework"], "monogame");
    assert_eq!(settings["paranoid_mode"], true);
    assert_eq!(settings["host_modules"][0], "StardewValley");
}

#[test]
fn init_rejects_unsupported_platform_combination() {
    let dir = tempdir().expect("tempdir");
    assert_cmd::cargo::cargo_bin_cmd!("modshim")
        .arg("init")
        .arg("--game-dir")
        .arg(dir.path())
        .arg("--platform")
        .arg("linux")
        .arg("--framework")
        .arg("xna")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Framework xna is not available on linux"));
    assert!(!HostLayout::new(dir.path()).settings_path.exists());
}

#[test]
fn load_fails_when_settings_missing() {
    let dir = tempdir().expect("tempdir");
    assert_cmd::cargo::cargo_bin_cmd!("modshim")
        .arg("load")
        .arg("--game-dir")
        .arg(dir.path())
        .arg("--module")
        .arg(dir.path().join("Nope.dll"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read loader settings"));
}

#[test]
fn load_rewrites_and_writes_output() {
    let game = tempdir().expect("game dir");
    init_game_dir(game.path());
    let mods = tempdir().expect("mods dir");
    let module = write(mods.path(), &farmer_mod("ExampleMod", "Stardew Valley", "getTileLocation"));

    assert_cmd::cargo::cargo_bin_cmd!("modshim")
        .arg("load")
        .arg("--game-dir")
        .arg(game.path())
        .arg("--module")
        .arg(&module)
        .arg("--mod-id")
        .arg("Example.Mod")
        .assert()
        .success()
        .stdout(predicate::str::contains("Mod Example.Mod: loaded"))
        .stdout(predicate::str::contains("ExampleMod (rewritten)"))
        .stdout(predicate::str::contains("Rewriting ExampleMod.dll for OS..."));

    let output = HostLayout::new(game.path()).mod_output_dir("Example.Mod").expect("plain mod id").join("ExampleMod.dll");
    assert!(output.is_file(), "expected loaded image at {}", output.display());
}

#[test]
fn load_rejects_incompatible_mod_and_history_records_it() {
    let game = tempdir().expect("game dir");
    init_game_dir(game.path());
    let mods = tempdir().expect("mods dir");
    let module = write(mods.path(), &farmer_mod("StaleMod", "StardewValley", "removedMethod"));

    assert_cmd::cargo::cargo_bin_cmd!("modshim")
        .arg("load")
        .arg("--game-dir")
        .arg(game.path())
        .arg("--module")
        .arg(&module)
        .assert()
        .failure()
        .stdout(predicate::str::contains("Mod StaleMod: rejected"))
        .stderr(predicate::str::contains("Mod 'StaleMod' was rejected"));
    let rejected_dir = HostLayout::new(game.path()).mod_output_dir("StaleMod").expect("plain mod id");
    assert!(!rejected_dir.join("StaleMod.dll").exists(), "rejected mod must not be written");

    assert_cmd::cargo::cargo_bin_cmd!("modshim")
        .arg("load")
        .arg("--game-dir")
        .arg(game.path())
        .arg("--module")
        .arg(&module)
        .arg("--assume-compatible")
        .arg("--mod-id")
        .arg("StaleMod.Forced")
        .assert()
        .success()
        .stdout(predicate::str::contains("Warnings: BrokenCodeLoaded"));

    let output = assert_cmd::cargo::cargo_bin_cmd!("modshim")
        .arg("history")
        .arg("--game-dir")
        .arg(game.path())
        .arg("--json")
        .output()
        .expect("run history");
    assert!(output.status.success());
    let runs: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    let runs = runs.as_array().expect("array");
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0]["status"], "rejected");
    assert_eq!(runs[0]["mod_id"], "StaleMod");
    assert_eq!(runs[1]["status"], "loaded");
    assert_eq!(runs[1]["modules"][0]["module"], "StaleMod");

    assert_cmd::cargo::cargo_bin_cmd!("modshim")
        .arg("history")
        .arg("--game-dir")
        .arg(game.path())
        .arg("--mod-id")
        .arg("StaleMod")
        .assert()
        .success()
        .stdout(predicate::str::contains("StaleMod (StaleMod.dll) rejected"))
        .stdout(predicate::str::contains("StaleMod.Forced").not());
}

#[test]
fn load_refuses_mod_id_with_path_separators() {
    let game = tempdir().expect("game dir");
    init_game_dir(game.path());
    let mods = tempdir().expect("mods dir");
    let module = write(mods.path(), &farmer_mod("ExampleMod", "StardewValley", "getTileLocation"));

    assert_cmd::cargo::cargo_bin_cmd!("modshim")
        .arg("load")
        .arg("--game-dir")
        .arg(game.path())
        .arg("--module")
        .arg(&module)
        .arg("--mod-id")
        .arg("../escape")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid mod id '../escape'"));
    assert!(!game.path().join(".modshim").join("escape").exists());
}

#[test]
fn load_json_reports_modules() {
    let game = tempdir().expect("game dir");
    init_game_dir(game.path());
    let mods = tempdir().expect("mods dir");
    let module = write(mods.path(), &farmer_mod("CleanMod", "StardewValley", "getTileLocation"));

    let output = assert_cmd::cargo::cargo_bin_cmd!("modshim")
        .arg("load")
        .arg("--game-dir")
        .arg(game.path())
        .arg("--module")
        .arg(&module)
        .arg("--json")
        .output()
        .expect("run load");
    assert!(output.status.success());
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(summary["status"], "loaded");
    assert_eq!(summary["modules"][0]["name"], "CleanMod");
    assert_eq!(summary["modules"][0]["rewritten"], false);
    assert!(summary["messages"].as_array().expect("messages").is_empty());
}

#[test]
fn inspect_summarizes_module() {
    let dir = tempdir().expect("tempdir");
    let module = write(dir.path(), &farmer_mod("ExampleMod", "Stardew Valley", "getTileLocation"));

    assert_cmd::cargo::cargo_bin_cmd!("modshim")
        .arg("inspect")
        .arg(&module)
        .assert()
        .success()
        .stdout(predicate::str::contains("Module ExampleMod v1.0.0.0"))
        .stdout(predicate::str::contains("Stardew Valley, Version=1.5.0.0"))
        .stdout(predicate::str::contains("Entry() 2 instructions"));
}

#[test]
fn inspect_rejects_non_module() {
    let dir = tempdir().expect("tempdir");
    let junk = dir.path().join("junk.dll");
    fs::write(&junk, b"junk").expect("write junk");

    assert_cmd::cargo::cargo_bin_cmd!("modshim")
        .arg("inspect")
        .arg(&junk)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse module"));
}
