#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use modshim_core::codec::write_module;
use modshim_core::model::{
    BinaryModule, Instruction, ModuleBuilder, ModuleVersion, OpCode, Operand, TypeBuilder, TypeHandle,
};

pub fn v(major: u16, minor: u16) -> ModuleVersion {
    ModuleVersion::new(major, minor, 0, 0)
}

pub fn write(dir: &Path, module: &BinaryModule) -> PathBuf {
    let path = dir.join(format!("{}.dll", module.name));
    fs::write(&path, write_module(module)).expect("write module");
    path
}

/// Platform modules for the MonoGame builds.
pub fn write_game_modules(dir: &Path) {
    let mut sv = ModuleBuilder::new("StardewValley", v(1, 6));
    sv.add_type(
        TypeBuilder::new("StardewValley", "Farmer")
            .public()
            .abstract_method("getTileLocation", false),
    );
    write(dir, &sv.build());

    let mut mono = ModuleBuilder::new("MonoGame.Framework", v(3, 8));
    mono.add_type(TypeBuilder::new("Microsoft.Xna.Framework", "Vector2").public());
    write(dir, &mono.build());
}

/// A mod that calls `StardewValley.Farmer.<method>` via the given game reference.
pub fn farmer_mod(name: &str, game_ref: &str, method: &str) -> BinaryModule {
    let mut b = ModuleBuilder::new(name, v(1, 0));
    let game = b.assembly_ref(game_ref, v(1, 5));
    let farmer = b.type_ref(game, "StardewValley", "Farmer");
    let call = b.method_ref(TypeHandle::Ref(farmer), method, "void()");
    b.add_type(TypeBuilder::new(name, "ModEntry").public().method(
        "Entry",
        false,
        vec![Instruction::new(OpCode::CallVirt, Operand::Member(call)), Instruction::simple(OpCode::Ret)],
    ));
    b.build()
}

/// Run `modshim init` for a windows/monogame game directory with platform modules in place.
pub fn init_game_dir(dir: &Path) {
    write_game_modules(dir);
    assert_cmd::cargo::cargo_bin_cmd!("modshim")
        .arg("init")
        .arg("--game-dir")
        .arg(dir)
        .assert()
        .success();
}
