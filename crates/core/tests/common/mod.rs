#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use modshim_core::codec::write_module;
use modshim_core::model::{BinaryModule, ModuleBuilder, ModuleVersion, TypeBuilder};
use modshim_core::monitor::MemoryMonitor;
use modshim_core::services::definitions::DefinitionIndex;
use modshim_core::services::handlers::{CompatibilityRules, FACADE_ASSEMBLY};
use modshim_core::services::loader::{LoaderOptions, ModLoader};
use modshim_core::services::platform::{GameFramework, Platform, PlatformProfile, PlatformTargetMap};
use modshim_core::services::runtime::{InMemoryRuntime, ModuleRuntime};

pub fn v(major: u16, minor: u16) -> ModuleVersion {
    ModuleVersion::new(major, minor, 0, 0)
}

/// Write `module` as `<dir>/<name>.dll` and return the path.
pub fn write(dir: &Path, module: &BinaryModule) -> PathBuf {
    let path = dir.join(format!("{}.dll", module.name));
    fs::write(&path, write_module(module)).expect("write module");
    path
}

/// Replacement game module for the MonoGame builds.
pub fn stardew_valley() -> BinaryModule {
    let mut b = ModuleBuilder::new("StardewValley", v(1, 6));
    b.add_type(
        TypeBuilder::new("StardewValley", "Game1")
            .public()
            .field("ticks", true, "int")
            .method("Update", false, vec![]),
    );
    b.add_type(
        TypeBuilder::new("StardewValley", "Farmer")
            .public()
            .field("name", false, "string")
            .abstract_method("get_Money", false)
            .abstract_method("set_Money", false)
            .abstract_method("getTileLocation", false),
    );
    b.add_type(TypeBuilder::new("StardewValley", "AnimalHouse").public().abstract_method("getIncubator", false));
    b.add_type(TypeBuilder::new("StardewValley", "SaveGame").public().field("serializer", true, "XmlSerializer"));
    b.add_type(TypeBuilder::new("StardewValley.Network", "NetDirection").public());
    b.add_type(TypeBuilder::new("StardewValley", "InternalHelper"));
    b.build()
}

pub fn monogame_framework() -> BinaryModule {
    let mut b = ModuleBuilder::new("MonoGame.Framework", v(3, 8));
    b.add_type(
        TypeBuilder::new("Microsoft.Xna.Framework.Graphics", "SpriteBatch")
            .public()
            .abstract_method("Begin", false)
            .abstract_method("Draw", false),
    );
    b.add_type(TypeBuilder::new("Microsoft.Xna.Framework", "Vector2").public().field("X", false, "float"));
    b.build()
}

pub fn windows_monogame() -> PlatformProfile {
    PlatformProfile::builtin(Platform::Windows, GameFramework::MonoGame).expect("builtin profile")
}

/// Write the platform replacement modules into a game directory.
pub fn write_game_dir(dir: &Path) {
    write(dir, &stardew_valley());
    write(dir, &monogame_framework());
}

/// Loader session backed by memory, with the game modules indexed.
pub fn loader(options: LoaderOptions) -> ModLoader<MemoryMonitor, InMemoryRuntime> {
    loader_with(options, InMemoryRuntime::new())
}

/// Loader session over the given runtime, with the game modules indexed.
pub fn loader_with<R: ModuleRuntime>(options: LoaderOptions, runtime: R) -> ModLoader<MemoryMonitor, R> {
    let targets = vec![stardew_valley(), monogame_framework()];
    let map = PlatformTargetMap::build(windows_monogame(), &targets).expect("target map");
    let mut definitions = DefinitionIndex::new();
    for module in &targets {
        definitions.add(module);
    }
    definitions.add_ambient("mscorlib");
    definitions.add_ambient(FACADE_ASSEMBLY);
    ModLoader::new(
        options,
        map,
        CompatibilityRules::builtin(),
        definitions,
        MemoryMonitor::new(),
        runtime,
    )
}

pub fn default_loader() -> ModLoader<MemoryMonitor, InMemoryRuntime> {
    loader(LoaderOptions::default())
}
