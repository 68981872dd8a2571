//! Mod metadata seen by the loader.
//!
//! The manifest itself is parsed and validated elsewhere; the loader only
//! needs the mod's identity, its entry module and a warning sink.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Bitset of compatibility warnings raised while loading a mod.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModWarning(u32);

impl ModWarning {
    pub const NONE: ModWarning = ModWarning(0);
    /// Incompatible code was detected but loaded anyway.
    pub const BROKEN_CODE_LOADED: ModWarning = ModWarning(1 << 0);
    /// The mod patches game code at runtime.
    pub const PATCHES_GAME: ModWarning = ModWarning(1 << 1);
    pub const CHANGES_SAVE_SERIALIZER: ModWarning = ModWarning(1 << 2);
    pub const USES_UNVALIDATED_UPDATE_TICK: ModWarning = ModWarning(1 << 3);
    pub const USES_DYNAMIC: ModWarning = ModWarning(1 << 4);
    pub const ACCESSES_CONSOLE: ModWarning = ModWarning(1 << 5);
    pub const ACCESSES_FILESYSTEM: ModWarning = ModWarning(1 << 6);
    pub const ACCESSES_SHELL: ModWarning = ModWarning(1 << 7);

    const NAMED: [(ModWarning, &'static str); 8] = [
        (ModWarning::BROKEN_CODE_LOADED, "BrokenCodeLoaded"),
        (ModWarning::PATCHES_GAME, "PatchesGame"),
        (ModWarning::CHANGES_SAVE_SERIALIZER, "ChangesSaveSerializer"),
        (ModWarning::USES_UNVALIDATED_UPDATE_TICK, "UsesUnvalidatedUpdateTick"),
        (ModWarning::USES_DYNAMIC, "UsesDynamic"),
        (ModWarning::ACCESSES_CONSOLE, "AccessesConsole"),
        (ModWarning::ACCESSES_FILESYSTEM, "AccessesFilesystem"),
        (ModWarning::ACCESSES_SHELL, "AccessesShell"),
    ];

    pub fn bits(self) -> u32 {
        self.0
    }

    /// Rebuild from stored bits, dropping unknown ones.
    pub fn from_bits_truncate(bits: u32) -> Self {
        let known = Self::NAMED.iter().fold(0, |acc, (flag, _)| acc | flag.0);
        ModWarning(bits & known)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: ModWarning) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: ModWarning) {
        self.0 |= other.0;
    }

    /// Names of the flags that are set, in bit order.
    pub fn names(self) -> Vec<&'static str> {
        Self::NAMED.iter().filter(|(flag, _)| self.contains(*flag)).map(|(_, name)| *name).collect()
    }
}

impl std::ops::BitOr for ModWarning {
    type Output = ModWarning;

    fn bitor(self, rhs: ModWarning) -> ModWarning {
        ModWarning(self.0 | rhs.0)
    }
}

impl fmt::Display for ModWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        f.write_str(&self.names().join(", "))
    }
}

/// The slice of a mod's metadata record that the loader reads and updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModMetadata {
    /// Unique mod id from the manifest.
    pub id: String,
    pub name: String,
    /// Entry module file name declared by the manifest, e.g. `MyMod.dll`.
    pub entry_module: String,
    #[serde(default)]
    warnings: ModWarning,
}

impl ModMetadata {
    pub fn new(id: impl Into<String>, name: impl Into<String>, entry_module: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            entry_module: entry_module.into(),
            warnings: ModWarning::NONE,
        }
    }

    /// Raise a warning flag. Flags are never cleared during a load pass.
    pub fn set_warning(&mut self, warning: ModWarning) {
        self.warnings.insert(warning);
    }

    pub fn warnings(&self) -> ModWarning {
        self.warnings
    }

    pub fn has_warning(&self, warning: ModWarning) -> bool {
        self.warnings.contains(warning)
    }
}
