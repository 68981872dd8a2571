use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::{read_module, ModuleReadError, MODULE_EXTENSION};
use crate::model::{AssemblyRef, BinaryModule};
use crate::services::handlers::{MemberRedirect, FACADE_ASSEMBLY};

const REWRITERS_NAMESPACE: &str = "StardewModdingAPI.Framework.ModLoading.Rewriters";

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Framework {framework} is not available on {platform}")]
    UnsupportedCombination { platform: Platform, framework: GameFramework },
    #[error("Platform profile '{profile}' both removes and targets '{name}'")]
    ConflictingProfile { profile: String, name: String },
    #[error("Could not find platform module '{name}' at {}", path.display())]
    MissingTargetModule { name: String, path: PathBuf },
    #[error("Platform module '{name}' was not provided")]
    TargetModuleNotProvided { name: String },
    #[error("Could not read platform module {}: {source}", path.display())]
    UnreadableTargetModule {
        path: PathBuf,
        #[source]
        source: ModuleReadError,
    },
    #[error("Platform module at {} is named '{found}', expected '{expected}'", path.display())]
    MismatchedTargetModule { path: PathBuf, expected: String, found: String },
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Unknown {kind} '{value}'")]
    UnknownName { kind: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Linux,
    Mac,
    Android,
}

impl Platform {
    pub const ALL: [Platform; 4] = [Platform::Windows, Platform::Linux, Platform::Mac, Platform::Android];

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::Linux => "linux",
            Platform::Mac => "mac",
            Platform::Android => "android",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| PlatformError::UnknownName { kind: "platform", value: s.to_string() })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameFramework {
    Xna,
    MonoGame,
}

impl GameFramework {
    pub const ALL: [GameFramework; 2] = [GameFramework::Xna, GameFramework::MonoGame];

    pub fn as_str(self) -> &'static str {
        match self {
            GameFramework::Xna => "xna",
            GameFramework::MonoGame => "monogame",
        }
    }
}

impl fmt::Display for GameFramework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameFramework {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GameFramework::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| PlatformError::UnknownName { kind: "framework", value: s.to_string() })
    }
}

/// Which platform modules to phase out and what replaces them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformProfile {
    pub name: String,
    /// Module names whose references are removed from mods.
    pub remove: Vec<String>,
    /// Replacement module names, loaded from the game directory.
    pub targets: Vec<String>,
    /// Member redirects applied only when a mod's platform references were swapped.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub facades: Vec<MemberRedirect>,
}

impl PlatformProfile {
    /// Built-in platform knowledge for the given platform and framework.
    pub fn builtin(platform: Platform, framework: GameFramework) -> Result<Self, PlatformError> {
        let xna = [
            "Microsoft.Xna.Framework",
            "Microsoft.Xna.Framework.Game",
            "Microsoft.Xna.Framework.Graphics",
            "Microsoft.Xna.Framework.Xact",
        ];
        let profile = match (platform, framework) {
            (_, GameFramework::MonoGame) => PlatformProfile {
                name: format!("{platform}-{framework}"),
                remove: ["Stardew Valley", "Netcode"]
                    .into_iter()
                    .chain(xna)
                    .map(String::from)
                    .collect(),
                targets: vec!["StardewValley".into(), "MonoGame.Framework".into()],
                facades: vec![MemberRedirect {
                    from_type: "Microsoft.Xna.Framework.Graphics.SpriteBatch".into(),
                    from_member: "Begin".into(),
                    to_assembly: FACADE_ASSEMBLY.into(),
                    to_type: format!("{REWRITERS_NAMESPACE}.SpriteBatchFacade"),
                    to_member: "Begin".into(),
                    is_static: false,
                }],
            },
            (Platform::Windows, GameFramework::Xna) => PlatformProfile {
                name: format!("{platform}-{framework}"),
                remove: vec!["StardewValley".into(), "MonoGame.Framework".into()],
                targets: ["Stardew Valley", "Netcode"]
                    .into_iter()
                    .chain(xna)
                    .map(String::from)
                    .collect(),
                facades: Vec::new(),
            },
            (platform, framework) => {
                return Err(PlatformError::UnsupportedCombination { platform, framework })
            }
        };
        Ok(profile)
    }

    /// Every valid built-in profile.
    pub fn builtin_all() -> Vec<(Platform, GameFramework, PlatformProfile)> {
        let mut out = Vec::new();
        for platform in Platform::ALL {
            for framework in GameFramework::ALL {
                if let Ok(profile) = PlatformProfile::builtin(platform, framework) {
                    out.push((platform, framework, profile));
                }
            }
        }
        out
    }

    /// Load a profile from YAML or JSON (chosen by file extension).
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read platform profile at {}", path.display()))?;
        let profile: PlatformProfile = if path.extension().and_then(|e| e.to_str()) == Some("json")
        {
            serde_json::from_slice(&bytes).context("Failed to parse platform profile JSON")?
        } else {
            serde_yaml::from_slice(&bytes).context("Failed to parse platform profile YAML")?
        };
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<(), PlatformError> {
        if let Some(name) = self.targets.iter().find(|t| self.remove.contains(t)) {
            return Err(PlatformError::ConflictingProfile {
                profile: self.name.clone(),
                name: name.clone(),
            });
        }
        Ok(())
    }
}

/// Read-only mapping from removed platform modules to their replacements.
///
/// Built once per loader; the type index covers every public type of every
/// replacement module, except compiler-generated namespaces.
#[derive(Debug, Clone)]
pub struct PlatformTargetMap {
    profile: PlatformProfile,
    targets: BTreeMap<String, AssemblyRef>,
    type_index: BTreeMap<String, String>,
}

impl PlatformTargetMap {
    /// Build from already-parsed replacement modules.
    pub fn build(profile: PlatformProfile, modules: &[BinaryModule]) -> Result<Self, PlatformError> {
        profile.validate()?;
        let mut targets = BTreeMap::new();
        let mut type_index = BTreeMap::new();
        for name in &profile.targets {
            let module = modules
                .iter()
                .find(|m| &m.name == name)
                .ok_or_else(|| PlatformError::TargetModuleNotProvided { name: name.clone() })?;
            targets.insert(name.clone(), module.identity());
            for type_name in module.public_type_names() {
                type_index.insert(type_name, name.clone());
            }
        }
        Ok(Self { profile, targets, type_index })
    }

    /// Read `<dir>/<target>.dll` for every target and build the map.
    ///
    /// Returns the parsed replacement modules as well so callers can index them.
    pub fn locate(profile: PlatformProfile, dir: &Path) -> Result<(Self, Vec<BinaryModule>), PlatformError> {
        let mut modules = Vec::new();
        for name in &profile.targets {
            let path = dir.join(format!("{name}.{MODULE_EXTENSION}"));
            if !path.is_file() {
                return Err(PlatformError::MissingTargetModule { name: name.clone(), path });
            }
            let bytes = std::fs::read(&path)
                .map_err(|source| PlatformError::Io { path: path.clone(), source })?;
            let module = read_module(&bytes)
                .map_err(|source| PlatformError::UnreadableTargetModule { path: path.clone(), source })?;
            if &module.name != name {
                return Err(PlatformError::MismatchedTargetModule {
                    path,
                    expected: name.clone(),
                    found: module.name,
                });
            }
            modules.push(module);
        }
        let map = Self::build(profile, &modules)?;
        Ok((map, modules))
    }

    pub fn profile(&self) -> &PlatformProfile {
        &self.profile
    }

    pub fn remove_names(&self) -> &[String] {
        &self.profile.remove
    }

    pub fn is_removed(&self, name: &str) -> bool {
        self.profile.remove.iter().any(|r| r == name)
    }

    /// Replacement module identities, ordered by name.
    pub fn targets(&self) -> impl Iterator<Item = &AssemblyRef> {
        self.targets.values()
    }

    pub fn target_reference(&self, name: &str) -> Option<&AssemblyRef> {
        self.targets.get(name)
    }

    /// Replacement module that defines the given public type.
    pub fn owner_of(&self, type_name: &str) -> Option<&str> {
        self.type_index.get(type_name).map(String::as_str)
    }

    pub fn indexed_type_count(&self) -> usize {
        self.type_index.len()
    }
}
