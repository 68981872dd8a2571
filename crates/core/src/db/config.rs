use serde::{Deserialize, Serialize};

use crate::services::handlers::FACADE_ASSEMBLY;
use crate::services::platform::{GameFramework, Platform};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Path to the ledger database (relative to the game directory unless absolute).
    pub path: String,
}

impl LedgerConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Loader configuration stored at `.modshim/settings.json` in the game directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderSettings {
    pub name: String,
    /// Version of the settings format.
    pub config_version: String,
    pub platform: Platform,
    pub framework: GameFramework,
    #[serde(default)]
    pub paranoid_mode: bool,
    #[serde(default = "default_true")]
    pub rewrite_mods: bool,
    pub ledger: LedgerConfig,
    /// Module names in the game directory that the host has loaded. Their
    /// definitions are indexed so mods can be checked against them.
    #[serde(default)]
    pub host_modules: Vec<String>,
    /// Module names known to be loaded without indexing their definitions.
    #[serde(default)]
    pub ambient_modules: Vec<String>,
    /// Optional platform profile (YAML or JSON) overriding the built-in one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
}

fn default_true() -> bool {
    true
}

impl LoaderSettings {
    pub fn new(
        name: impl Into<String>,
        platform: Platform,
        framework: GameFramework,
        ledger_path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            config_version: "0.1.0".to_string(),
            platform,
            framework,
            paranoid_mode: false,
            rewrite_mods: true,
            ledger: LedgerConfig::new(ledger_path),
            host_modules: Vec::new(),
            ambient_modules: vec!["mscorlib".into(), "netstandard".into(), FACADE_ASSEMBLY.into()],
            profile: None,
        }
    }
}
