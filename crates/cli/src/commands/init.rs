use std::fs;

use anyhow::{anyhow, Context, Result};
use modshim_core::db::{write_settings, HostLayout, LedgerDb, LoaderSettings};
use modshim_core::services::platform::{GameFramework, Platform, PlatformProfile};

use crate::{canonicalize_or_current, infer_host_name};

/// Options accepted by `modshim init`.
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    pub name: Option<String>,
    pub platform: String,
    pub framework: String,
    pub paranoid: bool,
    pub no_rewrite: bool,
    pub host_modules: Vec<String>,
    pub profile: Option<String>,
}

/// Initialize loader settings and the ledger for the game directory at `game_dir`.
pub fn init_command(game_dir: &str, options: InitOptions) -> Result<()> {
    let root_path = canonicalize_or_current(game_dir)?;
    let layout = HostLayout::new(&root_path);

    let platform: Platform = options.platform.parse()?;
    let framework: GameFramework = options.framework.parse()?;

    // Without a custom profile, the combination must have built-in knowledge.
    match &options.profile {
        Some(path) => {
            let profile_path = root_path.join(path);
            if !profile_path.is_file() {
                return Err(anyhow!("Platform profile not found: {}", profile_path.display()));
            }
            PlatformProfile::from_path(&profile_path)?;
        }
        None => {
            PlatformProfile::builtin(platform, framework)?;
        }
    }

    let host_name = match options.name {
        Some(n) => n,
        None => infer_host_name(&root_path),
    };

    fs::create_dir_all(&layout.meta_dir)
        .with_context(|| format!("Failed to create meta dir: {}", layout.meta_dir.display()))?;
    fs::create_dir_all(&layout.mods_dir)
        .with_context(|| format!("Failed to create mods dir: {}", layout.mods_dir.display()))?;
    fs::create_dir_all(&layout.loaded_dir).with_context(|| {
        format!("Failed to create loaded modules dir: {}", layout.loaded_dir.display())
    })?;

    let mut settings =
        LoaderSettings::new(&host_name, platform, framework, layout.ledger_path_relative_string());
    settings.paranoid_mode = options.paranoid;
    settings.rewrite_mods = !options.no_rewrite;
    settings.host_modules = options.host_modules;
    settings.profile = options.profile;
    write_settings(&layout, &settings)?;

    let ledger = LedgerDb::open(&layout.ledger_path).with_context(|| {
        format!("Failed to initialize load ledger at {}", layout.ledger_path.display())
    })?;
    tracing::debug!(schema_version = ledger.schema_version()?, "ledger ready");

    println!("Initialized modshim for '{}'", host_name);
    println!("  Game dir:  {}", layout.root.display());
    println!("  Platform:  {} ({})", settings.platform, settings.framework);
    println!("  Settings:  {}", layout.settings_path.display());
    println!("  Ledger:    {}", layout.ledger_path.display());
    println!("  Rewrite:   {}", if settings.rewrite_mods { "enabled" } else { "disabled" });
    if settings.paranoid_mode {
        println!("  Paranoid mode enabled");
    }

    Ok(())
}
