use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::db::{HostLayout, LedgerDb, LoaderSettings};

/// Load the settings JSON for a given layout.
pub fn load_settings(layout: &HostLayout) -> Result<LoaderSettings> {
    let json = std::fs::read_to_string(&layout.settings_path).with_context(|| {
        format!("Failed to read loader settings at {}", layout.settings_path.display())
    })?;
    let settings: LoaderSettings =
        serde_json::from_str(&json).context("Failed to parse loader settings JSON")?;
    Ok(settings)
}

/// Write settings as pretty JSON, creating the metadata directory if needed.
pub fn write_settings(layout: &HostLayout, settings: &LoaderSettings) -> Result<()> {
    std::fs::create_dir_all(&layout.meta_dir).with_context(|| {
        format!("Failed to create metadata directory {}", layout.meta_dir.display())
    })?;
    let json = serde_json::to_string_pretty(settings).context("Failed to serialize loader settings")?;
    std::fs::write(&layout.settings_path, json).with_context(|| {
        format!("Failed to write loader settings at {}", layout.settings_path.display())
    })?;
    Ok(())
}

/// Resolve the ledger path (relative or absolute in settings) and open it.
pub fn open_ledger(layout: &HostLayout) -> Result<(LoaderSettings, PathBuf, LedgerDb)> {
    let settings = load_settings(layout)?;
    let configured = Path::new(&settings.ledger.path);
    let ledger_path =
        if configured.is_absolute() { configured.to_path_buf() } else { layout.root.join(configured) };
    let ledger = LedgerDb::open(&ledger_path)
        .with_context(|| format!("Failed to open load ledger at {}", ledger_path.display()))?;
    Ok((settings, ledger_path, ledger))
}
