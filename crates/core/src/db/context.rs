use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::db::{open_ledger, HostLayout, LedgerDb, LoaderSettings};

/// Layout, settings and an open ledger for one game directory.
#[derive(Debug)]
pub struct HostContext {
    pub layout: HostLayout,
    pub settings: LoaderSettings,
    pub ledger_path: PathBuf,
    pub ledger: LedgerDb,
}

impl HostContext {
    /// Load settings and open the ledger for a game directory.
    pub fn from_root(root: impl AsRef<Path>) -> Result<Self> {
        let layout = HostLayout::new(root);
        let (settings, ledger_path, ledger) = open_ledger(&layout)?;
        Ok(Self { layout, settings, ledger_path, ledger })
    }
}
