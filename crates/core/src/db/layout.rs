use std::path::{Path, PathBuf};

use crate::codec::is_plain_name;

/// Logical layout of a game directory managed by the loader.
///
/// Pure path computation; nothing here touches the filesystem.
#[derive(Debug, Clone)]
pub struct HostLayout {
    /// Game directory; platform and host modules live here.
    pub root: PathBuf,
    /// Directory for loader metadata (.modshim).
    pub meta_dir: PathBuf,
    pub settings_path: PathBuf,
    pub ledger_path: PathBuf,
    /// Directory holding installed mods (Mods).
    pub mods_dir: PathBuf,
    /// Directory receiving loaded module images.
    pub loaded_dir: PathBuf,
}

impl HostLayout {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let meta_dir = root.join(".modshim");
        let settings_path = meta_dir.join("settings.json");
        let ledger_path = meta_dir.join("ledger.db");
        let mods_dir = root.join("Mods");
        let loaded_dir = meta_dir.join("loaded");

        Self { root, meta_dir, settings_path, ledger_path, mods_dir, loaded_dir }
    }

    /// Ledger path as stored in settings, relative to the root when possible.
    pub fn ledger_path_relative_string(&self) -> String {
        match self.ledger_path.strip_prefix(&self.root) {
            Ok(rel) => rel.to_string_lossy().to_string(),
            Err(_) => self.ledger_path.to_string_lossy().to_string(),
        }
    }

    /// Output directory for one mod's loaded images.
    ///
    /// `None` when the mod id is not a plain file name.
    pub fn mod_output_dir(&self, mod_id: &str) -> Option<PathBuf> {
        is_plain_name(mod_id).then(|| self.loaded_dir.join(mod_id))
    }
}
