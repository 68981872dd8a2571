use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::codec::{read_module, ModuleReadError, MODULE_EXTENSION, SYMBOL_EXTENSION};

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Module '{0}' is already loaded in the runtime")]
    AlreadyLoaded(String),
    #[error("Runtime rejected module image '{name}': {source}")]
    InvalidImage {
        name: String,
        #[source]
        source: ModuleReadError,
    },
    #[error("Failed to write module image to {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Bytes handed to the host runtime for one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleImage {
    pub name: String,
    pub bytes: Vec<u8>,
    pub symbols: Option<Vec<u8>>,
    /// Whether `bytes` were produced by the rewriter rather than read from disk.
    pub rewritten: bool,
}

/// A module the runtime accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleHandle {
    pub name: String,
    /// Hex SHA-256 of the loaded image.
    pub sha256: String,
    pub rewritten: bool,
}

impl ModuleHandle {
    pub fn for_image(image: &ModuleImage) -> Self {
        Self { name: image.name.clone(), sha256: sha256_hex(&image.bytes), rewritten: image.rewritten }
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// The host side that actually loads module images.
pub trait ModuleRuntime {
    fn load_image(&mut self, image: ModuleImage) -> Result<ModuleHandle, RuntimeError>;
}

/// Keeps loaded images in memory, keyed by module name.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRuntime {
    images: BTreeMap<String, ModuleImage>,
}

impl InMemoryRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image(&self, name: &str) -> Option<&ModuleImage> {
        self.images.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.images.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

impl ModuleRuntime for InMemoryRuntime {
    fn load_image(&mut self, image: ModuleImage) -> Result<ModuleHandle, RuntimeError> {
        if self.images.contains_key(&image.name) {
            return Err(RuntimeError::AlreadyLoaded(image.name));
        }
        read_module(&image.bytes)
            .map_err(|source| RuntimeError::InvalidImage { name: image.name.clone(), source })?;
        let handle = ModuleHandle::for_image(&image);
        self.images.insert(image.name.clone(), image);
        Ok(handle)
    }
}

/// Writes each image as `<name>.dll` (plus `<name>.pdb`) into a directory.
#[derive(Debug, Clone)]
pub struct DirectoryRuntime {
    dir: PathBuf,
}

impl DirectoryRuntime {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write(&self, path: PathBuf, bytes: &[u8]) -> Result<(), RuntimeError> {
        fs::write(&path, bytes).map_err(|source| RuntimeError::Io { path, source })
    }
}

impl ModuleRuntime for DirectoryRuntime {
    fn load_image(&mut self, image: ModuleImage) -> Result<ModuleHandle, RuntimeError> {
        fs::create_dir_all(&self.dir)
            .map_err(|source| RuntimeError::Io { path: self.dir.clone(), source })?;
        self.write(self.dir.join(format!("{}.{MODULE_EXTENSION}", image.name)), &image.bytes)?;
        if let Some(symbols) = &image.symbols {
            self.write(self.dir.join(format!("{}.{SYMBOL_EXTENSION}", image.name)), symbols)?;
        }
        tracing::debug!(module = %image.name, dir = %self.dir.display(), "wrote module image");
        Ok(ModuleHandle::for_image(&image))
    }
}
