use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::codec::{is_plain_name, read_module, MODULE_EXTENSION, SYMBOL_EXTENSION};
use crate::model::BinaryModule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStatus {
    Okay,
    AlreadyLoaded,
    Failed,
}

impl ParseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ParseStatus::Okay => "okay",
            ParseStatus::AlreadyLoaded => "already_loaded",
            ParseStatus::Failed => "failed",
        }
    }
}

/// One module encountered while walking a mod's local dependency graph.
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub file: PathBuf,
    pub module: Option<BinaryModule>,
    pub status: ParseStatus,
    /// File contents as read from disk. Empty for `Failed` entries that could not be read.
    pub source: Vec<u8>,
    /// Debug symbols read from the sibling `.pdb`, if any.
    pub symbols: Option<Vec<u8>>,
    pub error: Option<String>,
}

impl ParseResult {
    fn failed(file: PathBuf, source: Vec<u8>, error: String) -> Self {
        Self { file, module: None, status: ParseStatus::Failed, source, symbols: None, error: Some(error) }
    }

    /// File name used in diagnostics, e.g. `MyMod.dll`.
    pub fn file_name(&self) -> String {
        self.file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.file.display().to_string())
    }
}

/// Path of the debug-symbol file paired with a module file.
pub fn symbols_path(file: &Path) -> PathBuf {
    file.with_extension(SYMBOL_EXTENSION)
}

/// Walk `root` and its local dependencies, returning parse results leaf-to-root.
///
/// A reference is local when `<name>.dll` exists beside the referencing file;
/// anything else is left for the host to resolve. Reference names that are not
/// plain file names are never looked up on disk. Names in `visited` (seeded
/// with the host's loaded modules) produce an `AlreadyLoaded` entry and are
/// not descended into. A missing root yields an empty sequence.
pub fn discover_local_modules(root: &Path, visited: &mut BTreeSet<String>) -> Vec<ParseResult> {
    let mut out = Vec::new();
    walk(root, visited, &mut out);
    out
}

fn walk(file: &Path, visited: &mut BTreeSet<String>, out: &mut Vec<ParseResult>) {
    if !file.is_file() {
        return;
    }

    let source = match fs::read(file) {
        Ok(bytes) => bytes,
        Err(err) => {
            out.push(ParseResult::failed(file.to_path_buf(), Vec::new(), err.to_string()));
            return;
        }
    };
    let module = match read_module(&source) {
        Ok(module) => module,
        Err(err) => {
            tracing::debug!(file = %file.display(), error = %err, "module failed to parse");
            out.push(ParseResult::failed(file.to_path_buf(), source, err.to_string()));
            return;
        }
    };

    if visited.contains(&module.name) {
        out.push(ParseResult {
            file: file.to_path_buf(),
            module: None,
            status: ParseStatus::AlreadyLoaded,
            source: Vec::new(),
            symbols: None,
            error: None,
        });
        return;
    }
    visited.insert(module.name.clone());

    let dir = file.parent().unwrap_or_else(|| Path::new("."));
    let references: Vec<String> = module.assembly_references().map(|(_, r)| r.name.clone()).collect();
    for name in references {
        if !is_plain_name(&name) {
            tracing::debug!(module = %module.name, reference = %name, "skipping non-local reference name");
            continue;
        }
        walk(&dir.join(format!("{name}.{MODULE_EXTENSION}")), visited, out);
    }

    let symbols = fs::read(symbols_path(file)).ok();
    tracing::trace!(module = %module.name, file = %file.display(), has_symbols = symbols.is_some(), "discovered module");
    out.push(ParseResult {
        file: file.to_path_buf(),
        module: Some(module),
        status: ParseStatus::Okay,
        source,
        symbols,
        error: None,
    });
}
