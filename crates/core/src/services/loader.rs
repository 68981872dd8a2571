use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use crate::codec::{read_module, write_module, MODULE_EXTENSION};
use crate::db::{HostContext, LedgerDb, LoadRunRecord, LoadRunStatus, ModuleLoadRecord};
use crate::model::{BinaryModule, SYSTEM_PREFIX};
use crate::mods::{ModMetadata, ModWarning};
use crate::monitor::{LogLevel, LoggedMessages, Monitor};
use crate::services::definitions::DefinitionIndex;
use crate::services::flags::process_handler_results;
use crate::services::handlers::{handlers_for, CompatibilityRules, HandlerConfig, HandlerContext};
use crate::services::pipeline::RecursiveRewriter;
use crate::services::platform::{PlatformProfile, PlatformTargetMap};
use crate::services::resolver::{discover_local_modules, ParseResult, ParseStatus};
use crate::services::runtime::{ModuleHandle, ModuleImage, ModuleRuntime, RuntimeError};
use crate::services::scope::rewrite_type_scopes;

#[derive(Debug, Error)]
pub enum LoadError {
    /// The module file is missing, malformed, or already loaded.
    #[error("{0}")]
    AssemblyLoadFailed(String),
    /// Incompatible code was found and the caller did not opt into loading it anyway.
    #[error("{message}")]
    IncompatibleInstruction { message: String, incompatibilities: Vec<String> },
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl LoadError {
    pub fn is_structural(&self) -> bool {
        matches!(self, LoadError::AssemblyLoadFailed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPhase {
    Discovering,
    Validating,
    Rewriting,
    Emitting,
    Done,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderOptions {
    pub paranoid_mode: bool,
    pub rewrite_mods: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self { paranoid_mode: false, rewrite_mods: true }
    }
}

/// What happened to one discovered module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleOutcome {
    pub name: Option<String>,
    pub file: PathBuf,
    pub status: ParseStatus,
    pub platform_changed: bool,
    pub handle: Option<ModuleHandle>,
}

/// Trace of the most recent `load` call.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub mod_id: String,
    pub entry: PathBuf,
    pub phases: Vec<LoadPhase>,
    pub modules: Vec<ModuleOutcome>,
    pub messages: Vec<String>,
    pub warnings: ModWarning,
    pub rejection: Option<String>,
}

impl LoadReport {
    fn new(mod_id: &str, entry: &Path) -> Self {
        Self {
            mod_id: mod_id.to_string(),
            entry: entry.to_path_buf(),
            phases: Vec::new(),
            modules: Vec::new(),
            messages: Vec::new(),
            warnings: ModWarning::NONE,
            rejection: None,
        }
    }

    fn enter(&mut self, phase: LoadPhase) {
        if self.phases.last() != Some(&phase) {
            tracing::debug!(mod_id = %self.mod_id, ?phase, "load phase");
            self.phases.push(phase);
        }
    }

    pub fn phase(&self) -> Option<LoadPhase> {
        self.phases.last().copied()
    }

    pub fn is_rejected(&self) -> bool {
        self.phase() == Some(LoadPhase::Rejected)
    }
}

/// A successfully loaded mod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadedMod {
    /// The mod's own module (last in dependency order).
    pub root: ModuleHandle,
    /// Every module loaded by this call, leaf to root.
    pub modules: Vec<ModuleHandle>,
    pub messages: Vec<String>,
}

/// A rewritten module waiting for the end-of-pass checks.
struct StagedModule {
    image: ModuleImage,
    file_name: String,
    /// Index of this module's entry in `LoadReport::modules`.
    outcome: usize,
}

/// Summary returned when a loader session ends.
#[derive(Debug)]
pub struct ClosedSession<R> {
    pub loads: usize,
    pub released_modules: usize,
    pub runtime: R,
}

/// Loader session: owns the platform map, the definition index of every
/// module loaded so far, the log sink and the host runtime.
///
/// Open one per process and call [`ModLoader::load`] once per mod; the
/// definition index carries over between calls.
pub struct ModLoader<M: Monitor, R: ModuleRuntime> {
    options: LoaderOptions,
    platform: PlatformTargetMap,
    rules: CompatibilityRules,
    definitions: DefinitionIndex,
    monitor: M,
    runtime: R,
    last_report: Option<LoadReport>,
    loads: usize,
}

impl<M: Monitor, R: ModuleRuntime> ModLoader<M, R> {
    pub fn new(
        options: LoaderOptions,
        platform: PlatformTargetMap,
        rules: CompatibilityRules,
        definitions: DefinitionIndex,
        monitor: M,
        runtime: R,
    ) -> Self {
        Self { options, platform, rules, definitions, monitor, runtime, last_report: None, loads: 0 }
    }

    /// Build a session from a game directory's settings.
    ///
    /// Platform replacement modules and configured host modules are read from
    /// the game directory and indexed; a missing one is a configuration error.
    pub fn open(ctx: &HostContext, monitor: M, runtime: R) -> anyhow::Result<Self> {
        let settings = &ctx.settings;
        let root = &ctx.layout.root;
        let profile = match &settings.profile {
            Some(path) => PlatformProfile::from_path(&root.join(path))?,
            None => PlatformProfile::builtin(settings.platform, settings.framework)?,
        };
        let (platform, targets) = PlatformTargetMap::locate(profile, root)?;

        let mut definitions = DefinitionIndex::new();
        for module in &targets {
            definitions.add(module);
        }
        for name in &settings.host_modules {
            let path = root.join(format!("{name}.{MODULE_EXTENSION}"));
            let bytes = std::fs::read(&path)
                .with_context(|| format!("Failed to read host module at {}", path.display()))?;
            let module = read_module(&bytes)
                .with_context(|| format!("Failed to parse host module at {}", path.display()))?;
            definitions.add(&module);
        }
        for name in &settings.ambient_modules {
            definitions.add_ambient(name.clone());
        }
        tracing::info!(
            profile = %platform.profile().name,
            modules = definitions.module_count(),
            "loader session opened"
        );

        let options =
            LoaderOptions { paranoid_mode: settings.paranoid_mode, rewrite_mods: settings.rewrite_mods };
        Ok(Self::new(options, platform, CompatibilityRules::builtin(), definitions, monitor, runtime))
    }

    pub fn options(&self) -> LoaderOptions {
        self.options
    }

    pub fn platform(&self) -> &PlatformTargetMap {
        &self.platform
    }

    pub fn definitions(&self) -> &DefinitionIndex {
        &self.definitions
    }

    pub fn monitor(&self) -> &M {
        &self.monitor
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut R {
        &mut self.runtime
    }

    pub fn is_module_loaded(&self, name: &str) -> bool {
        self.definitions.is_loaded(name)
    }

    pub fn last_report(&self) -> Option<&LoadReport> {
        self.last_report.as_ref()
    }

    /// Rewrite and load a mod's entry module and its local dependencies.
    ///
    /// With `assume_compatible`, incompatible code only raises
    /// [`ModWarning::BROKEN_CODE_LOADED`]; otherwise it rejects the load.
    pub fn load(
        &mut self,
        meta: &mut ModMetadata,
        path: &Path,
        assume_compatible: bool,
    ) -> Result<LoadedMod, LoadError> {
        self.loads += 1;
        let mut report = LoadReport::new(&meta.id, path);
        let mut logged = LoggedMessages::new();

        let result = self.load_modules(meta, path, assume_compatible, &mut report, &mut logged);

        report.messages = logged.into_lines();
        report.warnings = meta.warnings();
        match &result {
            Ok(_) => report.enter(LoadPhase::Done),
            Err(err) => {
                report.enter(LoadPhase::Rejected);
                report.rejection = Some(err.to_string());
                tracing::warn!(mod_id = %meta.id, error = %err, "mod load rejected");
            }
        }
        let result = result.map(|(root, modules)| LoadedMod { root, modules, messages: report.messages.clone() });
        self.last_report = Some(report);
        result
    }

    fn load_modules(
        &mut self,
        meta: &mut ModMetadata,
        path: &Path,
        assume_compatible: bool,
        report: &mut LoadReport,
        logged: &mut LoggedMessages,
    ) -> Result<(ModuleHandle, Vec<ModuleHandle>), LoadError> {
        report.enter(LoadPhase::Discovering);
        let mut visited = self.definitions.loaded_names();
        let parsed = discover_local_modules(path, &mut visited);

        let failed = parsed.iter().find(|p| p.status == ParseStatus::Failed);
        if parsed.is_empty() || failed.is_some() {
            let message = if !path.exists() {
                format!("Could not load '{}' because it doesn't exist.", path.display())
            } else {
                match failed.and_then(|p| p.error.as_ref().map(|e| (p.file_name(), e))) {
                    Some((file, detail)) => format!("Could not load '{}'. {file}: {detail}", path.display()),
                    None => format!("Could not load '{}'.", path.display()),
                }
            };
            return Err(LoadError::AssemblyLoadFailed(message));
        }

        report.enter(LoadPhase::Validating);
        if parsed.last().map(|p| p.status) == Some(ParseStatus::AlreadyLoaded) {
            return Err(LoadError::AssemblyLoadFailed(format!(
                "Could not load '{}' because it was already loaded. Do you have two copies of this mod?",
                path.display()
            )));
        }

        let single = parsed.len() == 1;
        let mut staged = Vec::new();
        let result = self.stage_modules(meta, parsed, assume_compatible, report, logged, &mut staged);
        let committed = match result {
            Ok(()) => {
                report.enter(LoadPhase::Emitting);
                self.commit_modules(meta, &staged, single, report)
            }
            Err(err) => Err(err),
        };
        let handles = match committed {
            Ok(handles) => handles,
            Err(err) => {
                for module in &staged {
                    self.definitions.remove(&module.image.name);
                }
                return Err(err);
            }
        };

        let root = handles
            .last()
            .cloned()
            .ok_or_else(|| LoadError::AssemblyLoadFailed(format!("Could not load '{}'.", path.display())))?;
        Ok((root, handles))
    }

    /// Rewrite each discovered module and index it so later modules in the
    /// same mod resolve against it. Nothing reaches the runtime here.
    fn stage_modules(
        &mut self,
        meta: &mut ModMetadata,
        parsed: Vec<ParseResult>,
        assume_compatible: bool,
        report: &mut LoadReport,
        logged: &mut LoggedMessages,
        staged: &mut Vec<StagedModule>,
    ) -> Result<(), LoadError> {
        let mut incompatibilities = Vec::new();
        for entry in parsed {
            let file_name = entry.file_name();
            let ParseResult { file, module, status, source, symbols, .. } = entry;
            let Some(mut module) = module.filter(|_| status == ParseStatus::Okay) else {
                report.modules.push(ModuleOutcome {
                    name: None,
                    file,
                    status,
                    platform_changed: false,
                    handle: None,
                });
                continue;
            };

            report.enter(LoadPhase::Rewriting);
            let (changed, platform_changed, found) = self.rewrite_module(meta, &mut module, logged);
            incompatibilities.extend(found);

            let missing = module
                .assembly_references()
                .find(|(_, r)| !r.name.starts_with(SYSTEM_PREFIX) && !self.definitions.is_loaded(&r.name))
                .map(|(_, r)| r.full_name());
            if let Some(reference) = missing {
                let message = format!("Broken code in {file_name}: reference to missing assembly '{reference}'.");
                self.monitor.log_once(logged, &message, LogLevel::Trace);
                incompatibilities.push(message);
                if !assume_compatible {
                    return Err(LoadError::IncompatibleInstruction {
                        message: format!(
                            "Found a reference to missing assembly '{reference}' while loading assembly {file_name}."
                        ),
                        incompatibilities,
                    });
                }
                meta.set_warning(ModWarning::BROKEN_CODE_LOADED);
            }

            let image = if changed {
                ModuleImage { name: module.name.clone(), bytes: write_module(&module), symbols, rewritten: true }
            } else {
                ModuleImage { name: module.name.clone(), bytes: source, symbols, rewritten: false }
            };
            self.definitions.add(&module);
            report.modules.push(ModuleOutcome {
                name: Some(module.name.clone()),
                file,
                status,
                platform_changed,
                handle: None,
            });
            staged.push(StagedModule { image, file_name, outcome: report.modules.len() - 1 });
        }

        if !assume_compatible && meta.has_warning(ModWarning::BROKEN_CODE_LOADED) {
            return Err(LoadError::IncompatibleInstruction {
                message: format!("Mod '{}' contains incompatible code.", meta.name),
                incompatibilities,
            });
        }
        Ok(())
    }

    /// Hand staged images to the runtime, leaf to root.
    fn commit_modules(
        &mut self,
        meta: &ModMetadata,
        staged: &[StagedModule],
        single: bool,
        report: &mut LoadReport,
    ) -> Result<Vec<ModuleHandle>, LoadError> {
        let mut handles = Vec::with_capacity(staged.len());
        for module in staged {
            if !single {
                let suffix = if module.image.rewritten { " (rewritten)" } else { "" };
                self.monitor.log(&format!("Loading {}{suffix}...", module.file_name), LogLevel::Trace);
            }
            let handle = self.runtime.load_image(module.image.clone())?;
            tracing::debug!(mod_id = %meta.id, module = %handle.name, rewritten = handle.rewritten, "module loaded");
            report.modules[module.outcome].handle = Some(handle.clone());
            handles.push(handle);
        }
        Ok(handles)
    }

    /// Swap platform references, run the handler set and process its findings.
    ///
    /// Returns whether the module changed, whether its platform references
    /// were swapped, and the incompatibility messages raised.
    fn rewrite_module(
        &self,
        meta: &mut ModMetadata,
        module: &mut BinaryModule,
        logged: &mut LoggedMessages,
    ) -> (bool, bool, Vec<String>) {
        let filename = format!("{}.{MODULE_EXTENSION}", module.name);

        let mut platform_changed = false;
        if self.options.rewrite_mods {
            let scopes = rewrite_type_scopes(module, &self.platform);
            if scopes.platform_changed {
                self.monitor.log_once(logged, &format!("Rewriting {filename} for OS..."), LogLevel::Trace);
                platform_changed = true;
            }
        }

        let config = HandlerConfig {
            paranoid: self.options.paranoid_mode,
            platform_changed,
            rewrite_enabled: self.options.rewrite_mods,
        };
        let mut handlers = handlers_for(config, &self.rules, self.platform.profile());
        let ctx = HandlerContext { definitions: &self.definitions };
        let rewritten = RecursiveRewriter::rewrite_module(module, &ctx, &mut handlers);

        let mut incompatibilities = Vec::new();
        for handler in &handlers {
            incompatibilities.extend(process_handler_results(
                meta,
                handler.as_ref(),
                &self.monitor,
                logged,
                &filename,
            ));
        }

        (platform_changed || rewritten, platform_changed, incompatibilities)
    }

    /// End the session, releasing the definition index.
    pub fn close(self) -> ClosedSession<R> {
        let released_modules = self.definitions.module_count();
        tracing::info!(loads = self.loads, released_modules, "loader session closed");
        ClosedSession { loads: self.loads, released_modules, runtime: self.runtime }
    }
}

/// Runs a load and records it in the ledger.
pub struct LoadRunner<'a, M: Monitor, R: ModuleRuntime> {
    pub ledger: &'a LedgerDb,
    pub loader: &'a mut ModLoader<M, R>,
}

impl<'a, M: Monitor, R: ModuleRuntime> LoadRunner<'a, M, R> {
    pub fn run(
        &mut self,
        meta: &mut ModMetadata,
        path: &Path,
        assume_compatible: bool,
    ) -> Result<LoadedMod, LoadError> {
        let started_at = Utc::now().to_rfc3339();
        let result = self.loader.load(meta, path, assume_compatible);
        let finished_at = Utc::now().to_rfc3339();

        if let Some(report) = self.loader.last_report() {
            let run = LoadRunRecord {
                id: None,
                mod_id: meta.id.clone(),
                entry_module: meta.entry_module.clone(),
                status: if result.is_ok() { LoadRunStatus::Loaded } else { LoadRunStatus::Rejected },
                reason: report.rejection.clone(),
                warnings: report.warnings,
                started_at,
                finished_at,
            };
            let modules: Vec<ModuleLoadRecord> = report
                .modules
                .iter()
                .map(|m| ModuleLoadRecord {
                    module: m.name.clone().unwrap_or_default(),
                    file: m.file.display().to_string(),
                    status: m.status.as_str().to_string(),
                    rewritten: m.handle.as_ref().is_some_and(|h| h.rewritten),
                    sha256: m.handle.as_ref().map(|h| h.sha256.clone()),
                })
                .collect();
            // Ledger failures never fail the load.
            if let Err(err) = self.ledger.record_load(&run, &modules, &report.messages) {
                tracing::warn!(mod_id = %meta.id, error = %err, "failed to record load run");
            }
        }

        result
    }
}
