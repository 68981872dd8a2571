use anyhow::{anyhow, Result};
use modshim_core::db::HostContext;
use modshim_core::mods::ModMetadata;
use modshim_core::monitor::TracingMonitor;
use modshim_core::services::loader::{LoadError, LoadReport, LoadRunner, ModLoader};
use modshim_core::services::runtime::{DirectoryRuntime, ModuleHandle};
use serde::Serialize;

use crate::{canonicalize_or_current, infer_mod_id};

#[derive(Debug, Serialize)]
pub struct LoadSummary {
    pub mod_id: String,
    pub status: String,
    pub output_dir: String,
    pub modules: Vec<ModuleHandle>,
    pub warnings: Vec<&'static str>,
    pub messages: Vec<String>,
    pub reason: Option<String>,
    pub incompatibilities: Vec<String>,
}

impl LoadSummary {
    fn from_report(report: &LoadReport, output_dir: String, error: Option<&LoadError>) -> Self {
        let incompatibilities = match error {
            Some(LoadError::IncompatibleInstruction { incompatibilities, .. }) => incompatibilities.clone(),
            _ => Vec::new(),
        };
        Self {
            mod_id: report.mod_id.clone(),
            status: if error.is_some() { "rejected" } else { "loaded" }.to_string(),
            output_dir,
            modules: report.modules.iter().filter_map(|m| m.handle.clone()).collect(),
            warnings: report.warnings.names(),
            messages: report.messages.clone(),
            reason: report.rejection.clone(),
            incompatibilities,
        }
    }
}

/// Load one mod module (and its local dependencies) into the game directory's
/// output area, recording the run in the ledger.
pub fn load_command(
    game_dir: &str,
    module: &str,
    mod_id: Option<String>,
    assume_compatible: bool,
    json: bool,
) -> Result<()> {
    let root_path = canonicalize_or_current(game_dir)?;
    let ctx = HostContext::from_root(&root_path)?;
    let module_path = canonicalize_or_current(module)?;

    let mod_id = mod_id.unwrap_or_else(|| infer_mod_id(&module_path));
    let entry = module_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| module.to_string());
    let mut meta = ModMetadata::new(&mod_id, &mod_id, entry);

    let output_dir = ctx
        .layout
        .mod_output_dir(&mod_id)
        .ok_or_else(|| anyhow!("Invalid mod id '{mod_id}': it must not contain path separators"))?;
    let runtime = DirectoryRuntime::new(&output_dir);
    let monitor = TracingMonitor::new(&mod_id);
    let mut loader = ModLoader::open(&ctx, monitor, runtime)?;

    let result = LoadRunner { ledger: &ctx.ledger, loader: &mut loader }.run(
        &mut meta,
        &module_path,
        assume_compatible,
    );

    let summary = loader
        .last_report()
        .map(|report| LoadSummary::from_report(report, output_dir.display().to_string(), result.as_ref().err()))
        .ok_or_else(|| anyhow!("Load of '{}' produced no report", mod_id))?;
    loader.close();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    match result {
        Ok(_) => Ok(()),
        Err(err) => Err(anyhow!("Mod '{}' was rejected: {}", mod_id, err)),
    }
}

fn print_summary(summary: &LoadSummary) {
    println!("Mod {}: {}", summary.mod_id, summary.status);
    for module in &summary.modules {
        let marker = if module.rewritten { " (rewritten)" } else { "" };
        println!("  {}{}  sha256={}", module.name, marker, module.sha256);
    }
    if !summary.warnings.is_empty() {
        println!("  Warnings: {}", summary.warnings.join(", "));
    }
    for message in &summary.messages {
        println!("  {}", message);
    }
    if let Some(reason) = &summary.reason {
        println!("  Reason: {}", reason);
    }
    if summary.status == "loaded" {
        println!("  Output: {}", summary.output_dir);
    }
}
