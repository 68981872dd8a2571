use anyhow::Result;
use modshim_core::db::{HostContext, LoadRunRecord, ModuleLoadRecord};
use serde::Serialize;

use crate::canonicalize_or_current;

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub run: LoadRunRecord,
    pub modules: Vec<ModuleLoadRecord>,
    pub messages: Vec<String>,
}

/// Ledger runs for a game directory, oldest first.
pub fn collect_history(game_dir: &str, mod_id: Option<&str>) -> Result<Vec<HistoryEntry>> {
    let root_path = canonicalize_or_current(game_dir)?;
    let ctx = HostContext::from_root(&root_path)?;

    let mut entries = Vec::new();
    for run in ctx.ledger.list_runs(mod_id)? {
        let (modules, messages) = match run.id {
            Some(id) => (ctx.ledger.list_modules(id)?, ctx.ledger.list_messages(id)?),
            None => (Vec::new(), Vec::new()),
        };
        entries.push(HistoryEntry { run, modules, messages });
    }
    Ok(entries)
}

pub fn history_command(game_dir: &str, mod_id: Option<String>, json: bool) -> Result<()> {
    let entries = collect_history(game_dir, mod_id.as_deref())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No load runs recorded.");
        return Ok(());
    }

    for entry in &entries {
        let run = &entry.run;
        println!(
            "#{} {} ({}) {} at {}",
            run.id.unwrap_or_default(),
            run.mod_id,
            run.entry_module,
            run.status.as_str(),
            run.finished_at
        );
        if !run.warnings.is_empty() {
            println!("    warnings: {}", run.warnings);
        }
        if let Some(reason) = &run.reason {
            println!("    reason: {}", reason);
        }
        for module in &entry.modules {
            let marker = if module.rewritten { " (rewritten)" } else { "" };
            println!("    {} [{}]{}", module.module, module.status, marker);
        }
    }
    Ok(())
}
