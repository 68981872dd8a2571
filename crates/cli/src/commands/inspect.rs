use std::path::Path;

use anyhow::{Context, Result};
use modshim_core::codec::read_module;
use modshim_core::model::BinaryModule;
use serde::Serialize;

use crate::{canonicalize_or_current, sha256_file};

#[derive(Debug, Serialize)]
pub struct ModuleSummary {
    pub name: String,
    pub version: String,
    pub file: String,
    pub sha256: String,
    pub assembly_refs: Vec<String>,
    pub type_refs: Vec<TypeRefSummary>,
    pub member_refs: Vec<String>,
    pub types: Vec<TypeSummary>,
}

#[derive(Debug, Serialize)]
pub struct TypeRefSummary {
    pub name: String,
    pub scope: String,
}

#[derive(Debug, Serialize)]
pub struct TypeSummary {
    pub name: String,
    pub public: bool,
    pub fields: Vec<String>,
    pub methods: Vec<MethodSummary>,
}

#[derive(Debug, Serialize)]
pub struct MethodSummary {
    pub name: String,
    pub is_static: bool,
    /// Instruction count; `None` for methods without a body.
    pub instructions: Option<usize>,
}

/// Parse a module file and summarize its references and definitions.
pub fn summarize_module(path: &Path) -> Result<ModuleSummary> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read module: {}", path.display()))?;
    let module = read_module(&bytes)
        .with_context(|| format!("Failed to parse module: {}", path.display()))?;
    let sha256 = sha256_file(path)?;
    Ok(build_summary(&module, path, sha256))
}

fn build_summary(module: &BinaryModule, path: &Path, sha256: String) -> ModuleSummary {
    let type_refs = module
        .type_refs()
        .map(|(_, r)| TypeRefSummary {
            name: r.full_name(),
            scope: module.assembly_ref(r.scope).name.clone(),
        })
        .collect();
    let types = module
        .types()
        .iter()
        .map(|t| TypeSummary {
            name: t.full_name(),
            public: t.is_public,
            fields: t.fields.iter().map(|f| f.name.clone()).collect(),
            methods: t
                .methods
                .iter()
                .map(|m| MethodSummary {
                    name: m.name.clone(),
                    is_static: m.is_static,
                    instructions: m.body.as_ref().map(Vec::len),
                })
                .collect(),
        })
        .collect();

    ModuleSummary {
        name: module.name.clone(),
        version: module.version.to_string(),
        file: path.display().to_string(),
        sha256,
        assembly_refs: module.assembly_references().map(|(_, r)| r.full_name()).collect(),
        type_refs,
        member_refs: module.member_refs().map(|(id, _)| module.member_name(id)).collect(),
        types,
    }
}

pub fn inspect_command(path: &str, json: bool) -> Result<()> {
    let module_path = canonicalize_or_current(path)?;
    let summary = summarize_module(&module_path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Module {} v{}", summary.name, summary.version);
    println!("  File:   {}", summary.file);
    println!("  SHA256: {}", summary.sha256);
    println!("  References:");
    for reference in &summary.assembly_refs {
        println!("    {}", reference);
    }
    if !summary.type_refs.is_empty() {
        println!("  Type references:");
        for type_ref in &summary.type_refs {
            println!("    {} [{}]", type_ref.name, type_ref.scope);
        }
    }
    println!("  Types:");
    for ty in &summary.types {
        let visibility = if ty.public { "public" } else { "internal" };
        println!("    {} ({})", ty.name, visibility);
        for method in &ty.methods {
            match method.instructions {
                Some(count) => println!("      {}() {} instructions", method.name, count),
                None => println!("      {}() no body", method.name),
            }
        }
    }
    Ok(())
}
