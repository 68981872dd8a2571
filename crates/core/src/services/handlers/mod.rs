//! Instruction handlers: the pluggable rules run by the rewrite pipeline.
//!
//! Each handler inspects type references and single instructions, may rewrite
//! them in place, and records what it found in its [`HandlerFindings`]. A fresh
//! handler set is built for every module by [`handlers_for`].

use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::{BinaryModule, InstructionRef, TypeRefId};
use crate::services::definitions::DefinitionIndex;
use crate::services::platform::PlatformProfile;

mod finders;
mod rewriters;
mod rules;

pub use finders::{MemberFinder, MissingMemberFinder, MissingTypeFinder, TypeFinder};
pub use rewriters::{FieldToPropertyRewriter, ReplaceReferencesRewriter};
pub use rules::{CompatibilityRules, MemberRedirect, TypeRedirect, FACADE_ASSEMBLY, FACADE_NAMESPACE};

/// What a handler reported about the code it inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleResult {
    Rewritten,
    NotCompatible,
    DetectedGamePatch,
    DetectedSaveSerializerChange,
    DetectedUnvalidatedUpdateTick,
    DetectedDynamicUse,
    DetectedConsoleAccess,
    DetectedFilesystemAccess,
    DetectedShellAccess,
    None,
}

/// Per-module accumulator owned by each handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerFindings {
    pub flags: BTreeSet<HandleResult>,
    pub phrases: BTreeSet<String>,
}

impl HandlerFindings {
    pub fn mark(&mut self, result: HandleResult) {
        self.flags.insert(result);
    }

    pub fn mark_with(&mut self, result: HandleResult, phrase: impl Into<String>) {
        self.flags.insert(result);
        self.phrases.insert(phrase.into());
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

/// Read-only state shared by all handlers during one module pass.
#[derive(Debug, Clone, Copy)]
pub struct HandlerContext<'a> {
    pub definitions: &'a DefinitionIndex,
}

pub trait InstructionHandler {
    fn name(&self) -> &str;

    /// Phrase used in diagnostics when the handler collected none.
    fn default_phrase(&self) -> Option<&str> {
        None
    }

    /// Inspect (and possibly rewrite) a type reference. Returns whether the module changed.
    fn handle_type(&mut self, _ctx: &HandlerContext<'_>, _module: &mut BinaryModule, _type_ref: TypeRefId) -> bool {
        false
    }

    /// Inspect (and possibly rewrite) one instruction. Returns whether the module changed.
    fn handle_instruction(&mut self, _ctx: &HandlerContext<'_>, _module: &mut BinaryModule, _at: InstructionRef) -> bool {
        false
    }

    fn findings(&self) -> &HandlerFindings;
}

/// Which handler groups are active for a module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandlerConfig {
    pub paranoid: bool,
    pub platform_changed: bool,
    pub rewrite_enabled: bool,
}

/// Build the ordered handler set for one module.
pub fn handlers_for(
    config: HandlerConfig,
    rules: &CompatibilityRules,
    profile: &PlatformProfile,
) -> Vec<Box<dyn InstructionHandler>> {
    let mut handlers: Vec<Box<dyn InstructionHandler>> = Vec::new();

    if config.rewrite_enabled {
        if config.platform_changed && !profile.facades.is_empty() {
            handlers.push(Box::new(ReplaceReferencesRewriter::new(
                "PlatformFacadeRewriter",
                profile.facades.clone(),
                Vec::new(),
            )));
        }
        handlers.push(Box::new(FieldToPropertyRewriter::new()));
        handlers.push(Box::new(ReplaceReferencesRewriter::new(
            "ReplaceReferencesRewriter",
            rules.member_redirects.clone(),
            rules.type_redirects.clone(),
        )));
    }

    handlers.push(Box::new(MissingTypeFinder::new()));
    handlers.push(Box::new(MissingMemberFinder::new()));
    handlers.push(Box::new(TypeFinder::new(
        "HarmonyFinder",
        &["HarmonyLib.Harmony", "Harmony.HarmonyInstance"],
        HandleResult::DetectedGamePatch,
    )));
    handlers.push(Box::new(MemberFinder::new(
        "SaveSerializerFinder",
        "StardewValley.SaveGame",
        &["serializer", "farmerSerializer", "locationSerializer"],
        HandleResult::DetectedSaveSerializerChange,
    )));
    handlers.push(Box::new(
        MemberFinder::new(
            "UnvalidatedUpdateTickFinder",
            "StardewModdingAPI.Events.ISpecializedEvents",
            &[
                "add_UnvalidatedUpdateTicked",
                "remove_UnvalidatedUpdateTicked",
                "add_UnvalidatedUpdateTicking",
                "remove_UnvalidatedUpdateTicking",
            ],
            HandleResult::DetectedUnvalidatedUpdateTick,
        )
        .with_phrase("StardewModdingAPI.Events.ISpecializedEvents.UnvalidatedUpdateTicked event"),
    ));
    handlers.push(Box::new(TypeFinder::new(
        "DynamicFinder",
        &["System.Runtime.CompilerServices.CallSite", "Microsoft.CSharp.RuntimeBinder.Binder"],
        HandleResult::DetectedDynamicUse,
    )));

    if config.paranoid {
        handlers.push(Box::new(TypeFinder::new(
            "ConsoleFinder",
            &["System.Console"],
            HandleResult::DetectedConsoleAccess,
        )));
        handlers.push(Box::new(TypeFinder::new(
            "FilesystemFinder",
            &[
                "System.IO.File",
                "System.IO.FileStream",
                "System.IO.FileInfo",
                "System.IO.Directory",
                "System.IO.DirectoryInfo",
                "System.IO.DriveInfo",
                "System.IO.FileSystemWatcher",
            ],
            HandleResult::DetectedFilesystemAccess,
        )));
        handlers.push(Box::new(TypeFinder::new(
            "ShellFinder",
            &["System.Diagnostics.Process"],
            HandleResult::DetectedShellAccess,
        )));
    }

    handlers
}
