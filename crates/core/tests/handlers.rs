mod common;

use common::{monogame_framework, stardew_valley, v, windows_monogame};
use modshim_core::model::{
    BinaryModule, Instruction, InstructionRef, ModuleBuilder, OpCode, Operand, TypeBuilder, TypeHandle,
};
use modshim_core::services::definitions::DefinitionIndex;
use modshim_core::services::handlers::{
    handlers_for, CompatibilityRules, HandleResult, HandlerConfig, HandlerContext, InstructionHandler,
    TypeFinder, TypeRedirect, FACADE_NAMESPACE,
};
use modshim_core::codec::write_module;
use modshim_core::services::pipeline::RecursiveRewriter;
use modshim_core::services::platform::PlatformTargetMap;
use modshim_core::services::scope::rewrite_type_scopes;

fn definitions() -> DefinitionIndex {
    let mut index = DefinitionIndex::new();
    index.add(&stardew_valley());
    index.add(&monogame_framework());
    index.add_ambient("mscorlib");
    index
}

fn rewrite_enabled() -> HandlerConfig {
    HandlerConfig { paranoid: false, platform_changed: false, rewrite_enabled: true }
}

fn run(module: &mut BinaryModule, config: HandlerConfig) -> (bool, Vec<Box<dyn InstructionHandler>>) {
    let definitions = definitions();
    let ctx = HandlerContext { definitions: &definitions };
    let mut handlers = handlers_for(config, &CompatibilityRules::builtin(), &windows_monogame());
    let changed = RecursiveRewriter::rewrite_module(module, &ctx, &mut handlers);
    (changed, handlers)
}

fn findings<'a>(handlers: &'a [Box<dyn InstructionHandler>], name: &str) -> &'a modshim_core::services::handlers::HandlerFindings {
    handlers
        .iter()
        .find(|h| h.name() == name)
        .map(|h| h.findings())
        .unwrap_or_else(|| panic!("handler {name} not registered"))
}

fn at(index: usize) -> InstructionRef {
    InstructionRef { type_index: 0, method_index: 0, index }
}

#[test]
fn handler_order_depends_on_config() {
    let profile = windows_monogame();
    let rules = CompatibilityRules::builtin();
    let names = |config| -> Vec<String> {
        handlers_for(config, &rules, &profile).iter().map(|h| h.name().to_string()).collect()
    };

    let detect_only = names(HandlerConfig::default());
    assert_eq!(detect_only.first().map(String::as_str), Some("MissingTypeFinder"));
    assert!(!detect_only.iter().any(|n| n.ends_with("Rewriter")));

    let swapped = names(HandlerConfig { paranoid: true, platform_changed: true, rewrite_enabled: true });
    assert_eq!(
        &swapped[..3],
        &["PlatformFacadeRewriter", "FieldToPropertyRewriter", "ReplaceReferencesRewriter"]
    );
    assert_eq!(swapped.last().map(String::as_str), Some("ShellFinder"));
}

#[test]
fn field_access_becomes_property_call() {
    let mut b = ModuleBuilder::new("PropMod", v(1, 0));
    let sv = b.assembly_ref("StardewValley", v(1, 6));
    let farmer = b.type_ref(sv, "StardewValley", "Farmer");
    let money = b.field_ref(TypeHandle::Ref(farmer), "Money", "int");
    let name = b.field_ref(TypeHandle::Ref(farmer), "name", "string");
    b.add_type(TypeBuilder::new("PropMod", "Entry").method(
        "Run",
        false,
        vec![
            Instruction::new(OpCode::LdFld, Operand::Member(money)),
            Instruction::new(OpCode::StFld, Operand::Member(money)),
            Instruction::new(OpCode::LdFld, Operand::Member(name)),
            Instruction::new(OpCode::LdsFld, Operand::Member(money)),
        ],
    ));
    let mut module = b.build();

    let (changed, handlers) = run(&mut module, rewrite_enabled());
    assert!(changed);

    let getter = module.instruction(at(0)).expect("instruction");
    assert_eq!(getter.opcode, OpCode::CallVirt);
    let getter_ref = getter.member().expect("member");
    assert_eq!(module.member_name(getter_ref), "StardewValley.Farmer.get_Money");
    assert_eq!(module.member_ref(getter_ref).signature, "int()");
    let setter = module.instruction(at(1)).expect("instruction");
    let setter_ref = setter.member().expect("member");
    assert_eq!(module.member_name(setter_ref), "StardewValley.Farmer.set_Money");
    assert_eq!(module.member_ref(setter_ref).signature, "void(int)");
    // A field that still exists is left alone.
    assert_eq!(module.instruction(at(2)).map(|i| i.opcode), Some(OpCode::LdFld));
    // Static access to an instance accessor has no receiver to dispatch on.
    let static_getter = module.instruction(at(3)).expect("instruction");
    assert_eq!(static_getter.opcode, OpCode::Call);
    assert_eq!(static_getter.member(), Some(getter_ref));

    let found = findings(&handlers, "FieldToPropertyRewriter");
    assert!(found.flags.contains(&HandleResult::Rewritten));
    assert!(found.phrases.contains("StardewValley.Farmer.Money field now a property"));
    assert!(findings(&handlers, "MissingMemberFinder").is_empty());
}

#[test]
fn removed_members_are_redirected_to_facades() {
    let mut b = ModuleBuilder::new("FacadeMod", v(1, 0));
    let sv = b.assembly_ref("StardewValley", v(1, 6));
    let house = b.type_ref(sv, "StardewValley", "AnimalHouse");
    let direction = b.type_ref(sv, "StardewValley.Network", "NetDirection");
    let get_building = b.method_ref(TypeHandle::Ref(house), "getBuilding", "Building()");
    let implicit = b.method_ref(TypeHandle::Ref(direction), "op_Implicit", "int(NetDirection)");
    b.add_type(TypeBuilder::new("FacadeMod", "Entry").method(
        "Run",
        false,
        vec![
            Instruction::new(OpCode::CallVirt, Operand::Member(get_building)),
            Instruction::new(OpCode::CallVirt, Operand::Member(implicit)),
        ],
    ));
    let mut module = b.build();

    let (changed, handlers) = run(&mut module, rewrite_enabled());
    assert!(changed);

    let first = module.instruction(at(0)).expect("instruction");
    assert_eq!(first.opcode, OpCode::CallVirt);
    assert_eq!(
        module.member_name(first.member().expect("member")),
        format!("{FACADE_NAMESPACE}.AnimalHouseFacade.getBuilding")
    );
    let second = module.instruction(at(1)).expect("instruction");
    assert_eq!(second.opcode, OpCode::Call);
    assert_eq!(
        module.member_name(second.member().expect("member")),
        format!("{FACADE_NAMESPACE}.ImplicitConversionOperatorsFacade.NetDirection_ToInt")
    );
    assert!(module.find_assembly_ref("StardewModdingAPI").is_some());

    let found = findings(&handlers, "ReplaceReferencesRewriter");
    assert!(found.phrases.contains("reference to StardewValley.AnimalHouse.getBuilding"));
    assert!(found.phrases.contains("reference to StardewValley.Network.NetDirection.op_Implicit"));
    assert!(findings(&handlers, "MissingMemberFinder").is_empty());
}

fn sprite_batch_module() -> BinaryModule {
    let mut b = ModuleBuilder::new("DrawMod", v(1, 0));
    let mono = b.assembly_ref("MonoGame.Framework", v(3, 8));
    let batch = b.type_ref(mono, "Microsoft.Xna.Framework.Graphics", "SpriteBatch");
    let begin = b.method_ref(TypeHandle::Ref(batch), "Begin", "void()");
    b.add_type(TypeBuilder::new("DrawMod", "Entry").method(
        "Draw",
        false,
        vec![Instruction::new(OpCode::CallVirt, Operand::Member(begin))],
    ));
    b.build()
}

#[test]
fn platform_facades_apply_only_after_a_platform_swap() {
    let mut untouched = sprite_batch_module();
    let (changed, _) = run(&mut untouched, rewrite_enabled());
    assert!(!changed);

    let mut swapped = sprite_batch_module();
    let config = HandlerConfig { platform_changed: true, ..rewrite_enabled() };
    let (changed, handlers) = run(&mut swapped, config);
    assert!(changed);
    let call = swapped.instruction(at(0)).expect("instruction");
    assert_eq!(
        swapped.member_name(call.member().expect("member")),
        "StardewModdingAPI.Framework.ModLoading.Rewriters.SpriteBatchFacade.Begin"
    );
    assert!(findings(&handlers, "PlatformFacadeRewriter")
        .phrases
        .contains("reference to Microsoft.Xna.Framework.Graphics.SpriteBatch.Begin"));
}

#[test]
fn missing_types_and_members_are_not_compatible() {
    let mut b = ModuleBuilder::new("StaleMod", v(1, 0));
    let sv = b.assembly_ref("StardewValley", v(1, 6));
    let corlib = b.assembly_ref("mscorlib", v(4, 0));
    let farmer = b.type_ref(sv, "StardewValley", "Farmer");
    b.type_ref(sv, "StardewValley", "Nope");
    let console = b.type_ref(corlib, "System", "Console");
    let missing = b.method_ref(TypeHandle::Ref(farmer), "missingMethod", "void()");
    let write_line = b.method_ref(TypeHandle::Ref(console), "WriteLine", "void(string)");
    b.add_type(TypeBuilder::new("StaleMod", "Entry").method(
        "Run",
        false,
        vec![
            Instruction::new(OpCode::CallVirt, Operand::Member(missing)),
            Instruction::new(OpCode::Call, Operand::Member(write_line)),
        ],
    ));
    let mut module = b.build();

    let (changed, handlers) = run(&mut module, HandlerConfig::default());
    assert!(!changed);
    let types = findings(&handlers, "MissingTypeFinder");
    assert!(types.flags.contains(&HandleResult::NotCompatible));
    assert_eq!(types.phrases.iter().collect::<Vec<_>>(), vec!["StardewValley.Nope (no such type)"]);
    let members = findings(&handlers, "MissingMemberFinder");
    assert_eq!(
        members.phrases.iter().collect::<Vec<_>>(),
        vec!["StardewValley.Farmer.missingMethod (no such method)"]
    );
    // Console access is only reported in paranoid mode.
    assert!(!handlers.iter().any(|h| h.name() == "ConsoleFinder"));
}

#[test]
fn detectors_flag_patching_serializers_and_paranoid_access() {
    let mut b = ModuleBuilder::new("SneakyMod", v(1, 0));
    let harmony = b.assembly_ref("0Harmony", v(2, 0));
    let sv = b.assembly_ref("StardewValley", v(1, 6));
    let corlib = b.assembly_ref("mscorlib", v(4, 0));
    b.type_ref(harmony, "HarmonyLib", "Harmony");
    b.type_ref(corlib, "System.IO", "File");
    b.type_ref(corlib, "System.Diagnostics", "Process");
    let save = b.type_ref(sv, "StardewValley", "SaveGame");
    let serializer = b.field_ref(TypeHandle::Ref(save), "serializer", "XmlSerializer");
    b.add_type(TypeBuilder::new("SneakyMod", "Entry").method(
        "Run",
        true,
        vec![
            Instruction::new(OpCode::LdsFld, Operand::Member(serializer)),
            Instruction::new(OpCode::StsFld, Operand::Member(serializer)),
        ],
    ));
    let mut module = b.build();

    let config = HandlerConfig { paranoid: true, ..rewrite_enabled() };
    let (changed, handlers) = run(&mut module, config);
    assert!(!changed);
    assert!(findings(&handlers, "HarmonyFinder").flags.contains(&HandleResult::DetectedGamePatch));
    assert!(findings(&handlers, "SaveSerializerFinder")
        .flags
        .contains(&HandleResult::DetectedSaveSerializerChange));
    assert!(findings(&handlers, "FilesystemFinder").flags.contains(&HandleResult::DetectedFilesystemAccess));
    assert!(findings(&handlers, "ShellFinder").flags.contains(&HandleResult::DetectedShellAccess));
    assert!(findings(&handlers, "ConsoleFinder").is_empty());
    assert!(findings(&handlers, "FieldToPropertyRewriter").is_empty());
}

#[test]
fn type_finder_matches_namespace_wildcards() {
    let mut b = ModuleBuilder::new("WildMod", v(1, 0));
    let scope = b.assembly_ref("Mono.Cecil", v(0, 11));
    b.type_ref(scope, "Mono.Cecil.Cil", "Instruction");
    let mut module = b.build();

    let definitions = definitions();
    let ctx = HandlerContext { definitions: &definitions };
    let mut handlers: Vec<Box<dyn InstructionHandler>> = vec![
        Box::new(TypeFinder::new("CecilFinder", &["Mono.Cecil.*"], HandleResult::DetectedGamePatch)),
        Box::new(TypeFinder::new("CecilRootFinder", &["Mono.Cecil"], HandleResult::DetectedGamePatch)),
    ];
    RecursiveRewriter::rewrite_module(&mut module, &ctx, &mut handlers);
    assert!(!handlers[0].findings().is_empty());
    assert!(handlers[1].findings().is_empty());
    assert_eq!(handlers[0].default_phrase(), Some("Mono.Cecil.* type"));
}

#[test]
fn type_redirects_rewrite_type_references() {
    let mut b = ModuleBuilder::new("MovedMod", v(1, 0));
    let sv = b.assembly_ref("StardewValley", v(1, 6));
    let old = b.type_ref(sv, "StardewValley", "OldName");
    let mut module = b.build();

    let rules = CompatibilityRules::default().with_type_redirect(TypeRedirect {
        from_type: "StardewValley.OldName".into(),
        to_assembly: "MonoGame.Framework".into(),
        to_type: "Microsoft.Xna.Framework.Vector2".into(),
    });
    let definitions = definitions();
    let ctx = HandlerContext { definitions: &definitions };
    let mut handlers = handlers_for(rewrite_enabled(), &rules, &windows_monogame());
    assert!(RecursiveRewriter::rewrite_module(&mut module, &ctx, &mut handlers));

    assert_eq!(module.type_name(TypeHandle::Ref(old)), "Microsoft.Xna.Framework.Vector2");
    assert_eq!(module.type_scope_name(TypeHandle::Ref(old)), "MonoGame.Framework");
    let scope = module.find_assembly_ref("MonoGame.Framework").expect("scope");
    assert_eq!(module.assembly_ref(scope).version, v(3, 8));
    // The rewritten reference resolves, so no missing-type finding.
    assert!(findings(&handlers, "MissingTypeFinder").is_empty());
}

/// A pre-swap mod touching every rewriter: platform references, a platform
/// facade, a compatibility facade and a field that became a property.
fn legacy_module() -> BinaryModule {
    let mut b = ModuleBuilder::new("LegacyMod", v(1, 0));
    let game = b.assembly_ref("Stardew Valley", v(1, 5));
    let graphics = b.assembly_ref("Microsoft.Xna.Framework.Graphics", v(4, 0));
    b.assembly_ref("mscorlib", v(4, 0));
    let batch = b.type_ref(graphics, "Microsoft.Xna.Framework.Graphics", "SpriteBatch");
    let farmer = b.type_ref(game, "StardewValley", "Farmer");
    let house = b.type_ref(game, "StardewValley", "AnimalHouse");
    let begin = b.method_ref(TypeHandle::Ref(batch), "Begin", "void()");
    let money = b.field_ref(TypeHandle::Ref(farmer), "Money", "int");
    let get_building = b.method_ref(TypeHandle::Ref(house), "getBuilding", "Building()");
    b.add_type(TypeBuilder::new("LegacyMod", "Entry").method(
        "Run",
        false,
        vec![
            Instruction::new(OpCode::CallVirt, Operand::Member(begin)),
            Instruction::new(OpCode::LdFld, Operand::Member(money)),
            Instruction::new(OpCode::CallVirt, Operand::Member(get_building)),
            Instruction::simple(OpCode::Ret),
        ],
    ));
    b.build()
}

fn rewrite_for_platform(mut module: BinaryModule) -> BinaryModule {
    let targets = vec![stardew_valley(), monogame_framework()];
    let map = PlatformTargetMap::build(windows_monogame(), &targets).expect("target map");
    let scopes = rewrite_type_scopes(&mut module, &map);
    assert!(scopes.platform_changed);
    let (changed, _) = run(&mut module, HandlerConfig { platform_changed: true, ..rewrite_enabled() });
    assert!(changed);
    module
}

#[test]
fn full_rewrite_is_byte_identical_across_runs() {
    let original = legacy_module();
    let first = rewrite_for_platform(original.clone());
    let second = rewrite_for_platform(original.clone());

    let bytes = write_module(&first);
    assert_eq!(bytes, write_module(&second));
    assert_ne!(bytes, write_module(&original));

    let member = |index| first.member_name(first.instruction(at(index)).and_then(|i| i.member()).expect("member"));
    assert_eq!(member(0), "StardewModdingAPI.Framework.ModLoading.Rewriters.SpriteBatchFacade.Begin");
    assert_eq!(member(1), "StardewValley.Farmer.get_Money");
    assert_eq!(member(2), format!("{FACADE_NAMESPACE}.AnimalHouseFacade.getBuilding"));
    assert!(first.find_assembly_ref("Stardew Valley").is_none());
}
