use crate::model::{
    split_qualified_name, AssemblyRef, AssemblyRefId, BinaryModule, InstructionRef, MemberKind,
    MemberRef, OpCode, Operand, TypeHandle, TypeRef, TypeRefId, SYSTEM_PREFIX,
};
use crate::services::definitions::type_location;
use crate::services::handlers::{
    HandleResult, HandlerContext, HandlerFindings, InstructionHandler, MemberRedirect, TypeRedirect,
};

/// Reference to `assembly` in `module`, added if missing.
///
/// The version comes from the loaded module when it is indexed.
fn scope_for(ctx: &HandlerContext<'_>, module: &mut BinaryModule, assembly: &str) -> AssemblyRefId {
    let version = ctx.definitions.version_of(assembly).unwrap_or_default();
    module.add_assembly_ref(AssemblyRef::new(assembly, version))
}

/// Rewrites references to members and types that moved to a facade or new home.
#[derive(Debug)]
pub struct ReplaceReferencesRewriter {
    name: String,
    members: Vec<MemberRedirect>,
    types: Vec<TypeRedirect>,
    findings: HandlerFindings,
}

impl ReplaceReferencesRewriter {
    pub fn new(name: impl Into<String>, members: Vec<MemberRedirect>, types: Vec<TypeRedirect>) -> Self {
        Self { name: name.into(), members, types, findings: HandlerFindings::default() }
    }
}

impl InstructionHandler for ReplaceReferencesRewriter {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle_type(&mut self, ctx: &HandlerContext<'_>, module: &mut BinaryModule, type_ref: TypeRefId) -> bool {
        let full_name = module.type_ref(type_ref).full_name();
        let Some(redirect) = self.types.iter().find(|r| r.from_type == full_name).cloned() else {
            return false;
        };

        let scope = scope_for(ctx, module, &redirect.to_assembly);
        let (namespace, name) = split_qualified_name(&redirect.to_type);
        *module.type_ref_mut(type_ref) = TypeRef { namespace, name, scope };
        self.findings.mark_with(HandleResult::Rewritten, format!("reference to {full_name}"));
        true
    }

    fn handle_instruction(&mut self, ctx: &HandlerContext<'_>, module: &mut BinaryModule, at: InstructionRef) -> bool {
        let Some(member_id) = module.instruction(at).and_then(|i| i.member()) else {
            return false;
        };
        let member = module.member_ref(member_id);
        let parent = module.type_name(member.parent);
        let Some(redirect) = self
            .members
            .iter()
            .find(|r| r.from_type == parent && r.from_member == member.name)
            .cloned()
        else {
            return false;
        };
        let kind = member.kind;
        let signature = member.signature.clone();

        let scope = scope_for(ctx, module, &redirect.to_assembly);
        let (namespace, name) = split_qualified_name(&redirect.to_type);
        let facade = module.add_type_ref(TypeRef { namespace, name, scope });
        let replacement = module.add_member_ref(MemberRef {
            parent: TypeHandle::Ref(facade),
            name: redirect.to_member.clone(),
            kind,
            signature,
        });

        let Some(instruction) = module.instruction_mut(at) else {
            return false;
        };
        instruction.operand = Operand::Member(replacement);
        if redirect.is_static && instruction.opcode == OpCode::CallVirt {
            instruction.opcode = OpCode::Call;
        }

        self.findings.mark_with(
            HandleResult::Rewritten,
            format!("reference to {}.{}", redirect.from_type, redirect.from_member),
        );
        true
    }

    fn findings(&self) -> &HandlerFindings {
        &self.findings
    }
}

/// Turns access to a field that became a property into accessor calls.
#[derive(Debug, Default)]
pub struct FieldToPropertyRewriter {
    findings: HandlerFindings,
}

impl FieldToPropertyRewriter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InstructionHandler for FieldToPropertyRewriter {
    fn name(&self) -> &str {
        "FieldToPropertyRewriter"
    }

    fn handle_instruction(&mut self, ctx: &HandlerContext<'_>, module: &mut BinaryModule, at: InstructionRef) -> bool {
        let Some(instruction) = module.instruction(at) else {
            return false;
        };
        let (is_load, static_access) = match instruction.opcode {
            OpCode::LdFld => (true, false),
            OpCode::LdsFld => (true, true),
            OpCode::StFld => (false, false),
            OpCode::StsFld => (false, true),
            _ => return false,
        };
        let Some(member_id) = instruction.member() else {
            return false;
        };
        let member = module.member_ref(member_id);
        if member.kind != MemberKind::Field || !matches!(member.parent, TypeHandle::Ref(_)) {
            return false;
        }

        let parent = member.parent;
        let field = member.name.clone();
        let field_type = member.signature.clone();

        let (owner, type_name) = type_location(module, parent);
        if type_name.starts_with(SYSTEM_PREFIX)
            || ctx.definitions.resolve_type(&owner, &type_name).is_none()
            || ctx.definitions.find_field(&owner, &type_name, &field)
        {
            return false;
        }
        let accessor = format!("{}_{field}", if is_load { "get" } else { "set" });
        let Some(is_static) = ctx.definitions.find_method(&owner, &type_name, &accessor) else {
            return false;
        };

        let signature = if is_load { format!("{field_type}()") } else { format!("void({field_type})") };
        let replacement = module.add_member_ref(MemberRef {
            parent,
            name: accessor,
            kind: MemberKind::Method,
            signature,
        });
        let Some(instruction) = module.instruction_mut(at) else {
            return false;
        };
        // A static access has no receiver on the stack, so it can never be a virtual call.
        instruction.opcode = if is_static || static_access { OpCode::Call } else { OpCode::CallVirt };
        instruction.operand = Operand::Member(replacement);

        self.findings
            .mark_with(HandleResult::Rewritten, format!("{type_name}.{field} field now a property"));
        true
    }

    fn findings(&self) -> &HandlerFindings {
        &self.findings
    }
}
