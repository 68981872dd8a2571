use crate::model::{BinaryModule, InstructionRef, MemberKind, TypeHandle, TypeRefId, SYSTEM_PREFIX};
use crate::services::definitions::type_location;
use crate::services::handlers::{HandleResult, HandlerContext, HandlerFindings, InstructionHandler};

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        noun.to_string()
    } else {
        format!("{noun}s")
    }
}

/// Flags references to any of a set of types.
///
/// A name ending in `.*` matches every type in that namespace and below.
#[derive(Debug)]
pub struct TypeFinder {
    name: String,
    types: Vec<String>,
    result: HandleResult,
    phrase: String,
    findings: HandlerFindings,
}

impl TypeFinder {
    pub fn new(name: impl Into<String>, types: &[&str], result: HandleResult) -> Self {
        let phrase = format!("{} {}", types.join(", "), plural(types.len(), "type"));
        Self {
            name: name.into(),
            types: types.iter().map(|t| t.to_string()).collect(),
            result,
            phrase,
            findings: HandlerFindings::default(),
        }
    }

    fn matches(&self, full_name: &str) -> bool {
        self.types.iter().any(|pattern| match pattern.strip_suffix(".*") {
            Some(namespace) => full_name
                .strip_prefix(namespace)
                .is_some_and(|rest| rest.starts_with('.')),
            None => pattern == full_name,
        })
    }
}

impl InstructionHandler for TypeFinder {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_phrase(&self) -> Option<&str> {
        Some(&self.phrase)
    }

    fn handle_type(&mut self, _ctx: &HandlerContext<'_>, module: &mut BinaryModule, type_ref: TypeRefId) -> bool {
        if self.matches(&module.type_ref(type_ref).full_name()) {
            self.findings.mark(self.result);
        }
        false
    }

    fn findings(&self) -> &HandlerFindings {
        &self.findings
    }
}

/// Flags instructions that reference named members of one type.
#[derive(Debug)]
pub struct MemberFinder {
    name: String,
    type_name: String,
    members: Vec<String>,
    result: HandleResult,
    phrase: String,
    findings: HandlerFindings,
}

impl MemberFinder {
    pub fn new(name: impl Into<String>, type_name: &str, members: &[&str], result: HandleResult) -> Self {
        let listed: Vec<String> = members.iter().map(|m| format!("{type_name}.{m}")).collect();
        let phrase = format!("{} {}", listed.join(" or "), plural(members.len(), "member"));
        Self {
            name: name.into(),
            type_name: type_name.to_string(),
            members: members.iter().map(|m| m.to_string()).collect(),
            result,
            phrase,
            findings: HandlerFindings::default(),
        }
    }

    pub fn with_phrase(mut self, phrase: impl Into<String>) -> Self {
        self.phrase = phrase.into();
        self
    }
}

impl InstructionHandler for MemberFinder {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_phrase(&self) -> Option<&str> {
        Some(&self.phrase)
    }

    fn handle_instruction(&mut self, _ctx: &HandlerContext<'_>, module: &mut BinaryModule, at: InstructionRef) -> bool {
        let Some(member_id) = module.instruction(at).and_then(|i| i.member()) else {
            return false;
        };
        let member = module.member_ref(member_id);
        if self.members.contains(&member.name) && module.type_name(member.parent) == self.type_name {
            self.findings.mark(self.result);
        }
        false
    }

    fn findings(&self) -> &HandlerFindings {
        &self.findings
    }
}

/// Flags type references that no loaded module defines.
///
/// A type still scoped to a removed platform reference had no replacement;
/// a type scoped to an indexed module must exist in that module.
#[derive(Debug, Default)]
pub struct MissingTypeFinder {
    findings: HandlerFindings,
}

impl MissingTypeFinder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InstructionHandler for MissingTypeFinder {
    fn name(&self) -> &str {
        "MissingTypeFinder"
    }

    fn handle_type(&mut self, ctx: &HandlerContext<'_>, module: &mut BinaryModule, type_ref: TypeRefId) -> bool {
        let ty = module.type_ref(type_ref);
        let full_name = ty.full_name();
        if full_name.starts_with(SYSTEM_PREFIX) {
            return false;
        }
        let scope = module.assembly_ref(ty.scope);
        let missing = scope.is_removed()
            || (ctx.definitions.has_definitions(&scope.name)
                && ctx.definitions.resolve_type(&scope.name, &full_name).is_none());
        if missing {
            self.findings.mark_with(HandleResult::NotCompatible, format!("{full_name} (no such type)"));
        }
        false
    }

    fn findings(&self) -> &HandlerFindings {
        &self.findings
    }
}

/// Flags field and method references that an indexed type does not define.
#[derive(Debug, Default)]
pub struct MissingMemberFinder {
    findings: HandlerFindings,
}

impl MissingMemberFinder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InstructionHandler for MissingMemberFinder {
    fn name(&self) -> &str {
        "MissingMemberFinder"
    }

    fn handle_instruction(&mut self, ctx: &HandlerContext<'_>, module: &mut BinaryModule, at: InstructionRef) -> bool {
        let Some(member_id) = module.instruction(at).and_then(|i| i.member()) else {
            return false;
        };
        let member = module.member_ref(member_id);
        if matches!(member.parent, TypeHandle::Def(_)) {
            return false;
        }
        let (owner, type_name) = type_location(module, member.parent);
        if type_name.starts_with(SYSTEM_PREFIX) || ctx.definitions.resolve_type(&owner, &type_name).is_none() {
            return false;
        }

        let found = match member.kind {
            MemberKind::Field => ctx.definitions.find_field(&owner, &type_name, &member.name),
            MemberKind::Method => ctx.definitions.find_method(&owner, &type_name, &member.name).is_some(),
        };
        if !found {
            self.findings.mark_with(
                HandleResult::NotCompatible,
                format!("{type_name}.{} (no such {})", member.name, member.kind.as_str()),
            );
        }
        false
    }

    fn findings(&self) -> &HandlerFindings {
        &self.findings
    }
}
