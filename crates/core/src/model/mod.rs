//! In-memory model of a binary module.
//!
//! A [`BinaryModule`] is an owned arena: assembly references, type references,
//! member references and type definitions live in flat tables and refer to one
//! another through typed indices. Rewriting mutates entries by index, never via
//! aliased pointers, which keeps a rewrite pass deterministic.

use std::fmt;

use serde::{Deserialize, Serialize};

mod builder;
mod opcode;

pub use builder::{ModuleBuilder, TypeBuilder};
pub use opcode::{OpCode, OperandKind};

/// Prefix of platform-neutral runtime names that never need rescoping or resolution.
pub const SYSTEM_PREFIX: &str = "System.";

macro_rules! table_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

table_id!(
    /// Index into a module's assembly reference table.
    AssemblyRefId
);
table_id!(
    /// Index into a module's type reference table.
    TypeRefId
);
table_id!(
    /// Index into a module's member reference table.
    MemberRefId
);
table_id!(
    /// Index into a module's type definition table.
    TypeDefId
);

/// Four-part module version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleVersion {
    pub major: u16,
    pub minor: u16,
    pub build: u16,
    pub revision: u16,
}

impl ModuleVersion {
    pub fn new(major: u16, minor: u16, build: u16, revision: u16) -> Self {
        Self { major, minor, build, revision }
    }
}

impl fmt::Display for ModuleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.major, self.minor, self.build, self.revision)
    }
}

/// Reference from one module to another module by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyRef {
    pub name: String,
    pub version: ModuleVersion,
    #[serde(skip)]
    pub(crate) removed: bool,
}

impl AssemblyRef {
    pub fn new(name: impl Into<String>, version: ModuleVersion) -> Self {
        Self { name: name.into(), version, removed: false }
    }

    /// Display name including the version, e.g. `Netcode, Version=1.5.0.0`.
    pub fn full_name(&self) -> String {
        format!("{}, Version={}", self.name, self.version)
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }
}

/// Reference to a type defined in another module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRef {
    pub namespace: String,
    pub name: String,
    pub scope: AssemblyRefId,
}

impl TypeRef {
    pub fn full_name(&self) -> String {
        qualified_name(&self.namespace, &self.name)
    }
}

/// A type used by an instruction or signature: either imported or local.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TypeHandle {
    Ref(TypeRefId),
    Def(TypeDefId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    Field,
    Method,
}

impl MemberKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MemberKind::Field => "field",
            MemberKind::Method => "method",
        }
    }
}

/// Reference to a field or method on some type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRef {
    pub parent: TypeHandle,
    pub name: String,
    pub kind: MemberKind,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    None,
    Int(i64),
    String(String),
    Type(TypeHandle),
    Member(MemberRefId),
    Branch(u32),
}

impl Operand {
    pub fn kind(&self) -> OperandKind {
        match self {
            Operand::None => OperandKind::None,
            Operand::Int(_) => OperandKind::Int,
            Operand::String(_) => OperandKind::String,
            Operand::Type(_) => OperandKind::Type,
            Operand::Member(_) => OperandKind::Member,
            Operand::Branch(_) => OperandKind::Branch,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: OpCode,
    pub operand: Operand,
}

impl Instruction {
    pub fn new(opcode: OpCode, operand: Operand) -> Self {
        Self { opcode, operand }
    }

    pub fn simple(opcode: OpCode) -> Self {
        Self { opcode, operand: Operand::None }
    }

    pub fn member(&self) -> Option<MemberRefId> {
        match self.operand {
            Operand::Member(id) => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeArg {
    Int(i64),
    String(String),
    Type(TypeHandle),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomAttribute {
    pub constructor: MemberRefId,
    pub arguments: Vec<AttributeArg>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub is_static: bool,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDef {
    pub name: String,
    pub is_static: bool,
    pub signature: String,
    pub body: Option<Vec<Instruction>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    pub namespace: String,
    pub name: String,
    pub is_public: bool,
    pub base: Option<TypeHandle>,
    pub attributes: Vec<CustomAttribute>,
    pub fields: Vec<FieldDef>,
    pub methods: Vec<MethodDef>,
}

impl TypeDef {
    pub fn full_name(&self) -> String {
        qualified_name(&self.namespace, &self.name)
    }
}

/// Location of a single instruction inside a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstructionRef {
    pub type_index: usize,
    pub method_index: usize,
    pub index: usize,
}

/// A parsed module: metadata tables plus one instruction stream per method body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryModule {
    pub name: String,
    pub version: ModuleVersion,
    pub(crate) assembly_refs: Vec<AssemblyRef>,
    pub(crate) type_refs: Vec<TypeRef>,
    pub(crate) member_refs: Vec<MemberRef>,
    pub(crate) types: Vec<TypeDef>,
}

impl BinaryModule {
    pub fn new(name: impl Into<String>, version: ModuleVersion) -> Self {
        Self {
            name: name.into(),
            version,
            assembly_refs: Vec::new(),
            type_refs: Vec::new(),
            member_refs: Vec::new(),
            types: Vec::new(),
        }
    }

    /// Identity of this module as other modules would reference it.
    pub fn identity(&self) -> AssemblyRef {
        AssemblyRef::new(self.name.clone(), self.version)
    }

    /// Live (non-removed) assembly references, in table order.
    pub fn assembly_references(&self) -> impl Iterator<Item = (AssemblyRefId, &AssemblyRef)> {
        self.assembly_refs
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.removed)
            .map(|(i, r)| (AssemblyRefId(i as u32), r))
    }

    pub fn assembly_ref(&self, id: AssemblyRefId) -> &AssemblyRef {
        &self.assembly_refs[id.index()]
    }

    pub fn find_assembly_ref(&self, name: &str) -> Option<AssemblyRefId> {
        self.assembly_references().find(|(_, r)| r.name == name).map(|(id, _)| id)
    }

    /// Add an assembly reference, reusing a live reference with the same name.
    pub fn add_assembly_ref(&mut self, reference: AssemblyRef) -> AssemblyRefId {
        if let Some(id) = self.find_assembly_ref(&reference.name) {
            return id;
        }
        self.assembly_refs.push(AssemblyRef { removed: false, ..reference });
        AssemblyRefId((self.assembly_refs.len() - 1) as u32)
    }

    /// Remove an assembly reference. The slot stays allocated so ids remain stable.
    pub fn remove_assembly_ref(&mut self, id: AssemblyRefId) {
        self.assembly_refs[id.index()].removed = true;
    }

    pub(crate) fn assembly_ref_slots(&self) -> &[AssemblyRef] {
        &self.assembly_refs
    }

    pub fn type_refs(&self) -> impl Iterator<Item = (TypeRefId, &TypeRef)> {
        self.type_refs.iter().enumerate().map(|(i, t)| (TypeRefId(i as u32), t))
    }

    pub fn type_ref_count(&self) -> usize {
        self.type_refs.len()
    }

    pub fn type_ref(&self, id: TypeRefId) -> &TypeRef {
        &self.type_refs[id.index()]
    }

    pub fn type_ref_mut(&mut self, id: TypeRefId) -> &mut TypeRef {
        &mut self.type_refs[id.index()]
    }

    /// Add a type reference, reusing an identical entry.
    pub fn add_type_ref(&mut self, reference: TypeRef) -> TypeRefId {
        if let Some(pos) = self.type_refs.iter().position(|t| *t == reference) {
            return TypeRefId(pos as u32);
        }
        self.type_refs.push(reference);
        TypeRefId((self.type_refs.len() - 1) as u32)
    }

    pub fn member_refs(&self) -> impl Iterator<Item = (MemberRefId, &MemberRef)> {
        self.member_refs.iter().enumerate().map(|(i, m)| (MemberRefId(i as u32), m))
    }

    pub fn member_ref(&self, id: MemberRefId) -> &MemberRef {
        &self.member_refs[id.index()]
    }

    /// Add a member reference, reusing an identical entry.
    pub fn add_member_ref(&mut self, reference: MemberRef) -> MemberRefId {
        if let Some(pos) = self.member_refs.iter().position(|m| *m == reference) {
            return MemberRefId(pos as u32);
        }
        self.member_refs.push(reference);
        MemberRefId((self.member_refs.len() - 1) as u32)
    }

    pub fn types(&self) -> &[TypeDef] {
        &self.types
    }

    pub fn type_def(&self, id: TypeDefId) -> &TypeDef {
        &self.types[id.index()]
    }

    pub fn types_mut(&mut self) -> &mut [TypeDef] {
        &mut self.types
    }

    /// Qualified name of a type handle.
    pub fn type_name(&self, handle: TypeHandle) -> String {
        match handle {
            TypeHandle::Ref(id) => self.type_ref(id).full_name(),
            TypeHandle::Def(id) => self.type_def(id).full_name(),
        }
    }

    /// Name of the module owning the given type (this module for local definitions).
    pub fn type_scope_name(&self, handle: TypeHandle) -> &str {
        match handle {
            TypeHandle::Ref(id) => &self.assembly_ref(self.type_ref(id).scope).name,
            TypeHandle::Def(_) => &self.name,
        }
    }

    /// `Namespace.Type.member` form used in diagnostics.
    pub fn member_name(&self, id: MemberRefId) -> String {
        let member = self.member_ref(id);
        format!("{}.{}", self.type_name(member.parent), member.name)
    }

    /// Every instruction location, in definition order.
    pub fn instruction_locations(&self) -> Vec<InstructionRef> {
        let mut out = Vec::new();
        for (type_index, ty) in self.types.iter().enumerate() {
            for (method_index, method) in ty.methods.iter().enumerate() {
                if let Some(body) = &method.body {
                    for index in 0..body.len() {
                        out.push(InstructionRef { type_index, method_index, index });
                    }
                }
            }
        }
        out
    }

    /// The instruction list enclosing `at`.
    pub fn body(&self, at: InstructionRef) -> &[Instruction] {
        self.types
            .get(at.type_index)
            .and_then(|t| t.methods.get(at.method_index))
            .and_then(|m| m.body.as_deref())
            .unwrap_or(&[])
    }

    pub fn instruction(&self, at: InstructionRef) -> Option<&Instruction> {
        self.body(at).get(at.index)
    }

    pub fn instruction_mut(&mut self, at: InstructionRef) -> Option<&mut Instruction> {
        self.types
            .get_mut(at.type_index)?
            .methods
            .get_mut(at.method_index)?
            .body
            .as_mut()?
            .get_mut(at.index)
    }

    /// Type handles used as custom attribute arguments anywhere in the module.
    pub fn attribute_type_arguments(&self) -> Vec<TypeHandle> {
        self.types
            .iter()
            .flat_map(|t| t.attributes.iter())
            .flat_map(|a| a.arguments.iter())
            .filter_map(|arg| match arg {
                AttributeArg::Type(handle) => Some(*handle),
                _ => None,
            })
            .collect()
    }

    /// Public, non-compiler-generated type names defined by this module.
    pub fn public_type_names(&self) -> Vec<String> {
        self.types
            .iter()
            .filter(|t| t.is_public && !t.namespace.contains('<'))
            .map(TypeDef::full_name)
            .collect()
    }
}

/// Join a namespace and simple name into a qualified type name.
pub fn qualified_name(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}.{name}")
    }
}

/// Split a qualified type name into namespace and simple name.
pub fn split_qualified_name(full_name: &str) -> (String, String) {
    match full_name.rsplit_once('.') {
        Some((namespace, name)) => (namespace.to_string(), name.to_string()),
        None => (String::new(), full_name.to_string()),
    }
}
