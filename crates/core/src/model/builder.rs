use crate::model::{
    AssemblyRef, AssemblyRefId, AttributeArg, BinaryModule, CustomAttribute, FieldDef,
    Instruction, MemberKind, MemberRef, MemberRefId, MethodDef, ModuleVersion, TypeDef, TypeDefId,
    TypeHandle, TypeRef, TypeRefId,
};

/// Programmatic construction of a [`BinaryModule`].
///
/// Used by tooling and test fixtures; the codec produces modules from bytes.
#[derive(Debug, Clone)]
pub struct ModuleBuilder {
    module: BinaryModule,
}

impl ModuleBuilder {
    pub fn new(name: impl Into<String>, version: ModuleVersion) -> Self {
        Self { module: BinaryModule::new(name, version) }
    }

    pub fn assembly_ref(&mut self, name: impl Into<String>, version: ModuleVersion) -> AssemblyRefId {
        self.module.add_assembly_ref(AssemblyRef::new(name, version))
    }

    pub fn type_ref(
        &mut self,
        scope: AssemblyRefId,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> TypeRefId {
        self.module.add_type_ref(TypeRef { namespace: namespace.into(), name: name.into(), scope })
    }

    pub fn field_ref(
        &mut self,
        parent: TypeHandle,
        name: impl Into<String>,
        signature: impl Into<String>,
    ) -> MemberRefId {
        self.member_ref(parent, name, MemberKind::Field, signature)
    }

    pub fn method_ref(
        &mut self,
        parent: TypeHandle,
        name: impl Into<String>,
        signature: impl Into<String>,
    ) -> MemberRefId {
        self.member_ref(parent, name, MemberKind::Method, signature)
    }

    fn member_ref(
        &mut self,
        parent: TypeHandle,
        name: impl Into<String>,
        kind: MemberKind,
        signature: impl Into<String>,
    ) -> MemberRefId {
        self.module.add_member_ref(MemberRef {
            parent,
            name: name.into(),
            kind,
            signature: signature.into(),
        })
    }

    /// Append a type definition and return its id.
    pub fn add_type(&mut self, ty: TypeBuilder) -> TypeDefId {
        self.module.types.push(ty.def);
        TypeDefId((self.module.types.len() - 1) as u32)
    }

    pub fn build(self) -> BinaryModule {
        self.module
    }
}

/// Builder for a single type definition.
#[derive(Debug, Clone)]
pub struct TypeBuilder {
    def: TypeDef,
}

impl TypeBuilder {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            def: TypeDef {
                namespace: namespace.into(),
                name: name.into(),
                is_public: false,
                base: None,
                attributes: Vec::new(),
                fields: Vec::new(),
                methods: Vec::new(),
            },
        }
    }

    pub fn public(mut self) -> Self {
        self.def.is_public = true;
        self
    }

    pub fn base(mut self, base: TypeHandle) -> Self {
        self.def.base = Some(base);
        self
    }

    pub fn attribute(mut self, constructor: MemberRefId, arguments: Vec<AttributeArg>) -> Self {
        self.def.attributes.push(CustomAttribute { constructor, arguments });
        self
    }

    pub fn field(mut self, name: impl Into<String>, is_static: bool, signature: impl Into<String>) -> Self {
        self.def.fields.push(FieldDef { name: name.into(), is_static, signature: signature.into() });
        self
    }

    pub fn method(mut self, name: impl Into<String>, is_static: bool, body: Vec<Instruction>) -> Self {
        self.def.methods.push(MethodDef {
            name: name.into(),
            is_static,
            signature: String::new(),
            body: Some(body),
        });
        self
    }

    /// A method without a body (abstract or extern).
    pub fn abstract_method(mut self, name: impl Into<String>, is_static: bool) -> Self {
        self.def.methods.push(MethodDef {
            name: name.into(),
            is_static,
            signature: String::new(),
            body: None,
        });
        self
    }
}
