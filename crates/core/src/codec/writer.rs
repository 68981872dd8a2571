use crate::codec::{
    ARG_INT, ARG_STRING, ARG_TYPE, FORMAT_VERSION, HANDLE_DEF, HANDLE_NONE, HANDLE_REF, MAGIC,
    MEMBER_STATIC, METHOD_HAS_BODY, TYPE_PUBLIC,
};
use crate::model::{
    AttributeArg, BinaryModule, Instruction, MemberKind, ModuleVersion, Operand, TypeDef,
    TypeHandle,
};

#[derive(Default)]
struct Out {
    buf: Vec<u8>,
}

impl Out {
    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn len(&mut self, v: usize) {
        self.u32(v as u32);
    }

    fn i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn string(&mut self, s: &str) {
        self.len(s.len());
        self.buf.extend_from_slice(s.as_bytes());
    }

    fn version(&mut self, v: ModuleVersion) {
        self.u16(v.major);
        self.u16(v.minor);
        self.u16(v.build);
        self.u16(v.revision);
    }

    fn handle(&mut self, handle: TypeHandle) {
        match handle {
            TypeHandle::Ref(id) => {
                self.u8(HANDLE_REF);
                self.u32(id.0);
            }
            TypeHandle::Def(id) => {
                self.u8(HANDLE_DEF);
                self.u32(id.0);
            }
        }
    }
}

/// Encode a module. Output is a pure function of the module contents.
///
/// Removed assembly references are dropped unless a type reference still
/// points at one; such scopes are kept so the written module stays readable.
pub fn write_module(module: &BinaryModule) -> Vec<u8> {
    let slots = module.assembly_ref_slots();
    let mut referenced = vec![false; slots.len()];
    for (_, ty) in module.type_refs() {
        referenced[ty.scope.index()] = true;
    }
    let mut remap = vec![0u32; slots.len()];
    let mut kept = Vec::new();
    for (index, slot) in slots.iter().enumerate() {
        if !slot.removed || referenced[index] {
            remap[index] = kept.len() as u32;
            kept.push(slot);
        }
    }

    let mut out = Out::default();
    out.buf.extend_from_slice(MAGIC);
    out.u16(FORMAT_VERSION);
    out.string(&module.name);
    out.version(module.version);

    out.len(kept.len());
    out.len(module.type_ref_count());
    out.len(module.member_refs().count());
    out.len(module.types().len());

    for reference in kept {
        out.string(&reference.name);
        out.version(reference.version);
    }

    for (_, ty) in module.type_refs() {
        out.string(&ty.namespace);
        out.string(&ty.name);
        out.u32(remap[ty.scope.index()]);
    }

    for (_, member) in module.member_refs() {
        out.handle(member.parent);
        out.string(&member.name);
        out.u8(match member.kind {
            MemberKind::Field => 0,
            MemberKind::Method => 1,
        });
        out.string(&member.signature);
    }

    for ty in module.types() {
        write_type(&mut out, ty);
    }

    out.buf
}

fn write_type(out: &mut Out, ty: &TypeDef) {
    out.string(&ty.namespace);
    out.string(&ty.name);
    out.u8(if ty.is_public { TYPE_PUBLIC } else { 0 });
    match ty.base {
        Some(handle) => out.handle(handle),
        None => out.u8(HANDLE_NONE),
    }

    out.len(ty.attributes.len());
    for attribute in &ty.attributes {
        out.u32(attribute.constructor.0);
        out.len(attribute.arguments.len());
        for arg in &attribute.arguments {
            match arg {
                AttributeArg::Int(v) => {
                    out.u8(ARG_INT);
                    out.i64(*v);
                }
                AttributeArg::String(s) => {
                    out.u8(ARG_STRING);
                    out.string(s);
                }
                AttributeArg::Type(handle) => {
                    out.u8(ARG_TYPE);
                    out.handle(*handle);
                }
            }
        }
    }

    out.len(ty.fields.len());
    for field in &ty.fields {
        out.string(&field.name);
        out.u8(if field.is_static { MEMBER_STATIC } else { 0 });
        out.string(&field.signature);
    }

    out.len(ty.methods.len());
    for method in &ty.methods {
        out.string(&method.name);
        let mut flags = if method.is_static { MEMBER_STATIC } else { 0 };
        if method.body.is_some() {
            flags |= METHOD_HAS_BODY;
        }
        out.u8(flags);
        out.string(&method.signature);
        if let Some(body) = &method.body {
            out.len(body.len());
            for instruction in body {
                write_instruction(out, instruction);
            }
        }
    }
}

fn write_instruction(out: &mut Out, instruction: &Instruction) {
    debug_assert_eq!(instruction.opcode.operand_kind(), instruction.operand.kind());
    out.u8(instruction.opcode.to_byte());
    match &instruction.operand {
        Operand::None => {}
        Operand::Int(v) => out.i64(*v),
        Operand::String(s) => out.string(s),
        Operand::Type(handle) => out.handle(*handle),
        Operand::Member(id) => out.u32(id.0),
        Operand::Branch(target) => out.u32(*target),
    }
}
