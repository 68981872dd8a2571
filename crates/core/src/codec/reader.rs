use crate::codec::{
    ModuleReadError, ARG_INT, ARG_STRING, ARG_TYPE, FORMAT_VERSION, HANDLE_DEF, HANDLE_NONE,
    HANDLE_REF, MAGIC, MEMBER_STATIC, METHOD_HAS_BODY, TYPE_PUBLIC,
};
use crate::model::{
    AssemblyRef, AssemblyRefId, AttributeArg, BinaryModule, CustomAttribute, FieldDef,
    Instruction, MemberKind, MemberRef, MemberRefId, MethodDef, ModuleVersion, OpCode, Operand,
    OperandKind, TypeDef, TypeDefId, TypeHandle, TypeRef, TypeRefId,
};

type ReadResult<T> = Result<T, ModuleReadError>;

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, len: usize) -> ReadResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(ModuleReadError::UnexpectedEof { offset: self.pos })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> ReadResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> ReadResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> ReadResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn i64(&mut self) -> ReadResult<i64> {
        let b = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(b);
        Ok(i64::from_le_bytes(buf))
    }

    fn string(&mut self) -> ReadResult<String> {
        let len = self.u32()? as usize;
        let offset = self.pos;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).map_err(|_| ModuleReadError::InvalidUtf8 { offset })
    }

    fn version(&mut self) -> ReadResult<ModuleVersion> {
        Ok(ModuleVersion::new(self.u16()?, self.u16()?, self.u16()?, self.u16()?))
    }

    /// Read a table length; each entry needs at least one byte, so larger counts are truncated data.
    fn count(&mut self) -> ReadResult<usize> {
        let offset = self.pos;
        let count = self.u32()? as usize;
        if count > self.bytes.len().saturating_sub(self.pos) {
            return Err(ModuleReadError::UnexpectedEof { offset });
        }
        Ok(count)
    }
}

/// Table sizes used to validate indices while reading.
struct Bounds {
    assembly_refs: usize,
    type_refs: usize,
    member_refs: usize,
    types: usize,
}

fn check(table: &'static str, index: u32, len: usize) -> ReadResult<u32> {
    if (index as usize) < len {
        Ok(index)
    } else {
        Err(ModuleReadError::IndexOutOfRange { table, index, len })
    }
}

fn read_handle(cur: &mut Cursor<'_>, bounds: &Bounds) -> ReadResult<TypeHandle> {
    match read_optional_handle(cur, bounds)? {
        Some(handle) => Ok(handle),
        None => Err(ModuleReadError::InvalidTag {
            what: "type handle",
            tag: HANDLE_NONE,
            offset: cur.pos - 1,
        }),
    }
}

fn read_optional_handle(cur: &mut Cursor<'_>, bounds: &Bounds) -> ReadResult<Option<TypeHandle>> {
    let offset = cur.pos;
    match cur.u8()? {
        HANDLE_REF => {
            Ok(Some(TypeHandle::Ref(TypeRefId(check("type ref", cur.u32()?, bounds.type_refs)?))))
        }
        HANDLE_DEF => Ok(Some(TypeHandle::Def(TypeDefId(check("type def", cur.u32()?, bounds.types)?)))),
        HANDLE_NONE => Ok(None),
        tag => Err(ModuleReadError::InvalidTag { what: "type handle", tag, offset }),
    }
}

fn read_instruction(cur: &mut Cursor<'_>, bounds: &Bounds) -> ReadResult<Instruction> {
    let offset = cur.pos;
    let byte = cur.u8()?;
    let opcode = OpCode::from_byte(byte).ok_or(ModuleReadError::UnknownOpcode { byte, offset })?;
    let operand = match opcode.operand_kind() {
        OperandKind::None => Operand::None,
        OperandKind::Int => Operand::Int(cur.i64()?),
        OperandKind::String => Operand::String(cur.string()?),
        OperandKind::Type => Operand::Type(read_handle(cur, bounds)?),
        OperandKind::Member => {
            Operand::Member(MemberRefId(check("member ref", cur.u32()?, bounds.member_refs)?))
        }
        OperandKind::Branch => Operand::Branch(cur.u32()?),
    };
    Ok(Instruction { opcode, operand })
}

/// Parse a module from its encoded bytes.
pub fn read_module(bytes: &[u8]) -> Result<BinaryModule, ModuleReadError> {
    let mut cur = Cursor { bytes, pos: 0 };
    if bytes.len() < MAGIC.len() || &bytes[..MAGIC.len()] != MAGIC {
        return Err(ModuleReadError::BadMagic);
    }
    cur.pos = MAGIC.len();
    let format = cur.u16()?;
    if format != FORMAT_VERSION {
        return Err(ModuleReadError::UnsupportedVersion(format));
    }

    let name = cur.string()?;
    let version = cur.version()?;
    let mut module = BinaryModule::new(name, version);

    let bounds = Bounds {
        assembly_refs: cur.count()?,
        type_refs: cur.count()?,
        member_refs: cur.count()?,
        types: cur.count()?,
    };

    for _ in 0..bounds.assembly_refs {
        let name = cur.string()?;
        let version = cur.version()?;
        module.assembly_refs.push(AssemblyRef::new(name, version));
    }

    for _ in 0..bounds.type_refs {
        let namespace = cur.string()?;
        let name = cur.string()?;
        let scope = AssemblyRefId(check("assembly ref", cur.u32()?, bounds.assembly_refs)?);
        module.type_refs.push(TypeRef { namespace, name, scope });
    }

    for _ in 0..bounds.member_refs {
        let parent = read_handle(&mut cur, &bounds)?;
        let name = cur.string()?;
        let offset = cur.pos;
        let kind = match cur.u8()? {
            0 => MemberKind::Field,
            1 => MemberKind::Method,
            tag => return Err(ModuleReadError::InvalidTag { what: "member kind", tag, offset }),
        };
        let signature = cur.string()?;
        module.member_refs.push(MemberRef { parent, name, kind, signature });
    }

    for _ in 0..bounds.types {
        module.types.push(read_type(&mut cur, &bounds)?);
    }

    if cur.pos != bytes.len() {
        return Err(ModuleReadError::TrailingBytes(bytes.len() - cur.pos));
    }
    Ok(module)
}

fn read_type(cur: &mut Cursor<'_>, bounds: &Bounds) -> ReadResult<TypeDef> {
    let namespace = cur.string()?;
    let name = cur.string()?;
    let flags = cur.u8()?;
    let base = read_optional_handle(cur, bounds)?;

    let count = cur.count()?;
    let mut attributes = Vec::with_capacity(count);
    for _ in 0..count {
        let constructor = MemberRefId(check("member ref", cur.u32()?, bounds.member_refs)?);
        let arg_count = cur.count()?;
        let mut arguments = Vec::with_capacity(arg_count);
        for _ in 0..arg_count {
            let offset = cur.pos;
            arguments.push(match cur.u8()? {
                ARG_INT => AttributeArg::Int(cur.i64()?),
                ARG_STRING => AttributeArg::String(cur.string()?),
                ARG_TYPE => AttributeArg::Type(read_handle(cur, bounds)?),
                tag => {
                    return Err(ModuleReadError::InvalidTag { what: "attribute argument", tag, offset })
                }
            });
        }
        attributes.push(CustomAttribute { constructor, arguments });
    }

    let count = cur.count()?;
    let mut fields = Vec::with_capacity(count);
    for _ in 0..count {
        let name = cur.string()?;
        let flags = cur.u8()?;
        let signature = cur.string()?;
        fields.push(FieldDef { name, is_static: flags & MEMBER_STATIC != 0, signature });
    }

    let count = cur.count()?;
    let mut methods = Vec::with_capacity(count);
    for _ in 0..count {
        let method_name = cur.string()?;
        let flags = cur.u8()?;
        let signature = cur.string()?;
        let body = if flags & METHOD_HAS_BODY != 0 {
            let len = cur.count()?;
            let mut body = Vec::with_capacity(len);
            for _ in 0..len {
                body.push(read_instruction(cur, bounds)?);
            }
            for instruction in &body {
                if let Operand::Branch(target) = instruction.operand {
                    if target as usize >= body.len() {
                        return Err(ModuleReadError::BranchOutOfRange {
                            method: format!("{namespace}.{name}::{method_name}"),
                            target,
                            len: body.len(),
                        });
                    }
                }
            }
            Some(body)
        } else {
            None
        };
        methods.push(MethodDef { name: method_name, is_static: flags & MEMBER_STATIC != 0, signature, body });
    }

    Ok(TypeDef { namespace, name, is_public: flags & TYPE_PUBLIC != 0, base, attributes, fields, methods })
}
