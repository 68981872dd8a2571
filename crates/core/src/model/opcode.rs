use serde::{Deserialize, Serialize};

/// Operand shape carried by an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    None,
    Int,
    String,
    Type,
    Member,
    Branch,
}

macro_rules! opcodes {
    ($($variant:ident = $byte:literal, $mnemonic:literal, $kind:ident;)*) => {
        /// Stack-machine opcodes understood by the MSHM format.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum OpCode {
            $($variant,)*
        }

        impl OpCode {
            /// Encoded byte value.
            pub fn to_byte(self) -> u8 {
                match self {
                    $(OpCode::$variant => $byte,)*
                }
            }

            /// Decode an opcode byte; `None` for unknown values.
            pub fn from_byte(byte: u8) -> Option<Self> {
                match byte {
                    $($byte => Some(OpCode::$variant),)*
                    _ => None,
                }
            }

            pub fn mnemonic(self) -> &'static str {
                match self {
                    $(OpCode::$variant => $mnemonic,)*
                }
            }

            pub fn operand_kind(self) -> OperandKind {
                match self {
                    $(OpCode::$variant => OperandKind::$kind,)*
                }
            }
        }
    };
}

opcodes! {
    Nop = 0x00, "nop", None;
    Ret = 0x01, "ret", None;
    Pop = 0x02, "pop", None;
    Dup = 0x03, "dup", None;
    Throw = 0x04, "throw", None;
    LdNull = 0x05, "ldnull", None;
    Add = 0x06, "add", None;
    Sub = 0x07, "sub", None;
    Mul = 0x08, "mul", None;
    Div = 0x09, "div", None;
    Ceq = 0x0A, "ceq", None;
    Clt = 0x0B, "clt", None;
    Cgt = 0x0C, "cgt", None;
    LdcInt = 0x10, "ldc.i8", Int;
    LdArg = 0x11, "ldarg", Int;
    StArg = 0x12, "starg", Int;
    LdLoc = 0x13, "ldloc", Int;
    StLoc = 0x14, "stloc", Int;
    LdStr = 0x20, "ldstr", String;
    Br = 0x30, "br", Branch;
    BrTrue = 0x31, "brtrue", Branch;
    BrFalse = 0x32, "brfalse", Branch;
    Call = 0x40, "call", Member;
    CallVirt = 0x41, "callvirt", Member;
    NewObj = 0x42, "newobj", Member;
    LdFld = 0x43, "ldfld", Member;
    StFld = 0x44, "stfld", Member;
    LdsFld = 0x45, "ldsfld", Member;
    StsFld = 0x46, "stsfld", Member;
    LdFtn = 0x47, "ldftn", Member;
    LdToken = 0x50, "ldtoken", Type;
    CastClass = 0x51, "castclass", Type;
    IsInst = 0x52, "isinst", Type;
    Box = 0x53, "box", Type;
    UnboxAny = 0x54, "unbox.any", Type;
    NewArr = 0x55, "newarr", Type;
}

impl OpCode {
    /// Whether this opcode reads or writes a field.
    pub fn is_field_access(self) -> bool {
        matches!(self, OpCode::LdFld | OpCode::StFld | OpCode::LdsFld | OpCode::StsFld)
    }

    /// Whether this opcode invokes a method.
    pub fn is_call(self) -> bool {
        matches!(self, OpCode::Call | OpCode::CallVirt | OpCode::NewObj | OpCode::LdFtn)
    }
}
