//! MSHM binary module format.
//!
//! Layout (all integers little-endian, strings are `u32` length + UTF-8):
//!
//! ```text
//! magic "MSHM" | format u16 | name | version 4 x u16
//! table counts:  assembly refs, type refs, member refs, type defs (4 x u32)
//! assembly refs: { name, version }
//! type refs:     { namespace, name, scope u32 }
//! member refs:   { parent handle, name, kind u8, signature }
//! type defs:     { namespace, name, flags u8, base handle?,
//!                  attributes, fields, methods }
//! ```
//!
//! A type handle is a tag byte (`0` ref, `1` def) followed by a `u32` index;
//! an optional handle uses tag `0xFF` for "none".

mod reader;
mod writer;

use thiserror::Error;

pub use reader::read_module;
pub use writer::write_module;

pub(crate) const MAGIC: &[u8; 4] = b"MSHM";
pub const FORMAT_VERSION: u16 = 1;

/// File extension of module files.
pub const MODULE_EXTENSION: &str = "dll";
/// File extension of the debug-symbol file paired with a module.
pub const SYMBOL_EXTENSION: &str = "pdb";

/// Whether `name` can be used as a single file-name component.
///
/// Rejects empty names, `.`/`..`, and anything with a path separator or drive
/// colon, so a name read from a module can never point outside its directory.
pub fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', ':', '\0'])
}

pub(crate) const HANDLE_REF: u8 = 0;
pub(crate) const HANDLE_DEF: u8 = 1;
pub(crate) const HANDLE_NONE: u8 = 0xFF;

pub(crate) const ARG_INT: u8 = 0;
pub(crate) const ARG_STRING: u8 = 1;
pub(crate) const ARG_TYPE: u8 = 2;

pub(crate) const TYPE_PUBLIC: u8 = 0b01;
pub(crate) const MEMBER_STATIC: u8 = 0b01;
pub(crate) const METHOD_HAS_BODY: u8 = 0b10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModuleReadError {
    #[error("not a module file (bad magic)")]
    BadMagic,
    #[error("unsupported module format version {0}")]
    UnsupportedVersion(u16),
    #[error("unexpected end of data at offset {offset}")]
    UnexpectedEof { offset: usize },
    #[error("invalid UTF-8 string at offset {offset}")]
    InvalidUtf8 { offset: usize },
    #[error("unknown opcode 0x{byte:02X} at offset {offset}")]
    UnknownOpcode { byte: u8, offset: usize },
    #[error("invalid {what} tag {tag} at offset {offset}")]
    InvalidTag { what: &'static str, tag: u8, offset: usize },
    #[error("{table} index {index} out of range (table has {len} entries)")]
    IndexOutOfRange { table: &'static str, index: u32, len: usize },
    #[error("branch target {target} out of range in {method} ({len} instructions)")]
    BranchOutOfRange { method: String, target: u32, len: usize },
    #[error("{0} trailing bytes after module data")]
    TrailingBytes(usize),
}
