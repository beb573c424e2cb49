use thiserror::Error;

use crate::constant_pool::EntryKind;

#[derive(Error, Debug)]
pub enum ClassFileError {
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error("Malformed header: {0}")]
    MalformedHeader(HeaderError),
    #[error("Unexpected end of input: requested {requested} bytes, {remaining} remaining")]
    UnexpectedEndOfInput { requested: usize, remaining: usize },
    #[error("Unknown constant pool tag: {0}")]
    UnknownConstantTag(u8),
    #[error("Constant pool index {index} out of range (pool length {len})")]
    IndexOutOfRange { index: u16, len: usize },
    #[error("Expected {expected} at constant pool index {index}, found {found}")]
    WrongEntryKind {
        index: u16,
        expected: EntryKind,
        found: EntryKind,
    },
    #[error("Invalid method handle at index {index}: reference kind {reference_kind} cannot refer to {target:?}")]
    InvalidMethodHandleReference {
        index: u16,
        reference_kind: u8,
        target: Option<EntryKind>,
    },
    #[error("Invalid binary name {name:?} at constant pool index {index}")]
    InvalidBinaryName { index: u16, name: String },
    #[error("Illegal character 0x{byte:02X} at byte offset {offset}")]
    IllegalCharacter { byte: u8, offset: usize },
    #[error("Invalid code point: U+{0:X}")]
    InvalidCodePoint(u32),
    #[error("Descriptor syntax error: {0}")]
    DescriptorSyntaxError(#[from] DescriptorError),
    #[error("Invalid element value tag: {0:?}")]
    InvalidElementValueTag(char),
    #[error("Element values nested more than {limit} levels deep")]
    NestingTooDeep { limit: usize },
    #[error("Attribute {name} has {remaining} unread bytes")]
    AttributeLengthMismatch { name: &'static str, remaining: usize },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum HeaderError {
    #[error("Invalid magic identifier: 0x{0:X}")]
    InvalidMagicIdentifier(u32),
    #[error("{0} trailing bytes at end of class file")]
    TrailingBytes(usize),
}

#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum DescriptorError {
    #[error("empty descriptor")]
    Empty,
    #[error("invalid descriptor type {0:?}")]
    InvalidType(char),
    #[error("invalid code point U+{0:X} in descriptor")]
    InvalidCharacter(u32),
    #[error("no semicolon after class or interface name")]
    MissingSemicolon,
    #[error("class name missing")]
    MissingClassName,
    #[error("array type has more than 255 dimensions")]
    TooManyArrayDimensions,
    #[error("array type missing element type")]
    MissingArrayElementType,
    #[error("unexpected characters after descriptor")]
    TrailingCharacters,
    #[error("missing parameter list")]
    MissingParameterList,
    #[error("unterminated parameter list")]
    UnterminatedParameterList,
    #[error("missing return type")]
    MissingReturnType,
}
