// https://docs.oracle.com/javase/specs/jvms/se19/html/jvms-4.html

mod access_flags;
pub mod attributes;
mod class_file;
pub mod constant_pool;
pub mod descriptor;
mod error;
mod parser;
mod reader;
mod serialize;
pub mod utf8;
pub mod validator;

pub use self::class_file::{ClassFile, FieldInfo, MethodInfo};
pub use access_flags::{
    ClassAccessFlags, FieldAccessFlags, InnerClassAccessFlags, MethodAccessFlags,
    MethodParameterAccessFlags,
};
pub use attributes::Attribute;
pub use constant_pool::{ConstantPool, CpInfo, EntryKind};
pub use descriptor::{FieldDescriptor, MethodDescriptor};
pub use error::{ClassFileError, DescriptorError, HeaderError};
pub use parser::{Parser, ParserOptions, MAGIC_IDENTIFIER};
pub use reader::ByteCursor;
pub use serialize::Serialize;
pub use utf8::Utf8Text;

pub type Result<T, E = ClassFileError> = std::result::Result<T, E>;
