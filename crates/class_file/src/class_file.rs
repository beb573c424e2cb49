use std::io::{self, BufReader, Read};

use byteorder::WriteBytesExt;

use crate::{
    access_flags::{ClassAccessFlags, FieldAccessFlags, MethodAccessFlags},
    attributes::{ClassAttribute, Code, FieldAttribute, MethodAttribute},
    parser::Parser,
    reader::ByteCursor,
    serialize::Serialize,
    utf8::Utf8Text,
    validator, ConstantPool, Result,
};

/// https://docs.oracle.com/javase/specs/jvms/se19/html/jvms-4.html#jvms-4.1
#[derive(Debug, Clone, PartialEq)]
pub struct ClassFile {
    pub magic: u32,
    pub minor_version: u16,
    pub major_version: u16,
    pub constant_pool: ConstantPool,
    pub access_flags: ClassAccessFlags,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub attributes: Vec<ClassAttribute>,
}

impl ClassFile {
    /// Parses a class file from a reader of unknown length, which must end
    /// where the class file does.
    pub fn parse(r: impl Read) -> Result<ClassFile> {
        Parser::new(ByteCursor::new(BufReader::new(r))).parse()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<ClassFile> {
        Parser::new(ByteCursor::from_slice(bytes)).parse()
    }

    /// See [`validator::validate_class_file`].
    pub fn validate(&self) -> Result<()> {
        validator::validate_class_file(self)
    }

    pub fn class_name(&self) -> Result<&Utf8Text> {
        // The value of the this_class item must be a valid index into the constant_pool table.
        // The constant_pool entry at that index must be a CONSTANT_Class_info structure (§4.4.1)
        // representing the class or interface defined by this class file.
        self.constant_pool.class_name(self.this_class)
    }

    pub fn super_class(&self) -> Result<Option<&Utf8Text>> {
        // If the value of the super_class item is zero, then this class file must represent the class Object,
        // the only class or interface without a direct superclass.
        if self.super_class == 0 {
            return Ok(None);
        }

        self.constant_pool.class_name(self.super_class).map(Some)
    }

    pub fn interface_names(&self) -> Result<Vec<&Utf8Text>> {
        self.interfaces
            .iter()
            .map(|&index| self.constant_pool.class_name(index))
            .collect()
    }

    pub fn field_name(&self, field: &FieldInfo) -> Result<&Utf8Text> {
        self.constant_pool.utf8(field.name_index)
    }

    pub fn field_descriptor(&self, field: &FieldInfo) -> Result<&Utf8Text> {
        self.constant_pool.utf8(field.descriptor_index)
    }

    pub fn method_name(&self, method: &MethodInfo) -> Result<&Utf8Text> {
        self.constant_pool.utf8(method.name_index)
    }

    pub fn method_descriptor(&self, method: &MethodInfo) -> Result<&Utf8Text> {
        self.constant_pool.utf8(method.descriptor_index)
    }

    /// The `SourceFile` attribute, if present.
    pub fn source_file(&self) -> Result<Option<&Utf8Text>> {
        let sourcefile_index = self.attributes.iter().find_map(|a| match a {
            ClassAttribute::SourceFile { sourcefile_index } => Some(*sourcefile_index),
            _ => None,
        });

        sourcefile_index
            .map(|index| self.constant_pool.utf8(index))
            .transpose()
    }

    /// Writes everything up to and including the interfaces table back out in
    /// class file format.
    pub fn serialize_header<W: WriteBytesExt>(&self, writer: &mut W) -> io::Result<()> {
        self.magic.serialize(writer)?;
        self.minor_version.serialize(writer)?;
        self.major_version.serialize(writer)?;
        self.constant_pool.serialize(writer)?;
        self.access_flags.serialize(writer)?;
        self.this_class.serialize(writer)?;
        self.super_class.serialize(writer)?;
        self.interfaces.serialize(writer)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub access_flags: FieldAccessFlags,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<FieldAttribute>,
}

impl FieldInfo {
    /// Index of the constant initializing a static field.
    pub fn constant_value(&self) -> Option<u16> {
        self.attributes.iter().find_map(|a| match a {
            FieldAttribute::ConstantValue {
                constantvalue_index,
            } => Some(*constantvalue_index),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodInfo {
    pub access_flags: MethodAccessFlags,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<MethodAttribute>,
}

impl MethodInfo {
    /// `None` for abstract and native methods.
    pub fn code(&self) -> Option<&Code> {
        self.attributes.iter().find_map(|a| match a {
            MethodAttribute::Code(code) => Some(code),
            _ => None,
        })
    }
}
