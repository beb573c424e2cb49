use std::io::Read;

use log::debug;

use crate::{
    access_flags::{ClassAccessFlags, FieldAccessFlags, MethodAccessFlags},
    attributes::{parse_attributes, ClassAttribute, FieldAttribute, MethodAttribute},
    class_file::{FieldInfo, MethodInfo},
    reader::ByteCursor,
    validator, ClassFile, ClassFileError, ConstantPool, HeaderError, Result,
};

pub const MAGIC_IDENTIFIER: u32 = 0xCAFEBABE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    /// Run [`validator::validate`] as soon as the constant pool has been read.
    pub validate_constant_pool: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            validate_constant_pool: true,
        }
    }
}

pub struct Parser<R> {
    r: ByteCursor<R>,
    options: ParserOptions,
}

impl<R: Read> Parser<R> {
    pub fn new(r: ByteCursor<R>) -> Self {
        Self::with_options(r, ParserOptions::default())
    }

    pub fn with_options(r: ByteCursor<R>, options: ParserOptions) -> Self {
        Self { r, options }
    }

    /// Bytes consumed so far, including those of a failed parse.
    pub fn position(&self) -> usize {
        self.r.position()
    }

    pub fn parse(&mut self) -> Result<ClassFile> {
        let magic = self.parse_magic_identifier()?;
        let (major_version, minor_version) = self.parse_version()?;
        debug!("Class file version {}.{}", major_version, minor_version);

        let constant_pool_count = self.r.read_u2()?;
        let constant_pool = ConstantPool::parse(&mut self.r, constant_pool_count)?;
        debug!("Read {} constant pool slots", constant_pool.len());
        if self.options.validate_constant_pool {
            validator::validate(&constant_pool, major_version, minor_version)?;
        }

        let access_flags = ClassAccessFlags::from_bits_retain(self.r.read_u2()?);
        let this_class = self.r.read_u2()?;
        let super_class = self.r.read_u2()?;
        let interfaces_count = self.r.read_u2()?;
        let interfaces = self.r.read_u2_table(interfaces_count)?;

        let fields_count = self.r.read_u2()?;
        debug!("Reading {} fields", fields_count);
        let fields = (0..fields_count)
            .map(|_| self.parse_field_info(&constant_pool))
            .collect::<Result<Vec<_>>>()?;

        let methods_count = self.r.read_u2()?;
        debug!("Reading {} methods", methods_count);
        let methods = (0..methods_count)
            .map(|_| self.parse_method_info(&constant_pool))
            .collect::<Result<Vec<_>>>()?;

        let attributes = parse_attributes(&mut self.r, &constant_pool, ClassAttribute::parse)?;

        self.parse_end_of_input()?;

        Ok(ClassFile {
            magic,
            minor_version,
            major_version,
            constant_pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }

    fn parse_field_info(&mut self, constant_pool: &ConstantPool) -> Result<FieldInfo> {
        let access_flags = FieldAccessFlags::from_bits_retain(self.r.read_u2()?);
        let name_index = self.r.read_u2()?;
        let descriptor_index = self.r.read_u2()?;
        let attributes = parse_attributes(&mut self.r, constant_pool, FieldAttribute::parse)?;

        Ok(FieldInfo {
            access_flags,
            name_index,
            descriptor_index,
            attributes,
        })
    }

    fn parse_method_info(&mut self, constant_pool: &ConstantPool) -> Result<MethodInfo> {
        let access_flags = MethodAccessFlags::from_bits_retain(self.r.read_u2()?);
        let name_index = self.r.read_u2()?;
        let descriptor_index = self.r.read_u2()?;
        let attributes = parse_attributes(&mut self.r, constant_pool, MethodAttribute::parse)?;

        Ok(MethodInfo {
            access_flags,
            name_index,
            descriptor_index,
            attributes,
        })
    }

    fn parse_magic_identifier(&mut self) -> Result<u32> {
        match self.r.read_u4()? {
            MAGIC_IDENTIFIER => Ok(MAGIC_IDENTIFIER),
            magic_identifier => Err(ClassFileError::MalformedHeader(
                HeaderError::InvalidMagicIdentifier(magic_identifier),
            )),
        }
    }

    fn parse_version(&mut self) -> Result<(u16, u16)> {
        let minor = self.r.read_u2()?;
        let major = self.r.read_u2()?;
        Ok((major, minor))
    }

    fn parse_end_of_input(&mut self) -> Result<()> {
        let trailing = match self.r.remaining() {
            Some(remaining) => remaining,
            None => self.r.skip_to_end()?,
        };

        match trailing {
            0 => Ok(()),
            n => Err(ClassFileError::MalformedHeader(HeaderError::TrailingBytes(n))),
        }
    }
}
