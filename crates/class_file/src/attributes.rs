// https://docs.oracle.com/javase/specs/jvms/se19/html/jvms-4.html#jvms-4.7
//
// Attributes are read in two steps: `Attribute::parse` captures the name index
// and the raw bytes, then the context's `parse` re-reads those bytes according
// to the attribute's name. Names that are unknown, or not expected in that
// context, are kept as `Unknown` with their bytes untouched.

use std::{fmt, io::Read};

use log::{debug, trace, warn};

use crate::{
    access_flags::{InnerClassAccessFlags, MethodParameterAccessFlags},
    reader::ByteCursor,
    utf8::Utf8Text,
    ClassFileError, ConstantPool, Result,
};

const KNOWN_ATTRIBUTES: &[&str] = &[
    "ConstantValue",
    "Code",
    "StackMapTable",
    "Exceptions",
    "InnerClasses",
    "EnclosingMethod",
    "Synthetic",
    "Signature",
    "SourceFile",
    "SourceDebugExtension",
    "LineNumberTable",
    "LocalVariableTable",
    "LocalVariableTypeTable",
    "Deprecated",
    "RuntimeVisibleAnnotations",
    "RuntimeInvisibleAnnotations",
    "RuntimeVisibleParameterAnnotations",
    "RuntimeInvisibleParameterAnnotations",
    "RuntimeVisibleTypeAnnotations",
    "RuntimeInvisibleTypeAnnotations",
    "AnnotationDefault",
    "BootstrapMethods",
    "MethodParameters",
];

/// Element values nest through arrays and annotations; deeper input is rejected
/// rather than recursed into.
pub const MAX_ELEMENT_VALUE_DEPTH: usize = 256;

#[derive(Clone, PartialEq, Eq)]
pub struct Attribute {
    pub attribute_name_index: u16,
    pub info: Vec<u8>,
}

impl Attribute {
    pub fn parse<R: Read>(r: &mut ByteCursor<R>) -> Result<Self> {
        let attribute_name_index = r.read_u2()?;
        let attribute_length = r.read_u4()?;
        let info = r.read_bytes(attribute_length as usize)?;

        Ok(Attribute {
            attribute_name_index,
            info,
        })
    }

    pub fn name<'a>(&self, constant_pool: &'a ConstantPool) -> Result<&'a Utf8Text> {
        constant_pool.utf8(self.attribute_name_index)
    }
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("attribute_name_index", &self.attribute_name_index)
            .field("info", &format!("({} bytes)", self.info.len()))
            .finish()
    }
}

pub(crate) fn parse_attributes<R: Read, T>(
    r: &mut ByteCursor<R>,
    constant_pool: &ConstantPool,
    parse: impl Fn(Attribute, &ConstantPool) -> Result<T>,
) -> Result<Vec<T>> {
    let attributes_count = r.read_u2()?;
    (0..attributes_count)
        .map(|_| parse(Attribute::parse(r)?, constant_pool))
        .collect()
}

fn known_name(raw: &Attribute, constant_pool: &ConstantPool) -> Option<&'static str> {
    let name = match raw.name(constant_pool) {
        Ok(name) => name,
        Err(e) => {
            warn!("Keeping attribute as raw bytes: {}", e);
            return None;
        }
    };

    let known = KNOWN_ATTRIBUTES.iter().copied().find(|&known| name == known);
    match known {
        Some(name) => trace!("Attribute {} ({} bytes)", name, raw.info.len()),
        None => debug!("Unrecognized attribute {} ({} bytes)", name, raw.info.len()),
    }
    known
}

/// Runs `f` over the payload and checks that it used every byte. `f` returns
/// `None` for names that do not belong to the caller's context.
fn parse_payload<T>(
    name: &'static str,
    info: &[u8],
    f: impl FnOnce(&mut ByteCursor<&[u8]>) -> Result<Option<T>>,
) -> Result<Option<T>> {
    let mut r = ByteCursor::from_slice(info);
    let Some(value) = f(&mut r)? else {
        return Ok(None);
    };

    match r.remaining() {
        Some(0) | None => Ok(Some(value)),
        Some(remaining) => Err(ClassFileError::AttributeLengthMismatch { name, remaining }),
    }
}

fn read_rest(r: &mut ByteCursor<&[u8]>) -> Result<Vec<u8>> {
    let remaining = r.remaining().unwrap_or_default();
    r.read_bytes(remaining)
}

fn read_table<T>(
    r: &mut ByteCursor<&[u8]>,
    mut f: impl FnMut(&mut ByteCursor<&[u8]>) -> Result<T>,
) -> Result<Vec<T>> {
    let count = r.read_u2()?;
    (0..count).map(|_| f(r)).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassAttribute {
    SourceFile { sourcefile_index: u16 },
    InnerClasses(Vec<InnerClass>),
    EnclosingMethod(EnclosingMethod),
    SourceDebugExtension(Utf8Text),
    BootstrapMethods(Vec<BootstrapMethod>),
    Synthetic,
    Deprecated,
    Signature { signature_index: u16 },
    RuntimeVisibleAnnotations(Vec<Annotation>),
    RuntimeInvisibleAnnotations(Vec<Annotation>),
    RuntimeVisibleTypeAnnotations(Vec<u8>),
    RuntimeInvisibleTypeAnnotations(Vec<u8>),
    Unknown(Attribute),
}

impl ClassAttribute {
    pub fn parse(raw: Attribute, constant_pool: &ConstantPool) -> Result<Self> {
        let Some(name) = known_name(&raw, constant_pool) else {
            return Ok(ClassAttribute::Unknown(raw));
        };

        let attribute = parse_payload(name, &raw.info, |r| {
            Ok(Some(match name {
                "SourceFile" => ClassAttribute::SourceFile {
                    sourcefile_index: r.read_u2()?,
                },
                "InnerClasses" => ClassAttribute::InnerClasses(read_table(r, InnerClass::parse)?),
                "EnclosingMethod" => ClassAttribute::EnclosingMethod(EnclosingMethod {
                    class_index: r.read_u2()?,
                    method_index: r.read_u2()?,
                }),
                "SourceDebugExtension" => {
                    ClassAttribute::SourceDebugExtension(Utf8Text::new(read_rest(r)?)?)
                }
                "BootstrapMethods" => {
                    ClassAttribute::BootstrapMethods(read_table(r, BootstrapMethod::parse)?)
                }
                "Synthetic" => ClassAttribute::Synthetic,
                "Deprecated" => ClassAttribute::Deprecated,
                "Signature" => ClassAttribute::Signature {
                    signature_index: r.read_u2()?,
                },
                "RuntimeVisibleAnnotations" => {
                    ClassAttribute::RuntimeVisibleAnnotations(read_table(r, Annotation::parse)?)
                }
                "RuntimeInvisibleAnnotations" => {
                    ClassAttribute::RuntimeInvisibleAnnotations(read_table(r, Annotation::parse)?)
                }
                "RuntimeVisibleTypeAnnotations" => {
                    ClassAttribute::RuntimeVisibleTypeAnnotations(read_rest(r)?)
                }
                "RuntimeInvisibleTypeAnnotations" => {
                    ClassAttribute::RuntimeInvisibleTypeAnnotations(read_rest(r)?)
                }
                _ => return Ok(None),
            }))
        })?;

        Ok(attribute.unwrap_or(ClassAttribute::Unknown(raw)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldAttribute {
    ConstantValue { constantvalue_index: u16 },
    Synthetic,
    Deprecated,
    Signature { signature_index: u16 },
    RuntimeVisibleAnnotations(Vec<Annotation>),
    RuntimeInvisibleAnnotations(Vec<Annotation>),
    RuntimeVisibleTypeAnnotations(Vec<u8>),
    RuntimeInvisibleTypeAnnotations(Vec<u8>),
    Unknown(Attribute),
}

impl FieldAttribute {
    pub fn parse(raw: Attribute, constant_pool: &ConstantPool) -> Result<Self> {
        let Some(name) = known_name(&raw, constant_pool) else {
            return Ok(FieldAttribute::Unknown(raw));
        };

        let attribute = parse_payload(name, &raw.info, |r| {
            Ok(Some(match name {
                "ConstantValue" => FieldAttribute::ConstantValue {
                    constantvalue_index: r.read_u2()?,
                },
                "Synthetic" => FieldAttribute::Synthetic,
                "Deprecated" => FieldAttribute::Deprecated,
                "Signature" => FieldAttribute::Signature {
                    signature_index: r.read_u2()?,
                },
                "RuntimeVisibleAnnotations" => {
                    FieldAttribute::RuntimeVisibleAnnotations(read_table(r, Annotation::parse)?)
                }
                "RuntimeInvisibleAnnotations" => {
                    FieldAttribute::RuntimeInvisibleAnnotations(read_table(r, Annotation::parse)?)
                }
                "RuntimeVisibleTypeAnnotations" => {
                    FieldAttribute::RuntimeVisibleTypeAnnotations(read_rest(r)?)
                }
                "RuntimeInvisibleTypeAnnotations" => {
                    FieldAttribute::RuntimeInvisibleTypeAnnotations(read_rest(r)?)
                }
                _ => return Ok(None),
            }))
        })?;

        Ok(attribute.unwrap_or(FieldAttribute::Unknown(raw)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MethodAttribute {
    Code(Code),
    Exceptions(Vec<u16>),
    Synthetic,
    Deprecated,
    Signature { signature_index: u16 },
    RuntimeVisibleAnnotations(Vec<Annotation>),
    RuntimeInvisibleAnnotations(Vec<Annotation>),
    RuntimeVisibleParameterAnnotations(Vec<Vec<Annotation>>),
    RuntimeInvisibleParameterAnnotations(Vec<Vec<Annotation>>),
    RuntimeVisibleTypeAnnotations(Vec<u8>),
    RuntimeInvisibleTypeAnnotations(Vec<u8>),
    AnnotationDefault(ElementValue),
    MethodParameters(Vec<MethodParameter>),
    Unknown(Attribute),
}

impl MethodAttribute {
    pub fn parse(raw: Attribute, constant_pool: &ConstantPool) -> Result<Self> {
        let Some(name) = known_name(&raw, constant_pool) else {
            return Ok(MethodAttribute::Unknown(raw));
        };

        let attribute = parse_payload(name, &raw.info, |r| {
            Ok(Some(match name {
                "Code" => MethodAttribute::Code(Code::parse(r, constant_pool)?),
                "Exceptions" => MethodAttribute::Exceptions(read_table(r, |r| r.read_u2())?),
                "Synthetic" => MethodAttribute::Synthetic,
                "Deprecated" => MethodAttribute::Deprecated,
                "Signature" => MethodAttribute::Signature {
                    signature_index: r.read_u2()?,
                },
                "RuntimeVisibleAnnotations" => {
                    MethodAttribute::RuntimeVisibleAnnotations(read_table(r, Annotation::parse)?)
                }
                "RuntimeInvisibleAnnotations" => {
                    MethodAttribute::RuntimeInvisibleAnnotations(read_table(r, Annotation::parse)?)
                }
                "RuntimeVisibleParameterAnnotations" => {
                    MethodAttribute::RuntimeVisibleParameterAnnotations(parse_parameter_annotations(r)?)
                }
                "RuntimeInvisibleParameterAnnotations" => {
                    MethodAttribute::RuntimeInvisibleParameterAnnotations(parse_parameter_annotations(r)?)
                }
                "RuntimeVisibleTypeAnnotations" => {
                    MethodAttribute::RuntimeVisibleTypeAnnotations(read_rest(r)?)
                }
                "RuntimeInvisibleTypeAnnotations" => {
                    MethodAttribute::RuntimeInvisibleTypeAnnotations(read_rest(r)?)
                }
                "AnnotationDefault" => MethodAttribute::AnnotationDefault(ElementValue::parse(r)?),
                "MethodParameters" => MethodAttribute::MethodParameters(parse_method_parameters(r)?),
                _ => return Ok(None),
            }))
        })?;

        Ok(attribute.unwrap_or(MethodAttribute::Unknown(raw)))
    }
}

/// Attributes nested in a `Code` attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum CodeAttribute {
    StackMapTable(Vec<u8>),
    LineNumberTable(Vec<LineNumber>),
    LocalVariableTable(Vec<LocalVariable>),
    LocalVariableTypeTable(Vec<LocalVariableType>),
    RuntimeVisibleTypeAnnotations(Vec<u8>),
    RuntimeInvisibleTypeAnnotations(Vec<u8>),
    Unknown(Attribute),
}

impl CodeAttribute {
    pub fn parse(raw: Attribute, constant_pool: &ConstantPool) -> Result<Self> {
        let Some(name) = known_name(&raw, constant_pool) else {
            return Ok(CodeAttribute::Unknown(raw));
        };

        let attribute = parse_payload(name, &raw.info, |r| {
            Ok(Some(match name {
                "StackMapTable" => CodeAttribute::StackMapTable(read_rest(r)?),
                "LineNumberTable" => CodeAttribute::LineNumberTable(read_table(r, |r| {
                    Ok(LineNumber {
                        start_pc: r.read_u2()?,
                        line_number: r.read_u2()?,
                    })
                })?),
                "LocalVariableTable" => CodeAttribute::LocalVariableTable(read_table(r, |r| {
                    Ok(LocalVariable {
                        start_pc: r.read_u2()?,
                        length: r.read_u2()?,
                        name_index: r.read_u2()?,
                        descriptor_index: r.read_u2()?,
                        index: r.read_u2()?,
                    })
                })?),
                "LocalVariableTypeTable" => {
                    CodeAttribute::LocalVariableTypeTable(read_table(r, |r| {
                        Ok(LocalVariableType {
                            start_pc: r.read_u2()?,
                            length: r.read_u2()?,
                            name_index: r.read_u2()?,
                            signature_index: r.read_u2()?,
                            index: r.read_u2()?,
                        })
                    })?)
                }
                "RuntimeVisibleTypeAnnotations" => {
                    CodeAttribute::RuntimeVisibleTypeAnnotations(read_rest(r)?)
                }
                "RuntimeInvisibleTypeAnnotations" => {
                    CodeAttribute::RuntimeInvisibleTypeAnnotations(read_rest(r)?)
                }
                _ => return Ok(None),
            }))
        })?;

        Ok(attribute.unwrap_or(CodeAttribute::Unknown(raw)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionTableEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    pub catch_type: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Code {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionTableEntry>,
    pub attributes: Vec<CodeAttribute>,
}

impl Code {
    fn parse(r: &mut ByteCursor<&[u8]>, constant_pool: &ConstantPool) -> Result<Self> {
        let max_stack = r.read_u2()?;
        let max_locals = r.read_u2()?;
        let code_length = r.read_u4()?;
        let code = r.read_bytes(code_length as usize)?;
        let exception_table = read_table(r, |r| {
            Ok(ExceptionTableEntry {
                start_pc: r.read_u2()?,
                end_pc: r.read_u2()?,
                handler_pc: r.read_u2()?,
                catch_type: r.read_u2()?,
            })
        })?;
        let attributes = parse_attributes(r, constant_pool, CodeAttribute::parse)?;

        Ok(Code {
            max_stack,
            max_locals,
            code,
            exception_table,
            attributes,
        })
    }

    pub fn line_numbers(&self) -> impl Iterator<Item = &LineNumber> {
        self.attributes.iter().flat_map(|a| match a {
            CodeAttribute::LineNumberTable(table) => table.as_slice(),
            _ => &[][..],
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineNumber {
    pub start_pc: u16,
    pub line_number: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalVariable {
    pub start_pc: u16,
    pub length: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub index: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalVariableType {
    pub start_pc: u16,
    pub length: u16,
    pub name_index: u16,
    pub signature_index: u16,
    pub index: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InnerClass {
    pub inner_class_info_index: u16,
    pub outer_class_info_index: u16,
    pub inner_name_index: u16,
    pub inner_class_access_flags: InnerClassAccessFlags,
}

impl InnerClass {
    fn parse(r: &mut ByteCursor<&[u8]>) -> Result<Self> {
        Ok(InnerClass {
            inner_class_info_index: r.read_u2()?,
            outer_class_info_index: r.read_u2()?,
            inner_name_index: r.read_u2()?,
            inner_class_access_flags: InnerClassAccessFlags::from_bits_retain(r.read_u2()?),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnclosingMethod {
    pub class_index: u16,
    /// Zero when the class is not enclosed by a method or constructor.
    pub method_index: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapMethod {
    pub bootstrap_method_ref: u16,
    pub bootstrap_arguments: Vec<u16>,
}

impl BootstrapMethod {
    fn parse(r: &mut ByteCursor<&[u8]>) -> Result<Self> {
        let bootstrap_method_ref = r.read_u2()?;
        let bootstrap_arguments = read_table(r, |r| r.read_u2())?;

        Ok(BootstrapMethod {
            bootstrap_method_ref,
            bootstrap_arguments,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodParameter {
    pub name_index: u16,
    pub access_flags: MethodParameterAccessFlags,
}

fn parse_method_parameters(r: &mut ByteCursor<&[u8]>) -> Result<Vec<MethodParameter>> {
    // The count is a u1 here, unlike every other table.
    let parameters_count = r.read_u1()?;
    (0..parameters_count)
        .map(|_| {
            Ok(MethodParameter {
                name_index: r.read_u2()?,
                access_flags: MethodParameterAccessFlags::from_bits_retain(r.read_u2()?),
            })
        })
        .collect()
}

fn parse_parameter_annotations(r: &mut ByteCursor<&[u8]>) -> Result<Vec<Vec<Annotation>>> {
    let num_parameters = r.read_u1()?;
    (0..num_parameters)
        .map(|_| read_table(r, Annotation::parse))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub type_index: u16,
    pub element_value_pairs: Vec<ElementValuePair>,
}

impl Annotation {
    fn parse(r: &mut ByteCursor<&[u8]>) -> Result<Self> {
        Self::parse_nested(r, 0)
    }

    fn parse_nested(r: &mut ByteCursor<&[u8]>, depth: usize) -> Result<Self> {
        let type_index = r.read_u2()?;
        let element_value_pairs = read_table(r, |r| {
            Ok(ElementValuePair {
                element_name_index: r.read_u2()?,
                value: ElementValue::parse_nested(r, depth)?,
            })
        })?;

        Ok(Annotation {
            type_index,
            element_value_pairs,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementValuePair {
    pub element_name_index: u16,
    pub value: ElementValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementValue {
    /// Tags `B C D F I J S Z s`, pointing at a constant pool entry.
    Const { tag: char, const_value_index: u16 },
    Enum {
        type_name_index: u16,
        const_name_index: u16,
    },
    Class { class_info_index: u16 },
    Annotation(Annotation),
    Array(Vec<ElementValue>),
}

impl ElementValue {
    fn parse(r: &mut ByteCursor<&[u8]>) -> Result<Self> {
        Self::parse_nested(r, 0)
    }

    /// `depth` counts the arrays and annotations enclosing this value.
    fn parse_nested(r: &mut ByteCursor<&[u8]>, depth: usize) -> Result<Self> {
        if depth >= MAX_ELEMENT_VALUE_DEPTH {
            return Err(ClassFileError::NestingTooDeep {
                limit: MAX_ELEMENT_VALUE_DEPTH,
            });
        }

        let tag = r.read_u1()? as char;
        let value = match tag {
            'B' | 'C' | 'D' | 'F' | 'I' | 'J' | 'S' | 'Z' | 's' => ElementValue::Const {
                tag,
                const_value_index: r.read_u2()?,
            },
            'e' => ElementValue::Enum {
                type_name_index: r.read_u2()?,
                const_name_index: r.read_u2()?,
            },
            'c' => ElementValue::Class {
                class_info_index: r.read_u2()?,
            },
            '@' => ElementValue::Annotation(Annotation::parse_nested(r, depth + 1)?),
            '[' => ElementValue::Array(read_table(r, |r| {
                ElementValue::parse_nested(r, depth + 1)
            })?),
            _ => return Err(ClassFileError::InvalidElementValueTag(tag)),
        };

        Ok(value)
    }
}
