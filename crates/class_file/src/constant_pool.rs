// https://docs.oracle.com/javase/specs/jvms/se19/html/jvms-4.html#jvms-4.4

use std::{fmt, io::Read};

use byteorder::WriteBytesExt;
use log::trace;

use crate::{
    reader::ByteCursor,
    serialize::{u2_length, Serialize},
    utf8::Utf8Text,
    ClassFileError, Result,
};

/// The constant table of a class file, indexed from 1.
///
/// Slot 0 and the slot after every `Long` or `Double` hold [`CpInfo::Invalid`].
/// Entries may refer to indices after their own, so nothing is resolved while
/// parsing; see [`crate::validator`] for the consistency checks.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantPool {
    cp_infos: Vec<CpInfo>,
}

impl Default for ConstantPool {
    fn default() -> Self {
        Self {
            cp_infos: vec![CpInfo::Invalid],
        }
    }
}

impl ConstantPool {
    /// Builds a pool from the entries at indices 1, 2, ... in order, adding the
    /// padding slot after each wide entry.
    pub fn from_entries(entries: Vec<CpInfo>) -> Self {
        let mut cp_infos = Vec::with_capacity(entries.len() + 1);
        cp_infos.push(CpInfo::Invalid);
        for cp_info in entries {
            let slot_size = cp_info.kind().slot_size();
            cp_infos.push(cp_info);
            if slot_size == 2 {
                cp_infos.push(CpInfo::Invalid);
            }
        }
        Self { cp_infos }
    }

    /// Reads the `constant_pool_count - 1` slots that follow the count in a class file.
    pub fn parse<R: Read>(r: &mut ByteCursor<R>, constant_pool_count: u16) -> Result<Self> {
        let count = constant_pool_count as usize;
        let mut cp_infos = Vec::with_capacity(count.max(1));
        cp_infos.push(CpInfo::Invalid);

        while cp_infos.len() < count {
            let index = cp_infos.len();
            let cp_info = parse_cp_info(r)?;
            trace!("ConstantPool[{}]: {:?}", index, cp_info);

            let slot_size = cp_info.kind().slot_size();
            cp_infos.push(cp_info);
            if slot_size == 2 {
                if cp_infos.len() >= count {
                    return Err(ClassFileError::IndexOutOfRange {
                        index: (index + 1) as u16,
                        len: count,
                    });
                }
                cp_infos.push(CpInfo::Invalid);
            }
        }

        Ok(Self { cp_infos })
    }

    /// Number of slots including slot 0, i.e. the class file's `constant_pool_count`.
    pub fn len(&self) -> usize {
        self.cp_infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cp_infos.len() <= 1
    }

    pub fn entry(&self, index: u16) -> Result<&CpInfo> {
        if index == 0 || index as usize >= self.cp_infos.len() {
            return Err(ClassFileError::IndexOutOfRange {
                index,
                len: self.cp_infos.len(),
            });
        }
        Ok(&self.cp_infos[index as usize])
    }

    pub fn kind_of(&self, index: u16) -> Result<EntryKind> {
        Ok(self.entry(index)?.kind())
    }

    /// Returns the payload at `index` if it is a `T`.
    pub fn get<T: CpEntry>(&self, index: u16) -> Result<&T> {
        let cp_info = self.entry(index)?;
        T::from_cp_info(cp_info).ok_or(ClassFileError::WrongEntryKind {
            index,
            expected: T::KIND,
            found: cp_info.kind(),
        })
    }

    pub fn utf8(&self, index: u16) -> Result<&Utf8Text> {
        self.get::<Utf8Text>(index)
    }

    /// Resolves a `Class` entry to its name.
    pub fn class_name(&self, index: u16) -> Result<&Utf8Text> {
        let ClassInfo { name_index } = self.get::<ClassInfo>(index)?;
        self.utf8(*name_index)
    }

    /// Every slot after slot 0, padding included, with its index.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &CpInfo)> + '_ {
        self.cp_infos
            .iter()
            .enumerate()
            .skip(1)
            .map(|(index, cp_info)| (index as u16, cp_info))
    }
}

impl Serialize for ConstantPool {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        u2_length(self.cp_infos.len())?.serialize(writer)?;
        for (_, cp_info) in self.iter() {
            cp_info.serialize(writer)?;
        }
        Ok(())
    }
}

fn parse_cp_info<R: Read>(r: &mut ByteCursor<R>) -> Result<CpInfo> {
    let tag = r.read_u1()?;
    let kind = EntryKind::from_tag(tag).ok_or(ClassFileError::UnknownConstantTag(tag))?;

    let cp_info = match kind {
        EntryKind::Utf8 => {
            let length = r.read_u2()?;
            CpInfo::Utf8(Utf8Text::new(r.read_bytes(length as usize)?)?)
        }
        EntryKind::Integer => CpInfo::Integer(IntegerInfo(r.read_i4()?)),
        EntryKind::Float => CpInfo::Float(FloatInfo(f32::from_bits(r.read_u4()?))),
        EntryKind::Long => CpInfo::Long(LongInfo(r.read_u8()? as i64)),
        EntryKind::Double => CpInfo::Double(DoubleInfo(f64::from_bits(r.read_u8()?))),
        EntryKind::Class => CpInfo::Class(ClassInfo {
            name_index: r.read_u2()?,
        }),
        EntryKind::String => CpInfo::String(StringInfo {
            string_index: r.read_u2()?,
        }),
        EntryKind::FieldRef => CpInfo::FieldRef(FieldRefInfo {
            class_index: r.read_u2()?,
            name_and_type_index: r.read_u2()?,
        }),
        EntryKind::MethodRef => CpInfo::MethodRef(MethodRefInfo {
            class_index: r.read_u2()?,
            name_and_type_index: r.read_u2()?,
        }),
        EntryKind::InterfaceMethodRef => CpInfo::InterfaceMethodRef(InterfaceMethodRefInfo {
            class_index: r.read_u2()?,
            name_and_type_index: r.read_u2()?,
        }),
        EntryKind::NameAndType => CpInfo::NameAndType(NameAndTypeInfo {
            name_index: r.read_u2()?,
            descriptor_index: r.read_u2()?,
        }),
        EntryKind::MethodHandle => CpInfo::MethodHandle(MethodHandleInfo {
            reference_kind: r.read_u1()?,
            reference_index: r.read_u2()?,
        }),
        EntryKind::MethodType => CpInfo::MethodType(MethodTypeInfo {
            descriptor_index: r.read_u2()?,
        }),
        EntryKind::InvokeDynamic => CpInfo::InvokeDynamic(InvokeDynamicInfo {
            bootstrap_method_attr_index: r.read_u2()?,
            name_and_type_index: r.read_u2()?,
        }),
        EntryKind::Invalid => return Err(ClassFileError::UnknownConstantTag(tag)),
    };

    Ok(cp_info)
}

/// The kind of a constant pool entry, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Invalid,
    Utf8,
    Integer,
    Float,
    Long,
    Double,
    Class,
    String,
    FieldRef,
    MethodRef,
    InterfaceMethodRef,
    NameAndType,
    MethodHandle,
    MethodType,
    InvokeDynamic,
}

impl EntryKind {
    pub fn from_tag(tag: u8) -> Option<EntryKind> {
        let kind = match tag {
            1 => EntryKind::Utf8,
            3 => EntryKind::Integer,
            4 => EntryKind::Float,
            5 => EntryKind::Long,
            6 => EntryKind::Double,
            7 => EntryKind::Class,
            8 => EntryKind::String,
            9 => EntryKind::FieldRef,
            10 => EntryKind::MethodRef,
            11 => EntryKind::InterfaceMethodRef,
            12 => EntryKind::NameAndType,
            15 => EntryKind::MethodHandle,
            16 => EntryKind::MethodType,
            18 => EntryKind::InvokeDynamic,
            _ => return None,
        };
        Some(kind)
    }

    /// The tag byte, `None` for [`EntryKind::Invalid`].
    pub fn tag(self) -> Option<u8> {
        let tag = match self {
            EntryKind::Invalid => return None,
            EntryKind::Utf8 => 1,
            EntryKind::Integer => 3,
            EntryKind::Float => 4,
            EntryKind::Long => 5,
            EntryKind::Double => 6,
            EntryKind::Class => 7,
            EntryKind::String => 8,
            EntryKind::FieldRef => 9,
            EntryKind::MethodRef => 10,
            EntryKind::InterfaceMethodRef => 11,
            EntryKind::NameAndType => 12,
            EntryKind::MethodHandle => 15,
            EntryKind::MethodType => 16,
            EntryKind::InvokeDynamic => 18,
        };
        Some(tag)
    }

    pub fn slot_size(self) -> usize {
        match self {
            EntryKind::Long | EntryKind::Double => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum CpInfo {
    Invalid,
    Utf8(Utf8Text),
    Integer(IntegerInfo),
    Float(FloatInfo),
    Long(LongInfo),
    Double(DoubleInfo),
    Class(ClassInfo),
    String(StringInfo),
    FieldRef(FieldRefInfo),
    MethodRef(MethodRefInfo),
    InterfaceMethodRef(InterfaceMethodRefInfo),
    NameAndType(NameAndTypeInfo),
    MethodHandle(MethodHandleInfo),
    MethodType(MethodTypeInfo),
    InvokeDynamic(InvokeDynamicInfo),
}

impl CpInfo {
    pub fn kind(&self) -> EntryKind {
        match self {
            CpInfo::Invalid => EntryKind::Invalid,
            CpInfo::Utf8(_) => EntryKind::Utf8,
            CpInfo::Integer(_) => EntryKind::Integer,
            CpInfo::Float(_) => EntryKind::Float,
            CpInfo::Long(_) => EntryKind::Long,
            CpInfo::Double(_) => EntryKind::Double,
            CpInfo::Class(_) => EntryKind::Class,
            CpInfo::String(_) => EntryKind::String,
            CpInfo::FieldRef(_) => EntryKind::FieldRef,
            CpInfo::MethodRef(_) => EntryKind::MethodRef,
            CpInfo::InterfaceMethodRef(_) => EntryKind::InterfaceMethodRef,
            CpInfo::NameAndType(_) => EntryKind::NameAndType,
            CpInfo::MethodHandle(_) => EntryKind::MethodHandle,
            CpInfo::MethodType(_) => EntryKind::MethodType,
            CpInfo::InvokeDynamic(_) => EntryKind::InvokeDynamic,
        }
    }
}

impl Serialize for CpInfo {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        // Padding slots have no bytes of their own.
        let Some(tag) = self.kind().tag() else {
            return Ok(());
        };
        tag.serialize(writer)?;

        match self {
            CpInfo::Invalid => Ok(()),
            CpInfo::Utf8(text) => {
                u2_length(text.byte_len())?.serialize(writer)?;
                writer.write_all(text.as_bytes())
            }
            CpInfo::Integer(IntegerInfo(value)) => value.serialize(writer),
            CpInfo::Float(FloatInfo(value)) => value.to_bits().serialize(writer),
            CpInfo::Long(LongInfo(value)) => value.serialize(writer),
            CpInfo::Double(DoubleInfo(value)) => value.to_bits().serialize(writer),
            CpInfo::Class(ClassInfo { name_index }) => name_index.serialize(writer),
            CpInfo::String(StringInfo { string_index }) => string_index.serialize(writer),
            CpInfo::FieldRef(FieldRefInfo {
                class_index,
                name_and_type_index,
            })
            | CpInfo::MethodRef(MethodRefInfo {
                class_index,
                name_and_type_index,
            })
            | CpInfo::InterfaceMethodRef(InterfaceMethodRefInfo {
                class_index,
                name_and_type_index,
            }) => {
                class_index.serialize(writer)?;
                name_and_type_index.serialize(writer)
            }
            CpInfo::NameAndType(NameAndTypeInfo {
                name_index,
                descriptor_index,
            }) => {
                name_index.serialize(writer)?;
                descriptor_index.serialize(writer)
            }
            CpInfo::MethodHandle(MethodHandleInfo {
                reference_kind,
                reference_index,
            }) => {
                reference_kind.serialize(writer)?;
                reference_index.serialize(writer)
            }
            CpInfo::MethodType(MethodTypeInfo { descriptor_index }) => {
                descriptor_index.serialize(writer)
            }
            CpInfo::InvokeDynamic(InvokeDynamicInfo {
                bootstrap_method_attr_index,
                name_and_type_index,
            }) => {
                bootstrap_method_attr_index.serialize(writer)?;
                name_and_type_index.serialize(writer)
            }
        }
    }
}

/// A payload type stored in one [`CpInfo`] variant.
pub trait CpEntry {
    const KIND: EntryKind;

    fn from_cp_info(cp_info: &CpInfo) -> Option<&Self>;
}

macro_rules! cp_entry {
    ($ty:ty, $variant:ident) => {
        impl CpEntry for $ty {
            const KIND: EntryKind = EntryKind::$variant;

            fn from_cp_info(cp_info: &CpInfo) -> Option<&Self> {
                match cp_info {
                    CpInfo::$variant(ref n) => Some(n),
                    _ => None,
                }
            }
        }
    };
}

cp_entry!(Utf8Text, Utf8);
cp_entry!(IntegerInfo, Integer);
cp_entry!(FloatInfo, Float);
cp_entry!(LongInfo, Long);
cp_entry!(DoubleInfo, Double);
cp_entry!(ClassInfo, Class);
cp_entry!(StringInfo, String);
cp_entry!(FieldRefInfo, FieldRef);
cp_entry!(MethodRefInfo, MethodRef);
cp_entry!(InterfaceMethodRefInfo, InterfaceMethodRef);
cp_entry!(NameAndTypeInfo, NameAndType);
cp_entry!(MethodHandleInfo, MethodHandle);
cp_entry!(MethodTypeInfo, MethodType);
cp_entry!(InvokeDynamicInfo, InvokeDynamic);

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct IntegerInfo(pub i32);

#[derive(Debug, PartialEq, Clone, Copy)]
pub struct FloatInfo(pub f32);

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct LongInfo(pub i64);

#[derive(Debug, PartialEq, Clone, Copy)]
pub struct DoubleInfo(pub f64);

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct ClassInfo {
    // The value of the name_index item must be a valid index into the constant_pool table.
    // The constant_pool entry at that index must be a CONSTANT_Utf8_info structure (§4.4.7)
    // representing a valid binary class or interface name encoded in internal form (§4.2.1).
    pub name_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct StringInfo {
    pub string_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct FieldRefInfo {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct MethodRefInfo {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct InterfaceMethodRefInfo {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct NameAndTypeInfo {
    pub name_index: u16,
    pub descriptor_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct MethodHandleInfo {
    /// Kept raw; see [`ReferenceKind`] for the meaning of valid values.
    pub reference_kind: u8,
    pub reference_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct MethodTypeInfo {
    pub descriptor_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct InvokeDynamicInfo {
    pub bootstrap_method_attr_index: u16,
    pub name_and_type_index: u16,
}

/// How a `MethodHandle` entry is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    GetField = 1,
    GetStatic = 2,
    PutField = 3,
    PutStatic = 4,
    InvokeVirtual = 5,
    InvokeStatic = 6,
    InvokeSpecial = 7,
    NewInvokeSpecial = 8,
    InvokeInterface = 9,
}

impl TryFrom<u8> for ReferenceKind {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(ReferenceKind::GetField),
            2 => Ok(ReferenceKind::GetStatic),
            3 => Ok(ReferenceKind::PutField),
            4 => Ok(ReferenceKind::PutStatic),
            5 => Ok(ReferenceKind::InvokeVirtual),
            6 => Ok(ReferenceKind::InvokeStatic),
            7 => Ok(ReferenceKind::InvokeSpecial),
            8 => Ok(ReferenceKind::NewInvokeSpecial),
            9 => Ok(ReferenceKind::InvokeInterface),
            _ => Err(value),
        }
    }
}
