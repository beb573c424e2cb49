use std::io::{Error, ErrorKind, Result};

use byteorder::{BigEndian, WriteBytesExt};

/// Writes a value back out in class file format.
pub trait Serialize {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()>;
}

impl Serialize for u8 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(*self)
    }
}

impl Serialize for u16 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_u16::<BigEndian>(*self)
    }
}

impl Serialize for u32 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<BigEndian>(*self)
    }
}

impl Serialize for u64 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_u64::<BigEndian>(*self)
    }
}

impl Serialize for i32 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_i32::<BigEndian>(*self)
    }
}

impl Serialize for i64 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_i64::<BigEndian>(*self)
    }
}

/// Tables in class files are prefixed by a `u2` count.
impl Serialize for [u16] {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        u2_length(self.len())?.serialize(writer)?;
        for elem in self {
            elem.serialize(writer)?;
        }
        Ok(())
    }
}

/// Converts a count or byte length to its `u2` prefix, failing instead of
/// wrapping when it does not fit.
pub(crate) fn u2_length(len: usize) -> Result<u16> {
    u16::try_from(len).map_err(|_| {
        Error::new(
            ErrorKind::InvalidData,
            format!("length {} does not fit in a u2", len),
        )
    })
}

#[cfg(test)]
mod serialize_tests {
    use super::*;

    #[test]
    fn it_should_prefix_tables_with_their_length() {
        let mut out = Vec::new();
        [1u16, 0x0203][..].serialize(&mut out).unwrap();

        assert_eq!(out, [0x00, 0x02, 0x00, 0x01, 0x02, 0x03]);
    }

    #[test]
    fn it_should_refuse_tables_longer_than_a_u2_count() {
        let table = vec![0u16; 0x10000];
        let mut out = Vec::new();

        let err = table[..].serialize(&mut out).unwrap_err();
        assert_eq!(ErrorKind::InvalidData, err.kind());
        assert!(out.is_empty());
    }
}
