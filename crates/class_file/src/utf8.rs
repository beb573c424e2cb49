// https://docs.oracle.com/javase/specs/jvms/se19/html/jvms-4.html#jvms-4.4.7

use std::{
    fmt,
    hash::{Hash, Hasher},
};

use crate::{ClassFileError, Result};

const MAX_CODE_POINT: u32 = 0x10ffff;

/// Text in the class file's modified UTF-8 encoding.
///
/// The bytes are checked once on construction. Character boundaries are not
/// stored; every character-level operation walks the buffer again.
#[derive(Clone, Default)]
pub struct Utf8Text {
    bytes: Vec<u8>,
}

/// Where a match starts, both as a character index and as a byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacterPosition {
    pub index: usize,
    pub byte_offset: usize,
}

impl Utf8Text {
    pub fn new(bytes: Vec<u8>) -> Result<Self> {
        check_bytes(&bytes)?;
        Ok(Self { bytes })
    }

    /// Encodes a Rust string. Every `char` has a modified UTF-8 form, so this cannot fail.
    pub fn encode(s: &str) -> Self {
        let mut bytes = Vec::with_capacity(s.len());
        for c in s.chars() {
            push_code_point(c as u32, &mut bytes);
        }
        Self { bytes }
    }

    /// Encodes raw code points, including lone surrogates.
    pub fn from_code_points(code_points: impl IntoIterator<Item = u32>) -> Result<Self> {
        let mut bytes = Vec::new();
        for code_point in code_points {
            encode_code_point(code_point, &mut bytes)?;
        }
        Ok(Self { bytes })
    }

    // Only for code points that came out of `chars()`, which are always in range.
    pub(crate) fn from_decoded(code_points: &[u32]) -> Self {
        let mut bytes = Vec::with_capacity(code_points.len());
        for &code_point in code_points {
            push_code_point(code_point, &mut bytes);
        }
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of characters, not bytes.
    pub fn length(&self) -> usize {
        self.chars().count()
    }

    pub fn chars(&self) -> Chars<'_> {
        Chars {
            bytes: &self.bytes,
            offset: 0,
        }
    }

    /// Splits around every occurrence of `delimiter`. An empty delimiter
    /// splits the text into single characters.
    pub fn split(&self, delimiter: &Utf8Text) -> Vec<Utf8Text> {
        let mut parts = Vec::new();
        let mut iter = self.chars();

        if delimiter.is_empty() {
            loop {
                let start = iter.offset();
                if iter.next().is_none() {
                    return parts;
                }
                parts.push(self.slice(start, iter.offset()));
            }
        }

        let mut start = 0;
        loop {
            if let Some(rest) = match_at(iter.clone(), delimiter) {
                parts.push(self.slice(start, iter.offset()));
                start = rest.offset();
                iter = rest;
                continue;
            }
            if iter.next().is_none() {
                break;
            }
        }
        parts.push(self.slice(start, self.bytes.len()));

        parts
    }

    /// Finds the first occurrence of `needle`. An empty needle is never found.
    pub fn find(&self, needle: &Utf8Text) -> Option<CharacterPosition> {
        if needle.is_empty() {
            return None;
        }

        let mut iter = self.chars();
        let mut index = 0;
        loop {
            if match_at(iter.clone(), needle).is_some() {
                return Some(CharacterPosition {
                    index,
                    byte_offset: iter.offset(),
                });
            }
            iter.next()?;
            index += 1;
        }
    }

    pub fn contains(&self, needle: &Utf8Text) -> bool {
        self.find(needle).is_some()
    }

    /// True if any of `needles` occurs in the text.
    pub fn contains_any(&self, needles: &[Utf8Text]) -> bool {
        needles.iter().any(|needle| self.contains(needle))
    }

    pub fn starts_with(&self, prefix: &Utf8Text) -> bool {
        match_at(self.chars(), prefix).is_some()
    }

    // Both offsets must sit on character boundaries.
    fn slice(&self, start: usize, end: usize) -> Utf8Text {
        Utf8Text {
            bytes: self.bytes[start..end].to_vec(),
        }
    }
}

fn match_at<'a>(mut haystack: Chars<'a>, needle: &Utf8Text) -> Option<Chars<'a>> {
    for c in needle.chars() {
        if haystack.next() != Some(c) {
            return None;
        }
    }
    Some(haystack)
}

/// Lazily decodes code points from a [`Utf8Text`].
///
/// Code points are `u32` rather than `char` because class files may carry
/// unpaired surrogates.
#[derive(Clone)]
pub struct Chars<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Chars<'a> {
    /// Byte offset of the next character.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl<'a> Iterator for Chars<'a> {
    type Item = u32;

    fn next(&mut self) -> Option<Self::Item> {
        let (code_point, width) = decode_at(self.bytes, self.offset)?;
        self.offset += width;
        Some(code_point)
    }
}

/// Appends the modified UTF-8 form of `code_point` to `out`.
pub fn encode_code_point(code_point: u32, out: &mut Vec<u8>) -> Result<()> {
    if code_point > MAX_CODE_POINT {
        return Err(ClassFileError::InvalidCodePoint(code_point));
    }
    push_code_point(code_point, out);
    Ok(())
}

fn push_code_point(code_point: u32, out: &mut Vec<u8>) {
    match code_point {
        0x01..=0x7f => out.push(code_point as u8),
        0x00 | 0x80..=0x7ff => out.extend_from_slice(&[
            0xc0 | (code_point >> 6) as u8 & 0x1f,
            0x80 | code_point as u8 & 0x3f,
        ]),
        0x800..=0xffff => out.extend_from_slice(&[
            0xe0 | (code_point >> 12) as u8 & 0x0f,
            0x80 | (code_point >> 6) as u8 & 0x3f,
            0x80 | code_point as u8 & 0x3f,
        ]),
        _ => out.extend_from_slice(&[
            0xed,
            0xa0 | (((code_point >> 16) & 0x1f) - 1) as u8,
            0x80 | (code_point >> 10) as u8 & 0x3f,
            0xed,
            0xb0 | (code_point >> 6) as u8 & 0x0f,
            0x80 | code_point as u8 & 0x3f,
        ]),
    }
}

fn decode_at(bytes: &[u8], i: usize) -> Option<(u32, usize)> {
    let b0 = *bytes.get(i)?;
    let continuation = |n: usize| bytes.get(i + n).copied().filter(|b| b & 0xc0 == 0x80);

    match b0 {
        0x01..=0x7f => Some((b0 as u32, 1)),
        0xc0..=0xdf => {
            let b1 = continuation(1)?;
            Some(((b0 as u32 & 0x1f) << 6 | (b1 as u32 & 0x3f), 2))
        }
        0xe0..=0xef => {
            let b1 = continuation(1)?;
            let b2 = continuation(2)?;

            // A high surrogate directly followed by a low surrogate is one
            // supplementary character.
            if b0 == 0xed && (0xa0..=0xaf).contains(&b1) {
                if let (Some(0xed), Some(b4 @ 0xb0..=0xbf), Some(b5)) =
                    (bytes.get(i + 3).copied(), continuation(4), continuation(5))
                {
                    let code_point = 0x10000
                        + ((b1 as u32 & 0x0f) << 16
                            | (b2 as u32 & 0x3f) << 10
                            | (b4 as u32 & 0x0f) << 6
                            | (b5 as u32 & 0x3f));
                    return Some((code_point, 6));
                }
            }

            Some(((b0 as u32 & 0x0f) << 12 | (b1 as u32 & 0x3f) << 6 | (b2 as u32 & 0x3f), 3))
        }
        _ => None,
    }
}

fn check_bytes(bytes: &[u8]) -> Result<()> {
    if let Some(offset) = bytes.iter().position(|&b| b == 0 || b >= 0xf0) {
        return Err(ClassFileError::IllegalCharacter {
            byte: bytes[offset],
            offset,
        });
    }

    let mut offset = 0;
    while offset < bytes.len() {
        match decode_at(bytes, offset) {
            Some((_, width)) => offset += width,
            None => {
                return Err(ClassFileError::IllegalCharacter {
                    byte: bytes[offset],
                    offset,
                })
            }
        }
    }

    Ok(())
}

impl TryFrom<Vec<u8>> for Utf8Text {
    type Error = ClassFileError;

    fn try_from(bytes: Vec<u8>) -> Result<Self> {
        Self::new(bytes)
    }
}

impl From<&str> for Utf8Text {
    fn from(s: &str) -> Self {
        Self::encode(s)
    }
}

impl PartialEq for Utf8Text {
    fn eq(&self, other: &Self) -> bool {
        self.chars().eq(other.chars())
    }
}
impl Eq for Utf8Text {}

impl PartialEq<str> for Utf8Text {
    fn eq(&self, other: &str) -> bool {
        self.chars().eq(other.chars().map(|c| c as u32))
    }
}

impl PartialEq<&str> for Utf8Text {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl PartialEq<Utf8Text> for str {
    fn eq(&self, other: &Utf8Text) -> bool {
        other == self
    }
}

impl PartialEq<Utf8Text> for &str {
    fn eq(&self, other: &Utf8Text) -> bool {
        other == *self
    }
}

impl Hash for Utf8Text {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for c in self.chars() {
            c.hash(state);
        }
    }
}

impl fmt::Display for Utf8Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use std::fmt::Write;

        for c in self.chars() {
            f.write_char(char::from_u32(c).unwrap_or(char::REPLACEMENT_CHARACTER))?;
        }
        Ok(())
    }
}

impl fmt::Debug for Utf8Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_string())
    }
}
