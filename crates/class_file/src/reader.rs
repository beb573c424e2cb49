use std::io::{self, Read};

use byteorder::{BigEndian, ReadBytesExt};

use crate::{ClassFileError, Result};

type Endian = BigEndian;

/// Sequential big-endian reader used by every parser in this crate.
///
/// The cursor optionally knows how many bytes its source holds. When it does,
/// short reads are rejected before anything is consumed; otherwise the
/// underlying reader's end of file is reported the same way.
pub struct ByteCursor<R> {
    r: R,
    remaining: Option<usize>,
    position: usize,
}

impl<'a> ByteCursor<&'a [u8]> {
    pub fn from_slice(buf: &'a [u8]) -> Self {
        Self::with_length(buf, buf.len())
    }
}

impl<R: Read> ByteCursor<R> {
    /// Creates a cursor over a source of unknown length.
    pub fn new(r: R) -> Self {
        Self {
            r,
            remaining: None,
            position: 0,
        }
    }

    /// Creates a cursor over a source holding exactly `length` bytes.
    pub fn with_length(r: R, length: usize) -> Self {
        Self {
            r,
            remaining: Some(length),
            position: 0,
        }
    }

    /// Bytes left to read, or `None` if the source length is unknown.
    pub fn remaining(&self) -> Option<usize> {
        self.remaining
    }

    /// True once a source of known length has been fully read. A source of
    /// unknown length is never reported as exhausted.
    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn read_u1(&mut self) -> Result<u8> {
        self.reserve(1)?;
        let value = self.r.read_u8().map_err(|e| eof_error(e, 1))?;
        self.advance(1);
        Ok(value)
    }

    pub fn read_u2(&mut self) -> Result<u16> {
        self.reserve(2)?;
        let value = self.r.read_u16::<Endian>().map_err(|e| eof_error(e, 2))?;
        self.advance(2);
        Ok(value)
    }

    pub fn read_u4(&mut self) -> Result<u32> {
        self.reserve(4)?;
        let value = self.r.read_u32::<Endian>().map_err(|e| eof_error(e, 4))?;
        self.advance(4);
        Ok(value)
    }

    pub fn read_i4(&mut self) -> Result<i32> {
        Ok(self.read_u4()? as i32)
    }

    pub fn read_u8(&mut self) -> Result<u64> {
        let high_bytes = self.read_u4()?;
        let low_bytes = self.read_u4()?;
        Ok((high_bytes as u64) << 32 | low_bytes as u64)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        self.reserve(n)?;
        // Lengths come straight from the input, so never preallocate `n`.
        let mut buf = Vec::new();
        (&mut self.r).take(n as u64).read_to_end(&mut buf)?;
        if buf.len() < n {
            // The short read is gone from the source either way.
            self.advance(buf.len());
            return Err(ClassFileError::UnexpectedEndOfInput {
                requested: n,
                remaining: buf.len(),
            });
        }
        self.advance(n);
        Ok(buf)
    }

    /// Reads `count` big-endian `u16` values.
    pub fn read_u2_table(&mut self, count: u16) -> Result<Vec<u16>> {
        (0..count).map(|_| self.read_u2()).collect()
    }

    /// Consumes everything left in the source and returns how many bytes that was.
    pub fn skip_to_end(&mut self) -> Result<usize> {
        let skipped = match self.remaining {
            Some(n) => {
                io::copy(&mut (&mut self.r).take(n as u64), &mut io::sink())?;
                n
            }
            None => io::copy(&mut self.r, &mut io::sink())? as usize,
        };
        self.advance(skipped);
        Ok(skipped)
    }

    fn reserve(&self, requested: usize) -> Result<()> {
        match self.remaining {
            Some(remaining) if remaining < requested => {
                Err(ClassFileError::UnexpectedEndOfInput {
                    requested,
                    remaining,
                })
            }
            _ => Ok(()),
        }
    }

    fn advance(&mut self, n: usize) {
        self.position += n;
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= n;
        }
    }
}

fn eof_error(e: io::Error, requested: usize) -> ClassFileError {
    match e.kind() {
        io::ErrorKind::UnexpectedEof => ClassFileError::UnexpectedEndOfInput {
            requested,
            remaining: 0,
        },
        _ => ClassFileError::IOError(e),
    }
}
