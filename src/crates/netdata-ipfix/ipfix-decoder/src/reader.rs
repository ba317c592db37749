//! Bounded big-endian cursor over a packet buffer.
//!
//! Every read is checked against the reader's limit, so a malformed
//! length field surfaces as [`DecodeError::Truncated`] instead of a
//! panic. Offsets reported in errors are absolute positions in the
//! underlying buffer.

use crate::error::{DecodeError, Result};

/// Length value announcing a variable-length encoded field.
pub const VARIABLE_LENGTH: u16 = 0xFFFF;

#[derive(Debug, Clone)]
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
    limit: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            limit: data.len(),
        }
    }

    /// Reader over `data[start..limit]`, with `limit` clamped to the buffer.
    pub(crate) fn with_bounds(data: &'a [u8], start: usize, limit: usize) -> Self {
        let limit = limit.min(data.len());
        Self {
            data,
            pos: start.min(limit),
            limit,
        }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn remaining(&self) -> usize {
        self.limit - self.pos
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pos >= self.limit
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        if self.remaining() < needed {
            return Err(DecodeError::Truncated {
                offset: self.pos,
                needed,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        let value = self.data[self.pos];
        self.pos += 1;
        Ok(value)
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub(crate) fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.ensure(len)?;
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Splits off the next `len` bytes as an independent reader and
    /// advances past them.
    pub(crate) fn split(&mut self, len: usize) -> Result<ByteReader<'a>> {
        self.ensure(len)?;
        let sub = ByteReader::with_bounds(self.data, self.pos, self.pos + len);
        self.pos += len;
        Ok(sub)
    }

    /// Resolves the on-wire length of a field value.
    ///
    /// Fixed-length fields use their declared length. Variable-length
    /// fields carry a one byte prefix; the value 255 announces that the
    /// real length follows as a two byte big-endian integer.
    pub(crate) fn read_value_length(&mut self, declared_length: u16) -> Result<usize> {
        if declared_length != VARIABLE_LENGTH {
            return Ok(declared_length as usize);
        }
        let short = self.read_u8()?;
        if short < 255 {
            Ok(short as usize)
        } else {
            Ok(self.read_u16()? as usize)
        }
    }

    /// Reads one field value, resolving variable-length encoding first.
    pub(crate) fn read_value(&mut self, declared_length: u16) -> Result<&'a [u8]> {
        let len = self.read_value_length(declared_length)?;
        self.read_bytes(len)
    }
}
