//! Avro binary cursor: the primitive reads the resolving decoder is built on.
//!
//! Wire rules:
//! - null: 0 bytes
//! - boolean: 1 byte (0 or 1)
//! - int/long: zigzag + varint
//! - float/double: IEEE 754 little-endian
//! - bytes/string: long(length) + raw bytes
//! - array/map: blocks of long(count) items, terminated by count 0; a negative
//!   count is followed by the block's byte size

use crate::schema::{AvroSchema, Names};

/// Avro cursor error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CursorError {
    #[error("unexpected end of input")]
    EndOfInput,
    #[error("variable-length integer is too long")]
    VarIntTooLong,
    #[error("variable-length long is too long")]
    VarLongTooLong,
    #[error("invalid UTF-8")]
    InvalidUtf8,
    #[error("negative length: {0}")]
    NegativeLength(i64),
    #[error("length {0} does not fit in memory")]
    LengthOverflow(u64),
    #[error("negative enum index: {0}")]
    InvalidEnumIndex(i32),
    #[error("union index out of range: {0}")]
    UnionIndexOutOfRange(i64),
    #[error("cannot skip unknown schema `{0}`")]
    UnknownSchema(String),
}

/// Sequential reader over an Avro-encoded byte source.
///
/// A cursor is exclusively borrowed for a whole decode call; it is never
/// shared between concurrent reads.
pub trait Cursor {
    fn read_null(&mut self) -> Result<(), CursorError> {
        Ok(())
    }

    fn read_boolean(&mut self) -> Result<bool, CursorError>;

    fn read_int(&mut self) -> Result<i32, CursorError>;

    fn read_long(&mut self) -> Result<i64, CursorError>;

    fn read_float(&mut self) -> Result<f32, CursorError>;

    fn read_double(&mut self) -> Result<f64, CursorError>;

    fn read_string(&mut self) -> Result<String, CursorError>;

    /// Replaces the contents of `buf` with the next `bytes` value.
    fn read_bytes_into(&mut self, buf: &mut Vec<u8>) -> Result<(), CursorError>;

    /// Fills `buf` with exactly `buf.len()` raw bytes.
    fn read_fixed_into(&mut self, buf: &mut [u8]) -> Result<(), CursorError>;

    fn read_enum_ordinal(&mut self) -> Result<usize, CursorError>;

    fn read_union_index(&mut self) -> Result<usize, CursorError>;

    /// Item count of the next array block; `0` terminates the array.
    fn read_array_block_length(&mut self) -> Result<usize, CursorError>;

    /// Entry count of the next map block; `0` terminates the map.
    fn read_map_block_length(&mut self) -> Result<usize, CursorError>;

    fn skip_fixed(&mut self, size: usize) -> Result<(), CursorError>;

    /// Skips one length-prefixed `bytes`/`string` value.
    fn skip_string(&mut self) -> Result<(), CursorError>;

    /// Consumes one value of `schema` without materializing it.
    fn skip(&mut self, schema: &AvroSchema, names: &Names<'_>) -> Result<(), CursorError> {
        match schema {
            AvroSchema::Null => self.read_null(),
            AvroSchema::Boolean => self.skip_fixed(1),
            AvroSchema::Int => self.read_int().map(drop),
            AvroSchema::Long => self.read_long().map(drop),
            AvroSchema::Float => self.skip_fixed(4),
            AvroSchema::Double => self.skip_fixed(8),
            AvroSchema::Bytes | AvroSchema::String => self.skip_string(),
            AvroSchema::Fixed { size, .. } => self.skip_fixed(*size),
            AvroSchema::Enum { .. } => self.read_enum_ordinal().map(drop),
            AvroSchema::Array { items } => loop {
                let count = self.read_array_block_length()?;
                if count == 0 {
                    return Ok(());
                }
                for _ in 0..count {
                    self.skip(items, names)?;
                }
            },
            AvroSchema::Map { values } => loop {
                let count = self.read_map_block_length()?;
                if count == 0 {
                    return Ok(());
                }
                for _ in 0..count {
                    self.skip_string()?;
                    self.skip(values, names)?;
                }
            },
            AvroSchema::Record { fields, .. } => {
                for field in fields {
                    self.skip(&field.type_, names)?;
                }
                Ok(())
            }
            AvroSchema::Union(branches) => {
                let idx = self.read_union_index()?;
                let branch = branches
                    .get(idx)
                    .ok_or(CursorError::UnionIndexOutOfRange(idx as i64))?;
                self.skip(branch, names)
            }
            AvroSchema::Ref(name) => {
                let target = names
                    .get(name)
                    .ok_or_else(|| CursorError::UnknownSchema(name.clone()))?;
                self.skip(target, names)
            }
        }
    }
}

/// Avro cursor over an in-memory byte slice.
pub struct AvroCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> AvroCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn reset(&mut self, data: &'a [u8]) {
        self.data = data;
        self.pos = 0;
    }

    /// Current byte offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    // ---------------------------------------------------------------- helpers

    fn read_byte(&mut self) -> Result<u8, CursorError> {
        let b = *self.data.get(self.pos).ok_or(CursorError::EndOfInput)?;
        self.pos += 1;
        Ok(b)
    }

    fn read_raw(&mut self, n: usize) -> Result<&'a [u8], CursorError> {
        let end = self.pos.checked_add(n).ok_or(CursorError::EndOfInput)?;
        let bytes = self.data.get(self.pos..end).ok_or(CursorError::EndOfInput)?;
        self.pos = end;
        Ok(bytes)
    }

    fn read_length(&mut self) -> Result<usize, CursorError> {
        let len = self.read_long()?;
        if len < 0 {
            return Err(CursorError::NegativeLength(len));
        }
        usize::try_from(len).map_err(|_| CursorError::LengthOverflow(len as u64))
    }

    fn read_block_count(&mut self) -> Result<usize, CursorError> {
        let count = self.read_long()?;
        if count < 0 {
            // Negative counts carry the block's byte size, which item-wise
            // reads do not need.
            self.read_long()?;
        }
        let abs = count.unsigned_abs();
        usize::try_from(abs).map_err(|_| CursorError::LengthOverflow(abs))
    }

    // ---------------------------------------------------------------- varint

    /// Reads a variable-length unsigned integer (max 10 bytes for 64-bit long).
    pub fn read_varint_u64(&mut self) -> Result<u64, CursorError> {
        let mut result: u64 = 0;
        let mut shift = 0u32;
        for _ in 0..10 {
            let b = self.read_byte()? as u64;
            result |= (b & 0x7f) << shift;
            if b & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }
        Err(CursorError::VarLongTooLong)
    }

    /// Reads a variable-length unsigned integer (max 5 bytes for 32-bit int).
    pub fn read_varint_u32(&mut self) -> Result<u32, CursorError> {
        let mut result: u32 = 0;
        let mut shift = 0u32;
        for _ in 0..5 {
            let b = self.read_byte()? as u32;
            result |= (b & 0x7f) << shift;
            if b & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }
        Err(CursorError::VarIntTooLong)
    }
}

impl Cursor for AvroCursor<'_> {
    fn read_boolean(&mut self) -> Result<bool, CursorError> {
        Ok(self.read_byte()? != 0)
    }

    fn read_int(&mut self) -> Result<i32, CursorError> {
        let encoded = self.read_varint_u32()?;
        Ok(((encoded >> 1) as i32) ^ -((encoded & 1) as i32))
    }

    fn read_long(&mut self) -> Result<i64, CursorError> {
        let encoded = self.read_varint_u64()?;
        Ok(((encoded >> 1) as i64) ^ -((encoded & 1) as i64))
    }

    fn read_float(&mut self) -> Result<f32, CursorError> {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(self.read_raw(4)?);
        Ok(f32::from_le_bytes(bytes))
    }

    fn read_double(&mut self) -> Result<f64, CursorError> {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(self.read_raw(8)?);
        Ok(f64::from_le_bytes(bytes))
    }

    fn read_string(&mut self) -> Result<String, CursorError> {
        let len = self.read_length()?;
        let bytes = self.read_raw(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| CursorError::InvalidUtf8)
    }

    fn read_bytes_into(&mut self, buf: &mut Vec<u8>) -> Result<(), CursorError> {
        let len = self.read_length()?;
        let bytes = self.read_raw(len)?;
        buf.clear();
        buf.extend_from_slice(bytes);
        Ok(())
    }

    fn read_fixed_into(&mut self, buf: &mut [u8]) -> Result<(), CursorError> {
        let bytes = self.read_raw(buf.len())?;
        buf.copy_from_slice(bytes);
        Ok(())
    }

    fn read_enum_ordinal(&mut self) -> Result<usize, CursorError> {
        let idx = self.read_int()?;
        usize::try_from(idx).map_err(|_| CursorError::InvalidEnumIndex(idx))
    }

    fn read_union_index(&mut self) -> Result<usize, CursorError> {
        let idx = self.read_long()?;
        usize::try_from(idx).map_err(|_| CursorError::UnionIndexOutOfRange(idx))
    }

    fn read_array_block_length(&mut self) -> Result<usize, CursorError> {
        self.read_block_count()
    }

    fn read_map_block_length(&mut self) -> Result<usize, CursorError> {
        self.read_block_count()
    }

    fn skip_fixed(&mut self, size: usize) -> Result<(), CursorError> {
        self.read_raw(size).map(drop)
    }

    fn skip_string(&mut self) -> Result<(), CursorError> {
        let len = self.read_length()?;
        self.skip_fixed(len)
    }
}
