//! Little-endian primitive reader/writer for the OPC UA binary encoding.
//!
//! Only the handful of primitives the envelope needs live here: integers,
//! `String`, `ByteString` and `Guid`. Every read is bounds-checked and fails
//! with [`ProtocolError::Decoding`] instead of panicking, since chunk bytes
//! come straight off an untrusted transport.

use crate::error::{ProtocolError, Result};
use bytes::{BufMut, Bytes, BytesMut};

/// Upper bound accepted for a single `String`/`ByteString` length prefix.
pub const MAX_BYTE_STRING_LENGTH: usize = 16 * 1024 * 1024;

/// Cursor over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> BinaryReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current read offset from the start of the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Unread bytes, without consuming them.
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(ProtocolError::Decoding(format!(
                "need {len} bytes at offset {}, only {} left",
                self.pos,
                self.remaining()
            )));
        }
        let out = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.take(len)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let b = self.take(4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Length-prefixed byte string; a negative length encodes null.
    pub fn read_byte_string(&mut self) -> Result<Option<Bytes>> {
        let len = self.read_i32()?;
        if len < 0 {
            return Ok(None);
        }
        let len = len as usize;
        if len > MAX_BYTE_STRING_LENGTH {
            return Err(ProtocolError::Decoding(format!(
                "byte string length {len} exceeds limit"
            )));
        }
        Ok(Some(Bytes::copy_from_slice(self.take(len)?)))
    }

    pub fn read_string(&mut self) -> Result<Option<String>> {
        match self.read_byte_string()? {
            None => Ok(None),
            Some(raw) => String::from_utf8(raw.to_vec())
                .map(Some)
                .map_err(|e| ProtocolError::Decoding(format!("invalid UTF-8 string: {e}"))),
        }
    }

    pub fn read_guid(&mut self) -> Result<[u8; 16]> {
        let mut guid = [0u8; 16];
        guid.copy_from_slice(self.take(16)?);
        Ok(guid)
    }
}

/// Append-only encoder mirroring [`BinaryReader`].
#[derive(Debug, Default)]
pub struct BinaryWriter {
    buf: BytesMut,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.put_slice(bytes);
        self
    }

    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.buf.put_u8(value);
        self
    }

    pub fn write_u16(&mut self, value: u16) -> &mut Self {
        self.buf.put_u16_le(value);
        self
    }

    pub fn write_u32(&mut self, value: u32) -> &mut Self {
        self.buf.put_u32_le(value);
        self
    }

    pub fn write_i32(&mut self, value: i32) -> &mut Self {
        self.buf.put_i32_le(value);
        self
    }

    pub fn write_byte_string(&mut self, value: Option<&[u8]>) -> &mut Self {
        match value {
            None => self.write_i32(-1),
            Some(bytes) => {
                self.write_i32(bytes.len() as i32);
                self.write_bytes(bytes)
            }
        }
    }

    pub fn write_string(&mut self, value: Option<&str>) -> &mut Self {
        self.write_byte_string(value.map(str::as_bytes))
    }

    pub fn into_inner(self) -> BytesMut {
        self.buf
    }
}
