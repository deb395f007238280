//! Tokio codec that splits a byte stream into whole chunks.
//!
//! The decoder only looks at the 8-byte common header: it validates the
//! message type and chunk role, enforces the chunk size limit before
//! buffering anything, and yields each chunk as an owned `BytesMut` once all
//! of its bytes have arrived. Everything past the common header is left to
//! [`parse_header`](crate::core::header::parse_header).

use crate::config::DEFAULT_MAX_CHUNK_SIZE;
use crate::core::header::{ChunkType, MessageHeader, MessageType};
use crate::error::{ProtocolError, Result};
use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

#[derive(Debug, Clone, Copy)]
pub struct ChunkCodec {
    max_chunk_size: usize,
}

impl ChunkCodec {
    pub fn new(max_chunk_size: usize) -> Self {
        Self { max_chunk_size }
    }

    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }
}

impl Default for ChunkCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHUNK_SIZE)
    }
}

impl Decoder for ChunkCodec {
    type Item = BytesMut;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if src.len() < MessageHeader::SIZE {
            return Ok(None);
        }

        let type_bytes = [src[0], src[1], src[2]];
        if MessageType::from_bytes(type_bytes).is_none() {
            return Err(ProtocolError::InvalidMessageType(type_bytes));
        }
        if ChunkType::from_byte(src[3]).is_none() {
            return Err(ProtocolError::InvalidChunkType(src[3]));
        }

        let size = u32::from_le_bytes([src[4], src[5], src[6], src[7]]) as usize;
        if size < MessageHeader::SIZE {
            return Err(ProtocolError::InvalidHeader(
                "declared chunk size smaller than the common header",
            ));
        }
        if size > self.max_chunk_size {
            return Err(ProtocolError::OversizedChunk {
                size,
                limit: self.max_chunk_size,
            });
        }

        if src.len() < size {
            src.reserve(size - src.len());
            return Ok(None);
        }

        trace!(size, "chunk framed");
        Ok(Some(src.split_to(size)))
    }
}

impl Encoder<Bytes> for ChunkCodec {
    type Error = ProtocolError;

    fn encode(&mut self, chunk: Bytes, dst: &mut BytesMut) -> Result<()> {
        if chunk.len() > self.max_chunk_size {
            return Err(ProtocolError::OversizedChunk {
                size: chunk.len(),
                limit: self.max_chunk_size,
            });
        }
        dst.reserve(chunk.len());
        dst.extend_from_slice(&chunk);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn hello(len: usize) -> Vec<u8> {
        let mut out = b"HELF".to_vec();
        out.extend_from_slice(&(len as u32).to_le_bytes());
        out.resize(len, 0x11);
        out
    }

    #[test]
    fn test_partial_header_waits() {
        let mut codec = ChunkCodec::default();
        let mut buf = BytesMut::from(&b"HEL"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn test_splits_back_to_back_chunks() {
        let mut codec = ChunkCodec::default();
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&hello(12));
        buf.extend_from_slice(&hello(20));
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap().len(), 12);
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap().len(), 20);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_oversized_chunk_rejected_before_buffering() {
        let mut codec = ChunkCodec::new(1024);
        let mut buf = BytesMut::from(&hello(12)[..8]);
        buf[4..8].copy_from_slice(&4096u32.to_le_bytes());
        assert!(matches!(
            codec.decode(&mut buf),
            Err(ProtocolError::OversizedChunk {
                size: 4096,
                limit: 1024
            })
        ));
    }

    #[test]
    fn test_garbage_type_rejected() {
        let mut codec = ChunkCodec::default();
        let mut buf = BytesMut::from(&b"GET / HTTP/1.1\r\n"[..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(ProtocolError::InvalidMessageType(_))
        ));
    }
}
