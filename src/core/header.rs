//! # Chunk Frame Reader
//!
//! Parses the fixed part of a chunk: the 8-byte common header, the secure
//! channel id and the security header that follows it for OPN/CLO/MSG.
//!
//! ## Wire Format
//! ```text
//! [Type(3)] [Role(1)] [Size u32 LE] [ChannelId u32 LE]? [SecurityHeader]? [...]
//! ```
//!
//! [`parse_header`] is a pure function over one chunk's bytes; it never
//! looks at channel state. Deciding what the header means for the channel is
//! the pipeline's job.

use crate::core::binary::{BinaryReader, BinaryWriter};
use crate::core::security_header::{AsymmetricSecurityHeader, SymmetricSecurityHeader};
use crate::error::{constants, ProtocolError, Result};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Hello,
    Acknowledge,
    Error,
    ReverseHello,
    OpenSecureChannel,
    CloseSecureChannel,
    Message,
}

impl MessageType {
    pub fn from_bytes(bytes: [u8; 3]) -> Option<Self> {
        match &bytes {
            b"HEL" => Some(MessageType::Hello),
            b"ACK" => Some(MessageType::Acknowledge),
            b"ERR" => Some(MessageType::Error),
            b"RHE" => Some(MessageType::ReverseHello),
            b"OPN" => Some(MessageType::OpenSecureChannel),
            b"CLO" => Some(MessageType::CloseSecureChannel),
            b"MSG" => Some(MessageType::Message),
            _ => None,
        }
    }

    pub fn as_bytes(self) -> &'static [u8; 3] {
        match self {
            MessageType::Hello => b"HEL",
            MessageType::Acknowledge => b"ACK",
            MessageType::Error => b"ERR",
            MessageType::ReverseHello => b"RHE",
            MessageType::OpenSecureChannel => b"OPN",
            MessageType::CloseSecureChannel => b"CLO",
            MessageType::Message => b"MSG",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::Hello => "HEL",
            MessageType::Acknowledge => "ACK",
            MessageType::Error => "ERR",
            MessageType::ReverseHello => "RHE",
            MessageType::OpenSecureChannel => "OPN",
            MessageType::CloseSecureChannel => "CLO",
            MessageType::Message => "MSG",
        }
    }

    /// OPN, CLO and MSG travel inside a secure channel; the rest do not.
    pub fn is_secure_conversation(self) -> bool {
        matches!(
            self,
            MessageType::OpenSecureChannel | MessageType::CloseSecureChannel | MessageType::Message
        )
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of a chunk within its logical message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkType {
    Final,
    Intermediate,
    Abort,
}

impl ChunkType {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'F' => Some(ChunkType::Final),
            b'C' => Some(ChunkType::Intermediate),
            b'A' => Some(ChunkType::Abort),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            ChunkType::Final => b'F',
            ChunkType::Intermediate => b'C',
            ChunkType::Abort => b'A',
        }
    }
}

/// The 8-byte header common to every chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub message_type: MessageType,
    pub chunk_type: ChunkType,
    pub message_size: u32,
}

impl MessageHeader {
    pub const SIZE: usize = 8;

    /// Decode only the common header. Does not check the size against the
    /// number of bytes available; [`parse_header`] does.
    pub fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
        if reader.remaining() < Self::SIZE {
            return Err(ProtocolError::InvalidHeader(constants::ERR_TRUNCATED_HEADER));
        }
        let raw = reader.read_bytes(3)?;
        let type_bytes = [raw[0], raw[1], raw[2]];
        let message_type =
            MessageType::from_bytes(type_bytes).ok_or(ProtocolError::InvalidMessageType(type_bytes))?;
        let role = reader.read_u8()?;
        let chunk_type = ChunkType::from_byte(role).ok_or(ProtocolError::InvalidChunkType(role))?;
        let message_size = reader.read_u32()?;
        if (message_size as usize) < Self::SIZE {
            return Err(ProtocolError::InvalidHeader(
                "declared chunk size smaller than the common header",
            ));
        }
        Ok(Self {
            message_type,
            chunk_type,
            message_size,
        })
    }

    pub fn encode(&self, writer: &mut BinaryWriter) {
        writer
            .write_bytes(self.message_type.as_bytes())
            .write_u8(self.chunk_type.as_byte())
            .write_u32(self.message_size);
    }
}

/// Security header shape selected by the message type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityHeader {
    /// HEL, ACK, ERR and RHE carry none.
    None,
    Asymmetric(AsymmetricSecurityHeader),
    Symmetric(SymmetricSecurityHeader),
}

/// Everything [`parse_header`] extracts from a chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderInfo {
    pub header: MessageHeader,
    /// Present for OPN/CLO/MSG.
    pub channel_id: Option<u32>,
    pub security_header: SecurityHeader,
    /// Offset of the first byte after the security header. For a secured
    /// chunk this is where the (possibly encrypted) sequence header starts.
    pub body_offset: usize,
}

/// Parse the headers of one complete chunk.
///
/// # Errors
/// Fails on a truncated header, an unknown message type or chunk role, a
/// declared size that differs from `bytes.len()`, or a malformed security
/// header.
pub fn parse_header(bytes: &[u8]) -> Result<HeaderInfo> {
    let mut reader = BinaryReader::new(bytes);
    let header = MessageHeader::decode(&mut reader)?;

    let declared = header.message_size as usize;
    if declared != bytes.len() {
        return Err(ProtocolError::ChunkLengthMismatch {
            declared,
            actual: bytes.len(),
        });
    }

    if !header.message_type.is_secure_conversation() {
        return Ok(HeaderInfo {
            header,
            channel_id: None,
            security_header: SecurityHeader::None,
            body_offset: reader.position(),
        });
    }

    let channel_id = reader
        .read_u32()
        .map_err(|_| ProtocolError::InvalidHeader(constants::ERR_TRUNCATED_SECURITY_HEADER))?;

    let security_header = match header.message_type {
        MessageType::OpenSecureChannel => {
            SecurityHeader::Asymmetric(AsymmetricSecurityHeader::decode(&mut reader)?)
        }
        _ => SecurityHeader::Symmetric(SymmetricSecurityHeader::decode(&mut reader)?),
    };

    Ok(HeaderInfo {
        header,
        channel_id: Some(channel_id),
        security_header,
        body_offset: reader.position(),
    })
}
