//! Node identifiers used as message type identifiers.
//!
//! The body of every secured message starts with an `ExpandedNodeId` naming
//! its encoding. Only the decoding needed to find the right decoder lives
//! here; the rest of the data model belongs to the address space.

use crate::core::binary::{BinaryReader, BinaryWriter};
use crate::error::{ProtocolError, Result};
use bytes::Bytes;
use std::fmt;

const ENCODING_TWO_BYTE: u8 = 0x00;
const ENCODING_FOUR_BYTE: u8 = 0x01;
const ENCODING_NUMERIC: u8 = 0x02;
const ENCODING_STRING: u8 = 0x03;
const ENCODING_GUID: u8 = 0x04;
const ENCODING_BYTE_STRING: u8 = 0x05;

const FLAG_NAMESPACE_URI: u8 = 0x80;
const FLAG_SERVER_INDEX: u8 = 0x40;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    Numeric(u32),
    String(String),
    Guid([u8; 16]),
    Opaque(Bytes),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub namespace: u16,
    pub identifier: Identifier,
}

impl NodeId {
    pub fn numeric(namespace: u16, value: u32) -> Self {
        Self {
            namespace,
            identifier: Identifier::Numeric(value),
        }
    }

    pub fn string(namespace: u16, value: impl Into<String>) -> Self {
        Self {
            namespace,
            identifier: Identifier::String(value.into()),
        }
    }

    /// Decode the identifier part given an already-read encoding byte.
    fn decode_body(encoding: u8, reader: &mut BinaryReader<'_>) -> Result<Self> {
        let node_id = match encoding & 0x3F {
            ENCODING_TWO_BYTE => NodeId::numeric(0, reader.read_u8()? as u32),
            ENCODING_FOUR_BYTE => {
                let namespace = reader.read_u8()? as u16;
                NodeId::numeric(namespace, reader.read_u16()? as u32)
            }
            ENCODING_NUMERIC => {
                let namespace = reader.read_u16()?;
                NodeId::numeric(namespace, reader.read_u32()?)
            }
            ENCODING_STRING => {
                let namespace = reader.read_u16()?;
                let value = reader.read_string()?.unwrap_or_default();
                NodeId::string(namespace, value)
            }
            ENCODING_GUID => {
                let namespace = reader.read_u16()?;
                NodeId {
                    namespace,
                    identifier: Identifier::Guid(reader.read_guid()?),
                }
            }
            ENCODING_BYTE_STRING => {
                let namespace = reader.read_u16()?;
                NodeId {
                    namespace,
                    identifier: Identifier::Opaque(reader.read_byte_string()?.unwrap_or_default()),
                }
            }
            other => {
                return Err(ProtocolError::Decoding(format!(
                    "invalid node id encoding 0x{other:02x}"
                )))
            }
        };
        Ok(node_id)
    }

    pub fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
        let encoding = reader.read_u8()?;
        if encoding & (FLAG_NAMESPACE_URI | FLAG_SERVER_INDEX) != 0 {
            return Err(ProtocolError::Decoding(
                "expanded node id flags set on a plain node id".into(),
            ));
        }
        Self::decode_body(encoding, reader)
    }

    /// Encode with the most compact form that fits, setting `flags` on the
    /// encoding byte.
    fn encode_with_flags(&self, flags: u8, writer: &mut BinaryWriter) {
        match &self.identifier {
            Identifier::Numeric(value) if self.namespace == 0 && *value <= 0xFF => {
                writer.write_u8(ENCODING_TWO_BYTE | flags).write_u8(*value as u8);
            }
            Identifier::Numeric(value) if self.namespace <= 0xFF && *value <= 0xFFFF => {
                writer
                    .write_u8(ENCODING_FOUR_BYTE | flags)
                    .write_u8(self.namespace as u8)
                    .write_u16(*value as u16);
            }
            Identifier::Numeric(value) => {
                writer
                    .write_u8(ENCODING_NUMERIC | flags)
                    .write_u16(self.namespace)
                    .write_u32(*value);
            }
            Identifier::String(value) => {
                writer
                    .write_u8(ENCODING_STRING | flags)
                    .write_u16(self.namespace)
                    .write_string(Some(value));
            }
            Identifier::Guid(value) => {
                writer
                    .write_u8(ENCODING_GUID | flags)
                    .write_u16(self.namespace)
                    .write_bytes(value);
            }
            Identifier::Opaque(value) => {
                writer
                    .write_u8(ENCODING_BYTE_STRING | flags)
                    .write_u16(self.namespace)
                    .write_byte_string(Some(value));
            }
        }
    }

    pub fn encode(&self, writer: &mut BinaryWriter) {
        self.encode_with_flags(0, writer);
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace != 0 {
            write!(f, "ns={};", self.namespace)?;
        }
        match &self.identifier {
            Identifier::Numeric(v) => write!(f, "i={v}"),
            Identifier::String(v) => write!(f, "s={v}"),
            Identifier::Guid(v) => write!(f, "g={}", hex::encode(v)),
            Identifier::Opaque(v) => write!(f, "b={}", hex::encode(v)),
        }
    }
}

/// Node id optionally qualified by namespace URI and server index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpandedNodeId {
    pub node_id: NodeId,
    pub namespace_uri: Option<String>,
    pub server_index: u32,
}

impl ExpandedNodeId {
    pub fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
        let encoding = reader.read_u8()?;
        let node_id = NodeId::decode_body(encoding, reader)?;
        let namespace_uri = if encoding & FLAG_NAMESPACE_URI != 0 {
            reader.read_string()?
        } else {
            None
        };
        let server_index = if encoding & FLAG_SERVER_INDEX != 0 {
            reader.read_u32()?
        } else {
            0
        };
        Ok(Self {
            node_id,
            namespace_uri,
            server_index,
        })
    }

    pub fn encode(&self, writer: &mut BinaryWriter) {
        let mut flags = 0;
        if self.namespace_uri.is_some() {
            flags |= FLAG_NAMESPACE_URI;
        }
        if self.server_index != 0 {
            flags |= FLAG_SERVER_INDEX;
        }
        self.node_id.encode_with_flags(flags, writer);
        if let Some(uri) = &self.namespace_uri {
            writer.write_string(Some(uri));
        }
        if self.server_index != 0 {
            writer.write_u32(self.server_index);
        }
    }
}

impl From<NodeId> for ExpandedNodeId {
    fn from(node_id: NodeId) -> Self {
        Self {
            node_id,
            namespace_uri: None,
            server_index: 0,
        }
    }
}

impl fmt::Display for ExpandedNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.server_index != 0 {
            write!(f, "svr={};", self.server_index)?;
        }
        if let Some(uri) = &self.namespace_uri {
            write!(f, "nsu={uri};")?;
        }
        write!(f, "{}", self.node_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn decode_expanded(bytes: &[u8]) -> Result<ExpandedNodeId> {
        ExpandedNodeId::decode(&mut BinaryReader::new(bytes))
    }

    #[test]
    fn test_compact_numeric_forms() {
        // OpenSecureChannelRequest_Encoding_DefaultBinary = i=446 (four-byte form)
        let id = decode_expanded(&[0x01, 0x00, 0xBE, 0x01]).unwrap();
        assert_eq!(id.node_id, NodeId::numeric(0, 446));
        assert_eq!(id.to_string(), "i=446");

        let id = decode_expanded(&[0x00, 0x2A]).unwrap();
        assert_eq!(id.node_id, NodeId::numeric(0, 42));
    }

    #[test]
    fn test_expanded_flags() {
        let original = ExpandedNodeId {
            node_id: NodeId::string(2, "Temperature"),
            namespace_uri: Some("urn:plant".into()),
            server_index: 3,
        };
        let mut writer = BinaryWriter::new();
        original.encode(&mut writer);
        let bytes = writer.into_inner();
        assert_eq!(bytes[0] & 0xC0, 0xC0);
        assert_eq!(decode_expanded(&bytes).unwrap(), original);
    }

    #[test]
    fn test_unknown_encoding_rejected() {
        assert!(decode_expanded(&[0x07, 0x00]).is_err());
        assert!(decode_expanded(&[]).is_err());
    }
}
