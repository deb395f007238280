//! Security and sequence headers of secure conversation chunks.

use crate::core::binary::{BinaryReader, BinaryWriter};
use crate::error::{constants, ProtocolError, Result};
use bytes::Bytes;

/// Header of OPN chunks, secured with the peers' certificates.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AsymmetricSecurityHeader {
    pub security_policy_uri: String,
    pub sender_certificate: Option<Bytes>,
    pub receiver_certificate_thumbprint: Option<Bytes>,
}

impl AsymmetricSecurityHeader {
    pub fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(Self {
            security_policy_uri: reader.read_string()?.unwrap_or_default(),
            sender_certificate: reader.read_byte_string()?,
            receiver_certificate_thumbprint: reader.read_byte_string()?,
        })
    }

    pub fn encode(&self, writer: &mut BinaryWriter) {
        writer
            .write_string(Some(&self.security_policy_uri))
            .write_byte_string(self.sender_certificate.as_deref())
            .write_byte_string(self.receiver_certificate_thumbprint.as_deref());
    }

    /// The sender encrypts with our public key only when it names our
    /// certificate by thumbprint.
    pub fn is_encrypted(&self) -> bool {
        self.receiver_certificate_thumbprint
            .as_ref()
            .is_some_and(|t| !t.is_empty())
    }
}

/// Header of MSG and CLO chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymmetricSecurityHeader {
    pub token_id: u32,
}

impl SymmetricSecurityHeader {
    pub const SIZE: usize = 4;

    pub fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
        let token_id = reader
            .read_u32()
            .map_err(|_| ProtocolError::InvalidHeader(constants::ERR_TRUNCATED_SECURITY_HEADER))?;
        Ok(Self { token_id })
    }

    pub fn encode(&self, writer: &mut BinaryWriter) {
        writer.write_u32(self.token_id);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceHeader {
    pub sequence_number: u32,
    pub request_id: u32,
}

impl SequenceHeader {
    pub const SIZE: usize = 8;

    pub fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
        if reader.remaining() < Self::SIZE {
            return Err(ProtocolError::InvalidHeader(
                constants::ERR_TRUNCATED_SEQUENCE_HEADER,
            ));
        }
        Ok(Self {
            sequence_number: reader.read_u32()?,
            request_id: reader.read_u32()?,
        })
    }

    pub fn encode(&self, writer: &mut BinaryWriter) {
        writer
            .write_u32(self.sequence_number)
            .write_u32(self.request_id);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_asymmetric_header_with_null_fields() {
        let header = AsymmetricSecurityHeader {
            security_policy_uri: "http://opcfoundation.org/UA/SecurityPolicy#None".into(),
            sender_certificate: None,
            receiver_certificate_thumbprint: None,
        };
        let mut writer = BinaryWriter::new();
        header.encode(&mut writer);
        let bytes = writer.into_inner();
        let decoded = AsymmetricSecurityHeader::decode(&mut BinaryReader::new(&bytes)).unwrap();
        assert_eq!(decoded, header);
        assert!(!decoded.is_encrypted());
    }

    #[test]
    fn test_empty_thumbprint_means_unencrypted() {
        let header = AsymmetricSecurityHeader {
            receiver_certificate_thumbprint: Some(Bytes::new()),
            ..Default::default()
        };
        assert!(!header.is_encrypted());
        let header = AsymmetricSecurityHeader {
            receiver_certificate_thumbprint: Some(Bytes::from_static(&[1; 20])),
            ..Default::default()
        };
        assert!(header.is_encrypted());
    }

    #[test]
    fn test_short_sequence_header() {
        let mut reader = BinaryReader::new(&[1, 0, 0, 0, 2]);
        assert!(matches!(
            SequenceHeader::decode(&mut reader),
            Err(ProtocolError::InvalidHeader(_))
        ));
    }
}
