//! Shared helpers for integration tests: chunk builders and a toy crypto
//! provider.

#![allow(dead_code, clippy::unwrap_used)]

use bytes::{Bytes, BytesMut};
use opcua_secure_conversation::config::PipelineConfig;
use opcua_secure_conversation::core::binary::BinaryWriter;
use opcua_secure_conversation::core::header::{ChunkType, MessageHeader, MessageType};
use opcua_secure_conversation::core::node_id::{ExpandedNodeId, NodeId};
use opcua_secure_conversation::core::security_header::{
    AsymmetricSecurityHeader, SequenceHeader, SymmetricSecurityHeader,
};
use opcua_secure_conversation::error::Result;
use opcua_secure_conversation::protocol::{DecoderRegistry, Notification, SecureMessageReader};
use opcua_secure_conversation::security::derived_keys::DerivedKeys;
use opcua_secure_conversation::security::policy::SymmetricSignature;
use opcua_secure_conversation::security::{
    Certificate, CryptoFactories, CryptoFactory, PrivateKey, SecurityPolicy,
};
use std::sync::Arc;
use tokio::sync::mpsc;

pub const CHANNEL: u32 = 42;
pub const READ_REQUEST: u32 = 631;
pub const BROWSE_REQUEST: u32 = 527;
const MASK: u8 = 0xC3;

/// Browse request body used by the tests: a view name and a node count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Browse {
    pub view: String,
    pub nodes: u32,
}

fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

fn mask(data: &[u8]) -> Vec<u8> {
    data.iter().map(|b| b ^ MASK).collect()
}

/// Masking "cipher" and checksum "signatures" with a 2048-bit key size.
pub struct ToyCrypto;

impl CryptoFactory for ToyCrypto {
    fn policy(&self) -> SecurityPolicy {
        SecurityPolicy::Basic256Sha256
    }

    fn asymmetric_decrypt(&self, _key: &PrivateKey, ciphertext: &[u8]) -> Result<Vec<u8>> {
        Ok(mask(ciphertext))
    }

    fn asymmetric_verify(&self, _cert: &Certificate, data: &[u8], signature: &[u8]) -> Result<bool> {
        let expected = checksum(data);
        Ok(signature.iter().all(|&b| b == expected))
    }

    fn public_key_length(&self, _cert: &Certificate) -> Result<usize> {
        Ok(256)
    }

    fn symmetric_decrypt(&self, _keys: &DerivedKeys, ciphertext: &[u8]) -> Result<Vec<u8>> {
        Ok(mask(ciphertext))
    }
}

pub fn factories() -> CryptoFactories {
    let mut factories = CryptoFactories::new();
    factories.register(Arc::new(ToyCrypto));
    factories
}

pub fn keys(seed: u8) -> DerivedKeys {
    DerivedKeys::new(
        vec![seed; 32],
        vec![seed.wrapping_add(1); 32],
        vec![seed.wrapping_add(2); 16],
        SymmetricSignature::HmacSha256,
    )
}

pub fn registry() -> DecoderRegistry {
    let registry = DecoderRegistry::new();
    registry
        .register(NodeId::numeric(0, READ_REQUEST), |r| r.read_u32())
        .unwrap();
    registry
        .register(NodeId::numeric(0, BROWSE_REQUEST), |r| {
            Ok(Browse {
                view: r.read_string()?.unwrap_or_default(),
                nodes: r.read_u32()?,
            })
        })
        .unwrap();
    registry
}

/// Pipeline wired to an unbounded channel sink.
pub fn pipeline(config: &PipelineConfig) -> (SecureMessageReader, mpsc::UnboundedReceiver<Notification>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        SecureMessageReader::new(config, registry(), factories(), tx),
        rx,
    )
}

pub fn drain(rx: &mut mpsc::UnboundedReceiver<Notification>) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Ok(n) = rx.try_recv() {
        out.push(n);
    }
    out
}

pub fn read_body(value: u32) -> Vec<u8> {
    let mut w = BinaryWriter::new();
    ExpandedNodeId::from(NodeId::numeric(0, READ_REQUEST)).encode(&mut w);
    w.write_u32(value);
    w.into_inner().to_vec()
}

pub fn browse_body(view: &str, nodes: u32) -> Vec<u8> {
    let mut w = BinaryWriter::new();
    ExpandedNodeId::from(NodeId::numeric(0, BROWSE_REQUEST)).encode(&mut w);
    w.write_string(Some(view)).write_u32(nodes);
    w.into_inner().to_vec()
}

/// Builder for one chunk.
pub struct ChunkBuilder {
    message_type: MessageType,
    role: ChunkType,
    token_id: u32,
    policy: SecurityPolicy,
    sequence_number: u32,
    request_id: u32,
    payload: Vec<u8>,
    keys: Option<DerivedKeys>,
    encrypt: bool,
}

impl ChunkBuilder {
    pub fn msg(sequence_number: u32, request_id: u32, payload: &[u8]) -> Self {
        Self {
            message_type: MessageType::Message,
            role: ChunkType::Final,
            token_id: 0,
            policy: SecurityPolicy::None,
            sequence_number,
            request_id,
            payload: payload.to_vec(),
            keys: None,
            encrypt: false,
        }
    }

    pub fn open(policy: SecurityPolicy, sequence_number: u32, payload: &[u8]) -> Self {
        Self {
            message_type: MessageType::OpenSecureChannel,
            policy,
            ..Self::msg(sequence_number, sequence_number, payload)
        }
    }

    pub fn close(sequence_number: u32, request_id: u32) -> Self {
        Self {
            message_type: MessageType::CloseSecureChannel,
            ..Self::msg(sequence_number, request_id, &read_body(0))
        }
    }

    pub fn role(mut self, role: ChunkType) -> Self {
        self.role = role;
        self
    }

    pub fn token(mut self, token_id: u32) -> Self {
        self.token_id = token_id;
        self
    }

    /// Sign with `keys` (symmetric chunks).
    pub fn signed(mut self, keys: DerivedKeys) -> Self {
        self.keys = Some(keys);
        self
    }

    pub fn encrypted(mut self) -> Self {
        self.encrypt = true;
        self
    }

    fn security_header(&self) -> Vec<u8> {
        let mut w = BinaryWriter::new();
        if self.message_type == MessageType::OpenSecureChannel {
            let secure = self.policy.is_secure();
            AsymmetricSecurityHeader {
                security_policy_uri: self.policy.uri().unwrap_or_default(),
                sender_certificate: secure.then(|| Bytes::from_static(b"client-cert")),
                receiver_certificate_thumbprint: self
                    .encrypt
                    .then(|| Bytes::from_static(&[0x77; 20])),
            }
            .encode(&mut w);
        } else {
            SymmetricSecurityHeader {
                token_id: self.token_id,
            }
            .encode(&mut w);
        }
        w.into_inner().to_vec()
    }

    pub fn build(self) -> BytesMut {
        let security_header = self.security_header();
        let body_offset = MessageHeader::SIZE + 4 + security_header.len();

        let mut plain = BinaryWriter::new();
        SequenceHeader {
            sequence_number: self.sequence_number,
            request_id: self.request_id,
        }
        .encode(&mut plain);
        plain.write_bytes(&self.payload);
        if self.encrypt {
            plain.write_bytes(&[1, 1]);
        }
        let plain = plain.into_inner();

        let asymmetric = self.message_type == MessageType::OpenSecureChannel;
        let signature_length = match (&self.keys, asymmetric && self.policy.is_secure()) {
            (_, true) => 256,
            (Some(keys), false) => keys.signature_length(),
            (None, false) => 0,
        };

        let mut w = BinaryWriter::new();
        MessageHeader {
            message_type: self.message_type,
            chunk_type: self.role,
            message_size: (body_offset + plain.len() + signature_length) as u32,
        }
        .encode(&mut w);
        w.write_u32(CHANNEL)
            .write_bytes(&security_header)
            .write_bytes(&plain);
        let mut chunk = w.into_inner();

        if asymmetric && self.policy.is_secure() {
            let c = checksum(&chunk);
            chunk.extend_from_slice(&[c; 256]);
        } else if let Some(keys) = &self.keys {
            let signature = keys.sign(&chunk).unwrap();
            chunk.extend_from_slice(&signature);
        }
        if self.encrypt {
            let tail = mask(&chunk[body_offset..]);
            chunk.truncate(body_offset);
            chunk.extend_from_slice(&tail);
        }
        chunk
    }
}

pub fn hello() -> BytesMut {
    let mut w = BinaryWriter::new();
    MessageHeader {
        message_type: MessageType::Hello,
        chunk_type: ChunkType::Final,
        message_size: 32,
    }
    .encode(&mut w);
    w.write_bytes(&[0; 24]);
    w.into_inner()
}
