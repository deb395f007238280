//! Decryption and signature verification stages.
//!
//! Each stage takes ownership of the whole chunk and returns a new buffer
//! holding exactly the sequence header followed by the body, with signature
//! and padding removed. The chunk header bytes in front of `body_offset` are
//! part of the signed region and stay in place until verification is done.

use crate::core::security_header::{AsymmetricSecurityHeader, SequenceHeader};
use crate::error::{constants, ProtocolError, Result};
use crate::security::context::{Certificate, PrivateKey, SecurityContext};
use crate::security::crypto::{self, CryptoFactory};
use crate::security::policy::{MessageSecurityMode, SecurityPolicy};
use crate::security::token_store::TokenEntry;
use crate::utils::metrics::global_metrics;
use bytes::BytesMut;
use tracing::{trace, warn};

/// Replace everything after `body_offset` with `plaintext`.
fn splice_plaintext(mut chunk: BytesMut, body_offset: usize, plaintext: &[u8]) -> BytesMut {
    chunk.truncate(body_offset);
    chunk.extend_from_slice(plaintext);
    chunk
}

fn require_factory(ctx: &SecurityContext) -> Result<&dyn CryptoFactory> {
    ctx.factory()
        .map(|f| &**f)
        .ok_or(ProtocolError::SecurityPolicyNotImplemented(ctx.policy().name()))
}

/// Open an OPN chunk under the policy its header names. Nothing is
/// committed to the channel here; the caller does that once this succeeds.
pub(crate) fn open_asymmetric(
    mut chunk: BytesMut,
    body_offset: usize,
    header: &AsymmetricSecurityHeader,
    policy: SecurityPolicy,
    factory: Option<&dyn CryptoFactory>,
    private_key: Option<&PrivateKey>,
) -> Result<BytesMut> {
    if policy == SecurityPolicy::None {
        return Ok(chunk.split_off(body_offset));
    }
    let factory = factory.ok_or(ProtocolError::SecurityPolicyNotImplemented(policy.name()))?;
    let encrypted = header.is_encrypted();

    if encrypted {
        let key = private_key
            .ok_or(ProtocolError::SecurityError(constants::ERR_MISSING_PRIVATE_KEY))?;
        let plaintext = factory.asymmetric_decrypt(key, &chunk[body_offset..]).map_err(|e| {
            global_metrics().decryption_failure();
            warn!(error = %e, "asymmetric decryption failed");
            ProtocolError::DecryptionFailure
        })?;
        chunk = splice_plaintext(chunk, body_offset, &plaintext);
        trace!(len = chunk.len(), "asymmetric payload decrypted");
    }

    let certificate = header
        .sender_certificate
        .as_ref()
        .filter(|c| !c.is_empty())
        .map(|c| Certificate(c.clone()))
        .ok_or(ProtocolError::SecurityError(
            constants::ERR_MISSING_SENDER_CERTIFICATE,
        ))?;
    let signature_length =
        crypto::asymmetric_signature_length(factory.public_key_length(&certificate)?)?;
    if chunk.len() < body_offset + signature_length {
        return Err(ProtocolError::InvalidHeader(
            "chunk too short to carry its signature",
        ));
    }

    let (data, signature) = chunk.split_at(chunk.len() - signature_length);
    if !factory.asymmetric_verify(&certificate, data, signature)? {
        global_metrics().signature_failure();
        return Err(ProtocolError::SecurityError(constants::ERR_ASYMMETRIC_SIGNATURE));
    }

    crypto::strip_signature(&mut chunk, signature_length, body_offset)?;
    if encrypted {
        crypto::remove_padding(&mut chunk, body_offset + SequenceHeader::SIZE)?;
    }
    Ok(chunk.split_off(body_offset))
}

/// Open a MSG/CLO chunk with the keys of an already selected token.
pub(crate) fn open_symmetric(
    mut chunk: BytesMut,
    body_offset: usize,
    entry: &TokenEntry,
    ctx: &SecurityContext,
) -> Result<BytesMut> {
    let token_id = entry.token.token_id;
    if entry.token.expired {
        return Err(ProtocolError::ExpiredToken(token_id));
    }
    let factory = require_factory(ctx)?;
    let keys = entry
        .derived_keys
        .as_ref()
        .ok_or(ProtocolError::MissingDerivedKeys(token_id))?;
    let encrypted = ctx.mode() == MessageSecurityMode::SignAndEncrypt;

    if encrypted {
        let plaintext = factory
            .symmetric_decrypt(keys, &chunk[body_offset..])
            .map_err(|e| {
                global_metrics().decryption_failure();
                warn!(token_id, error = %e, "symmetric decryption failed");
                ProtocolError::DecryptionFailure
            })?;
        chunk = splice_plaintext(chunk, body_offset, &plaintext);
    }

    let signature_length = keys.signature_length();
    if chunk.len() < body_offset + signature_length
        || !factory.symmetric_verify_chunk(keys, &chunk)
    {
        global_metrics().signature_failure();
        return Err(ProtocolError::SecurityError(constants::ERR_SYMMETRIC_SIGNATURE));
    }

    crypto::strip_signature(&mut chunk, signature_length, body_offset)?;
    if encrypted {
        crypto::remove_padding(&mut chunk, body_offset + SequenceHeader::SIZE)?;
    }
    Ok(chunk.split_off(body_offset))
}
