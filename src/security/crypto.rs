//! # Cryptographic Codec Boundary
//!
//! The pipeline orchestrates decryption and signature checks but does not
//! implement RSA or AES itself. A [`CryptoFactory`] per security policy
//! supplies those primitives; [`CryptoFactories`] maps policies to them.
//!
//! Symmetric signing (HMAC) and key derivation have working defaults built on
//! [`DerivedKeys`], so a factory for an SHA-256 policy only has to provide the
//! block cipher and the certificate operations.

use crate::error::{ProtocolError, Result};
use crate::security::context::{Certificate, PrivateKey};
use crate::security::derived_keys::{self, DerivedKeys};
use crate::security::policy::SecurityPolicy;
use bytes::BytesMut;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Cryptographic primitives for one security policy.
///
/// Implementations must never include key material in error values or log
/// output.
pub trait CryptoFactory: Send + Sync {
    fn policy(&self) -> SecurityPolicy;

    /// Decrypt an asymmetrically encrypted region with the local private key.
    fn asymmetric_decrypt(&self, private_key: &PrivateKey, ciphertext: &[u8]) -> Result<Vec<u8>>;

    /// Check `signature` over `data` with the public key of `certificate`.
    fn asymmetric_verify(
        &self,
        certificate: &Certificate,
        data: &[u8],
        signature: &[u8],
    ) -> Result<bool>;

    /// Size in bytes of the certificate's public key modulus.
    fn public_key_length(&self, certificate: &Certificate) -> Result<usize>;

    /// Decrypt a symmetrically encrypted region with the token's keys.
    fn symmetric_decrypt(&self, keys: &DerivedKeys, ciphertext: &[u8]) -> Result<Vec<u8>>;

    /// Verify a chunk whose trailing bytes are its symmetric signature.
    fn symmetric_verify_chunk(&self, keys: &DerivedKeys, chunk: &[u8]) -> bool {
        keys.verify_chunk(chunk)
    }

    fn derive_keys(&self, secret: &[u8], seed: &[u8]) -> Result<DerivedKeys> {
        let options = self
            .policy()
            .derived_key_options()
            .ok_or(ProtocolError::SecurityPolicyNotImplemented(self.policy().name()))?;
        derived_keys::derive_keys(secret, seed, &options)
    }
}

/// Registry of crypto factories, one per enabled policy.
#[derive(Clone, Default)]
pub struct CryptoFactories {
    factories: HashMap<SecurityPolicy, Arc<dyn CryptoFactory>>,
}

impl CryptoFactories {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable a policy. Replaces any factory already registered for it.
    pub fn register(&mut self, factory: Arc<dyn CryptoFactory>) -> &mut Self {
        self.factories.insert(factory.policy(), factory);
        self
    }

    pub fn get(&self, policy: SecurityPolicy) -> Result<Arc<dyn CryptoFactory>> {
        self.factories
            .get(&policy)
            .cloned()
            .ok_or(ProtocolError::SecurityPolicyNotImplemented(policy.name()))
    }

    pub fn is_enabled(&self, policy: SecurityPolicy) -> bool {
        self.factories.contains_key(&policy)
    }

    pub fn policies(&self) -> impl Iterator<Item = SecurityPolicy> + '_ {
        self.factories.keys().copied()
    }
}

impl fmt::Debug for CryptoFactories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.policies()).finish()
    }
}

/// Asymmetric signature length for a public key of `key_length` bytes.
///
/// Only 1024-bit and 2048-bit keys are accepted.
pub fn asymmetric_signature_length(key_length: usize) -> Result<usize> {
    match key_length {
        128 | 256 => Ok(key_length),
        other => Err(ProtocolError::InvalidSignatureLength(other)),
    }
}

/// Drop `len` signature bytes from the end of `buf`, never cutting into the
/// first `floor` bytes.
pub fn strip_signature(buf: &mut BytesMut, len: usize, floor: usize) -> Result<()> {
    if buf.len() < floor + len {
        return Err(ProtocolError::InvalidHeader(
            "chunk too short to carry its signature",
        ));
    }
    buf.truncate(buf.len() - len);
    Ok(())
}

/// Remove block-cipher padding: the last byte `n` is the padding size and
/// `n + 1` bytes, all equal to `n`, are dropped.
pub fn remove_padding(buf: &mut BytesMut, floor: usize) -> Result<()> {
    let Some(&n) = buf.last() else {
        return Err(ProtocolError::InvalidPadding("empty buffer".into()));
    };
    let pad = n as usize + 1;
    if buf.len() < floor + pad {
        return Err(ProtocolError::InvalidPadding(format!(
            "padding of {pad} bytes exceeds {} payload bytes",
            buf.len().saturating_sub(floor)
        )));
    }
    let start = buf.len() - pad;
    if buf[start..].iter().any(|&b| b != n) {
        return Err(ProtocolError::InvalidPadding("inconsistent padding bytes".into()));
    }
    buf.truncate(start);
    Ok(())
}
