//! Symmetric key material derived from the channel nonces.
//!
//! Key derivation uses the OPC UA `P_SHA256` pseudo-random function (the
//! TLS 1.2 `P_hash` construction over HMAC-SHA256). The same HMAC signs
//! and verifies symmetric chunks; the signature is the trailing
//! `signature_length` bytes of the chunk and covers everything before it.

use crate::error::{ProtocolError, Result};
use crate::security::policy::{DerivedKeyOptions, SymmetricSignature};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

type HmacSha256 = Hmac<Sha256>;

/// Keys for one direction of one security token.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKeys {
    signing_key: Vec<u8>,
    encrypting_key: Vec<u8>,
    initialization_vector: Vec<u8>,
    #[zeroize(skip)]
    signature: SymmetricSignature,
}

impl DerivedKeys {
    /// Assemble keys produced elsewhere (e.g. by an external crypto provider).
    pub fn new(
        signing_key: Vec<u8>,
        encrypting_key: Vec<u8>,
        initialization_vector: Vec<u8>,
        signature: SymmetricSignature,
    ) -> Self {
        Self {
            signing_key,
            encrypting_key,
            initialization_vector,
            signature,
        }
    }

    pub fn signing_key(&self) -> &[u8] {
        &self.signing_key
    }

    pub fn encrypting_key(&self) -> &[u8] {
        &self.encrypting_key
    }

    pub fn initialization_vector(&self) -> &[u8] {
        &self.initialization_vector
    }

    pub fn signature_algorithm(&self) -> SymmetricSignature {
        self.signature
    }

    pub fn signature_length(&self) -> usize {
        self.signature.signature_length()
    }

    /// Compute the HMAC signature of `data`.
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self.signature {
            SymmetricSignature::HmacSha256 => {
                let mut mac = HmacSha256::new_from_slice(&self.signing_key)
                    .map_err(|_| ProtocolError::SecurityError("invalid signing key length"))?;
                mac.update(data);
                Ok(mac.finalize().into_bytes().to_vec())
            }
            SymmetricSignature::HmacSha1 => Err(ProtocolError::SecurityError(
                "HMAC-SHA1 signatures require an external crypto provider",
            )),
        }
    }

    /// Verify a chunk whose last `signature_length` bytes are its signature.
    pub fn verify_chunk(&self, chunk: &[u8]) -> bool {
        let sig_len = self.signature_length();
        if chunk.len() < sig_len {
            return false;
        }
        let (data, signature) = chunk.split_at(chunk.len() - sig_len);
        match self.sign(data) {
            Ok(expected) => expected.ct_eq(signature).into(),
            Err(_) => false,
        }
    }
}

impl fmt::Debug for DerivedKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedKeys")
            .field("signing_key", &format_args!("[{} bytes]", self.signing_key.len()))
            .field(
                "encrypting_key",
                &format_args!("[{} bytes]", self.encrypting_key.len()),
            )
            .field("signature", &self.signature)
            .finish()
    }
}

/// `P_SHA256(secret, seed)` truncated to `length` bytes.
pub fn p_sha256(secret: &[u8], seed: &[u8], length: usize) -> Result<Vec<u8>> {
    let keyed = HmacSha256::new_from_slice(secret)
        .map_err(|_| ProtocolError::SecurityError("invalid key derivation secret"))?;

    let mut out = Vec::with_capacity(length + 32);
    // A(1) = HMAC(secret, seed)
    let mut a = {
        let mut mac = keyed.clone();
        mac.update(seed);
        mac.finalize().into_bytes()
    };
    while out.len() < length {
        let mut mac = keyed.clone();
        mac.update(&a);
        mac.update(seed);
        out.extend_from_slice(&mac.finalize().into_bytes());

        let mut next = keyed.clone();
        next.update(&a);
        a = next.finalize().into_bytes();
    }
    out.truncate(length);
    Ok(out)
}

/// Derive one direction's keys from the peer nonces.
///
/// Per the secure conversation rules, client keys use the server nonce as
/// secret and the client nonce as seed; server keys swap them.
pub fn derive_keys(secret: &[u8], seed: &[u8], options: &DerivedKeyOptions) -> Result<DerivedKeys> {
    if options.signature != SymmetricSignature::HmacSha256 {
        return Err(ProtocolError::SecurityError(
            "P_SHA1 key derivation requires an external crypto provider",
        ));
    }
    let sign_len = options.signing_key_length;
    let enc_len = options.encrypting_key_length;
    let total = sign_len + enc_len + options.encrypting_block_size;

    let mut material = p_sha256(secret, seed, total)?;
    let keys = DerivedKeys::new(
        material[..sign_len].to_vec(),
        material[sign_len..sign_len + enc_len].to_vec(),
        material[sign_len + enc_len..].to_vec(),
        options.signature,
    );
    material.zeroize();
    Ok(keys)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::security::policy::SecurityPolicy;

    fn basic256sha256() -> DerivedKeyOptions {
        SecurityPolicy::Basic256Sha256.derived_key_options().unwrap()
    }

    #[test]
    fn test_p_sha256_lengths_and_prefix_stability() {
        let short = p_sha256(b"secret", b"seed", 20).unwrap();
        let long = p_sha256(b"secret", b"seed", 80).unwrap();
        assert_eq!(short.len(), 20);
        assert_eq!(long.len(), 80);
        assert_eq!(&long[..20], &short[..]);
    }

    #[test]
    fn test_derive_keys_splits_material() {
        let keys = derive_keys(&[1; 32], &[2; 32], &basic256sha256()).unwrap();
        let material = p_sha256(&[1; 32], &[2; 32], 80).unwrap();
        assert_eq!(keys.signing_key(), &material[..32]);
        assert_eq!(keys.encrypting_key(), &material[32..64]);
        assert_eq!(keys.initialization_vector(), &material[64..]);
    }

    #[test]
    fn test_sign_then_verify_chunk() {
        let keys = derive_keys(&[7; 32], &[9; 32], &basic256sha256()).unwrap();
        let mut chunk = b"MSGF-some-chunk-bytes".to_vec();
        let signature = keys.sign(&chunk).unwrap();
        chunk.extend_from_slice(&signature);
        assert!(keys.verify_chunk(&chunk));

        let last = chunk.len() - 1;
        chunk[last] ^= 0x01;
        assert!(!keys.verify_chunk(&chunk));
        assert!(!keys.verify_chunk(&[0u8; 4]));
    }

    #[test]
    fn test_debug_hides_key_material() {
        let keys = DerivedKeys::new(
            vec![0xAB; 32],
            vec![0xCD; 32],
            vec![0; 16],
            SymmetricSignature::HmacSha256,
        );
        let rendered = format!("{keys:?}");
        assert!(rendered.contains("[32 bytes]"));
        assert!(!rendered.contains("171"));
    }
}
