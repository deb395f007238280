//! Security policies and message security modes.

use std::fmt;

const URI_PREFIX: &str = "http://opcfoundation.org/UA/SecurityPolicy#";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SecurityPolicy {
    /// Not known yet: no OPN has been processed.
    #[default]
    Invalid,
    None,
    Basic128Rsa15,
    Basic256,
    Basic256Sha256,
    Aes128Sha256RsaOaep,
    Aes256Sha256RsaPss,
}

/// HMAC used to sign symmetric chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymmetricSignature {
    HmacSha1,
    HmacSha256,
}

impl SymmetricSignature {
    pub fn signature_length(self) -> usize {
        match self {
            SymmetricSignature::HmacSha1 => 20,
            SymmetricSignature::HmacSha256 => 32,
        }
    }
}

/// Sizes of the key material a policy derives from the channel nonces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedKeyOptions {
    pub signing_key_length: usize,
    pub encrypting_key_length: usize,
    pub encrypting_block_size: usize,
    pub signature: SymmetricSignature,
}

impl SecurityPolicy {
    const ALL: [SecurityPolicy; 6] = [
        SecurityPolicy::None,
        SecurityPolicy::Basic128Rsa15,
        SecurityPolicy::Basic256,
        SecurityPolicy::Basic256Sha256,
        SecurityPolicy::Aes128Sha256RsaOaep,
        SecurityPolicy::Aes256Sha256RsaPss,
    ];

    /// Resolve a policy URI. Unknown URIs map to [`SecurityPolicy::Invalid`].
    pub fn from_uri(uri: &str) -> Self {
        uri.strip_prefix(URI_PREFIX)
            .and_then(|name| Self::ALL.into_iter().find(|p| p.name() == name))
            .unwrap_or(SecurityPolicy::Invalid)
    }

    pub fn name(self) -> &'static str {
        match self {
            SecurityPolicy::Invalid => "Invalid",
            SecurityPolicy::None => "None",
            SecurityPolicy::Basic128Rsa15 => "Basic128Rsa15",
            SecurityPolicy::Basic256 => "Basic256",
            SecurityPolicy::Basic256Sha256 => "Basic256Sha256",
            SecurityPolicy::Aes128Sha256RsaOaep => "Aes128_Sha256_RsaOaep",
            SecurityPolicy::Aes256Sha256RsaPss => "Aes256_Sha256_RsaPss",
        }
    }

    pub fn uri(self) -> Option<String> {
        match self {
            SecurityPolicy::Invalid => None,
            other => Some(format!("{URI_PREFIX}{}", other.name())),
        }
    }

    pub fn is_secure(self) -> bool {
        !matches!(self, SecurityPolicy::Invalid | SecurityPolicy::None)
    }

    pub fn derived_key_options(self) -> Option<DerivedKeyOptions> {
        let (signing_key_length, encrypting_key_length, signature) = match self {
            SecurityPolicy::Invalid | SecurityPolicy::None => return None,
            SecurityPolicy::Basic128Rsa15 => (16, 16, SymmetricSignature::HmacSha1),
            SecurityPolicy::Basic256 => (24, 32, SymmetricSignature::HmacSha1),
            SecurityPolicy::Basic256Sha256 => (32, 32, SymmetricSignature::HmacSha256),
            SecurityPolicy::Aes128Sha256RsaOaep => (32, 16, SymmetricSignature::HmacSha256),
            SecurityPolicy::Aes256Sha256RsaPss => (32, 32, SymmetricSignature::HmacSha256),
        };
        Some(DerivedKeyOptions {
            signing_key_length,
            encrypting_key_length,
            encrypting_block_size: 16,
            signature,
        })
    }
}

impl fmt::Display for SecurityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MessageSecurityMode {
    #[default]
    Invalid,
    None,
    Sign,
    SignAndEncrypt,
}

impl MessageSecurityMode {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(MessageSecurityMode::Invalid),
            1 => Some(MessageSecurityMode::None),
            2 => Some(MessageSecurityMode::Sign),
            3 => Some(MessageSecurityMode::SignAndEncrypt),
            _ => None,
        }
    }

    pub fn is_encrypted(self) -> bool {
        self == MessageSecurityMode::SignAndEncrypt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_round_trip() {
        for policy in SecurityPolicy::ALL {
            let uri = policy.uri();
            assert_eq!(uri.as_deref().map(SecurityPolicy::from_uri), Some(policy));
        }
        assert_eq!(SecurityPolicy::Invalid.uri(), None);
    }

    #[test]
    fn test_unknown_uri_is_invalid() {
        assert_eq!(
            SecurityPolicy::from_uri("http://opcfoundation.org/UA/SecurityPolicy#Rot13"),
            SecurityPolicy::Invalid
        );
        assert_eq!(SecurityPolicy::from_uri(""), SecurityPolicy::Invalid);
    }

    #[test]
    fn test_derived_key_sizes() {
        let opts = SecurityPolicy::Basic256Sha256.derived_key_options();
        assert_eq!(opts.map(|o| o.signature.signature_length()), Some(32));
        assert!(SecurityPolicy::None.derived_key_options().is_none());
    }
}
