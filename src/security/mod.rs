//! # Channel Security
//!
//! Security policy resolution, token bookkeeping and the boundary to the
//! cryptographic primitives.
//!
//! ## Components
//! - **Policy**: security policy URIs and message security modes
//! - **Context**: per-channel policy, mode and key material
//! - **Token Store**: sliding window of security tokens with lazy eviction
//! - **Crypto**: `CryptoFactory` trait and per-policy registry
//! - **Derived Keys**: P_SHA256 key derivation and HMAC chunk signatures
//!
//! ## Security
//! - Key material is zeroized on drop and never printed by `Debug`
//! - Signature comparison is constant time (subtle)

pub mod context;
pub mod crypto;
pub mod derived_keys;
pub mod policy;
pub mod token_store;

pub use context::{Certificate, PrivateKey, SecurityContext};
pub use crypto::{CryptoFactories, CryptoFactory};
pub use derived_keys::DerivedKeys;
pub use policy::{MessageSecurityMode, SecurityPolicy};
pub use token_store::{SecurityToken, TokenEntry, TokenStore};
