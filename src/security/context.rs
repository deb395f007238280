//! Per-channel security state.

use crate::error::{ProtocolError, Result};
use crate::security::crypto::CryptoFactory;
use crate::security::policy::{MessageSecurityMode, SecurityPolicy};
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// DER-encoded X.509 certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate(pub Bytes);

impl Certificate {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Local private key, opaque to this crate and wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey(Vec<u8>);

impl PrivateKey {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey([{} bytes])", self.0.len())
    }
}

/// Security policy, mode and key material of one secure channel.
///
/// Policy and mode start out `Invalid`. The first OPN (or an explicit
/// [`set_security`](Self::set_security)) fixes the policy; any later OPN on
/// the same channel must carry the same one. A None policy forced by an
/// unsecured HEL/ACK does not count as fixed.
#[derive(Default)]
pub struct SecurityContext {
    policy: SecurityPolicy,
    mode: MessageSecurityMode,
    private_key: Option<PrivateKey>,
    peer_certificate: Option<Certificate>,
    factory: Option<Arc<dyn CryptoFactory>>,
    policy_fixed: bool,
}

impl SecurityContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for a channel known up front to run without security.
    pub fn insecure() -> Self {
        Self {
            policy: SecurityPolicy::None,
            mode: MessageSecurityMode::None,
            policy_fixed: true,
            ..Self::default()
        }
    }

    pub fn with_private_key(mut self, key: PrivateKey) -> Self {
        self.private_key = Some(key);
        self
    }

    pub fn policy(&self) -> SecurityPolicy {
        self.policy
    }

    pub fn mode(&self) -> MessageSecurityMode {
        self.mode
    }

    pub fn private_key(&self) -> Option<&PrivateKey> {
        self.private_key.as_ref()
    }

    pub fn set_private_key(&mut self, key: PrivateKey) {
        self.private_key = Some(key);
    }

    pub fn peer_certificate(&self) -> Option<&Certificate> {
        self.peer_certificate.as_ref()
    }

    pub fn factory(&self) -> Option<&Arc<dyn CryptoFactory>> {
        self.factory.as_ref()
    }

    /// Whether the channel's policy can no longer change.
    pub fn is_policy_fixed(&self) -> bool {
        self.policy_fixed
    }

    pub(crate) fn set_factory(&mut self, factory: Arc<dyn CryptoFactory>) {
        self.factory = Some(factory);
    }

    /// Fix the security mode and policy negotiated for this channel.
    ///
    /// # Panics
    /// Panics if the mode was already set, or if either argument is
    /// `Invalid`. Both are programming errors in the negotiation layer.
    pub fn set_security(&mut self, mode: MessageSecurityMode, policy: SecurityPolicy) {
        assert!(
            self.mode == MessageSecurityMode::Invalid,
            "security already set"
        );
        assert!(policy != SecurityPolicy::Invalid, "invalid security policy");
        assert!(mode != MessageSecurityMode::Invalid, "invalid security mode");
        self.policy = policy;
        self.mode = mode;
        self.policy_fixed = true;
    }

    /// HEL/ACK/RHE are exchanged in the clear. Before the policy is fixed
    /// this forces policy and mode to None; afterwards it would be a
    /// downgrade and is refused.
    pub(crate) fn force_none(&mut self) -> Result<()> {
        if self.policy_fixed && self.policy.is_secure() {
            return Err(ProtocolError::SecurityError(
                "unsecured handshake message on a secured channel",
            ));
        }
        self.policy = SecurityPolicy::None;
        self.mode = MessageSecurityMode::None;
        Ok(())
    }

    /// Refuse an OPN whose policy differs from the one already fixed.
    /// Leaves the context untouched.
    pub(crate) fn check_open(&self, policy: SecurityPolicy) -> Result<()> {
        if self.policy_fixed && self.policy != policy {
            warn!(current = %self.policy, requested = %policy, "security policy change refused");
            return Err(ProtocolError::SecurityPolicyMismatch {
                current: self.policy.name(),
                requested: policy.name(),
            });
        }
        Ok(())
    }

    /// Commit the policy named by a verified OPN security header.
    pub(crate) fn apply_open(
        &mut self,
        policy: SecurityPolicy,
        factory: Option<Arc<dyn CryptoFactory>>,
        sender_certificate: Option<Bytes>,
    ) -> Result<()> {
        self.check_open(policy)?;
        if !self.policy_fixed {
            debug!(%policy, "secure channel policy established");
        }
        self.policy = policy;
        self.policy_fixed = true;
        if policy == SecurityPolicy::None {
            self.mode = MessageSecurityMode::None;
        } else if self.mode == MessageSecurityMode::None {
            // mode forced by a HEL/ACK; the negotiation layer sets the real one
            self.mode = MessageSecurityMode::Invalid;
        }
        if factory.is_some() {
            self.factory = factory;
        }
        if let Some(cert) = sender_certificate.filter(|c| !c.is_empty()) {
            self.peer_certificate = Some(Certificate(cert));
        }
        Ok(())
    }
}

impl fmt::Debug for SecurityContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityContext")
            .field("policy", &self.policy)
            .field("mode", &self.mode)
            .field("has_private_key", &self.private_key.is_some())
            .field("has_peer_certificate", &self.peer_certificate.is_some())
            .field("policy_fixed", &self.policy_fixed)
            .finish()
    }
}
