//! OPC UA status codes produced by this layer.
//!
//! Only the codes the secure conversation layer and its service helpers can
//! emit are named; anything else read off the wire is kept as a raw value.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 32-bit OPC UA status code. The top two bits carry the severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusCode(pub u32);

impl StatusCode {
    pub const GOOD: StatusCode = StatusCode(0x0000_0000);
    pub const BAD_UNEXPECTED_ERROR: StatusCode = StatusCode(0x8001_0000);
    pub const BAD_DECODING_ERROR: StatusCode = StatusCode(0x8007_0000);
    pub const BAD_NOTHING_TO_DO: StatusCode = StatusCode(0x800F_0000);
    pub const BAD_CERTIFICATE_INVALID: StatusCode = StatusCode(0x8012_0000);
    pub const BAD_SECURITY_CHECKS_FAILED: StatusCode = StatusCode(0x8013_0000);
    pub const BAD_SECURE_CHANNEL_ID_INVALID: StatusCode = StatusCode(0x8022_0000);
    pub const BAD_INDEX_RANGE_INVALID: StatusCode = StatusCode(0x8036_0000);
    pub const BAD_INDEX_RANGE_NO_DATA: StatusCode = StatusCode(0x8037_0000);
    pub const BAD_CONTINUATION_POINT_INVALID: StatusCode = StatusCode(0x804A_0000);
    pub const BAD_NO_CONTINUATION_POINTS: StatusCode = StatusCode(0x804B_0000);
    pub const BAD_SECURITY_POLICY_REJECTED: StatusCode = StatusCode(0x8055_0000);
    pub const BAD_TYPE_MISMATCH: StatusCode = StatusCode(0x8074_0000);
    pub const BAD_TCP_MESSAGE_TYPE_INVALID: StatusCode = StatusCode(0x807E_0000);
    pub const BAD_TCP_SECURE_CHANNEL_UNKNOWN: StatusCode = StatusCode(0x807F_0000);
    pub const BAD_TCP_MESSAGE_TOO_LARGE: StatusCode = StatusCode(0x8080_0000);
    pub const BAD_TCP_INTERNAL_ERROR: StatusCode = StatusCode(0x8082_0000);
    pub const BAD_TCP_ENDPOINT_URL_INVALID: StatusCode = StatusCode(0x8083_0000);
    pub const BAD_REQUEST_INTERRUPTED: StatusCode = StatusCode(0x8084_0000);
    pub const BAD_SECURE_CHANNEL_CLOSED: StatusCode = StatusCode(0x8086_0000);
    pub const BAD_SECURE_CHANNEL_TOKEN_UNKNOWN: StatusCode = StatusCode(0x8087_0000);
    pub const BAD_SEQUENCE_NUMBER_INVALID: StatusCode = StatusCode(0x8088_0000);

    pub fn is_good(self) -> bool {
        self.0 & 0xC000_0000 == 0
    }

    pub fn is_bad(self) -> bool {
        self.0 & 0x8000_0000 != 0
    }

    /// Symbolic name, if the code is one this crate knows.
    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            StatusCode::GOOD => "Good",
            StatusCode::BAD_UNEXPECTED_ERROR => "BadUnexpectedError",
            StatusCode::BAD_DECODING_ERROR => "BadDecodingError",
            StatusCode::BAD_NOTHING_TO_DO => "BadNothingToDo",
            StatusCode::BAD_CERTIFICATE_INVALID => "BadCertificateInvalid",
            StatusCode::BAD_SECURITY_CHECKS_FAILED => "BadSecurityChecksFailed",
            StatusCode::BAD_SECURE_CHANNEL_ID_INVALID => "BadSecureChannelIdInvalid",
            StatusCode::BAD_INDEX_RANGE_INVALID => "BadIndexRangeInvalid",
            StatusCode::BAD_INDEX_RANGE_NO_DATA => "BadIndexRangeNoData",
            StatusCode::BAD_CONTINUATION_POINT_INVALID => "BadContinuationPointInvalid",
            StatusCode::BAD_NO_CONTINUATION_POINTS => "BadNoContinuationPoints",
            StatusCode::BAD_SECURITY_POLICY_REJECTED => "BadSecurityPolicyRejected",
            StatusCode::BAD_TYPE_MISMATCH => "BadTypeMismatch",
            StatusCode::BAD_TCP_MESSAGE_TYPE_INVALID => "BadTcpMessageTypeInvalid",
            StatusCode::BAD_TCP_SECURE_CHANNEL_UNKNOWN => "BadTcpSecureChannelUnknown",
            StatusCode::BAD_TCP_MESSAGE_TOO_LARGE => "BadTcpMessageTooLarge",
            StatusCode::BAD_TCP_INTERNAL_ERROR => "BadTcpInternalError",
            StatusCode::BAD_TCP_ENDPOINT_URL_INVALID => "BadTcpEndpointUrlInvalid",
            StatusCode::BAD_REQUEST_INTERRUPTED => "BadRequestInterrupted",
            StatusCode::BAD_SECURE_CHANNEL_CLOSED => "BadSecureChannelClosed",
            StatusCode::BAD_SECURE_CHANNEL_TOKEN_UNKNOWN => "BadSecureChannelTokenUnknown",
            StatusCode::BAD_SEQUENCE_NUMBER_INVALID => "BadSequenceNumberInvalid",
            _ => return None,
        };
        Some(name)
    }
}

impl Default for StatusCode {
    fn default() -> Self {
        StatusCode::GOOD
    }
}

impl From<u32> for StatusCode {
    fn from(value: u32) -> Self {
        StatusCode(value)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} (0x{:08X})", self.0),
            None => write!(f, "0x{:08X}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_bits() {
        assert!(StatusCode::GOOD.is_good());
        assert!(!StatusCode::GOOD.is_bad());
        assert!(StatusCode::BAD_INDEX_RANGE_NO_DATA.is_bad());
        // Uncertain codes are neither good nor bad
        let uncertain = StatusCode(0x4000_0000);
        assert!(!uncertain.is_good());
        assert!(!uncertain.is_bad());
    }

    #[test]
    fn test_display_names_known_codes() {
        assert_eq!(
            StatusCode::BAD_CONTINUATION_POINT_INVALID.to_string(),
            "BadContinuationPointInvalid (0x804A0000)"
        );
        assert_eq!(StatusCode(0x8123_0000).to_string(), "0x81230000");
    }
}
