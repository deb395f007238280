//! Sequence number tracking for secured chunks.

use tracing::warn;

/// Expected and carried sequence numbers of an out-of-order chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceAnomaly {
    pub expected: u32,
    pub actual: u32,
}

/// Tracks the previous sequence number of one channel.
///
/// A gap is advisory: it is reported and the carried number becomes the new
/// reference, so one anomaly does not cascade into the following chunks.
#[derive(Debug, Default, Clone)]
pub struct SequenceValidator {
    previous: Option<u32>,
}

impl SequenceValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn previous(&self) -> Option<u32> {
        self.previous
    }

    /// Record `actual` and report it if it does not follow the previous one.
    // TODO: decide how a restart from near u32::MAX to a small value should be
    // treated; only the wrap to exactly prev + 1 (mod 2^32) passes today.
    pub fn check(&mut self, actual: u32) -> Option<SequenceAnomaly> {
        let anomaly = self.previous.and_then(|prev| {
            let expected = prev.wrapping_add(1);
            (expected != actual).then_some(SequenceAnomaly { expected, actual })
        });
        if let Some(a) = anomaly {
            warn!(expected = a.expected, actual = a.actual, "sequence number anomaly");
        }
        self.previous = Some(actual);
        anomaly
    }
}
