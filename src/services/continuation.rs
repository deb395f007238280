//! # Continuation Points
//!
//! Pages a large result set (browse references, history values) across
//! several service calls. The first page is returned immediately; the rest
//! is parked behind an opaque key the client presents to fetch the next
//! page or to release the set.
//!
//! One manager per session. Keys are ASCII decimal renderings of a
//! per-manager counter, so they are unique within the session but
//! predictable.

use crate::config::ContinuationConfig;
use crate::services::status::StatusCode;
use crate::utils::metrics::global_metrics;
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

/// Opaque key handed to the client.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ContinuationPoint(Bytes);

impl ContinuationPoint {
    pub fn new(key: impl Into<Bytes>) -> Self {
        Self(key.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ContinuationPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContinuationPoint({})", String::from_utf8_lossy(&self.0))
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuationResult<T> {
    pub status: StatusCode,
    /// Present while more values remain.
    pub continuation_point: Option<ContinuationPoint>,
    pub values: Vec<T>,
}

impl<T> ContinuationResult<T> {
    fn page(values: Vec<T>, continuation_point: Option<ContinuationPoint>) -> Self {
        Self {
            status: StatusCode::GOOD,
            continuation_point,
            values,
        }
    }

    fn rejected(status: StatusCode) -> Self {
        Self {
            status,
            continuation_point: None,
            values: Vec::new(),
        }
    }
}

struct Parked<T> {
    page_size: usize,
    remaining: Vec<T>,
}

/// Pages result sets for one session.
///
/// Keys are a per-manager counter rendered as ASCII decimal, so a client
/// can guess other keys of the same session.
pub struct ContinuationPointManager<T> {
    parked: HashMap<ContinuationPoint, Parked<T>>,
    counter: u64,
    max_continuation_points: usize,
}

impl<T> ContinuationPointManager<T> {
    pub fn new(config: &ContinuationConfig) -> Self {
        Self {
            parked: HashMap::new(),
            counter: 0,
            max_continuation_points: config.max_continuation_points,
        }
    }

    /// Return the first page of `values` and park the remainder.
    ///
    /// A `page_size` of 0, or one that covers every value, returns the whole
    /// set without a key. When the session already holds the maximum number
    /// of continuation points the result is `BadNoContinuationPoints` with
    /// no values.
    pub fn register(&mut self, page_size: usize, mut values: Vec<T>) -> ContinuationResult<T> {
        if page_size == 0 || page_size >= values.len() {
            return ContinuationResult::page(values, None);
        }
        if self.max_continuation_points != 0 && self.parked.len() >= self.max_continuation_points
        {
            warn!(
                open = self.parked.len(),
                limit = self.max_continuation_points,
                "continuation point limit reached"
            );
            global_metrics().continuation_point_rejected();
            return ContinuationResult::rejected(StatusCode::BAD_NO_CONTINUATION_POINTS);
        }

        let remaining = values.split_off(page_size);
        let key = self.next_key();
        debug!(key = ?key, parked = remaining.len(), "continuation point created");
        self.parked.insert(
            key.clone(),
            Parked {
                page_size,
                remaining,
            },
        );
        global_metrics().continuation_point_created();
        ContinuationResult::page(values, Some(key))
    }

    /// Next page for `key`. The key stays valid while values remain.
    pub fn get_next(&mut self, key: &ContinuationPoint) -> ContinuationResult<T> {
        let Some(parked) = self.parked.get_mut(key) else {
            debug!(key = ?key, "unknown continuation point");
            return ContinuationResult::rejected(StatusCode::BAD_CONTINUATION_POINT_INVALID);
        };

        let take = parked.page_size.min(parked.remaining.len());
        let page: Vec<T> = parked.remaining.drain(..take).collect();
        if parked.remaining.is_empty() {
            self.parked.remove(key);
            global_metrics().continuation_point_released();
            ContinuationResult::page(page, None)
        } else {
            ContinuationResult::page(page, Some(key.clone()))
        }
    }

    /// Release `key` and drop its remaining values.
    pub fn cancel(&mut self, key: &ContinuationPoint) -> StatusCode {
        match self.parked.remove(key) {
            Some(_) => {
                global_metrics().continuation_point_released();
                StatusCode::GOOD
            }
            None => StatusCode::BAD_CONTINUATION_POINT_INVALID,
        }
    }

    /// Open continuation points.
    pub fn len(&self) -> usize {
        self.parked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parked.is_empty()
    }

    fn next_key(&mut self) -> ContinuationPoint {
        self.counter += 1;
        ContinuationPoint(Bytes::from(self.counter.to_string()))
    }
}

impl<T> Default for ContinuationPointManager<T> {
    fn default() -> Self {
        Self::new(&ContinuationConfig::default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn manager(limit: usize) -> ContinuationPointManager<char> {
        ContinuationPointManager::new(&ContinuationConfig {
            max_continuation_points: limit,
        })
    }

    #[test]
    fn test_paging_through_five() {
        let mut cpm = manager(0);
        let first = cpm.register(2, vec!['a', 'b', 'c', 'd', 'e']);
        assert_eq!(first.values, vec!['a', 'b']);
        let key = first.continuation_point.unwrap();

        let second = cpm.get_next(&key);
        assert_eq!(second.values, vec!['c', 'd']);
        assert_eq!(second.continuation_point.as_ref(), Some(&key));

        let third = cpm.get_next(&key);
        assert_eq!(third.values, vec!['e']);
        assert!(third.continuation_point.is_none());
        assert!(cpm.is_empty());

        assert_eq!(
            cpm.get_next(&key).status,
            StatusCode::BAD_CONTINUATION_POINT_INVALID
        );
    }

    #[test]
    fn test_no_paging_needed() {
        let mut cpm = manager(0);
        let all = cpm.register(0, vec!['a', 'b']);
        assert_eq!(all.values.len(), 2);
        assert!(all.continuation_point.is_none());
        let all = cpm.register(2, vec!['a', 'b']);
        assert!(all.continuation_point.is_none());
        assert!(cpm.is_empty());
    }

    #[test]
    fn test_cancel() {
        let mut cpm = manager(0);
        let key = cpm.register(1, vec!['a', 'b']).continuation_point.unwrap();
        assert_eq!(cpm.cancel(&key), StatusCode::GOOD);
        assert_eq!(cpm.cancel(&key), StatusCode::BAD_CONTINUATION_POINT_INVALID);
        assert_eq!(
            cpm.get_next(&key).status,
            StatusCode::BAD_CONTINUATION_POINT_INVALID
        );
    }

    #[test]
    fn test_keys_are_distinct_decimal() {
        let mut cpm = manager(0);
        let k1 = cpm.register(1, vec!['a', 'b']).continuation_point.unwrap();
        let k2 = cpm.register(1, vec!['a', 'b']).continuation_point.unwrap();
        assert_eq!(k1.as_bytes(), b"1");
        assert_eq!(k2.as_bytes(), b"2");
    }

    #[test]
    fn test_limit() {
        let mut cpm = manager(1);
        let _held = cpm.register(1, vec!['a', 'b']);
        let refused = cpm.register(1, vec!['c', 'd']);
        assert_eq!(refused.status, StatusCode::BAD_NO_CONTINUATION_POINTS);
        assert!(refused.values.is_empty());
        // a result that fits needs no continuation point
        assert_eq!(cpm.register(5, vec!['x']).status, StatusCode::GOOD);
    }

    #[test]
    fn test_empty_key_is_invalid() {
        let mut cpm = manager(0);
        let empty = ContinuationPoint::new(Bytes::new());
        assert!(empty.is_empty());
        assert_eq!(
            cpm.get_next(&empty).status,
            StatusCode::BAD_CONTINUATION_POINT_INVALID
        );
    }
}
