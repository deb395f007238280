//! # Security Token Store
//!
//! Sliding window of security tokens for one channel, oldest first.
//!
//! Tokens are pushed by the negotiation layer as they are issued. While a
//! renewal is in flight the peer may still send traffic under the previous
//! token, so older entries stay until a chunk proves the peer has moved on:
//! a lookup that matches a newer token retires every entry in front of it.
//! Nothing here is time driven; expiry is a flag set from outside.

use crate::security::derived_keys::DerivedKeys;
use std::collections::VecDeque;
use std::time::{Duration, SystemTime};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityToken {
    pub channel_id: u32,
    pub token_id: u32,
    pub created_at: SystemTime,
    pub revised_lifetime: Duration,
    pub expired: bool,
}

impl SecurityToken {
    pub fn new(channel_id: u32, token_id: u32, revised_lifetime: Duration) -> Self {
        Self {
            channel_id,
            token_id,
            created_at: SystemTime::now(),
            revised_lifetime,
            expired: false,
        }
    }

    /// Whether `revised_lifetime` has passed since creation. The store does
    /// not act on this; the negotiation layer uses it to decide when to call
    /// [`TokenStore::expire`].
    pub fn lifetime_elapsed(&self, now: SystemTime) -> bool {
        now.duration_since(self.created_at)
            .map(|age| age >= self.revised_lifetime)
            .unwrap_or(false)
    }
}

/// A token with the keys derived for it. Keys are absent when the channel
/// runs without security.
#[derive(Debug, Clone)]
pub struct TokenEntry {
    pub token: SecurityToken,
    pub derived_keys: Option<DerivedKeys>,
}

/// Result of [`TokenStore::select_matching`].
#[derive(Debug)]
pub struct TokenSelection<'a> {
    pub entry: Option<&'a TokenEntry>,
    /// Older tokens were retired to reach the match.
    pub renewed: bool,
}

#[derive(Debug, Default)]
pub struct TokenStore {
    entries: VecDeque<TokenEntry>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a newly issued token.
    ///
    /// # Panics
    /// Panics if a token with the same id is already stored; pushing a token
    /// twice is a bug in the negotiation layer.
    pub fn push(&mut self, token: SecurityToken, derived_keys: Option<DerivedKeys>) {
        assert!(
            self.entries
                .iter()
                .all(|e| e.token.token_id != token.token_id),
            "security token {} pushed twice",
            token.token_id
        );
        debug!(token_id = token.token_id, "security token added");
        self.entries.push_back(TokenEntry {
            token,
            derived_keys,
        });
    }

    /// Find the entry for `token_id`, retiring every older entry in front of
    /// it. Non-matching heads are discarded as they are scanned, so a miss
    /// leaves the store empty.
    pub fn select_matching(&mut self, token_id: u32) -> TokenSelection<'_> {
        let mut retired = 0usize;
        while self
            .entries
            .front()
            .is_some_and(|e| e.token.token_id != token_id)
        {
            self.entries.pop_front();
            retired += 1;
        }

        let found = !self.entries.is_empty();
        if found && retired > 0 {
            debug!(token_id, retired, "security token renewed");
        } else if !found && retired > 0 {
            debug!(token_id, retired, "no matching security token, store drained");
        }
        TokenSelection {
            entry: self.entries.front(),
            renewed: found && retired > 0,
        }
    }

    /// Mark a token expired. Returns false if it is not stored.
    pub fn expire(&mut self, token_id: u32) -> bool {
        match self
            .entries
            .iter_mut()
            .find(|e| e.token.token_id == token_id)
        {
            Some(entry) => {
                entry.token.expired = true;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored token ids, oldest first.
    pub fn token_ids(&self) -> Vec<u32> {
        self.entries.iter().map(|e| e.token.token_id).collect()
    }
}
