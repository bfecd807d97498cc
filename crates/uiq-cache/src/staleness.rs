//! Staleness Policy
//!
//! Every cached handle carries the time it was fetched and the cache epoch it
//! was written in. An entry is usable while it is younger than its TTL and its
//! epoch is still current; bumping the epoch invalidates everything at once.

use uiq_node::Timestamp;

/// TTL applied to nodes that carry text
pub const SHORT_TTL_MS: u64 = 1000;

/// TTL applied to everything else
pub const LONG_TTL_MS: u64 = 2000;

/// Per-node time-to-live selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessPolicy {
    /// TTL for nodes whose text is non-empty
    pub short_ttl: u64,
    /// TTL for all other nodes
    pub long_ttl: u64,
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self {
            short_ttl: SHORT_TTL_MS,
            long_ttl: LONG_TTL_MS,
        }
    }
}

impl StalenessPolicy {
    pub const fn new(short_ttl: u64, long_ttl: u64) -> Self {
        Self { short_ttl, long_ttl }
    }

    /// TTL for a node, text-bearing content churns faster
    #[inline]
    pub fn ttl(&self, has_text: bool) -> u64 {
        if has_text { self.short_ttl } else { self.long_ttl }
    }

    /// Check whether an entry stamped at `stamp` may still be used at `now`
    #[inline]
    pub fn is_valid(&self, stamp: Timestamp, has_text: bool, now: Timestamp) -> bool {
        now.saturating_sub(stamp) <= self.ttl(has_text)
    }
}

/// Cached value with its fetch time and cache epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stamped<T> {
    pub value: T,
    pub stamp: Timestamp,
    pub epoch: u64,
}

impl<T> Stamped<T> {
    pub fn new(value: T, stamp: Timestamp, epoch: u64) -> Self {
        Self { value, stamp, epoch }
    }
}
