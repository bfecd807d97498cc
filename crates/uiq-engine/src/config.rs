//! Engine Configuration

use serde::{Deserialize, Serialize};
use uiq_cache::{CacheLimits, StalenessPolicy, LONG_TTL_MS, SHORT_TTL_MS};
use uiq_node::{MAX_CHILD, MAX_DESCENDANTS, MAX_KEEP, SHORT_TEXT_MAX};

/// Engine configuration options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Cache TTL for nodes with text (ms)
    pub short_ttl_ms: u64,

    /// Cache TTL for all other nodes (ms)
    pub long_ttl_ms: u64,

    /// Children enumerated per node
    pub max_child: usize,

    /// Nodes visited by one descendant walk
    pub max_descendants: usize,

    /// Records produced by one snapshot
    pub max_keep: usize,

    /// Entries per cache
    pub cache_capacity: usize,

    /// Longest text/description used as a discriminator
    pub short_text_max: usize,

    /// Ancestors considered when synthesizing a selector
    pub ancestor_lookback: usize,

    /// Default number of candidates for positional queries
    pub candidate_limit: usize,

    /// Children listed by `inspect`
    pub inspect_children: usize,

    /// Use host lookups for identifier/text selectors
    pub fast_query: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            short_ttl_ms: SHORT_TTL_MS,
            long_ttl_ms: LONG_TTL_MS,
            max_child: MAX_CHILD,
            max_descendants: MAX_DESCENDANTS,
            max_keep: MAX_KEEP,
            cache_capacity: MAX_DESCENDANTS,
            short_text_max: SHORT_TEXT_MAX,
            ancestor_lookback: 2,
            candidate_limit: 3,
            inspect_children: 2,
            fast_query: cfg!(feature = "fast-query"),
        }
    }
}

impl EngineConfig {
    /// Load from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, crate::EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    pub(crate) fn staleness(&self) -> StalenessPolicy {
        StalenessPolicy::new(self.short_ttl_ms, self.long_ttl_ms)
    }

    pub(crate) fn limits(&self) -> CacheLimits {
        CacheLimits {
            max_child: self.max_child,
            max_descendants: self.max_descendants,
            capacity: self.cache_capacity,
        }
    }
}
