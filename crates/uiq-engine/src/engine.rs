//! Engine - Main entry point

use uiq_cache::{CacheStats, NodeCache};
use uiq_node::{AttributeSnapshot, Clock, NodeHandle, SystemClock, TreeSource};
use uiq_selector::{Selector, SelectorError};

use crate::inspect::{self, NodeDetail};
use crate::position::{self, Candidate};
use crate::query::QueryAll;
use crate::snapshot::{self, FlattenedRecord};
use crate::synthesize::synthesize;
use crate::EngineConfig;

/// Query engine over one host tree session.
///
/// Owns the node caches; handles passed in must come from the same source.
pub struct Engine<S, C = SystemClock> {
    config: EngineConfig,
    cache: NodeCache<S, C>,
}

impl<S: TreeSource> Engine<S> {
    /// Create an engine with the default configuration
    pub fn new(source: S) -> Self {
        Self::with_config(source, EngineConfig::default())
    }

    /// Create an engine with the given configuration
    pub fn with_config(source: S, config: EngineConfig) -> Self {
        Self::with_clock(source, SystemClock::new(), config)
    }
}

impl<S: TreeSource, C: Clock> Engine<S, C> {
    /// Create an engine reading time from `clock`
    pub fn with_clock(source: S, clock: C, config: EngineConfig) -> Self {
        tracing::info!("uiq engine {} initialized", crate::VERSION);
        let cache = NodeCache::with_clock(source, clock, config.staleness(), config.limits());
        Self { config, cache }
    }

    /// Get engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &NodeCache<S, C> {
        &self.cache
    }

    /// Root of the active window
    pub fn root(&self) -> Option<NodeHandle> {
        self.cache.root()
    }

    /// Attribute snapshot, `None` if the host cannot answer
    pub fn attributes(&self, node: NodeHandle) -> Option<AttributeSnapshot> {
        self.cache.attributes(node)
    }

    /// First match under `scope` (the scope itself included)
    pub fn query_first(&self, scope: NodeHandle, selector: &Selector) -> Option<NodeHandle> {
        self.query_all(scope, selector).next()
    }

    /// Every match under `scope`, lazily
    pub fn query_all<'a>(&'a self, scope: NodeHandle, selector: &'a Selector) -> QueryAll<'a, S, C> {
        QueryAll::new(&self.cache, scope, selector, self.config.fast_query)
    }

    /// Parse `selector` and return its first match under `scope`
    pub fn query(&self, scope: NodeHandle, selector: &str) -> Result<Option<NodeHandle>, EngineError> {
        let selector: Selector = selector.parse()?;
        Ok(self.query_first(scope, &selector))
    }

    /// Up to `limit` candidates under `(x, y)`, best first
    pub fn resolve_at(&self, root: NodeHandle, x: i32, y: i32, limit: usize) -> Vec<Candidate> {
        position::resolve(&self.cache, root, x, y, limit, self.config.short_text_max)
    }

    /// Flatten the subtree under `root`
    pub fn snapshot(&self, root: NodeHandle) -> Vec<FlattenedRecord> {
        snapshot::build(&self.cache, root, self.config.max_keep)
    }

    /// Selector a human can read back for `node`
    pub fn synthesize_selector(&self, node: NodeHandle) -> Option<String> {
        let attrs = self.cache.attributes(node)?;
        let ancestors: Vec<_> = self
            .cache
            .ancestor_chain_limited(node, self.config.ancestor_lookback + 1)
            .skip(1)
            .filter_map(|a| self.cache.attributes(a))
            .collect();
        Some(synthesize(&attrs, &ancestors, self.config.short_text_max))
    }

    pub fn inspect(&self, node: NodeHandle) -> Option<NodeDetail> {
        inspect::inspect(&self.cache, node, &self.config)
    }

    /// Inspect each candidate under `(x, y)` from the active root
    pub fn describe_at(&self, x: i32, y: i32, limit: usize) -> Vec<NodeDetail> {
        let Some(root) = self.cache.root() else {
            return Vec::new();
        };
        self.resolve_at(root, x, y, limit)
            .into_iter()
            .filter_map(|c| self.inspect(c.node))
            .collect()
    }

    /// Drop every cached entry; call on the host's tree-changed signal
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    pub fn invalidate_subtree(&self, node: NodeHandle) {
        self.cache.invalidate_subtree(node);
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

/// Engine error
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Selector error: {0}")]
    Selector(#[from] SelectorError),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}
