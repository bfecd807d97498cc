//! uiq cache layer
//!
//! Memoizes the costly structural queries (root, parent, child, index) made
//! against a host tree, expires them on a per-node TTL, and exposes lazy
//! traversals built on top of the memoized fetches.

mod cache;
mod lru;
mod staleness;
mod traverse;
mod window;

pub use cache::{CacheLimits, CacheStats, FastQuery, NodeCache};
pub use lru::LruMap;
pub use staleness::{Stamped, StalenessPolicy, LONG_TTL_MS, SHORT_TTL_MS};
pub use traverse::{
    AncestorChain, Ancestors, Children, ChildrenInWindow, Descendants, DescendantsInWindow,
    FastQueryNodes, SiblingDirection, Siblings,
};
pub use window::OffsetRange;
