//! uiq Engine
//!
//! Cached query and traversal engine over a live UI tree.
//!
//! # Goals
//! - Few host round trips (structural calls are cached with short TTLs)
//! - Bounded work per call
//! - Results that serialize straight to JSON
//!
//! # Example
//! ```rust
//! use uiq_engine::{Engine, node::{MemoryTree, NodeSpec}};
//!
//! let tree = MemoryTree::new("com.app");
//! let root = tree.set_root(NodeSpec::new("android.widget.FrameLayout"));
//! let ok = tree.add_child(root, NodeSpec::new("android.widget.Button").id("ok").clickable());
//!
//! let engine = Engine::new(tree);
//! assert_eq!(engine.query(root, "Button[vid='ok']").unwrap(), Some(ok));
//! assert_eq!(engine.synthesize_selector(ok).as_deref(), Some("Button[vid='ok'][clickable=true]"));
//! ```

mod config;
mod engine;
mod inspect;
mod position;
mod query;
mod snapshot;
mod synthesize;

pub use config::EngineConfig;
pub use engine::{Engine, EngineError};
pub use inspect::{NodeDetail, NodePosition};
pub use position::{Candidate, Rank};
pub use query::QueryAll;
pub use snapshot::{find_in_snapshot, FlattenedRecord};
pub use synthesize::synthesize;

// Re-export sub-crates for advanced usage
pub use uiq_cache as cache;
pub use uiq_node as node;
pub use uiq_selector as selector;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
