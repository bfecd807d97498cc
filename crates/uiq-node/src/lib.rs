//! uiq node model
//!
//! Opaque handles into a host-owned UI tree, the attribute snapshot read from
//! a handle, and the contract a host implements to expose its tree.

mod attributes;
mod clock;
mod geometry;
mod memory;
mod source;

pub use attributes::{short_identifier, AttrKind, AttrValue, AttributeSnapshot};
pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use geometry::{Bounds, Point};
pub use memory::{CallCounts, MemoryTree, NodeSpec};
pub use source::{SourceError, SourceResult, TreeSource};

use serde::{Deserialize, Serialize};

/// Opaque reference to a node owned by the host tree.
///
/// A handle is a token into the host's registry. The engine never invents
/// handles; it only receives them from a [`TreeSource`]. Two handles denote the
/// same live node iff they are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeHandle(pub u64);

impl NodeHandle {
    /// Raw registry token
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Hard cap on children enumerated per node
pub const MAX_CHILD: usize = 512;

/// Hard cap on nodes yielded by one descendant traversal
pub const MAX_DESCENDANTS: usize = 4096;

/// Hard cap on records produced by one snapshot
pub const MAX_KEEP: usize = 5000;

/// Longest text/description still considered a usable discriminator
pub const SHORT_TEXT_MAX: usize = 20;
