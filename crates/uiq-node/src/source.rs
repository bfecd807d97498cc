//! Tree Source
//!
//! The contract a host implements to expose its UI tree.

use crate::attributes::AttributeSnapshot;
use crate::clock::Timestamp;
use crate::NodeHandle;

/// Failure reported by a tree source
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// The host cannot answer right now (window torn down, service not bound)
    #[error("Tree source unavailable")]
    Unavailable,
    /// The handle no longer refers to a live node
    #[error("Node handle expired: {0:?}")]
    Expired(NodeHandle),
}

pub type SourceResult<T> = Result<T, SourceError>;

/// Host-owned UI tree.
///
/// Structural fetches (`root`, `parent`, `child`) and the `find_by_*` lookups
/// are costly; `attributes` is a cheap read of state the handle already
/// carries. All calls happen on the host's single UI context.
pub trait TreeSource {
    /// Root of the active window
    fn root(&self) -> SourceResult<Option<NodeHandle>>;

    /// Parent of `node`, `None` for the root
    fn parent(&self, node: NodeHandle) -> SourceResult<Option<NodeHandle>>;

    /// Child at `index`, `None` if out of range or gone
    fn child(&self, node: NodeHandle, index: usize) -> SourceResult<Option<NodeHandle>>;

    /// Attribute snapshot of `node`
    fn attributes(&self, node: NodeHandle) -> SourceResult<AttributeSnapshot>;

    /// Nodes under `scope` whose full identifier equals `value`
    fn find_by_identifier(&self, scope: NodeHandle, value: &str) -> SourceResult<Vec<NodeHandle>>;

    /// Nodes under `scope` whose text matches `value` (host-defined, usually
    /// a case-insensitive substring match)
    fn find_by_text(&self, scope: NodeHandle, value: &str) -> SourceResult<Vec<NodeHandle>>;

    /// Host-side liveness, independent of the engine's own TTLs
    fn is_handle_expired(&self, _node: NodeHandle, _now: Timestamp) -> bool {
        false
    }
}

macro_rules! forward_tree_source {
    ($($ptr:ty),*) => {$(
        impl<T: TreeSource + ?Sized> TreeSource for $ptr {
            fn root(&self) -> SourceResult<Option<NodeHandle>> {
                (**self).root()
            }

            fn parent(&self, node: NodeHandle) -> SourceResult<Option<NodeHandle>> {
                (**self).parent(node)
            }

            fn child(&self, node: NodeHandle, index: usize) -> SourceResult<Option<NodeHandle>> {
                (**self).child(node, index)
            }

            fn attributes(&self, node: NodeHandle) -> SourceResult<AttributeSnapshot> {
                (**self).attributes(node)
            }

            fn find_by_identifier(&self, scope: NodeHandle, value: &str) -> SourceResult<Vec<NodeHandle>> {
                (**self).find_by_identifier(scope, value)
            }

            fn find_by_text(&self, scope: NodeHandle, value: &str) -> SourceResult<Vec<NodeHandle>> {
                (**self).find_by_text(scope, value)
            }

            fn is_handle_expired(&self, node: NodeHandle, now: Timestamp) -> bool {
                (**self).is_handle_expired(node, now)
            }
        }
    )*};
}

forward_tree_source!(&T, std::rc::Rc<T>, Box<T>);
