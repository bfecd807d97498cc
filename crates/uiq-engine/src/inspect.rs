//! Node Inspection
//!
//! Everything a picker UI shows for one node: a short ancestor path, the first
//! few children, a synthesized selector and the on-screen position.

use serde::{Deserialize, Serialize};
use uiq_cache::NodeCache;
use uiq_node::{AttributeSnapshot, Clock, NodeHandle, TreeSource};

use crate::config::EngineConfig;
use crate::snapshot::FlattenedRecord;
use crate::synthesize::synthesize;

/// Top-left corner and center of a node, in screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePosition {
    pub x: i32,
    pub y: i32,
    pub center_x: i32,
    pub center_y: i32,
}

/// Inspection result for one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDetail {
    pub node: NodeHandle,
    /// Root-most ancestor first, ending with the node itself
    pub ancestor_path: Vec<FlattenedRecord>,
    /// Leading children, ids continuing after the node
    pub children: Vec<FlattenedRecord>,
    /// Children reachable by traversal; the record keeps the host's count
    pub traversable_children: usize,
    pub selector: String,
    pub position: NodePosition,
}

impl NodeDetail {
    /// Record of the inspected node
    pub fn record(&self) -> Option<&FlattenedRecord> {
        self.ancestor_path.last()
    }
}

fn record(id: usize, pid: i64, attr: AttributeSnapshot) -> FlattenedRecord {
    FlattenedRecord { id, pid, id_query_flag: None, text_query_flag: None, attr }
}

pub(crate) fn inspect<S: TreeSource, C: Clock>(
    cache: &NodeCache<S, C>,
    node: NodeHandle,
    config: &EngineConfig,
) -> Option<NodeDetail> {
    let attrs_of = |h: NodeHandle| {
        cache.attributes(h).map(|mut attr| {
            attr.index = cache.index(h);
            attr.depth = cache.depth(h);
            attr
        })
    };

    let target = attrs_of(node)?;
    // nearest first
    let ancestors: Vec<AttributeSnapshot> = cache
        .ancestor_chain_limited(node, config.ancestor_lookback + 1)
        .skip(1)
        .filter_map(attrs_of)
        .collect();

    let selector = synthesize(&target, &ancestors, config.short_text_max);
    let bounds = target.bounds();
    let center = bounds.center();
    let position = NodePosition { x: bounds.left, y: bounds.top, center_x: center.x, center_y: center.y };

    let ancestor_path: Vec<FlattenedRecord> = ancestors
        .into_iter()
        .rev()
        .chain(std::iter::once(target))
        .enumerate()
        .map(|(id, attr)| record(id, id as i64 - 1, attr))
        .collect();
    let node_id = ancestor_path.len() - 1;

    let children = cache
        .children(node)
        .take(config.inspect_children)
        .filter_map(attrs_of)
        .enumerate()
        .map(|(i, attr)| record(node_id + 1 + i, node_id as i64, attr))
        .collect();

    Some(NodeDetail {
        node,
        ancestor_path,
        children,
        traversable_children: cache.child_count(node),
        selector,
        position,
    })
}
