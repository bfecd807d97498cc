//! Position Resolver
//!
//! Finds the UI elements under a screen point. The walk is depth-first and
//! prunes every subtree whose root does not contain the point.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use uiq_cache::NodeCache;
use uiq_node::{AttributeSnapshot, Bounds, Clock, NodeHandle, TreeSource};

/// Ranking key of a positional candidate; smaller sorts first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rank {
    pub identifiable: bool,
    pub clickable: bool,
    pub area: i64,
}

impl Rank {
    fn key(&self) -> (bool, bool, bool, i64) {
        (
            !(self.identifiable && self.clickable),
            !self.clickable,
            !self.identifiable,
            self.area,
        )
    }
}

impl Ord for Rank {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl PartialOrd for Rank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Element under the point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub node: NodeHandle,
    pub rank: Rank,
    pub bounds: Bounds,
}

/// Rank for a node containing the point, `None` if it does not qualify
pub(crate) fn qualify(attrs: &AttributeSnapshot, short_text_max: usize) -> Option<Rank> {
    let bounds = attrs.bounds();
    if !attrs.visible || bounds.is_degenerate() {
        return None;
    }
    let identifiable = attrs.is_identifiable(short_text_max);
    if !attrs.clickable && !identifiable {
        return None;
    }
    Some(Rank { identifiable, clickable: attrs.clickable, area: bounds.area() })
}

/// Up to `limit` best candidates under `(x, y)` below and including `root`
pub(crate) fn resolve<S: TreeSource, C: Clock>(
    cache: &NodeCache<S, C>,
    root: NodeHandle,
    x: i32,
    y: i32,
    limit: usize,
    short_text_max: usize,
) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    let mut stack = vec![root];
    let mut visited = 0usize;

    while let Some(node) = stack.pop() {
        let Some(attrs) = cache.attributes(node) else {
            continue;
        };
        let bounds = attrs.bounds();
        if !bounds.contains(x, y) {
            continue;
        }
        visited += 1;
        if let Some(rank) = qualify(&attrs, short_text_max) {
            candidates.push(Candidate { node, rank, bounds });
        }

        let children: Vec<_> = cache.children(node).collect();
        stack.extend(children.into_iter().rev());
    }

    // stable: equal ranks keep pre-order
    candidates.sort_by(|a, b| a.rank.cmp(&b.rank));
    tracing::debug!(
        "resolve_at({}, {}) visited {} nodes, {} candidates",
        x,
        y,
        visited,
        candidates.len()
    );
    candidates.truncate(limit);
    candidates
}
