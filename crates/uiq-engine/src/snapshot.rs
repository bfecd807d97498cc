//! Snapshot Builder
//!
//! Flattens a subtree into dense, serializable records in pre-order and marks
//! which records the host's identifier/text lookups can find on their own.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uiq_cache::{FastQuery, NodeCache};
use uiq_node::{AttributeSnapshot, Clock, NodeHandle, TreeSource};

/// One flattened node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlattenedRecord {
    /// Dense pre-order id
    pub id: usize,
    /// Parent id, -1 for the snapshot root
    pub pid: i64,
    /// Whether an identifier lookup singles this node out; `None` if unknown
    #[serde(rename = "idQf")]
    pub id_query_flag: Option<bool>,
    /// Whether a text lookup singles this node out; `None` if unknown
    #[serde(rename = "textQf")]
    pub text_query_flag: Option<bool>,
    pub attr: AttributeSnapshot,
}

impl FlattenedRecord {
    pub fn parent_id(&self) -> Option<usize> {
        usize::try_from(self.pid).ok()
    }
}

/// Visible clickable record with the smallest area containing `(x, y)`
pub fn find_in_snapshot(records: &[FlattenedRecord], x: i32, y: i32) -> Option<&FlattenedRecord> {
    records
        .iter()
        .filter(|r| r.attr.visible && r.attr.clickable)
        .filter(|r| {
            let bounds = r.attr.bounds();
            !bounds.is_degenerate() && bounds.contains(x, y)
        })
        .min_by_key(|r| r.attr.bounds().area())
}

struct Entry {
    handle: NodeHandle,
    parent: Option<usize>,
    children: Vec<usize>,
}

#[derive(Clone, Copy)]
enum Flag {
    Id,
    Text,
}

impl Flag {
    fn get(self, record: &FlattenedRecord) -> Option<bool> {
        match self {
            Flag::Id => record.id_query_flag,
            Flag::Text => record.text_query_flag,
        }
    }

    fn set(self, record: &mut FlattenedRecord, value: bool) {
        match self {
            Flag::Id => record.id_query_flag = Some(value),
            Flag::Text => record.text_query_flag = Some(value),
        }
    }
}

/// Flatten the subtree under `root` into at most `max_keep` records
pub(crate) fn build<S: TreeSource, C: Clock>(
    cache: &NodeCache<S, C>,
    root: NodeHandle,
    max_keep: usize,
) -> Vec<FlattenedRecord> {
    let mut records: Vec<FlattenedRecord> = Vec::new();
    let mut entries: Vec<Entry> = Vec::new();

    let base_depth = cache.depth(root);
    let base_index = cache.index(root);
    // (node, parent record, index in parent, depth)
    let mut stack = vec![(root, None::<usize>, base_index, base_depth)];

    while let Some((node, parent, index, depth)) = stack.pop() {
        if records.len() >= max_keep {
            tracing::debug!("snapshot truncated at {} records", max_keep);
            break;
        }
        let Some(mut attr) = cache.attributes(node) else {
            continue;
        };
        attr.index = index;
        attr.depth = depth;

        let id = records.len();
        records.push(FlattenedRecord {
            id,
            pid: parent.map_or(-1, |p| p as i64),
            id_query_flag: None,
            text_query_flag: None,
            attr,
        });
        entries.push(Entry { handle: node, parent, children: Vec::new() });
        if let Some(p) = parent {
            entries[p].children.push(id);
        }

        if records.len() >= max_keep {
            continue;
        }
        let children: Vec<_> = cache.children(node).collect();
        for (i, child) in children.into_iter().enumerate().rev() {
            stack.push((child, Some(id), i, depth + 1));
        }
    }

    mark_lookups(cache, root, &mut records, &entries);
    propagate(&mut records, &entries, Flag::Id);
    propagate(&mut records, &entries, Flag::Text);

    tracing::debug!("snapshot of {:?}: {} records", root, records.len());
    records
}

/// Leaves first, then interior nodes, each group in reverse pre-order. One
/// host lookup per distinct value.
fn mark_lookups<S: TreeSource, C: Clock>(
    cache: &NodeCache<S, C>,
    root: NodeHandle,
    records: &mut [FlattenedRecord],
    entries: &[Entry],
) {
    let mut by_identifier: HashMap<String, Option<Vec<NodeHandle>>> = HashMap::new();
    let mut by_text: HashMap<String, Option<Vec<NodeHandle>>> = HashMap::new();

    let leaves = (0..records.len()).rev().filter(|&i| entries[i].children.is_empty());
    let interior = (0..records.len()).rev().filter(|&i| !entries[i].children.is_empty());

    for i in leaves.chain(interior) {
        let handle = entries[i].handle;
        let only_this = |found: &Option<Vec<NodeHandle>>| found.as_ref().map(|nodes| nodes.as_slice() == [handle]);

        let record = &mut records[i];
        if let Some(identifier) = record.attr.identifier.as_deref().filter(|s| !s.is_empty()) {
            let found = by_identifier
                .entry(identifier.to_string())
                .or_insert_with(|| cache.lookup(root, &FastQuery::Id(identifier.to_string())));
            record.id_query_flag = only_this(found);
        }
        if let Some(text) = record.attr.text.as_deref().filter(|s| !s.is_empty()) {
            let found = by_text
                .entry(text.to_string())
                .or_insert_with(|| cache.lookup(root, &FastQuery::Text(text.to_string())));
            record.text_query_flag = only_this(found);
        }
    }
}

/// Spread `Some(true)` to unknown siblings, then up through unknown ancestors
/// together with their unknown siblings. Known flags are never overwritten.
fn propagate(records: &mut [FlattenedRecord], entries: &[Entry], flag: Flag) {
    let mark_siblings = |records: &mut [FlattenedRecord], node: usize| {
        if let Some(parent) = entries[node].parent {
            for &sibling in &entries[parent].children {
                if flag.get(&records[sibling]).is_none() {
                    flag.set(&mut records[sibling], true);
                }
            }
        }
    };

    for i in 0..records.len() {
        if flag.get(&records[i]) != Some(true) {
            continue;
        }
        mark_siblings(records, i);

        let mut cursor = entries[i].parent;
        while let Some(ancestor) = cursor {
            if flag.get(&records[ancestor]).is_some() {
                break;
            }
            flag.set(&mut records[ancestor], true);
            mark_siblings(records, ancestor);
            cursor = entries[ancestor].parent;
        }
    }
}
