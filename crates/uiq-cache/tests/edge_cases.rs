//! Edge case tests for uiq-cache
//!
//! Staleness, bounds and host failure handling against an in-memory tree.

use std::rc::Rc;

use uiq_cache::{CacheLimits, FastQuery, NodeCache, OffsetRange, StalenessPolicy};
use uiq_node::{ManualClock, MemoryTree, NodeHandle, NodeSpec};

fn cache_over(tree: &Rc<MemoryTree>, clock: &Rc<ManualClock>) -> NodeCache<Rc<MemoryTree>, Rc<ManualClock>> {
    NodeCache::with_clock(tree.clone(), clock.clone(), StalenessPolicy::default(), CacheLimits::default())
}

/// root -> [labelled(text), plain]
fn small_tree() -> (Rc<MemoryTree>, NodeHandle, NodeHandle, NodeHandle) {
    let tree = Rc::new(MemoryTree::new("com.app"));
    let root = tree.set_root(NodeSpec::new("FrameLayout"));
    let labelled = tree.add_child(root, NodeSpec::new("TextView").text("Hello"));
    let plain = tree.add_child(root, NodeSpec::new("View"));
    (tree, root, labelled, plain)
}

#[test]
fn test_fresh_entry_is_served_from_cache() {
    let (tree, root, _, plain) = small_tree();
    let clock = Rc::new(ManualClock::new(0));
    let cache = cache_over(&tree, &clock);

    assert_eq!(cache.child(root, 1), Some(plain));
    let fetched = tree.counts().child;
    clock.advance(500);
    assert_eq!(cache.child(root, 1), Some(plain));
    assert_eq!(tree.counts().child, fetched);
    assert!(cache.stats().hits >= 1);
}

#[test]
fn test_text_node_expires_after_short_ttl() {
    let (tree, root, labelled, _) = small_tree();
    let clock = Rc::new(ManualClock::new(0));
    let cache = cache_over(&tree, &clock);

    assert_eq!(cache.child(root, 0), Some(labelled));
    let before = tree.counts().child;

    clock.advance(1000);
    cache.child(root, 0);
    assert_eq!(tree.counts().child, before, "still valid at exactly the TTL");

    clock.advance(1);
    assert_eq!(cache.child(root, 0), Some(labelled));
    assert_eq!(tree.counts().child, before + 1, "refetched after the TTL");
}

#[test]
fn test_plain_node_uses_long_ttl() {
    let (tree, root, _, plain) = small_tree();
    let clock = Rc::new(ManualClock::new(0));
    let cache = cache_over(&tree, &clock);

    cache.child(root, 1);
    let before = tree.counts().child;
    clock.advance(1500);
    assert_eq!(cache.child(root, 1), Some(plain));
    assert_eq!(tree.counts().child, before);
    clock.advance(501);
    cache.child(root, 1);
    assert_eq!(tree.counts().child, before + 1);
}

#[test]
fn test_child_fill_populates_parent_and_index() {
    let (tree, root, _, plain) = small_tree();
    let clock = Rc::new(ManualClock::new(0));
    let cache = cache_over(&tree, &clock);

    cache.root();
    cache.child(root, 1);
    tree.reset_counts();

    assert_eq!(cache.parent(plain), Some(root));
    assert_eq!(cache.peek_index(plain), Some(1));
    assert_eq!(cache.index(plain), 1);
    assert_eq!(tree.counts().structural(), 0);
}

#[test]
fn test_root_has_no_parent() {
    let (tree, root, labelled, _) = small_tree();
    let clock = Rc::new(ManualClock::new(0));
    let cache = cache_over(&tree, &clock);

    assert_eq!(cache.root(), Some(root));
    assert_eq!(cache.parent(root), None);
    assert_eq!(cache.root_excluding(root), None);
    assert_eq!(cache.root_excluding(labelled), Some(root));
    assert_eq!(cache.depth(root), 0);
    assert_eq!(cache.depth(labelled), 1);
    assert_eq!(cache.index(root), 0);
}

#[test]
fn test_child_out_of_range() {
    let (tree, root, _, _) = small_tree();
    let clock = Rc::new(ManualClock::new(0));
    let cache = cache_over(&tree, &clock);

    assert_eq!(cache.child(root, 2), None);
    assert_eq!(tree.counts().child, 0);
}

#[test]
fn test_children_clamped_to_max_child() {
    let tree = Rc::new(MemoryTree::new("com.app"));
    let root = tree.set_root(NodeSpec::new("ListView"));
    for _ in 0..600 {
        tree.add_child(root, NodeSpec::new("Item"));
    }
    let clock = Rc::new(ManualClock::new(0));
    let cache = cache_over(&tree, &clock);

    assert_eq!(cache.children(root).count(), 512);
    assert_eq!(cache.child(root, 512), None);
}

#[test]
fn test_unavailable_source_degrades_to_empty() {
    let (tree, root, _, _) = small_tree();
    let clock = Rc::new(ManualClock::new(0));
    let cache = cache_over(&tree, &clock);

    tree.set_available(false);
    assert_eq!(cache.root(), None);
    assert_eq!(cache.children(root).count(), 0);
    assert_eq!(cache.descendants(root).count(), 0);
    assert!(cache.attributes(root).is_none());
    assert!(cache.stats().failures > 0);

    tree.set_available(true);
    assert_eq!(cache.root(), Some(root));
}

#[test]
fn test_expired_handle_is_refetched() {
    let (tree, root, labelled, _) = small_tree();
    let clock = Rc::new(ManualClock::new(0));
    let cache = cache_over(&tree, &clock);

    cache.child(root, 0);
    let before = tree.counts().child;
    tree.expire_at(labelled, 10);
    clock.advance(10);
    cache.child(root, 0);
    assert_eq!(tree.counts().child, before + 1);
}

#[test]
fn test_invalidate_all_forces_refetch() {
    let (tree, root, _, _) = small_tree();
    let clock = Rc::new(ManualClock::new(0));
    let cache = cache_over(&tree, &clock);

    assert_eq!(cache.children(root).count(), 2);
    assert_eq!(cache.len().0, 2);
    cache.invalidate_all();
    assert_eq!(cache.len(), (0, 0, 0));

    tree.reset_counts();
    assert_eq!(cache.children(root).count(), 2);
    assert_eq!(tree.counts().child, 2);
    assert_eq!(cache.stats().invalidations, 1);
}

#[test]
fn test_invalidate_subtree() {
    let tree = Rc::new(MemoryTree::new("com.app"));
    let root = tree.set_root(NodeSpec::new("Frame"));
    let list = tree.add_child(root, NodeSpec::new("List"));
    tree.add_child(list, NodeSpec::new("Item"));
    tree.add_child(list, NodeSpec::new("Item"));
    let side = tree.add_child(root, NodeSpec::new("Side"));
    let clock = Rc::new(ManualClock::new(0));
    let cache = cache_over(&tree, &clock);

    assert_eq!(cache.descendants(root).count(), 4);
    cache.invalidate_subtree(list);
    tree.reset_counts();

    assert_eq!(cache.child(root, 1), Some(side));
    assert_eq!(tree.counts().child, 0);
    assert_eq!(cache.children(list).count(), 2);
    assert_eq!(tree.counts().child, 2);
}

#[test]
fn test_invalidate_subtree_drops_parent_slot() {
    let tree = Rc::new(MemoryTree::new("com.app"));
    let root = tree.set_root(NodeSpec::new("Frame"));
    let list = tree.add_child(root, NodeSpec::new("List"));
    let clock = Rc::new(ManualClock::new(0));
    let cache = cache_over(&tree, &clock);

    assert_eq!(cache.child(root, 0), Some(list));
    assert_eq!(cache.len(), (1, 1, 1));

    cache.invalidate_subtree(list);
    assert_eq!(cache.len(), (0, 0, 0));

    tree.reset_counts();
    assert_eq!(cache.child(root, 0), Some(list));
    assert_eq!(tree.counts().child, 1);
}

#[test]
fn test_vid_lookup_borrows_root_namespace() {
    let tree = Rc::new(MemoryTree::new("com.app"));
    let root = tree.set_root(NodeSpec::new("Frame"));
    let list = tree.add_child(root, NodeSpec::new("List"));
    let ok = tree.add_child(list, NodeSpec::new("Button").id("ok"));
    tree.update(list, |a| a.namespace = None);
    let clock = Rc::new(ManualClock::new(0));
    let cache = cache_over(&tree, &clock);

    assert_eq!(cache.lookup(list, &FastQuery::Vid("ok".into())), Some(vec![ok]));

    tree.update(root, |a| a.namespace = None);
    assert_eq!(cache.lookup(list, &FastQuery::Vid("ok".into())), None);
    assert_eq!(cache.lookup(list, &FastQuery::Id("com.app:id/ok".into())), Some(vec![ok]));
}

#[test]
fn test_removed_node_stops_traversal() {
    let (tree, root, labelled, _) = small_tree();
    let clock = Rc::new(ManualClock::new(0));
    let cache = cache_over(&tree, &clock);

    tree.remove(labelled);
    cache.invalidate_all();
    assert_eq!(cache.children(root).count(), 1);
    assert!(cache.attributes(labelled).is_none());
}

#[test]
fn test_descendant_window_stops_after_max() {
    let tree = Rc::new(MemoryTree::new("com.app"));
    let root = tree.set_root(NodeSpec::new("Frame"));
    for _ in 0..50 {
        tree.add_child(root, NodeSpec::new("Item"));
    }
    let clock = Rc::new(ManualClock::new(0));
    let cache = cache_over(&tree, &clock);

    let picked: Vec<_> = cache.descendants_in(root, OffsetRange::at_most(2)).collect();
    assert_eq!(picked.len(), 3);
    assert!(tree.counts().child <= 4);
}

#[test]
fn test_small_capacity_evicts() {
    let tree = Rc::new(MemoryTree::new("com.app"));
    let root = tree.set_root(NodeSpec::new("Frame"));
    for _ in 0..10 {
        tree.add_child(root, NodeSpec::new("Item"));
    }
    let limits = CacheLimits { capacity: 4, ..CacheLimits::default() };
    let cache = NodeCache::with_clock(tree.clone(), ManualClock::new(0), StalenessPolicy::default(), limits);

    assert_eq!(cache.children(root).count(), 10);
    let (child, index, parent) = cache.len();
    assert!(child <= 4 && index <= 4 && parent <= 4);
}
