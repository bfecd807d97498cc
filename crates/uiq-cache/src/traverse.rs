//! Lazy traversals over the node cache
//!
//! Every iterator borrows the cache and pulls nodes one fetch at a time, so a
//! consumer that stops early never pays for the rest of the walk.

use uiq_node::{Clock, NodeHandle, TreeSource};

use crate::cache::{FastQuery, NodeCache};
use crate::window::OffsetRange;

/// Children in index order
pub struct Children<'a, S, C> {
    cache: &'a NodeCache<S, C>,
    node: NodeHandle,
    next: usize,
    count: Option<usize>,
}

impl<'a, S: TreeSource, C: Clock> Children<'a, S, C> {
    pub(crate) fn new(cache: &'a NodeCache<S, C>, node: NodeHandle) -> Self {
        Self { cache, node, next: 0, count: None }
    }
}

impl<S: TreeSource, C: Clock> Iterator for Children<'_, S, C> {
    type Item = NodeHandle;

    fn next(&mut self) -> Option<NodeHandle> {
        let count = *self.count.get_or_insert_with(|| self.cache.child_count(self.node));
        if self.next >= count {
            return None;
        }
        match self.cache.child_unchecked(self.node, self.next) {
            Some(child) => {
                self.next += 1;
                Some(child)
            }
            None => {
                // a hole means the host changed under us; stop here
                self.next = count;
                None
            }
        }
    }
}

/// Children whose index lies in a window
pub struct ChildrenInWindow<'a, S, C> {
    inner: Children<'a, S, C>,
    window: OffsetRange,
}

impl<'a, S: TreeSource, C: Clock> ChildrenInWindow<'a, S, C> {
    pub(crate) fn new(cache: &'a NodeCache<S, C>, node: NodeHandle, window: OffsetRange) -> Self {
        let mut inner = Children::new(cache, node);
        inner.next = window.min.unwrap_or(0);
        Self { inner, window }
    }
}

impl<S: TreeSource, C: Clock> Iterator for ChildrenInWindow<'_, S, C> {
    type Item = (NodeHandle, usize);

    fn next(&mut self) -> Option<(NodeHandle, usize)> {
        let offset = self.inner.next;
        if self.window.is_past(offset) {
            return None;
        }
        let child = self.inner.next()?;
        Some((child, offset))
    }
}

struct Frame {
    node: NodeHandle,
    next: usize,
    count: usize,
}

/// Pre-order descendants, excluding the start node.
///
/// A yielded node's children are only enumerated when the following item is
/// requested.
pub struct Descendants<'a, S, C> {
    cache: &'a NodeCache<S, C>,
    stack: Vec<Frame>,
    pending: Option<NodeHandle>,
    yielded: usize,
}

impl<'a, S: TreeSource, C: Clock> Descendants<'a, S, C> {
    pub(crate) fn new(cache: &'a NodeCache<S, C>, node: NodeHandle) -> Self {
        Self { cache, stack: Vec::new(), pending: Some(node), yielded: 0 }
    }
}

impl<S: TreeSource, C: Clock> Iterator for Descendants<'_, S, C> {
    type Item = NodeHandle;

    fn next(&mut self) -> Option<NodeHandle> {
        if self.yielded >= self.cache.limits().max_descendants {
            if self.yielded == self.cache.limits().max_descendants {
                tracing::debug!("descendant walk truncated at {} nodes", self.yielded);
                self.yielded += 1;
            }
            return None;
        }
        if let Some(node) = self.pending.take() {
            let count = self.cache.child_count(node);
            self.stack.push(Frame { node, next: 0, count });
        }
        while let Some(frame) = self.stack.last_mut() {
            if frame.next >= frame.count {
                self.stack.pop();
                continue;
            }
            let index = frame.next;
            frame.next += 1;
            let parent = frame.node;
            match self.cache.child_unchecked(parent, index) {
                Some(child) => {
                    self.pending = Some(child);
                    self.yielded += 1;
                    return Some(child);
                }
                None => {
                    self.stack.pop();
                }
            }
        }
        None
    }
}

/// Descendants tagged with their pre-order discovery offset
pub struct DescendantsInWindow<'a, S, C> {
    inner: Descendants<'a, S, C>,
    window: OffsetRange,
    offset: usize,
}

impl<'a, S: TreeSource, C: Clock> DescendantsInWindow<'a, S, C> {
    pub(crate) fn new(cache: &'a NodeCache<S, C>, node: NodeHandle, window: OffsetRange) -> Self {
        Self { inner: Descendants::new(cache, node), window, offset: 0 }
    }
}

impl<S: TreeSource, C: Clock> Iterator for DescendantsInWindow<'_, S, C> {
    type Item = (NodeHandle, usize);

    fn next(&mut self) -> Option<(NodeHandle, usize)> {
        loop {
            if self.window.is_past(self.offset) {
                return None;
            }
            let node = self.inner.next()?;
            let offset = self.offset;
            self.offset += 1;
            if self.window.accepts(offset) {
                return Some((node, offset));
            }
        }
    }
}

/// The start node followed by each ancestor up to the root
pub struct AncestorChain<'a, S, C> {
    cache: &'a NodeCache<S, C>,
    current: Option<NodeHandle>,
    remaining: usize,
}

impl<'a, S: TreeSource, C: Clock> AncestorChain<'a, S, C> {
    pub(crate) fn new(cache: &'a NodeCache<S, C>, node: NodeHandle, max_len: Option<usize>) -> Self {
        let remaining = max_len.unwrap_or(cache.limits().max_descendants);
        Self { cache, current: Some(node), remaining }
    }
}

impl<S: TreeSource, C: Clock> Iterator for AncestorChain<'_, S, C> {
    type Item = NodeHandle;

    fn next(&mut self) -> Option<NodeHandle> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.current.take()?;
        self.remaining -= 1;
        if self.remaining > 0 {
            self.current = self.cache.parent(node);
        }
        Some(node)
    }
}

/// Proper ancestors with their distance (0 = parent) inside a window
pub struct Ancestors<'a, S, C> {
    chain: AncestorChain<'a, S, C>,
    window: OffsetRange,
    offset: usize,
}

impl<'a, S: TreeSource, C: Clock> Ancestors<'a, S, C> {
    pub(crate) fn new(cache: &'a NodeCache<S, C>, node: NodeHandle, window: OffsetRange) -> Self {
        let mut chain = AncestorChain::new(cache, node, None);
        // drop the start node without asking for anything beyond its parent
        chain.current = cache.parent(node);
        Self { chain, window, offset: 0 }
    }
}

impl<S: TreeSource, C: Clock> Iterator for Ancestors<'_, S, C> {
    type Item = (NodeHandle, usize);

    fn next(&mut self) -> Option<(NodeHandle, usize)> {
        loop {
            if self.window.is_past(self.offset) {
                return None;
            }
            let node = self.chain.next()?;
            let offset = self.offset;
            self.offset += 1;
            if self.window.accepts(offset) {
                return Some((node, offset));
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiblingDirection {
    /// Lower indices, nearest first
    Before,
    /// Higher indices, nearest first
    After,
}

/// Siblings in one direction with their distance (0 = adjacent).
///
/// Offsets outside the window are skipped without fetching.
pub struct Siblings<'a, S, C> {
    cache: &'a NodeCache<S, C>,
    parent: Option<NodeHandle>,
    origin: usize,
    count: usize,
    direction: SiblingDirection,
    window: OffsetRange,
    offset: usize,
}

impl<'a, S: TreeSource, C: Clock> Siblings<'a, S, C> {
    pub(crate) fn new(
        cache: &'a NodeCache<S, C>,
        node: NodeHandle,
        window: OffsetRange,
        direction: SiblingDirection,
    ) -> Self {
        let parent = cache.parent(node);
        let (origin, count) = match parent {
            Some(parent) => (cache.index(node), cache.child_count(parent)),
            None => (0, 0),
        };
        Self {
            cache,
            parent,
            origin,
            count,
            direction,
            window,
            offset: window.min.unwrap_or(0),
        }
    }

    fn index_at(&self, offset: usize) -> Option<usize> {
        match self.direction {
            SiblingDirection::Before => self.origin.checked_sub(offset + 1),
            SiblingDirection::After => {
                let index = self.origin + offset + 1;
                (index < self.count).then_some(index)
            }
        }
    }
}

impl<S: TreeSource, C: Clock> Iterator for Siblings<'_, S, C> {
    type Item = (NodeHandle, usize);

    fn next(&mut self) -> Option<(NodeHandle, usize)> {
        let parent = self.parent?;
        if self.window.is_past(self.offset) {
            return None;
        }
        let offset = self.offset;
        let index = self.index_at(offset)?;
        self.offset += 1;
        match self.cache.child_unchecked(parent, index) {
            Some(sibling) => Some((sibling, offset)),
            None => {
                self.parent = None;
                None
            }
        }
    }
}

/// Matches of host lookups, one lookup per key, issued on demand.
///
/// Keys the host cannot answer yield nothing and are counted by
/// [`unanswered`](Self::unanswered).
pub struct FastQueryNodes<'a, S, C> {
    cache: &'a NodeCache<S, C>,
    scope: NodeHandle,
    keys: std::vec::IntoIter<FastQuery>,
    found: std::vec::IntoIter<NodeHandle>,
    unanswered: usize,
}

impl<'a, S: TreeSource, C: Clock> FastQueryNodes<'a, S, C> {
    pub(crate) fn new(cache: &'a NodeCache<S, C>, scope: NodeHandle, keys: Vec<FastQuery>) -> Self {
        Self {
            cache,
            scope,
            keys: keys.into_iter(),
            found: Vec::new().into_iter(),
            unanswered: 0,
        }
    }

    /// Keys issued so far that the host could not answer
    pub fn unanswered(&self) -> usize {
        self.unanswered
    }
}

impl<S: TreeSource, C: Clock> Iterator for FastQueryNodes<'_, S, C> {
    type Item = NodeHandle;

    fn next(&mut self) -> Option<NodeHandle> {
        loop {
            if let Some(node) = self.found.next() {
                return Some(node);
            }
            let key = self.keys.next()?;
            match self.cache.lookup(self.scope, &key) {
                Some(found) => self.found = found.into_iter(),
                None => self.unanswered += 1,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use uiq_node::{ManualClock, MemoryTree, NodeSpec};

    use super::*;
    use crate::{CacheLimits, StalenessPolicy};

    struct Fixture {
        tree: Rc<MemoryTree>,
        root: NodeHandle,
        a: NodeHandle,
        b: NodeHandle,
        c: NodeHandle,
        a1: NodeHandle,
        a2: NodeHandle,
    }

    /// root -> [a -> [a1, a2], b, c]
    fn fixture() -> Fixture {
        let tree = Rc::new(MemoryTree::new("app"));
        let root = tree.set_root(NodeSpec::new("Frame"));
        let a = tree.add_child(root, NodeSpec::new("List").id("list"));
        let b = tree.add_child(root, NodeSpec::new("Button").text("ok"));
        let c = tree.add_child(root, NodeSpec::new("Button").text("cancel"));
        let a1 = tree.add_child(a, NodeSpec::new("Item").text("one"));
        let a2 = tree.add_child(a, NodeSpec::new("Item").text("two"));
        Fixture { tree, root, a, b, c, a1, a2 }
    }

    fn cache(tree: &Rc<MemoryTree>) -> NodeCache<Rc<MemoryTree>, ManualClock> {
        NodeCache::with_clock(tree.clone(), ManualClock::new(0), StalenessPolicy::default(), CacheLimits::default())
    }

    #[test]
    fn test_children_in_order() {
        let f = fixture();
        let cache = cache(&f.tree);
        let kids: Vec<_> = cache.children(f.root).collect();
        assert_eq!(kids, vec![f.a, f.b, f.c]);
    }

    #[test]
    fn test_descendants_preorder() {
        let f = fixture();
        let cache = cache(&f.tree);
        let all: Vec<_> = cache.descendants(f.root).collect();
        assert_eq!(all, vec![f.a, f.a1, f.a2, f.b, f.c]);
    }

    #[test]
    fn test_descendants_lazy() {
        let f = fixture();
        let cache = cache(&f.tree);
        f.tree.reset_counts();
        let first = cache.descendants(f.root).next();
        assert_eq!(first, Some(f.a));
        assert_eq!(f.tree.counts().child, 1);
    }

    #[test]
    fn test_descendants_bounded() {
        let f = fixture();
        let limits = CacheLimits { max_descendants: 2, ..CacheLimits::default() };
        let cache = NodeCache::with_clock(f.tree.clone(), ManualClock::new(0), StalenessPolicy::default(), limits);
        assert_eq!(cache.descendants(f.root).count(), 2);
    }

    #[test]
    fn test_descendants_window_offsets() {
        let f = fixture();
        let cache = cache(&f.tree);
        let picked: Vec<_> = cache.descendants_in(f.root, OffsetRange::between(1, 2)).collect();
        assert_eq!(picked, vec![(f.a1, 1), (f.a2, 2)]);
    }

    #[test]
    fn test_ancestor_chain() {
        let f = fixture();
        let cache = cache(&f.tree);
        let chain: Vec<_> = cache.ancestor_chain(f.a2).collect();
        assert_eq!(chain, vec![f.a2, f.a, f.root]);
        let limited: Vec<_> = cache.ancestor_chain_limited(f.a2, 2).collect();
        assert_eq!(limited, vec![f.a2, f.a]);
    }

    #[test]
    fn test_ancestors_window() {
        let f = fixture();
        let cache = cache(&f.tree);
        let grand: Vec<_> = cache.ancestors_in(f.a1, OffsetRange::exact(1)).collect();
        assert_eq!(grand, vec![(f.root, 1)]);
        assert_eq!(cache.ancestors_in(f.root, OffsetRange::ANY).count(), 0);
    }

    #[test]
    fn test_siblings_both_directions() {
        let f = fixture();
        let cache = cache(&f.tree);
        let before: Vec<_> = cache.siblings_before(f.c, OffsetRange::ANY).collect();
        assert_eq!(before, vec![(f.b, 0), (f.a, 1)]);
        let after: Vec<_> = cache.siblings_after(f.a, OffsetRange::ANY).collect();
        assert_eq!(after, vec![(f.b, 0), (f.c, 1)]);
        assert_eq!(cache.siblings_after(f.c, OffsetRange::ANY).count(), 0);
    }

    #[test]
    fn test_siblings_window_skips_fetches() {
        let f = fixture();
        let cache = cache(&f.tree);
        cache.index(f.a);
        f.tree.reset_counts();
        let far: Vec<_> = cache.siblings_after(f.a, OffsetRange::exact(1)).collect();
        assert_eq!(far, vec![(f.c, 1)]);
        assert_eq!(f.tree.counts().child, 1);
    }

    #[test]
    fn test_fast_query_nodes_one_lookup_per_key() {
        let f = fixture();
        let cache = cache(&f.tree);
        f.tree.reset_counts();
        let keys = vec![FastQuery::Vid("list".into()), FastQuery::Text("TWO".into())];
        let mut found = cache.fast_query_nodes(f.root, keys);
        assert_eq!(found.next(), Some(f.a));
        assert_eq!(f.tree.counts().lookups(), 1);
        assert_eq!(found.next(), Some(f.a2));
        assert_eq!(found.next(), None);
        assert_eq!(f.tree.counts().lookups(), 2);
        assert_eq!(found.unanswered(), 0);
    }

    #[test]
    fn test_fast_query_nodes_unanswered() {
        let f = fixture();
        let cache = cache(&f.tree);
        f.tree.update(f.root, |a| a.namespace = None);
        f.tree.update(f.a, |a| a.namespace = None);
        let keys = vec![FastQuery::Vid("list".into()), FastQuery::Id("app:id/list".into())];
        let mut found = cache.fast_query_nodes(f.a, keys);
        assert_eq!(found.next(), Some(f.a));
        assert_eq!(found.unanswered(), 1);
    }

    #[test]
    fn test_children_window() {
        let f = fixture();
        let cache = cache(&f.tree);
        let tail: Vec<_> = cache.children_in(f.root, OffsetRange::at_least(1)).collect();
        assert_eq!(tail, vec![(f.b, 1), (f.c, 2)]);
        let head: Vec<_> = cache.children_in(f.root, OffsetRange::NEAREST).collect();
        assert_eq!(head, vec![(f.a, 0)]);
    }
}
