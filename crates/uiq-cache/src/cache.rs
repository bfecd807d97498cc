//! Node Cache
//!
//! Four bounded caches over the host tree: child by `(parent, index)`, index
//! by node, parent by node, and the root. A single child fetch fills the
//! child, index and parent caches at once. Entries expire per node (see
//! [`StalenessPolicy`]) and are refetched transparently. Host failures never
//! escape: every lookup degrades to `None`.

use std::cell::{Cell, RefCell};

use uiq_node::{
    AttributeSnapshot, Clock, NodeHandle, SourceError, SourceResult, SystemClock, TreeSource,
    MAX_CHILD, MAX_DESCENDANTS,
};

use crate::lru::LruMap;
use crate::staleness::{Stamped, StalenessPolicy};
use crate::traverse::{
    AncestorChain, Ancestors, Children, ChildrenInWindow, Descendants, DescendantsInWindow,
    FastQueryNodes, SiblingDirection, Siblings,
};
use crate::window::OffsetRange;

/// Traversal and capacity bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheLimits {
    /// Children enumerated per node
    pub max_child: usize,
    /// Nodes yielded by one descendant traversal
    pub max_descendants: usize,
    /// Entries per cache
    pub capacity: usize,
}

impl Default for CacheLimits {
    fn default() -> Self {
        Self {
            max_child: MAX_CHILD,
            max_descendants: MAX_DESCENDANTS,
            capacity: MAX_DESCENDANTS,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from a fresh entry
    pub hits: u64,
    /// Lookups that had to go to the host
    pub misses: u64,
    /// Host calls that failed (unavailable or expired)
    pub failures: u64,
    /// Full invalidations
    pub invalidations: u64,
}

impl CacheStats {
    /// Fraction of lookups served from cache
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 { 0.0 } else { self.hits as f64 / total as f64 }
    }
}

/// Host O(1) lookup key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FastQuery {
    /// Full identifier
    Id(String),
    /// Short identifier, expanded with the scope's (or root's) namespace
    Vid(String),
    /// Text (host-defined matching)
    Text(String),
}

#[derive(Debug)]
struct Caches {
    child: LruMap<(NodeHandle, usize), Stamped<NodeHandle>>,
    index: LruMap<NodeHandle, Stamped<usize>>,
    parent: LruMap<NodeHandle, Stamped<NodeHandle>>,
    root: Option<Stamped<NodeHandle>>,
}

impl Caches {
    fn new(capacity: usize) -> Self {
        Self {
            child: LruMap::new(capacity),
            index: LruMap::new(capacity),
            parent: LruMap::new(capacity),
            root: None,
        }
    }

    fn clear(&mut self) {
        self.child.clear();
        self.index.clear();
        self.parent.clear();
        self.root = None;
    }
}

/// Memoizing view over a [`TreeSource`].
///
/// Confined to the host's UI context: the cache uses interior mutability and
/// is deliberately not `Sync`.
#[derive(Debug)]
pub struct NodeCache<S, C = SystemClock> {
    source: S,
    clock: C,
    policy: StalenessPolicy,
    limits: CacheLimits,
    caches: RefCell<Caches>,
    /// Bumped by `invalidate_all`; entries from older epochs are dead
    epoch: Cell<u64>,
    stats: Cell<CacheStats>,
}

impl<S: TreeSource> NodeCache<S, SystemClock> {
    /// Cache with default TTLs and limits on the system clock
    pub fn new(source: S) -> Self {
        Self::with_clock(source, SystemClock::new(), StalenessPolicy::default(), CacheLimits::default())
    }
}

impl<S: TreeSource, C: Clock> NodeCache<S, C> {
    pub fn with_clock(source: S, clock: C, policy: StalenessPolicy, limits: CacheLimits) -> Self {
        Self {
            source,
            clock,
            policy,
            limits,
            caches: RefCell::new(Caches::new(limits.capacity)),
            epoch: Cell::new(0),
            stats: Cell::new(CacheStats::default()),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn policy(&self) -> StalenessPolicy {
        self.policy
    }

    pub fn limits(&self) -> CacheLimits {
        self.limits
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.get()
    }

    pub fn reset_stats(&self) {
        self.stats.set(CacheStats::default());
    }

    /// Current time on the cache clock
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    // ------------------------------------------------------------------
    // Host access
    // ------------------------------------------------------------------

    /// Attribute snapshot, `None` if the host cannot answer
    pub fn attributes(&self, node: NodeHandle) -> Option<AttributeSnapshot> {
        self.settle("attributes", self.source.attributes(node))
    }

    /// Child count clamped to `max_child`
    pub fn child_count(&self, node: NodeHandle) -> usize {
        self.attributes(node)
            .map_or(0, |a| a.child_count.min(self.limits.max_child))
    }

    /// Run one host lookup.
    ///
    /// `None` when the host could not answer, or when a `Vid` key cannot be
    /// expanded because neither the scope nor the root reports a namespace.
    pub fn lookup(&self, scope: NodeHandle, query: &FastQuery) -> Option<Vec<NodeHandle>> {
        let result = match query {
            FastQuery::Id(value) => self.source.find_by_identifier(scope, value),
            FastQuery::Text(value) => self.source.find_by_text(scope, value),
            FastQuery::Vid(value) => {
                let Some(namespace) = self.namespace_for(scope) else {
                    tracing::debug!("no namespace to expand vid {:?} under {:?}", value, scope);
                    return None;
                };
                self.source
                    .find_by_identifier(scope, &format!("{}:id/{}", namespace, value))
            }
        };
        self.settle("fast query", result)
    }

    fn namespace_for(&self, scope: NodeHandle) -> Option<String> {
        let from_scope = self.attributes(scope).and_then(|a| a.namespace);
        from_scope
            .or_else(|| self.root().and_then(|r| self.attributes(r)).and_then(|a| a.namespace))
            .filter(|ns| !ns.is_empty())
    }

    fn settle<T>(&self, what: &str, result: SourceResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.bump(|s| s.failures += 1);
                match err {
                    SourceError::Unavailable => tracing::debug!("{} skipped: {}", what, err),
                    SourceError::Expired(_) => tracing::trace!("{} skipped: {}", what, err),
                }
                None
            }
        }
    }

    fn bump(&self, f: impl FnOnce(&mut CacheStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }

    fn stamp<T>(&self, value: T) -> Stamped<T> {
        Stamped::new(value, self.clock.now(), self.epoch.get())
    }

    /// Staleness check for an entry describing `node`
    fn is_fresh<T>(&self, node: NodeHandle, entry: &Stamped<T>) -> bool {
        if entry.epoch != self.epoch.get() {
            return false;
        }
        let now = self.clock.now();
        if self.source.is_handle_expired(node, now) {
            return false;
        }
        let Ok(attrs) = self.source.attributes(node) else {
            return false;
        };
        self.policy.is_valid(entry.stamp, attrs.has_text(), now)
    }

    fn hit<T>(&self, value: T) -> Option<T> {
        self.bump(|s| s.hits += 1);
        Some(value)
    }

    fn miss(&self) {
        self.bump(|s| s.misses += 1);
    }

    // ------------------------------------------------------------------
    // Cached structure
    // ------------------------------------------------------------------

    /// Root of the active window
    pub fn root(&self) -> Option<NodeHandle> {
        let cached = self.caches.borrow().root;
        if let Some(entry) = cached {
            if self.is_fresh(entry.value, &entry) {
                return self.hit(entry.value);
            }
        }
        self.miss();
        let root = self.settle("root", self.source.root()).flatten();
        self.caches.borrow_mut().root = root.map(|r| self.stamp(r));
        root
    }

    /// Cached root, or `None` when `node` itself is the root
    pub fn root_excluding(&self, node: NodeHandle) -> Option<NodeHandle> {
        self.root().filter(|&root| root != node)
    }

    /// Parent of `node`; `None` for the root or when the host cannot answer.
    ///
    /// A host answer of "no parent" re-anchors the cached root on `node`.
    pub fn parent(&self, node: NodeHandle) -> Option<NodeHandle> {
        if self.root() == Some(node) {
            return None;
        }
        let cached = self.caches.borrow_mut().parent.get(&node).copied();
        if let Some(entry) = cached {
            if self.is_fresh(entry.value, &entry) {
                return self.hit(entry.value);
            }
        }
        self.miss();
        match self.settle("parent", self.source.parent(node))? {
            Some(parent) => {
                let entry = self.stamp(parent);
                self.caches.borrow_mut().parent.insert(node, entry);
                Some(parent)
            }
            None => {
                tracing::trace!("{:?} has no parent, re-anchoring root", node);
                let entry = self.stamp(node);
                self.caches.borrow_mut().root = Some(entry);
                None
            }
        }
    }

    /// Child of `node` at `index`, bounds-checked against the clamped child count
    pub fn child(&self, node: NodeHandle, index: usize) -> Option<NodeHandle> {
        if index >= self.child_count(node) {
            return None;
        }
        self.child_unchecked(node, index)
    }

    /// Child lookup for callers that already bounds-checked `index`
    pub(crate) fn child_unchecked(&self, node: NodeHandle, index: usize) -> Option<NodeHandle> {
        let cached = self.caches.borrow_mut().child.get(&(node, index)).copied();
        if let Some(entry) = cached {
            if self.is_fresh(entry.value, &entry) {
                return self.hit(entry.value);
            }
        }
        self.miss();
        let child = self.settle("child", self.source.child(node, index)).flatten()?;
        tracing::trace!("cached child {:?}[{}] = {:?}", node, index, child);
        let mut caches = self.caches.borrow_mut();
        caches.child.insert((node, index), self.stamp(child));
        caches.index.insert(child, self.stamp(index));
        caches.parent.insert(child, self.stamp(node));
        Some(child)
    }

    /// Index of `node` in its parent without scanning siblings
    pub fn peek_index(&self, node: NodeHandle) -> Option<usize> {
        let cached = self.caches.borrow_mut().index.get(&node).copied()?;
        if self.is_fresh(node, &cached) {
            self.hit(cached.value)
        } else {
            None
        }
    }

    /// Index of `node` in its parent; 0 when no parent is known
    pub fn index(&self, node: NodeHandle) -> usize {
        if let Some(index) = self.peek_index(node) {
            return index;
        }
        self.miss();
        let Some(parent) = self.parent(node) else {
            return 0;
        };
        for (index, child) in self.children(parent).enumerate() {
            if child == node {
                let entry = self.stamp(index);
                self.caches.borrow_mut().index.insert(node, entry);
                return index;
            }
        }
        0
    }

    /// Distance from `node` to the root, recomputed on every call
    pub fn depth(&self, node: NodeHandle) -> usize {
        let mut depth = 0;
        let mut cursor = node;
        while let Some(parent) = self.parent(cursor) {
            depth += 1;
            cursor = parent;
            if depth >= self.limits.max_descendants {
                tracing::debug!("depth walk from {:?} hit the bound", node);
                break;
            }
        }
        depth
    }

    // ------------------------------------------------------------------
    // Invalidation
    // ------------------------------------------------------------------

    /// Forget everything, e.g. after the host reports a window change
    pub fn invalidate_all(&self) {
        // The epoch bump alone makes every entry dead, so the engine is
        // consistent even if the maps cannot be cleared right now.
        self.epoch.set(self.epoch.get().wrapping_add(1));
        self.bump(|s| s.invalidations += 1);
        match self.caches.try_borrow_mut() {
            Ok(mut caches) => caches.clear(),
            Err(_) => {
                tracing::debug!("cache busy during invalidation, relying on epoch");
                return;
            }
        }
        tracing::debug!("node cache invalidated (epoch {})", self.epoch.get());
    }

    /// Drop `node` and every still-cached descendant
    pub fn invalidate_subtree(&self, node: NodeHandle) {
        let mut caches = self.caches.borrow_mut();
        let mut stack = vec![node];
        let mut removed = 0usize;
        while let Some(current) = stack.pop() {
            for index in 0..self.limits.max_child {
                if let Some(entry) = caches.child.remove(&(current, index)) {
                    caches.index.remove(&entry.value);
                    caches.parent.remove(&entry.value);
                    stack.push(entry.value);
                    removed += 1;
                }
            }
        }
        // the parent's slot would otherwise keep handing out `node`
        let slot = caches.parent.remove(&node).map(|p| p.value);
        let index = caches.index.remove(&node).map(|i| i.value);
        if let Some(parent) = slot {
            let indices = match index {
                Some(i) => i..i + 1,
                None => 0..self.limits.max_child,
            };
            for i in indices {
                if caches.child.peek(&(parent, i)).is_some_and(|e| e.value == node) {
                    caches.child.remove(&(parent, i));
                }
            }
        }
        if caches.root.is_some_and(|r| r.value == node) {
            caches.root = None;
        }
        tracing::trace!("invalidated subtree of {:?} ({} cached descendants)", node, removed);
    }

    /// Entries currently held in the (child, index, parent) caches
    pub fn len(&self) -> (usize, usize, usize) {
        let caches = self.caches.borrow();
        (caches.child.len(), caches.index.len(), caches.parent.len())
    }

    // ------------------------------------------------------------------
    // Traversals
    // ------------------------------------------------------------------

    /// Children in index order, stopping at the first missing child
    pub fn children(&self, node: NodeHandle) -> Children<'_, S, C> {
        Children::new(self, node)
    }

    /// Children whose index lies in `window`
    pub fn children_in(&self, node: NodeHandle, window: OffsetRange) -> ChildrenInWindow<'_, S, C> {
        ChildrenInWindow::new(self, node, window)
    }

    /// Pre-order descendants (excluding `node`), at most `max_descendants`
    pub fn descendants(&self, node: NodeHandle) -> Descendants<'_, S, C> {
        Descendants::new(self, node)
    }

    /// Descendants tagged with their discovery offset, filtered by `window`
    pub fn descendants_in(&self, node: NodeHandle, window: OffsetRange) -> DescendantsInWindow<'_, S, C> {
        DescendantsInWindow::new(self, node, window)
    }

    /// `node`, its parent, grandparent, ... up to the root
    pub fn ancestor_chain(&self, node: NodeHandle) -> AncestorChain<'_, S, C> {
        AncestorChain::new(self, node, None)
    }

    /// Like [`ancestor_chain`](Self::ancestor_chain) but at most `max_len` nodes
    pub fn ancestor_chain_limited(&self, node: NodeHandle, max_len: usize) -> AncestorChain<'_, S, C> {
        AncestorChain::new(self, node, Some(max_len))
    }

    /// Proper ancestors whose distance (0 = parent) lies in `window`
    pub fn ancestors_in(&self, node: NodeHandle, window: OffsetRange) -> Ancestors<'_, S, C> {
        Ancestors::new(self, node, window)
    }

    /// Preceding siblings, nearest first
    pub fn siblings_before(&self, node: NodeHandle, window: OffsetRange) -> Siblings<'_, S, C> {
        Siblings::new(self, node, window, SiblingDirection::Before)
    }

    /// Following siblings, nearest first
    pub fn siblings_after(&self, node: NodeHandle, window: OffsetRange) -> Siblings<'_, S, C> {
        Siblings::new(self, node, window, SiblingDirection::After)
    }

    /// Host lookup matches under `scope`, one lookup per key, in key order
    pub fn fast_query_nodes(&self, scope: NodeHandle, keys: Vec<FastQuery>) -> FastQueryNodes<'_, S, C> {
        FastQueryNodes::new(self, scope, keys)
    }

}
