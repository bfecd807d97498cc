//! Selector Evaluator
//!
//! Right-to-left matching: a node is tested against the target segment, then
//! the connective to its left is walked through the cache and every reached
//! node is tried against the next segment, recursively.

use std::collections::HashSet;

use uiq_cache::{Descendants, FastQueryNodes, NodeCache};
use uiq_node::{AttrKind, AttrValue, AttributeSnapshot, Clock, NodeHandle, TreeSource};
use uiq_selector::{Relation, Segment, Selector};

/// Matches one selector against nodes of a cached tree
pub(crate) struct Matcher<'a, S, C> {
    cache: &'a NodeCache<S, C>,
    selector: &'a Selector,
}

impl<'a, S: TreeSource, C: Clock> Matcher<'a, S, C> {
    pub(crate) fn new(cache: &'a NodeCache<S, C>, selector: &'a Selector) -> Self {
        Self { cache, selector }
    }

    /// Whether `node` is a target of the selector
    pub(crate) fn matches(&self, node: NodeHandle) -> bool {
        if self.selector.is_root_anchored() && self.cache.root() != Some(node) {
            return false;
        }
        self.match_at(node, self.selector.segments().len() - 1)
    }

    fn match_at(&self, node: NodeHandle, index: usize) -> bool {
        if !self.segment_matches(node, &self.selector.segments()[index]) {
            return false;
        }
        if index == 0 {
            return true;
        }

        let connective = self.selector.connectives()[index - 1];
        let window = connective.window;
        let left = index - 1;
        match connective.relation {
            Relation::Ancestor => self
                .cache
                .ancestors_in(node, window)
                .any(|(n, _)| self.match_at(n, left)),
            Relation::Child => self
                .cache
                .children_in(node, window)
                .any(|(n, _)| self.match_at(n, left)),
            Relation::Descendant => self
                .cache
                .descendants_in(node, window)
                .any(|(n, _)| self.match_at(n, left)),
            Relation::SiblingBefore => self
                .cache
                .siblings_before(node, window)
                .any(|(n, _)| self.match_at(n, left)),
            Relation::SiblingAfter => self
                .cache
                .siblings_after(node, window)
                .any(|(n, _)| self.match_at(n, left)),
        }
    }

    fn segment_matches(&self, node: NodeHandle, segment: &Segment) -> bool {
        let Some(attrs) = self.cache.attributes(node) else {
            return false;
        };
        segment.matches_name(attrs.class_name.as_deref())
            && segment
                .predicates
                .iter()
                .all(|p| p.test(self.value(node, &attrs, p.attr)))
    }

    /// `index` and `depth` come from the cache, everything else from the snapshot
    fn value<'b>(&self, node: NodeHandle, attrs: &'b AttributeSnapshot, kind: AttrKind) -> AttrValue<'b> {
        match kind {
            AttrKind::Index => AttrValue::Int(self.cache.index(node) as i64),
            AttrKind::Depth => AttrValue::Int(self.cache.depth(node) as i64),
            _ => attrs.get(kind),
        }
    }
}

enum Candidates<'a, S, C> {
    Walk(Descendants<'a, S, C>),
    Fast(FastQueryNodes<'a, S, C>),
    /// Walk after an unanswered lookup; skips nodes already tried
    Fallback(Descendants<'a, S, C>),
    Done,
}

/// Lazy iterator over every match under a scope, in traversal order
pub struct QueryAll<'a, S, C> {
    matcher: Matcher<'a, S, C>,
    scope: NodeHandle,
    started: bool,
    candidates: Candidates<'a, S, C>,
    seen: HashSet<NodeHandle>,
}

impl<'a, S: TreeSource, C: Clock> QueryAll<'a, S, C> {
    pub(crate) fn new(cache: &'a NodeCache<S, C>, scope: NodeHandle, selector: &'a Selector, fast: bool) -> Self {
        let candidates = if selector.is_root_anchored() {
            Candidates::Done
        } else if let Some(key) = selector.fast_query().filter(|_| fast) {
            Candidates::Fast(cache.fast_query_nodes(scope, vec![key]))
        } else {
            Candidates::Walk(cache.descendants(scope))
        };
        Self {
            matcher: Matcher::new(cache, selector),
            scope,
            started: false,
            candidates,
            seen: HashSet::new(),
        }
    }
}

impl<S: TreeSource, C: Clock> Iterator for QueryAll<'_, S, C> {
    type Item = NodeHandle;

    fn next(&mut self) -> Option<NodeHandle> {
        if !self.started {
            self.started = true;
            // the scope is tested before any candidate; anchored selectors only test the root
            let first = if self.matcher.selector.is_root_anchored() {
                self.matcher.cache.root()
            } else {
                Some(self.scope)
            };
            if let Some(node) = first {
                self.seen.insert(node);
                if self.matcher.matches(node) {
                    return Some(node);
                }
            }
        }

        loop {
            let node = match &mut self.candidates {
                Candidates::Walk(walk) => walk.next(),
                Candidates::Fast(fast) => match fast.next() {
                    // host lookups may repeat nodes or include the scope
                    Some(n) if !self.seen.insert(n) => continue,
                    Some(n) => Some(n),
                    None if fast.unanswered() > 0 => {
                        self.candidates = Candidates::Fallback(self.matcher.cache.descendants(self.scope));
                        continue;
                    }
                    None => None,
                },
                Candidates::Fallback(walk) => match walk.next() {
                    Some(n) if !self.seen.insert(n) => continue,
                    other => other,
                },
                Candidates::Done => None,
            };
            let Some(node) = node else {
                self.candidates = Candidates::Done;
                return None;
            };
            if self.matcher.matches(node) {
                return Some(node);
            }
        }
    }
}
