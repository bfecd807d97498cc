//! In-Memory Tree
//!
//! Arena-backed [`TreeSource`] for hosts that already hold their UI as plain
//! data, for replaying captured trees, and for tests. Every source call is
//! counted so callers can observe how many queries an operation issued.

use std::cell::{Cell, RefCell};

use crate::attributes::AttributeSnapshot;
use crate::clock::Timestamp;
use crate::geometry::Bounds;
use crate::source::{SourceError, SourceResult, TreeSource};
use crate::NodeHandle;

/// Number of calls made against a [`MemoryTree`], per operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub root: usize,
    pub parent: usize,
    pub child: usize,
    pub attributes: usize,
    pub find_by_identifier: usize,
    pub find_by_text: usize,
}

impl CallCounts {
    /// Structural fetches (root, parent, child)
    pub fn structural(&self) -> usize {
        self.root + self.parent + self.child
    }

    /// Host-side fast lookups
    pub fn lookups(&self) -> usize {
        self.find_by_identifier + self.find_by_text
    }
}

/// Description of a node to insert
#[derive(Debug, Clone)]
pub struct NodeSpec {
    class_name: String,
    identifier: Option<IdSpec>,
    text: Option<String>,
    description: Option<String>,
    bounds: Bounds,
    clickable: bool,
    focusable: bool,
    checkable: bool,
    checked: Option<bool>,
    editable: bool,
    long_clickable: bool,
    visible: bool,
}

#[derive(Debug, Clone)]
enum IdSpec {
    /// Short id, expanded with the tree's namespace
    Short(String),
    /// Full id taken as is
    Full(String),
}

impl NodeSpec {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            identifier: None,
            text: None,
            description: None,
            bounds: Bounds::default(),
            clickable: false,
            focusable: false,
            checkable: false,
            checked: Some(false),
            editable: false,
            long_clickable: false,
            visible: true,
        }
    }

    /// Short identifier, stored as `"<namespace>:id/<id>"`
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.identifier = Some(IdSpec::Short(id.into()));
        self
    }

    /// Full identifier, stored verbatim
    pub fn full_id(mut self, id: impl Into<String>) -> Self {
        self.identifier = Some(IdSpec::Full(id.into()));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn desc(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn bounds(mut self, left: i32, top: i32, right: i32, bottom: i32) -> Self {
        self.bounds = Bounds::new(left, top, right, bottom);
        self
    }

    pub fn clickable(mut self) -> Self {
        self.clickable = true;
        self
    }

    pub fn focusable(mut self) -> Self {
        self.focusable = true;
        self
    }

    pub fn checkable(mut self, checked: Option<bool>) -> Self {
        self.checkable = true;
        self.checked = checked;
        self
    }

    pub fn editable(mut self) -> Self {
        self.editable = true;
        self
    }

    pub fn long_clickable(mut self) -> Self {
        self.long_clickable = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

#[derive(Debug)]
struct Slot {
    attrs: AttributeSnapshot,
    parent: Option<usize>,
    children: Vec<usize>,
    alive: bool,
    expires_at: Option<Timestamp>,
}

/// Arena-based UI tree implementing [`TreeSource`]
#[derive(Debug)]
pub struct MemoryTree {
    namespace: String,
    slots: RefCell<Vec<Slot>>,
    root: Cell<Option<usize>>,
    available: Cell<bool>,
    counts: Cell<CallCounts>,
}

impl MemoryTree {
    /// Create an empty tree for the given application namespace
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            slots: RefCell::new(Vec::new()),
            root: Cell::new(None),
            available: Cell::new(true),
            counts: Cell::new(CallCounts::default()),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Insert a new root, detaching any previous tree
    pub fn set_root(&self, spec: NodeSpec) -> NodeHandle {
        if let Some(old) = self.root.get() {
            self.kill(old);
        }
        let idx = self.insert(spec, None);
        self.root.set(Some(idx));
        NodeHandle(idx as u64)
    }

    /// Append a child to `parent`
    pub fn add_child(&self, parent: NodeHandle, spec: NodeSpec) -> NodeHandle {
        let parent_idx = parent.0 as usize;
        let idx = self.insert(spec, Some(parent_idx));
        if let Some(slot) = self.slots.borrow_mut().get_mut(parent_idx) {
            slot.children.push(idx);
        }
        NodeHandle(idx as u64)
    }

    /// Detach `node` and its subtree; their handles become expired
    pub fn remove(&self, node: NodeHandle) {
        let idx = node.0 as usize;
        let parent = self.slots.borrow().get(idx).and_then(|s| s.parent);
        if let Some(p) = parent {
            if let Some(slot) = self.slots.borrow_mut().get_mut(p) {
                slot.children.retain(|&c| c != idx);
            }
        }
        if self.root.get() == Some(idx) {
            self.root.set(None);
        }
        self.kill(idx);
    }

    /// Edit the attributes of a live node in place
    pub fn update(&self, node: NodeHandle, edit: impl FnOnce(&mut AttributeSnapshot)) {
        if let Some(slot) = self.slots.borrow_mut().get_mut(node.0 as usize) {
            edit(&mut slot.attrs);
        }
    }

    /// Make every call fail with [`SourceError::Unavailable`] while `false`
    pub fn set_available(&self, available: bool) {
        self.available.set(available);
    }

    /// Report `node` as expired from `at` onwards
    pub fn expire_at(&self, node: NodeHandle, at: Timestamp) {
        if let Some(slot) = self.slots.borrow_mut().get_mut(node.0 as usize) {
            slot.expires_at = Some(at);
        }
    }

    /// Calls made so far
    pub fn counts(&self) -> CallCounts {
        self.counts.get()
    }

    pub fn reset_counts(&self) {
        self.counts.set(CallCounts::default());
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.slots.borrow().iter().filter(|s| s.alive).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live handles in pre-order from the root
    pub fn handles(&self) -> Vec<NodeHandle> {
        let slots = self.slots.borrow();
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.root.get().into_iter().collect();
        while let Some(idx) = stack.pop() {
            out.push(NodeHandle(idx as u64));
            stack.extend(slots[idx].children.iter().rev());
        }
        out
    }

    fn insert(&self, spec: NodeSpec, parent: Option<usize>) -> usize {
        let mut attrs = AttributeSnapshot {
            class_name: Some(spec.class_name),
            text: spec.text,
            description: spec.description,
            clickable: spec.clickable,
            focusable: spec.focusable,
            checkable: spec.checkable,
            checked: spec.checked,
            editable: spec.editable,
            long_clickable: spec.long_clickable,
            visible: spec.visible,
            ..Default::default()
        };
        attrs.set_bounds(spec.bounds);
        let identifier = spec.identifier.map(|id| match id {
            IdSpec::Short(short) => format!("{}:id/{}", self.namespace, short),
            IdSpec::Full(full) => full,
        });
        attrs.set_identifier(identifier, Some(self.namespace.clone()));

        let mut slots = self.slots.borrow_mut();
        slots.push(Slot {
            attrs,
            parent,
            children: Vec::new(),
            alive: true,
            expires_at: None,
        });
        slots.len() - 1
    }

    fn kill(&self, idx: usize) {
        let mut slots = self.slots.borrow_mut();
        let mut stack = vec![idx];
        while let Some(i) = stack.pop() {
            if let Some(slot) = slots.get_mut(i) {
                slot.alive = false;
                stack.extend(slot.children.iter().copied());
            }
        }
    }

    fn bump(&self, f: impl FnOnce(&mut CallCounts)) {
        let mut counts = self.counts.get();
        f(&mut counts);
        self.counts.set(counts);
    }

    fn check(&self) -> SourceResult<()> {
        if self.available.get() {
            Ok(())
        } else {
            Err(SourceError::Unavailable)
        }
    }

    fn live(&self, node: NodeHandle) -> SourceResult<usize> {
        let idx = node.0 as usize;
        match self.slots.borrow().get(idx) {
            Some(slot) if slot.alive => Ok(idx),
            _ => Err(SourceError::Expired(node)),
        }
    }

    /// Pre-order walk of `scope`'s subtree (scope included)
    fn collect(&self, scope: usize, mut keep: impl FnMut(&AttributeSnapshot) -> bool) -> Vec<NodeHandle> {
        let slots = self.slots.borrow();
        let mut out = Vec::new();
        let mut stack = vec![scope];
        while let Some(idx) = stack.pop() {
            let slot = &slots[idx];
            if keep(&slot.attrs) {
                out.push(NodeHandle(idx as u64));
            }
            stack.extend(slot.children.iter().rev());
        }
        out
    }
}

impl TreeSource for MemoryTree {
    fn root(&self) -> SourceResult<Option<NodeHandle>> {
        self.bump(|c| c.root += 1);
        self.check()?;
        Ok(self.root.get().map(|idx| NodeHandle(idx as u64)))
    }

    fn parent(&self, node: NodeHandle) -> SourceResult<Option<NodeHandle>> {
        self.bump(|c| c.parent += 1);
        self.check()?;
        let idx = self.live(node)?;
        Ok(self.slots.borrow()[idx].parent.map(|p| NodeHandle(p as u64)))
    }

    fn child(&self, node: NodeHandle, index: usize) -> SourceResult<Option<NodeHandle>> {
        self.bump(|c| c.child += 1);
        self.check()?;
        let idx = self.live(node)?;
        Ok(self.slots.borrow()[idx]
            .children
            .get(index)
            .map(|&c| NodeHandle(c as u64)))
    }

    fn attributes(&self, node: NodeHandle) -> SourceResult<AttributeSnapshot> {
        self.bump(|c| c.attributes += 1);
        self.check()?;
        let idx = self.live(node)?;
        let slots = self.slots.borrow();
        let slot = &slots[idx];
        let mut attrs = slot.attrs.clone();
        attrs.child_count = slot.children.len();
        attrs.index = slot
            .parent
            .and_then(|p| slots[p].children.iter().position(|&c| c == idx))
            .unwrap_or(0);
        let mut depth = 0;
        let mut cursor = slot.parent;
        while let Some(p) = cursor {
            depth += 1;
            cursor = slots[p].parent;
        }
        attrs.depth = depth;
        Ok(attrs)
    }

    fn find_by_identifier(&self, scope: NodeHandle, value: &str) -> SourceResult<Vec<NodeHandle>> {
        self.bump(|c| c.find_by_identifier += 1);
        self.check()?;
        let idx = self.live(scope)?;
        Ok(self.collect(idx, |a| a.identifier.as_deref() == Some(value)))
    }

    fn find_by_text(&self, scope: NodeHandle, value: &str) -> SourceResult<Vec<NodeHandle>> {
        self.bump(|c| c.find_by_text += 1);
        self.check()?;
        let idx = self.live(scope)?;
        let needle = value.to_lowercase();
        Ok(self.collect(idx, |a| {
            [a.text.as_deref(), a.description.as_deref()]
                .into_iter()
                .flatten()
                .any(|s| s.to_lowercase().contains(&needle))
        }))
    }

    fn is_handle_expired(&self, node: NodeHandle, now: Timestamp) -> bool {
        match self.slots.borrow().get(node.0 as usize) {
            Some(slot) => !slot.alive || slot.expires_at.is_some_and(|at| now >= at),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (MemoryTree, NodeHandle, NodeHandle, NodeHandle) {
        let tree = MemoryTree::new("com.app");
        let root = tree.set_root(NodeSpec::new("android.widget.FrameLayout").bounds(0, 0, 100, 100));
        let a = tree.add_child(root, NodeSpec::new("android.widget.Button").id("ok").text("OK"));
        let b = tree.add_child(root, NodeSpec::new("android.widget.TextView").text("ok later"));
        (tree, root, a, b)
    }

    #[test]
    fn test_structure() {
        let (tree, root, a, b) = sample();
        assert_eq!(tree.root().unwrap(), Some(root));
        assert_eq!(tree.child(root, 0).unwrap(), Some(a));
        assert_eq!(tree.child(root, 1).unwrap(), Some(b));
        assert_eq!(tree.child(root, 2).unwrap(), None);
        assert_eq!(tree.parent(b).unwrap(), Some(root));
        assert_eq!(tree.parent(root).unwrap(), None);
        assert_eq!(tree.handles(), vec![root, a, b]);
    }

    #[test]
    fn test_attributes_structural_fields() {
        let (tree, root, _, b) = sample();
        let attrs = tree.attributes(b).unwrap();
        assert_eq!(attrs.index, 1);
        assert_eq!(attrs.depth, 1);
        assert_eq!(tree.attributes(root).unwrap().child_count, 2);
    }

    #[test]
    fn test_identifier_expansion() {
        let (tree, _, a, _) = sample();
        let attrs = tree.attributes(a).unwrap();
        assert_eq!(attrs.identifier.as_deref(), Some("com.app:id/ok"));
        assert_eq!(attrs.secondary_identifier.as_deref(), Some("ok"));
    }

    #[test]
    fn test_find_by_text_is_case_insensitive_substring() {
        let (tree, root, a, b) = sample();
        assert_eq!(tree.find_by_text(root, "ok").unwrap(), vec![a, b]);
        assert_eq!(tree.find_by_identifier(root, "com.app:id/ok").unwrap(), vec![a]);
        assert_eq!(tree.counts().lookups(), 2);
    }

    #[test]
    fn test_unavailable() {
        let (tree, root, _, _) = sample();
        tree.set_available(false);
        assert_eq!(tree.root(), Err(SourceError::Unavailable));
        assert_eq!(tree.child(root, 0), Err(SourceError::Unavailable));
        tree.set_available(true);
        assert!(tree.root().is_ok());
    }

    #[test]
    fn test_remove_expires_subtree() {
        let (tree, root, a, _) = sample();
        tree.remove(a);
        assert_eq!(tree.attributes(a), Err(SourceError::Expired(a)));
        assert!(tree.is_handle_expired(a, 0));
        assert_eq!(tree.attributes(root).unwrap().child_count, 1);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_expire_at() {
        let (tree, _, a, _) = sample();
        tree.expire_at(a, 500);
        assert!(!tree.is_handle_expired(a, 499));
        assert!(tree.is_handle_expired(a, 500));
    }

    #[test]
    fn test_counts() {
        let (tree, root, _, _) = sample();
        tree.root().unwrap();
        tree.child(root, 0).unwrap();
        tree.parent(root).unwrap();
        assert_eq!(tree.counts().structural(), 3);
        tree.reset_counts();
        assert_eq!(tree.counts(), CallCounts::default());
    }
}
