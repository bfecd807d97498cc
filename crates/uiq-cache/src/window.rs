//! Offset windows for connective traversals

/// Inclusive `(min, max)` window over traversal offsets, both bounds optional.
///
/// Offset 0 is the nearest node in the traversal direction (the parent, the
/// adjacent sibling, the first child, the first descendant).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct OffsetRange {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl OffsetRange {
    /// Every offset
    pub const ANY: OffsetRange = OffsetRange { min: None, max: None };

    /// Only the nearest node
    pub const NEAREST: OffsetRange = OffsetRange { min: Some(0), max: Some(0) };

    pub const fn exact(offset: usize) -> Self {
        Self { min: Some(offset), max: Some(offset) }
    }

    pub const fn between(min: usize, max: usize) -> Self {
        Self { min: Some(min), max: Some(max) }
    }

    pub const fn at_least(min: usize) -> Self {
        Self { min: Some(min), max: None }
    }

    pub const fn at_most(max: usize) -> Self {
        Self { min: None, max: Some(max) }
    }

    /// Check whether `offset` lies in the window
    #[inline]
    pub fn accepts(&self, offset: usize) -> bool {
        self.min.is_none_or(|min| offset >= min) && self.max.is_none_or(|max| offset <= max)
    }

    /// True once `offset` is beyond the upper bound, so iteration can stop
    #[inline]
    pub fn is_past(&self, offset: usize) -> bool {
        self.max.is_some_and(|max| offset > max)
    }
}
