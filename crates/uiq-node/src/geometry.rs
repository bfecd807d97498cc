//! Screen Geometry
//!
//! Integer screen-space rectangles as reported by the host.

use serde::{Deserialize, Serialize};

/// Screen point in pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Node bounds in screen coordinates.
///
/// Hosts are allowed to report degenerate rectangles (`left > right` or
/// `top > bottom`); those have no positive area and never take part in
/// positional queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    /// Create from edges
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Area in square pixels, zero or negative for degenerate bounds
    pub fn area(&self) -> i64 {
        self.width() as i64 * self.height() as i64
    }

    /// True when the rectangle encloses no pixels
    pub fn is_degenerate(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    /// Check if point is inside (edges inclusive)
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.left && x <= self.right && y >= self.top && y <= self.bottom
    }

    /// Center point, rounded toward the top-left
    pub fn center(&self) -> Point {
        Point::new(
            self.left + self.width() / 2,
            self.top + self.height() / 2,
        )
    }
}
