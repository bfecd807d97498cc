//! Attribute Snapshot
//!
//! Read-only attributes taken from one handle at one instant, and the closed
//! set of attribute kinds selectors can address.

use serde::{Deserialize, Serialize};

use crate::geometry::Bounds;

/// Immutable attribute record for one node.
///
/// Serialized field names follow the selector attribute names (`id`, `vid`,
/// `name`, `desc`, ...), so a serialized record can be read side by side with
/// the selectors that address it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeSnapshot {
    /// Full resource identifier, e.g. `com.app:id/submit`
    #[serde(rename = "id")]
    pub identifier: Option<String>,
    /// Short identifier with the namespace prefix removed, e.g. `submit`
    #[serde(rename = "vid")]
    pub secondary_identifier: Option<String>,
    /// Owning application namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(rename = "name")]
    pub class_name: Option<String>,
    pub text: Option<String>,
    #[serde(rename = "desc")]
    pub description: Option<String>,

    pub clickable: bool,
    pub focusable: bool,
    pub checkable: bool,
    /// `None` when the host reports a partial or unknown state
    pub checked: Option<bool>,
    pub editable: bool,
    pub long_clickable: bool,
    #[serde(rename = "visibleToUser")]
    pub visible: bool,

    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub width: i32,
    pub height: i32,

    pub child_count: usize,
    pub index: usize,
    pub depth: usize,
}

impl AttributeSnapshot {
    /// Bounds as a rectangle
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.left, self.top, self.right, self.bottom)
    }

    /// Set the geometry fields, keeping `width`/`height` consistent
    pub fn set_bounds(&mut self, bounds: Bounds) {
        self.left = bounds.left;
        self.top = bounds.top;
        self.right = bounds.right;
        self.bottom = bounds.bottom;
        self.width = bounds.width();
        self.height = bounds.height();
    }

    /// Set the identifier and derive the short form from the namespace
    pub fn set_identifier(&mut self, identifier: Option<String>, namespace: Option<String>) {
        self.secondary_identifier = match (&identifier, &namespace) {
            (Some(id), Some(ns)) => short_identifier(id, ns).map(str::to_string),
            _ => None,
        };
        self.identifier = identifier;
        self.namespace = namespace;
    }

    /// True when the node carries text (drives the short cache TTL)
    pub fn has_text(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Text, if non-empty and at most `max` characters
    pub fn short_text(&self, max: usize) -> Option<&str> {
        short(self.text.as_deref(), max)
    }

    /// Description, if non-empty and at most `max` characters
    pub fn short_description(&self, max: usize) -> Option<&str> {
        short(self.description.as_deref(), max)
    }

    /// Non-empty secondary identifier
    pub fn vid(&self) -> Option<&str> {
        non_empty(self.secondary_identifier.as_deref())
    }

    /// Whether the node has any attribute a human could use to find it again
    pub fn is_identifiable(&self, max: usize) -> bool {
        self.vid().is_some()
            || non_empty(self.identifier.as_deref()).is_some()
            || self.short_text(max).is_some()
            || self.short_description(max).is_some()
    }

    /// Class name without its package, e.g. `Button` for `android.widget.Button`
    pub fn short_class_name(&self) -> Option<&str> {
        let name = non_empty(self.class_name.as_deref())?;
        Some(name.rsplit('.').next().unwrap_or(name))
    }

    /// Read one attribute by kind.
    ///
    /// `Index` and `Depth` report the stored fields; callers with access to
    /// the tree resolve those structurally instead.
    pub fn get(&self, kind: AttrKind) -> AttrValue<'_> {
        match kind {
            AttrKind::Id => AttrValue::from_str_opt(self.identifier.as_deref()),
            AttrKind::Vid => AttrValue::from_str_opt(self.secondary_identifier.as_deref()),
            AttrKind::Name => AttrValue::from_str_opt(self.class_name.as_deref()),
            AttrKind::Text => AttrValue::from_str_opt(self.text.as_deref()),
            AttrKind::Desc => AttrValue::from_str_opt(self.description.as_deref()),

            AttrKind::Clickable => AttrValue::Bool(self.clickable),
            AttrKind::Focusable => AttrValue::Bool(self.focusable),
            AttrKind::Checkable => AttrValue::Bool(self.checkable),
            AttrKind::Checked => self.checked.map_or(AttrValue::Null, AttrValue::Bool),
            AttrKind::Editable => AttrValue::Bool(self.editable),
            AttrKind::LongClickable => AttrValue::Bool(self.long_clickable),
            AttrKind::VisibleToUser => AttrValue::Bool(self.visible),

            AttrKind::Left => AttrValue::Int(self.left as i64),
            AttrKind::Top => AttrValue::Int(self.top as i64),
            AttrKind::Right => AttrValue::Int(self.right as i64),
            AttrKind::Bottom => AttrValue::Int(self.bottom as i64),
            AttrKind::Width => AttrValue::Int(self.width as i64),
            AttrKind::Height => AttrValue::Int(self.height as i64),

            AttrKind::Index => AttrValue::Int(self.index as i64),
            AttrKind::Depth => AttrValue::Int(self.depth as i64),
            AttrKind::ChildCount => AttrValue::Int(self.child_count as i64),
        }
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

fn short(s: Option<&str>, max: usize) -> Option<&str> {
    non_empty(s).filter(|s| s.chars().count() <= max)
}

/// Strip `"<namespace>:id/"` from a full identifier.
pub fn short_identifier<'a>(identifier: &'a str, namespace: &str) -> Option<&'a str> {
    identifier
        .strip_prefix(namespace)
        .and_then(|rest| rest.strip_prefix(":id/"))
}

/// Attribute addressable from a selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrKind {
    Id,
    Vid,
    Name,
    Text,
    Desc,

    Clickable,
    Focusable,
    Checkable,
    Checked,
    Editable,
    LongClickable,
    VisibleToUser,

    Left,
    Top,
    Right,
    Bottom,
    Width,
    Height,

    Index,
    Depth,
    ChildCount,
}

impl AttrKind {
    pub const ALL: [AttrKind; 21] = [
        Self::Id,
        Self::Vid,
        Self::Name,
        Self::Text,
        Self::Desc,
        Self::Clickable,
        Self::Focusable,
        Self::Checkable,
        Self::Checked,
        Self::Editable,
        Self::LongClickable,
        Self::VisibleToUser,
        Self::Left,
        Self::Top,
        Self::Right,
        Self::Bottom,
        Self::Width,
        Self::Height,
        Self::Index,
        Self::Depth,
        Self::ChildCount,
    ];

    /// Parse from a selector attribute name
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "id" => Self::Id,
            "vid" => Self::Vid,
            "name" => Self::Name,
            "text" => Self::Text,
            "desc" => Self::Desc,
            "clickable" => Self::Clickable,
            "focusable" => Self::Focusable,
            "checkable" => Self::Checkable,
            "checked" => Self::Checked,
            "editable" => Self::Editable,
            "longClickable" => Self::LongClickable,
            "visibleToUser" => Self::VisibleToUser,
            "left" => Self::Left,
            "top" => Self::Top,
            "right" => Self::Right,
            "bottom" => Self::Bottom,
            "width" => Self::Width,
            "height" => Self::Height,
            "index" => Self::Index,
            "depth" => Self::Depth,
            "childCount" => Self::ChildCount,
            _ => return None,
        })
    }

    /// Selector attribute name
    pub fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Vid => "vid",
            Self::Name => "name",
            Self::Text => "text",
            Self::Desc => "desc",
            Self::Clickable => "clickable",
            Self::Focusable => "focusable",
            Self::Checkable => "checkable",
            Self::Checked => "checked",
            Self::Editable => "editable",
            Self::LongClickable => "longClickable",
            Self::VisibleToUser => "visibleToUser",
            Self::Left => "left",
            Self::Top => "top",
            Self::Right => "right",
            Self::Bottom => "bottom",
            Self::Width => "width",
            Self::Height => "height",
            Self::Index => "index",
            Self::Depth => "depth",
            Self::ChildCount => "childCount",
        }
    }

    /// Kinds whose value depends on the node's position in the tree
    pub fn is_structural(self) -> bool {
        matches!(self, Self::Index | Self::Depth)
    }
}

/// Attribute value borrowed from a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrValue<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Str(&'a str),
}

impl<'a> AttrValue<'a> {
    fn from_str_opt(s: Option<&'a str>) -> Self {
        s.map_or(AttrValue::Null, AttrValue::Str)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }
}
