//! Selector Synthesizer
//!
//! Builds a selector a human can read back for a node: its short class name,
//! the best single discriminator, anchored on the nearest close ancestor that
//! has a discriminator of its own.

use uiq_node::{AttrKind, AttributeSnapshot};
use uiq_selector::{is_valid_name, Connective, Predicate, Relation, Segment, Selector};

/// First usable of `vid`, short `text`, short `desc`
fn discriminator(attrs: &AttributeSnapshot, max: usize) -> Option<Predicate> {
    if let Some(vid) = attrs.vid() {
        return Some(Predicate::equals(AttrKind::Vid, vid));
    }
    if let Some(text) = attrs.short_text(max) {
        return Some(Predicate::equals(AttrKind::Text, text));
    }
    attrs.short_description(max).map(|desc| Predicate::equals(AttrKind::Desc, desc))
}

/// Class names the parser cannot read back become `*`
fn class_segment(attrs: &AttributeSnapshot) -> Segment {
    match attrs.short_class_name() {
        Some(name) if is_valid_name(name) => Segment::named(name),
        _ => Segment::any(),
    }
}

fn node_segment(attrs: &AttributeSnapshot, max: usize) -> Segment {
    let mut segment = class_segment(attrs);
    if let Some(predicate) = discriminator(attrs, max) {
        segment = segment.with(predicate);
    }
    if attrs.clickable {
        segment = segment.with(Predicate::equals(AttrKind::Clickable, true));
    }
    segment
}

/// Selector for `node` given its ancestors, nearest first.
///
/// The first ancestor with a discriminator anchors the selector and the
/// ancestors between it and the node are kept as class-only segments. With no
/// such ancestor the node's own segment is returned.
pub fn synthesize(node: &AttributeSnapshot, ancestors: &[AttributeSnapshot], short_text_max: usize) -> String {
    let target = node_segment(node, short_text_max);

    for (i, ancestor) in ancestors.iter().enumerate() {
        let Some(predicate) = discriminator(ancestor, short_text_max) else {
            continue;
        };
        let mut selector = Selector::single(class_segment(ancestor).with(predicate));
        for between in ancestors[..i].iter().rev() {
            selector = selector.then(Connective::new(Relation::Ancestor), class_segment(between));
        }
        return selector
            .then(Connective::new(Relation::Ancestor), target)
            .to_string();
    }

    Selector::single(target).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(class: &str) -> AttributeSnapshot {
        AttributeSnapshot { class_name: Some(class.to_string()), ..Default::default() }
    }

    #[test]
    fn test_discriminator_priority() {
        let mut node = attrs("android.widget.Button");
        node.text = Some("OK".into());
        node.description = Some("confirm".into());
        node.clickable = true;
        assert_eq!(synthesize(&node, &[], 20), "Button[text='OK'][clickable=true]");

        node.set_identifier(Some("com.app:id/ok".into()), Some("com.app".into()));
        assert_eq!(synthesize(&node, &[], 20), "Button[vid='ok'][clickable=true]");
    }

    #[test]
    fn test_long_text_falls_back_to_desc() {
        let mut node = attrs("android.widget.TextView");
        node.text = Some("a".repeat(21));
        node.description = Some("summary".into());
        assert_eq!(synthesize(&node, &[], 20), "TextView[desc='summary']");
    }

    #[test]
    fn test_quotes_escaped() {
        let mut node = attrs("TextView");
        node.text = Some("Don't".into());
        assert_eq!(synthesize(&node, &[], 20), r"TextView[text='Don\'t']");
    }

    #[test]
    fn test_anchors_on_identifiable_ancestor() {
        let node = attrs("android.widget.ImageView");
        let parent = attrs("android.widget.LinearLayout");
        let mut grandparent = attrs("android.widget.FrameLayout");
        grandparent.set_identifier(Some("com.app:id/card".into()), Some("com.app".into()));

        assert_eq!(
            synthesize(&node, &[parent.clone(), grandparent], 20),
            "FrameLayout[vid='card'] > LinearLayout > ImageView"
        );
        assert_eq!(synthesize(&node, &[parent], 20), "ImageView");
    }

    #[test]
    fn test_missing_class() {
        let node = AttributeSnapshot { clickable: true, ..Default::default() };
        assert_eq!(synthesize(&node, &[], 20), "*[clickable=true]");
    }

    #[test]
    fn test_unparseable_class_becomes_any() {
        let mut node = attrs("com.app.Outer$Inner-1");
        node.text = Some("Go".into());
        let mut parent = attrs("com.app.Card View");
        parent.set_identifier(Some("com.app:id/card".into()), Some("com.app".into()));

        let out = synthesize(&node, &[parent], 20);
        assert_eq!(out, "*[vid='card'] > *[text='Go']");
        assert!(out.parse::<Selector>().is_ok());

        let inner = attrs("com.app.Outer$Inner_1");
        assert_eq!(synthesize(&inner, &[], 20), "Outer$Inner_1");
    }

    #[test]
    fn test_synthesized_selectors_parse_back() {
        let mut node = attrs("android.widget.CheckBox");
        node.description = Some("a [b] > c".into());
        node.clickable = true;
        let out = synthesize(&node, &[attrs("Row"), attrs("")], 20);
        let parsed: Selector = out.parse().unwrap();
        assert_eq!(parsed.to_string(), out);
    }
}
