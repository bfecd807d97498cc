//! Comprehensive tests for uiq-selector
//!
//! Builder and parser agreement, predicate semantics on real snapshots.

use uiq_cache::{FastQuery, OffsetRange};
use uiq_node::{AttrKind, AttributeSnapshot};
use uiq_selector::{Connective, Literal, Operator, Predicate, Relation, Segment, Selector};

#[test]
fn test_builder_matches_parser() {
    let built = Selector::single(Segment::named("RecyclerView"))
        .then(
            Connective::with_window(Relation::Child, OffsetRange::exact(0)),
            Segment::named("LinearLayout"),
        )
        .then(
            Connective::new(Relation::Ancestor),
            Segment::named("TextView").with(Predicate::equals(AttrKind::Text, "Inbox")),
        );
    let parsed: Selector = "RecyclerView <1 LinearLayout > TextView[text='Inbox']".parse().unwrap();
    assert_eq!(built, parsed);
}

#[test]
fn test_predicates_against_snapshot() {
    let mut attrs = AttributeSnapshot {
        class_name: Some("android.widget.Button".into()),
        text: Some("Send now".into()),
        clickable: true,
        ..Default::default()
    };
    attrs.set_identifier(Some("com.mail:id/send".into()), Some("com.mail".into()));

    let sel: Selector = "Button[vid='send'][text*='now'][clickable=true][width>=0]".parse().unwrap();
    let target = sel.target();
    assert!(target.matches_name(attrs.class_name.as_deref()));
    for predicate in &target.predicates {
        assert!(predicate.test(attrs.get(predicate.attr)), "{} failed", predicate);
    }
}

#[test]
fn test_fast_query_prefers_first_indexable_predicate() {
    let sel: Selector = "*[clickable=true][text^='Sub'][id='com.app:id/x']".parse().unwrap();
    assert_eq!(sel.fast_query(), Some(FastQuery::Text("Sub".into())));

    let none: Selector = "*[text!='Sub']".parse().unwrap();
    assert_eq!(none.fast_query(), None);
}

#[test]
fn test_checked_tristate() {
    let unknown = AttributeSnapshot { checked: None, ..Default::default() };
    let unchecked = AttributeSnapshot { checked: Some(false), ..Default::default() };
    let is_null = Predicate::new(AttrKind::Checked, Operator::Eq, Literal::Null).unwrap();
    assert!(is_null.test(unknown.get(AttrKind::Checked)));
    assert!(!is_null.test(unchecked.get(AttrKind::Checked)));
}

#[test]
fn test_unicode_names_and_literals() {
    let sel: Selector = "按钮[text='确定']".parse().unwrap();
    assert_eq!(sel.target().name.as_deref(), Some("按钮"));
    assert_eq!(sel.target().predicates[0].literal, Literal::Str("确定".into()));
    assert_eq!(sel.to_string(), "按钮[text='确定']");
}
