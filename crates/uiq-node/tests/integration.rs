//! Integration tests for the uiq node model

use std::rc::Rc;

use uiq_node::{
    AttrKind, AttrValue, AttributeSnapshot, Bounds, MemoryTree, NodeHandle, NodeSpec, SourceError, TreeSource,
};

fn walk(source: &dyn TreeSource, node: NodeHandle, out: &mut Vec<String>) {
    let attrs = source.attributes(node).unwrap();
    out.push(attrs.short_class_name().unwrap_or("*").to_string());
    let mut index = 0;
    while let Some(child) = source.child(node, index).unwrap() {
        walk(source, child, out);
        index += 1;
    }
}

#[test]
fn test_source_through_pointers() {
    let tree = MemoryTree::new("com.app");
    let root = tree.set_root(NodeSpec::new("android.widget.FrameLayout"));
    let list = tree.add_child(root, NodeSpec::new("android.widget.ListView"));
    tree.add_child(list, NodeSpec::new("android.widget.TextView").text("a"));
    tree.add_child(root, NodeSpec::new("android.widget.Button"));

    let expected = vec!["FrameLayout", "ListView", "TextView", "Button"];

    let mut by_ref = Vec::new();
    walk(&&tree, root, &mut by_ref);
    assert_eq!(by_ref, expected);

    let shared = Rc::new(tree);
    let mut by_rc = Vec::new();
    walk(&shared.clone(), root, &mut by_rc);
    assert_eq!(by_rc, expected);
    assert_eq!(shared.handles().len(), 4);
}

#[test]
fn test_boxed_source_reports_expiry() {
    let tree = MemoryTree::new("com.app");
    let root = tree.set_root(NodeSpec::new("Frame"));
    let child = tree.add_child(root, NodeSpec::new("View"));
    let boxed: Box<MemoryTree> = Box::new(tree);

    assert!(!boxed.is_handle_expired(child, 0));
    boxed.expire_at(child, 100);
    assert!(!boxed.is_handle_expired(child, 99));
    assert!(boxed.is_handle_expired(child, 100));

    boxed.remove(child);
    assert_eq!(boxed.attributes(child), Err(SourceError::Expired(child)));
    assert_eq!(boxed.child(root, 0), Ok(None));
}

#[test]
fn test_lookups_include_scope() {
    let tree = MemoryTree::new("com.app");
    let root = tree.set_root(NodeSpec::new("Frame").text("Settings"));
    let item = tree.add_child(root, NodeSpec::new("TextView").text("settings and privacy"));
    let other = tree.add_child(root, NodeSpec::new("TextView").full_id("android:id/title"));

    assert_eq!(tree.find_by_text(root, "SETTINGS"), Ok(vec![root, item]));
    assert_eq!(tree.find_by_text(item, "settings"), Ok(vec![item]));
    assert_eq!(tree.find_by_identifier(root, "android:id/title"), Ok(vec![other]));
    assert_eq!(tree.find_by_identifier(root, "com.app:id/title"), Ok(vec![]));
    assert_eq!(tree.counts().lookups(), 4);
}

#[test]
fn test_snapshot_json_field_names() {
    let tree = MemoryTree::new("com.app");
    let root = tree.set_root(NodeSpec::new("Frame"));
    let button = tree.add_child(
        root,
        NodeSpec::new("android.widget.Button").id("ok").desc("Confirm").bounds(10, 20, 110, 70).clickable(),
    );
    let attrs = tree.attributes(button).unwrap();

    let json = serde_json::to_value(&attrs).unwrap();
    assert_eq!(json["id"], "com.app:id/ok");
    assert_eq!(json["vid"], "ok");
    assert_eq!(json["name"], "android.widget.Button");
    assert_eq!(json["desc"], "Confirm");
    assert_eq!(json["visibleToUser"], true);
    assert_eq!(json["longClickable"], false);
    assert_eq!(json["width"], 100);
    assert_eq!(json["index"], 0);
    assert_eq!(json["depth"], 1);

    let back: AttributeSnapshot = serde_json::from_value(json).unwrap();
    assert_eq!(back, attrs);
    assert_eq!(back.bounds(), Bounds::new(10, 20, 110, 70));
}

#[test]
fn test_attribute_dispatch() {
    let tree = MemoryTree::new("com.app");
    let root = tree.set_root(NodeSpec::new("Frame"));
    let check = tree.add_child(root, NodeSpec::new("CheckBox").checkable(None).text("Remember me"));
    let attrs = tree.attributes(check).unwrap();

    assert!(matches!(attrs.get(AttrKind::Text), AttrValue::Str("Remember me")));
    assert!(matches!(attrs.get(AttrKind::Checkable), AttrValue::Bool(true)));
    assert!(attrs.get(AttrKind::Checked).is_null());
    assert!(attrs.get(AttrKind::Id).is_null());
}
