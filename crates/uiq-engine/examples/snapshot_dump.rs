//! Example: snapshot, resolve and inspect a small in-memory screen
//!
//! Run with `RUST_LOG=debug` to see cache and traversal events.

use tracing_subscriber::EnvFilter;
use uiq_engine::node::{MemoryTree, NodeSpec};
use uiq_engine::{Engine, EngineConfig};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let tree = MemoryTree::new("com.example.notes");
    let root = tree.set_root(NodeSpec::new("android.widget.FrameLayout").bounds(0, 0, 1080, 1920));
    let bar = tree.add_child(
        root,
        NodeSpec::new("android.widget.LinearLayout").id("action_bar").bounds(0, 0, 1080, 160),
    );
    tree.add_child(bar, NodeSpec::new("android.widget.TextView").text("Notes").bounds(40, 40, 400, 120));
    let list = tree.add_child(
        root,
        NodeSpec::new("android.widget.ListView").id("notes").bounds(0, 160, 1080, 1920),
    );
    for (i, title) in ["Groceries", "Call back Sam", "Ideas"].into_iter().enumerate() {
        let top = 160 + i as i32 * 180;
        let item = tree.add_child(
            list,
            NodeSpec::new("android.widget.RelativeLayout").clickable().bounds(0, top, 1080, top + 180),
        );
        tree.add_child(item, NodeSpec::new("android.widget.TextView").text(title).bounds(40, top + 30, 800, top + 150));
        tree.add_child(
            item,
            NodeSpec::new("android.widget.CheckBox").checkable(Some(i == 0)).clickable().bounds(900, top + 50, 1000, top + 130),
        );
    }

    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };
    let engine = Engine::with_config(tree, config);
    println!("uiq engine v{}", uiq_engine::VERSION);

    let records = engine.snapshot(root);
    println!("{}", serde_json::to_string_pretty(&records)?);

    let (x, y) = (950, 450);
    for detail in engine.describe_at(x, y, engine.config().candidate_limit) {
        println!("at ({}, {}): {}", x, y, detail.selector);
    }

    if let Some(checkbox) = engine.query(root, "TextView[text='Groceries'] + CheckBox")? {
        println!("checkbox: {:?}", engine.synthesize_selector(checkbox));
    }

    let stats = engine.cache_stats();
    println!("cache: {} hits, {} misses, hit rate {:.2}", stats.hits, stats.misses, stats.hit_rate());
    Ok(())
}
