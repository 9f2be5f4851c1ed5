use std::sync::Arc;

use serde_json::json;
use tokio::runtime::Runtime;

use liveflow::collaborators::in_memory::{InMemoryPlayerStore, InMemoryTemplateRegistry};
use liveflow::{FlowDefinition, FlowEngine, Node, OpTag, StatTemplate};

pub fn bench_runtime() -> Runtime {
    Runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build runtime")
}

pub fn bench_engine() -> FlowEngine {
    FlowEngine::builder()
        .player_store(Arc::new(
            InMemoryPlayerStore::new().with_stat("gold", json!(100)),
        ))
        .template_registry(Arc::new(InMemoryTemplateRegistry::new(vec![
            StatTemplate::number("gold"),
        ])))
        .build()
}

/// Chain of `nodes` additions, each feeding the next through `$previous`.
pub fn build_linear_flow(nodes: usize) -> FlowDefinition {
    let mut tail: Option<Node> = None;
    for i in (0..nodes).rev() {
        let mut node = Node::new(OpTag::Add, format!("add{}", i))
            .with_param("value1", json!({"value": "$previous"}))
            .with_param("value2", json!({"value": 1, "isLiteral": true}));
        if let Some(child) = tail.take() {
            node = node.with_child(child);
        }
        tail = Some(node);
    }
    let root = Node::new(OpTag::SessionStart, "root");
    FlowDefinition::new(
        "linear",
        match tail {
            Some(chain) => root.with_child(chain),
            None => root,
        },
    )
}

/// `depth` nested branches on the `gold` stat.
pub fn build_branch_chain(depth: usize) -> FlowDefinition {
    let mut tail: Option<Node> = None;
    for i in (0..depth).rev() {
        let mut node = Node::new(OpTag::Branch, format!("b{}", i)).with_param(
            "conditions",
            json!([{
                "value1": {"value": "gold", "type": "number"},
                "value2": {"value": i, "isLiteral": true},
                "operator": ">="
            }]),
        );
        if let Some(child) = tail.take() {
            node = node.with_child(child);
        }
        tail = Some(node);
    }
    let root = Node::new(OpTag::SessionStart, "root");
    FlowDefinition::new(
        "branches",
        match tail {
            Some(chain) => root.with_child(chain),
            None => root,
        },
    )
}

/// `width` sibling variable writes under one root.
pub fn build_fanout_flow(width: usize) -> FlowDefinition {
    let children = (0..width).map(|i| {
        Node::new(OpTag::SetVariable, format!("set{}", i))
            .with_param("name", format!("v{}", i))
            .with_param("value", json!({"value": i, "isLiteral": true}))
    });
    FlowDefinition::new(
        "fanout",
        Node::new(OpTag::SessionStart, "root").with_children(children),
    )
}
