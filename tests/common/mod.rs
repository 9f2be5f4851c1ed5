#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{json, Value};

use liveflow::collaborators::in_memory::{
    InMemoryEntityRegistry, InMemoryFlowRegistry, InMemoryPlayerStore, InMemoryTemplateRegistry,
    RecordingBackend,
};
use liveflow::{EngineConfig, FlowDefinition, FlowEngine, Node, OpTag, StatTemplate};

/// Engine wired to in-memory collaborators the test can inspect.
pub struct Harness {
    pub engine: FlowEngine,
    pub player: Arc<InMemoryPlayerStore>,
    pub entities: Arc<InMemoryEntityRegistry>,
    pub backend: Arc<RecordingBackend>,
    pub flows: Arc<InMemoryFlowRegistry>,
}

pub struct HarnessBuilder {
    config: EngineConfig,
    player: InMemoryPlayerStore,
    templates: Vec<StatTemplate>,
    entities: InMemoryEntityRegistry,
    backend: RecordingBackend,
    flows: Vec<FlowDefinition>,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            player: InMemoryPlayerStore::new(),
            templates: Vec::new(),
            entities: InMemoryEntityRegistry::new(),
            backend: RecordingBackend::new(),
            flows: Vec::new(),
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn player(mut self, player: InMemoryPlayerStore) -> Self {
        self.player = player;
        self
    }

    pub fn templates(mut self, templates: Vec<StatTemplate>) -> Self {
        self.templates = templates;
        self
    }

    pub fn entities(mut self, entities: InMemoryEntityRegistry) -> Self {
        self.entities = entities;
        self
    }

    pub fn failing_backend(mut self) -> Self {
        self.backend = RecordingBackend::failing();
        self
    }

    pub fn flow(mut self, flow: FlowDefinition) -> Self {
        self.flows.push(flow);
        self
    }

    pub fn build(self) -> Harness {
        let player = Arc::new(self.player);
        let entities = Arc::new(self.entities);
        let backend = Arc::new(self.backend);
        let flows = Arc::new(InMemoryFlowRegistry::new(self.flows));
        let engine = FlowEngine::builder()
            .config(self.config)
            .player_store(player.clone())
            .template_registry(Arc::new(InMemoryTemplateRegistry::new(self.templates)))
            .entity_registry(entities.clone())
            .backend(backend.clone())
            .flow_registry(flows.clone())
            .build();
        Harness {
            engine,
            player,
            entities,
            backend,
            flows,
        }
    }
}

/// Let fire-and-forget backend tasks run.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

pub fn lit(value: Value) -> Value {
    json!({ "value": value, "isLiteral": true })
}

pub fn previous() -> Value {
    json!({ "value": "$previous" })
}

pub fn add(slot: &str, a: f64, b: f64) -> Node {
    Node::new(OpTag::Add, slot)
        .with_param("value1", lit(json!(a)))
        .with_param("value2", lit(json!(b)))
}

/// `ops_set_variable` storing the previous result as local `name`.
pub fn save(slot: &str, name: &str) -> Node {
    Node::new(OpTag::SetVariable, slot)
        .with_param("name", name)
        .with_param("value", previous())
}

pub fn set_literal(slot: &str, name: &str, value: Value) -> Node {
    Node::new(OpTag::SetVariable, slot)
        .with_param("name", name)
        .with_param("value", lit(value))
}

pub fn session_flow(id: &str, children: Vec<Node>) -> FlowDefinition {
    FlowDefinition::new(
        id,
        Node::new(OpTag::SessionStart, "root").with_children(children),
    )
}
