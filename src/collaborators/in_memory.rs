//! In-memory collaborators.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use super::{
    BackendAction, BackendActionSender, EntityRegistry, FlowRegistry, OfferSnapshot, PlayerStore,
    RandomSource, StatTemplate, TemplateRegistry,
};
use crate::error::{NodeError, NodeResult};
use crate::flow::FlowDefinition;

// ================================
// Player store
// ================================

#[derive(Debug, Default)]
pub struct InMemoryPlayerStore {
    segments: RwLock<Vec<String>>,
    stats: RwLock<HashMap<String, Value>>,
    entered_flows: Mutex<Vec<String>>,
}

impl InMemoryPlayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_segments(self, segments: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.segments
            .write()
            .extend(segments.into_iter().map(Into::into));
        self
    }

    pub fn with_stat(self, internal_id: impl Into<String>, value: Value) -> Self {
        self.stats.write().insert(internal_id.into(), value);
        self
    }

    /// Flows reported through `on_flow_entered`, in call order.
    pub fn entered_flows(&self) -> Vec<String> {
        self.entered_flows.lock().clone()
    }

    fn numeric_stat(&self, internal_id: &str) -> f64 {
        self.stats
            .read()
            .get(internal_id)
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
    }
}

impl PlayerStore for InMemoryPlayerStore {
    fn segments(&self) -> Vec<String> {
        self.segments.read().clone()
    }

    fn has_segment(&self, segment_id: &str) -> bool {
        self.segments.read().iter().any(|s| s == segment_id)
    }

    fn add_segment(&self, segment_id: &str) {
        let mut segments = self.segments.write();
        if !segments.iter().any(|s| s == segment_id) {
            segments.push(segment_id.to_string());
        }
    }

    fn remove_segment(&self, segment_id: &str) {
        self.segments.write().retain(|s| s != segment_id);
    }

    fn stat_value(&self, internal_id: &str) -> Option<Value> {
        self.stats.read().get(internal_id).cloned()
    }

    fn set_stat_value(&self, internal_id: &str, value: Value) {
        self.stats.write().insert(internal_id.to_string(), value);
    }

    fn add_to_stat(&self, internal_id: &str, amount: f64) {
        let next = self.numeric_stat(internal_id) + amount;
        self.stats
            .write()
            .insert(internal_id.to_string(), crate::value::number_to_value(next));
    }

    fn subtract_from_stat(&self, internal_id: &str, amount: f64) {
        self.add_to_stat(internal_id, -amount);
    }

    fn on_flow_entered(&self, flow_id: &str) {
        self.entered_flows.lock().push(flow_id.to_string());
    }
}

// ================================
// Templates
// ================================

#[derive(Debug, Default)]
pub struct InMemoryTemplateRegistry {
    templates: RwLock<Vec<StatTemplate>>,
}

impl InMemoryTemplateRegistry {
    pub fn new(templates: Vec<StatTemplate>) -> Self {
        Self {
            templates: RwLock::new(templates),
        }
    }
}

impl TemplateRegistry for InMemoryTemplateRegistry {
    fn template_by_internal_id(&self, internal_id: &str) -> Option<StatTemplate> {
        self.templates
            .read()
            .iter()
            .find(|t| t.internal_id == internal_id)
            .cloned()
    }

    fn templates(&self) -> Vec<StatTemplate> {
        self.templates.read().clone()
    }
}

// ================================
// Entities / offers
// ================================

#[derive(Debug, Default)]
pub struct InMemoryEntityRegistry {
    offers: RwLock<HashMap<String, OfferSnapshot>>,
    entity_ids: RwLock<HashMap<String, String>>,
    media: RwLock<HashSet<String>>,
    shown: Mutex<Vec<String>>,
}

impl InMemoryEntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_offer(self, offer: OfferSnapshot) -> Self {
        self.offers
            .write()
            .insert(offer.internal_id.clone(), offer);
        self
    }

    pub fn with_entity(self, node_id: impl Into<String>, entity_id: impl Into<String>) -> Self {
        self.entity_ids
            .write()
            .insert(node_id.into(), entity_id.into());
        self
    }

    pub fn with_media(self, name: impl Into<String>) -> Self {
        self.media.write().insert(name.into());
        self
    }

    /// Internal ids of offers passed to `show_offer`, in call order.
    pub fn shown_offers(&self) -> Vec<String> {
        self.shown.lock().clone()
    }
}

impl EntityRegistry for InMemoryEntityRegistry {
    fn offer_by_internal_id(&self, internal_id: &str) -> Option<OfferSnapshot> {
        self.offers.read().get(internal_id).cloned()
    }

    fn entity_id_by_node_id(&self, node_id: &str) -> Option<String> {
        self.entity_ids.read().get(node_id).cloned()
    }

    fn cached_media_exists(&self, name: &str) -> bool {
        self.media.read().contains(name)
    }

    fn show_offer(&self, offer: &OfferSnapshot) {
        self.shown.lock().push(offer.internal_id.clone());
    }
}

// ================================
// Backend
// ================================

/// Records every action; optionally fails them all.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    actions: Mutex<Vec<BackendAction>>,
    fail: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            actions: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn actions(&self) -> Vec<BackendAction> {
        self.actions.lock().clone()
    }

    pub fn actions_named(&self, action: &str) -> Vec<BackendAction> {
        self.actions
            .lock()
            .iter()
            .filter(|a| a.action == action)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl BackendActionSender for RecordingBackend {
    async fn send_action(&self, action: BackendAction) -> NodeResult<()> {
        let name = action.action.clone();
        self.actions.lock().push(action);
        if self.fail {
            return Err(NodeError::BackendSyncError(format!(
                "backend rejected '{}'",
                name
            )));
        }
        Ok(())
    }
}

// ================================
// Flows
// ================================

#[derive(Debug, Default)]
pub struct InMemoryFlowRegistry {
    flows: RwLock<Vec<Arc<FlowDefinition>>>,
}

impl InMemoryFlowRegistry {
    pub fn new(flows: Vec<FlowDefinition>) -> Self {
        Self {
            flows: RwLock::new(flows.into_iter().map(Arc::new).collect()),
        }
    }

    pub fn register(&self, flow: FlowDefinition) {
        self.flows.write().push(Arc::new(flow));
    }
}

impl FlowRegistry for InMemoryFlowRegistry {
    fn flows(&self) -> Vec<Arc<FlowDefinition>> {
        self.flows.read().clone()
    }
}

// ================================
// Randomness
// ================================

/// Replays a fixed sequence of draws (as fractions of the requested range),
/// then repeats the last one.
#[derive(Debug)]
pub struct ScriptedRandom {
    fractions: Mutex<VecDeque<f64>>,
    last: Mutex<f64>,
}

impl ScriptedRandom {
    pub fn new(fractions: impl IntoIterator<Item = f64>) -> Self {
        Self {
            fractions: Mutex::new(fractions.into_iter().collect()),
            last: Mutex::new(0.0),
        }
    }
}

impl RandomSource for ScriptedRandom {
    fn next_f64(&self, min: f64, max: f64) -> f64 {
        let fraction = match self.fractions.lock().pop_front() {
            Some(f) => {
                *self.last.lock() = f;
                f
            }
            None => *self.last.lock(),
        };
        min + (max - min) * fraction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_player_store_segments() {
        let store = InMemoryPlayerStore::new().with_segments(["a"]);
        store.add_segment("b");
        store.add_segment("b");
        assert_eq!(store.segments(), vec!["a", "b"]);
        store.remove_segment("a");
        assert!(!store.has_segment("a"));
    }

    #[test]
    fn test_player_store_stats() {
        let store = InMemoryPlayerStore::new().with_stat("gold", json!(10));
        store.add_to_stat("gold", 5.0);
        store.subtract_from_stat("gold", 2.5);
        assert_eq!(store.stat_value("gold"), Some(json!(12.5)));
        store.add_to_stat("new", 1.0);
        assert_eq!(store.stat_value("new"), Some(json!(1)));
    }

    #[tokio::test]
    async fn test_recording_backend() {
        let backend = RecordingBackend::failing();
        let action = BackendAction::new(&Default::default(), "addSegment", json!({}));
        assert!(backend.send_action(action).await.is_err());
        assert_eq!(backend.actions_named("addSegment").len(), 1);
    }

    #[test]
    fn test_scripted_random() {
        let rng = ScriptedRandom::new([0.25, 0.9]);
        assert_eq!(rng.next_f64(0.0, 100.0), 25.0);
        assert_eq!(rng.next_f64(0.0, 100.0), 90.0);
        assert_eq!(rng.next_f64(0.0, 10.0), 9.0);
        assert_eq!(rng.next_int(1, 10), 10);
    }
}
