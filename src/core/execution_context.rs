use serde_json::{Map, Value};

use super::variable_store::VariableStore;
use crate::collaborators::{EntityConfig, OfferSnapshot};

/// Mutable state of one flow run. Never shared between runs.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    pub flow_id: String,
    pub variables: VariableStore,
    /// Set by `i_return`; stops every remaining visit of the run.
    pub stopped: bool,
    /// Nesting level of custom-flow calls (0 for a top-level run).
    pub call_depth: u32,

    // Trigger-scoped carry objects
    pub entity_config: Option<EntityConfig>,
    pub offer: Option<OfferSnapshot>,
    pub event_custom_data: Option<Map<String, Value>>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear every field back to its default.
    pub fn reset(&mut self) {
        self.flow_id.clear();
        self.variables.clear();
        self.stopped = false;
        self.call_depth = 0;
        self.entity_config = None;
        self.offer = None;
        self.event_custom_data = None;
    }

    pub fn is_clean(&self) -> bool {
        self.flow_id.is_empty()
            && self.variables.is_empty()
            && !self.stopped
            && self.call_depth == 0
            && self.entity_config.is_none()
            && self.offer.is_none()
            && self.event_custom_data.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reset_clears_everything() {
        let mut ctx = ExecutionContext::new();
        ctx.flow_id = "flow-1".into();
        ctx.variables.set_local("a", json!(1));
        ctx.variables.set_contextual("segment", json!(["vip"]));
        ctx.stopped = true;
        ctx.call_depth = 2;
        ctx.offer = Some(OfferSnapshot::new("offer-1"));
        ctx.entity_config = Some(EntityConfig::new("cfg-1"));
        ctx.event_custom_data = Some(Map::new());
        assert!(!ctx.is_clean());

        ctx.reset();
        assert!(ctx.is_clean());
    }
}
