//! Trigger routing.
//!
//! Every registered flow whose root is the fired trigger, and whose root
//! parameters match the event, runs in registry order. Carry objects flow
//! from one run into the next; local variables are merged with later flows
//! overwriting earlier ones.

use std::collections::HashMap;

use serde_json::{Map, Value};

use super::flow_engine::{FlowEngine, FlowInvocation};
use crate::collaborators::{EntityConfig, OfferSnapshot};
use crate::flow::OpTag;
use crate::value::{number_to_value, to_display_string};

/// Outcome of firing one trigger
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriggerRunResult {
    /// Ids of the flows that ran, in order
    pub flows_run: Vec<String>,
    pub local_vars: HashMap<String, Value>,
    pub entity_config: Option<EntityConfig>,
    pub offer: Option<OfferSnapshot>,
    pub event_custom_data: Option<Map<String, Value>>,
}

/// Whether the root parameter `key` accepts `actual`. A missing or empty
/// parameter accepts anything; an array accepts any of its members.
pub fn param_matches(params: &Map<String, Value>, key: &str, actual: &str) -> bool {
    match params.get(key) {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) if s.is_empty() => true,
        Some(Value::Array(items)) => {
            items.is_empty() || items.iter().any(|v| to_display_string(v) == actual)
        }
        Some(v) => to_display_string(v) == actual,
    }
}

impl FlowEngine {
    /// Run every flow rooted at `trigger` whose root parameters satisfy
    /// `predicate`.
    pub async fn run_for_event<P>(
        &self,
        trigger: OpTag,
        predicate: P,
        invocation: FlowInvocation,
    ) -> TriggerRunResult
    where
        P: Fn(&Map<String, Value>) -> bool + Send + Sync,
    {
        let FlowInvocation {
            contextual_seed,
            trigger_seed,
            mut entity_config,
            mut offer,
            mut event_custom_data,
            depth,
        } = invocation;

        let mut result = TriggerRunResult::default();
        for flow in self.flows.flows() {
            if flow.root.op != trigger || !predicate(&flow.root.params) {
                continue;
            }
            let run = self
                .execute_with(
                    &flow,
                    FlowInvocation {
                        contextual_seed: contextual_seed.clone(),
                        trigger_seed: trigger_seed.clone(),
                        entity_config: entity_config.take(),
                        offer: offer.take(),
                        event_custom_data: event_custom_data.take(),
                        depth,
                    },
                )
                .await;
            result.local_vars.extend(run.local_vars);
            result.flows_run.push(run.flow_id);
            entity_config = run.entity_config;
            offer = run.offer;
            event_custom_data = run.event_custom_data;
        }

        if result.flows_run.is_empty() {
            tracing::debug!(trigger = trigger.as_str(), "no flow matched trigger");
        }
        result.entity_config = entity_config;
        result.offer = offer;
        result.event_custom_data = event_custom_data;
        result
    }

    pub async fn on_session_start(&self, contextual_seed: Map<String, Value>) -> TriggerRunResult {
        let invocation = FlowInvocation::new().with_contextual_seed(contextual_seed);
        self.run_for_event(OpTag::SessionStart, |_| true, invocation)
            .await
    }

    /// Fire custom trigger `trigger_id` with `trigger_seed` as the root's
    /// previous result.
    pub async fn on_custom_trigger(&self, trigger_id: &str, trigger_seed: Value) -> TriggerRunResult {
        let invocation = FlowInvocation::new().with_trigger_seed(trigger_seed);
        self.run_custom_trigger(trigger_id, invocation).await
    }

    pub(crate) async fn run_custom_trigger(
        &self,
        trigger_id: &str,
        invocation: FlowInvocation,
    ) -> TriggerRunResult {
        self.run_for_event(
            OpTag::CustomTrigger,
            |params| param_matches(params, "triggerId", trigger_id),
            invocation,
        )
        .await
    }

    /// The shown offer is both the seed and the `offer` carry object.
    pub async fn on_offer_shown(&self, offer: OfferSnapshot) -> TriggerRunResult {
        let offer_id = offer.internal_id.clone();
        let invocation = FlowInvocation::new()
            .with_trigger_seed(Value::String(offer_id.clone()))
            .with_offer(offer);
        self.run_for_event(
            OpTag::OfferShown,
            |params| param_matches(params, "offerId", &offer_id),
            invocation,
        )
        .await
    }

    /// Flows may rewrite `config` through `act_apply_change`; the rewritten
    /// config comes back in the result.
    pub async fn on_config_param_retrieved(&self, config: EntityConfig) -> TriggerRunResult {
        let config_id = config.id.clone();
        let invocation = FlowInvocation::new()
            .with_trigger_seed(Value::String(config_id.clone()))
            .with_entity_config(config);
        self.run_for_event(
            OpTag::ConfigParamRetrieved,
            |params| param_matches(params, "configId", &config_id),
            invocation,
        )
        .await
    }

    pub async fn on_item_added(&self, item_id: &str, amount: f64) -> TriggerRunResult {
        self.item_event(OpTag::ItemAdded, item_id, amount).await
    }

    pub async fn on_item_removed(&self, item_id: &str, amount: f64) -> TriggerRunResult {
        self.item_event(OpTag::ItemRemoved, item_id, amount).await
    }

    async fn item_event(&self, trigger: OpTag, item_id: &str, amount: f64) -> TriggerRunResult {
        let invocation = FlowInvocation::new()
            .with_contextual("itemId", Value::String(item_id.to_string()))
            .with_trigger_seed(number_to_value(amount));
        self.run_for_event(
            trigger,
            |params| param_matches(params, "itemId", item_id),
            invocation,
        )
        .await
    }

    pub async fn on_stat_changed(&self, stat_id: &str, value: Value) -> TriggerRunResult {
        let invocation = FlowInvocation::new().with_trigger_seed(value);
        self.run_for_event(
            OpTag::StatChanged,
            |params| param_matches(params, "statId", stat_id),
            invocation,
        )
        .await
    }

    pub async fn on_segment_enter(&self, segment_id: &str) -> TriggerRunResult {
        self.segment_event(OpTag::SegmentEnter, segment_id).await
    }

    pub async fn on_segment_exit(&self, segment_id: &str) -> TriggerRunResult {
        self.segment_event(OpTag::SegmentExit, segment_id).await
    }

    async fn segment_event(&self, trigger: OpTag, segment_id: &str) -> TriggerRunResult {
        let invocation =
            FlowInvocation::new().with_trigger_seed(Value::String(segment_id.to_string()));
        self.run_for_event(
            trigger,
            |params| param_matches(params, "segmentId", segment_id),
            invocation,
        )
        .await
    }

    /// `custom_data` starts the `eventCustomData` accumulator that
    /// `act_apply_change` and `act_send_event` work on.
    pub async fn on_analytics_event(
        &self,
        event_name: &str,
        custom_data: Map<String, Value>,
    ) -> TriggerRunResult {
        let invocation = FlowInvocation::new()
            .with_trigger_seed(Value::String(event_name.to_string()))
            .with_event_custom_data(custom_data);
        self.run_for_event(
            OpTag::AnalyticsEventSend,
            |params| param_matches(params, "eventName", event_name),
            invocation,
        )
        .await
    }
}
