use serde_json::{json, Map, Value};

use super::{id_param, NodeEnv};
use crate::core::ExecutionContext;
use crate::error::{NodeError, NodeResult};
use crate::flow::Node;
use crate::value::ValueRef;

/// `act_show_offer`: hand the offer `offerId` to the entity registry.
pub fn show_offer(
    node: &Node,
    ctx: &ExecutionContext,
    prev: &Value,
    env: &NodeEnv<'_>,
) -> NodeResult<Value> {
    let offer_id = id_param(node, "offerId", ctx, prev)?;
    let offer = env
        .entities
        .offer_by_internal_id(&offer_id)
        .ok_or_else(|| NodeError::LookupError(format!("offer '{}'", offer_id)))?;
    env.entities.show_offer(&offer);
    tracing::info!(flow_id = %ctx.flow_id, offer_id = %offer_id, "offer shown");
    Ok(Value::String(offer_id))
}

/// `act_send_event`: send `eventName` with the accumulated custom data,
/// overlaid with the node's own `customData` entries.
pub fn send_event(
    node: &Node,
    ctx: &ExecutionContext,
    prev: &Value,
    env: &NodeEnv<'_>,
) -> NodeResult<Value> {
    let event_name = node.require_str("eventName")?;
    let mut custom_data = ctx.event_custom_data.clone().unwrap_or_default();
    if let Some(extra) = node.param("customData") {
        let extra = extra.as_object().ok_or_else(|| {
            NodeError::ValidationError("act_send_event customData must be an object".to_string())
        })?;
        merge_custom_data(&mut custom_data, extra, ctx, prev);
    }

    let payload = json!({
        "eventName": event_name,
        "customData": custom_data,
    });
    env.sync_backend(&ctx.flow_id, "sendEvent", payload.clone());
    Ok(payload)
}

/// Entries shaped like value refs are resolved; anything else is literal.
fn merge_custom_data(
    target: &mut Map<String, Value>,
    extra: &Map<String, Value>,
    ctx: &ExecutionContext,
    prev: &Value,
) {
    for (key, raw) in extra {
        let value = match serde_json::from_value::<ValueRef>(raw.clone()) {
            Ok(r) if raw.get("value").is_some() || raw.get("raw").is_some() => {
                r.resolve_or_null(prev, &ctx.variables)
            }
            _ => raw.clone(),
        };
        target.insert(key.clone(), value);
    }
}
