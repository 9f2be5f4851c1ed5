use serde_json::{Map, Value};

use super::NodeEnv;
use crate::core::ExecutionContext;
use crate::error::{NodeError, NodeResult};
use crate::flow::Node;
use crate::value::to_display_string;

/// Field a change is written to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeTarget {
    EventCustomData,
    OfferIcon,
    OfferPrice,
    OfferContent,
    /// Leaf of the entity config, by slot id
    ConfigSlot(String),
}

impl ChangeTarget {
    pub fn parse(field: &str) -> Self {
        match field {
            "eventCustomData" => ChangeTarget::EventCustomData,
            "offerIcon" => ChangeTarget::OfferIcon,
            "offerPrice" => ChangeTarget::OfferPrice,
            "offerContent" => ChangeTarget::OfferContent,
            slot => ChangeTarget::ConfigSlot(slot.to_string()),
        }
    }
}

/// `act_apply_change`: write `value` into the carry object selected by
/// `fieldToSet`.
///
/// A missing carry object, unknown media or unmatched slot is logged and the
/// node still succeeds with the resolved value.
pub fn apply_change(
    node: &Node,
    ctx: &mut ExecutionContext,
    prev: &Value,
    env: &NodeEnv<'_>,
) -> NodeResult<Value> {
    let target = ChangeTarget::parse(node.require_str("fieldToSet")?);
    let value = node
        .require_value_ref("value")?
        .resolve_or_null(prev, &ctx.variables);

    let outcome = match &target {
        ChangeTarget::EventCustomData => {
            let key = node.require_str("key")?.to_string();
            let mut data = ctx.event_custom_data.take().unwrap_or_else(Map::new);
            data.insert(key, value.clone());
            ctx.event_custom_data = Some(data);
            Ok(())
        }
        ChangeTarget::OfferIcon | ChangeTarget::OfferPrice | ChangeTarget::OfferContent => {
            match ctx.offer.take() {
                Some(mut offer) => {
                    let applied = match target {
                        ChangeTarget::OfferIcon => {
                            let icon = to_display_string(&value);
                            if env.entities.cached_media_exists(&icon) {
                                offer.icon = Some(icon);
                                Ok(())
                            } else {
                                Err(NodeError::LookupError(format!("cached media '{}'", icon)))
                            }
                        }
                        ChangeTarget::OfferPrice => {
                            offer.price = value.clone();
                            Ok(())
                        }
                        _ => {
                            offer.content = remap_content(&value, env);
                            Ok(())
                        }
                    };
                    ctx.offer = Some(offer);
                    applied
                }
                None => Err(NodeError::LookupError("no offer in this run".to_string())),
            }
        }
        ChangeTarget::ConfigSlot(slot_id) => match ctx.entity_config.as_mut() {
            Some(config) => match config.find_slot_mut(slot_id) {
                Some(entry) => {
                    entry.value = value.clone();
                    Ok(())
                }
                None => Err(NodeError::LookupError(format!(
                    "config '{}' has no slot '{}'",
                    config.id, slot_id
                ))),
            },
            None => Err(NodeError::LookupError(
                "no entity config in this run".to_string(),
            )),
        },
    };

    if let Err(e) = outcome {
        tracing::warn!(
            flow_id = %ctx.flow_id,
            slot_id = %node.slot_id,
            field = ?target,
            error_code = e.error_code(),
            error = %e,
            "change not applied"
        );
    }
    Ok(value)
}

/// Node ids to entity ids; ids without an entity are dropped.
fn remap_content(value: &Value, env: &NodeEnv<'_>) -> Vec<String> {
    let node_ids: Vec<String> = match value {
        Value::Array(items) => items.iter().map(to_display_string).collect(),
        Value::Null => Vec::new(),
        other => vec![to_display_string(other)],
    };
    node_ids
        .iter()
        .filter_map(|node_id| {
            let mapped = env.entities.entity_id_by_node_id(node_id);
            if mapped.is_none() {
                tracing::warn!(node_id = %node_id, "offer content has no entity");
            }
            mapped
        })
        .collect()
}
