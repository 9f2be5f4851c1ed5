use serde_json::{json, Value};

use super::{id_param, NodeEnv};
use crate::collaborators::StatType;
use crate::core::ExecutionContext;
use crate::error::{NodeError, NodeResult};
use crate::flow::{Node, OpTag};
use crate::value::{coerce, number_to_value, to_number};

// ================================
// Segments
// ================================

/// `act_segment_add` / `act_segment_remove` on `segmentId`.
pub fn segment_change(
    node: &Node,
    ctx: &mut ExecutionContext,
    prev: &Value,
    env: &NodeEnv<'_>,
) -> NodeResult<Value> {
    let segment_id = id_param(node, "segmentId", ctx, prev)?;
    let held = env.player.has_segment(&segment_id);

    let action = match node.op {
        OpTag::SegmentAdd if !held => {
            env.player.add_segment(&segment_id);
            Some("addSegment")
        }
        OpTag::SegmentRemove if held => {
            env.player.remove_segment(&segment_id);
            Some("removeSegment")
        }
        OpTag::SegmentAdd | OpTag::SegmentRemove => None,
        other => {
            return Err(NodeError::ValidationError(format!(
                "{} is not a segment node",
                other
            )))
        }
    };

    if let Some(action) = action {
        env.refresh_segments(ctx);
        env.sync_backend(&ctx.flow_id, action, json!({ "segmentId": segment_id.clone() }));
    }
    Ok(Value::String(segment_id))
}

// ================================
// Stats
// ================================

/// `act_stat_set`, `act_stat_add`, `act_stat_subtract` on `statId`.
///
/// Returns the stat value after the change, clamped to the template range.
pub fn stat_change(
    node: &Node,
    ctx: &mut ExecutionContext,
    prev: &Value,
    env: &NodeEnv<'_>,
) -> NodeResult<Value> {
    let stat_id = id_param(node, "statId", ctx, prev)?;
    let template = env
        .templates
        .template_by_internal_id(&stat_id)
        .ok_or_else(|| NodeError::LookupError(format!("stat template '{}'", stat_id)))?;
    let input = node
        .require_value_ref("value")?
        .resolve_or_null(prev, &ctx.variables);

    let new_value = match node.op {
        OpTag::StatSet => {
            let value = coerce(&input, template.value_type.target(), &env.locale)?;
            let value = match template.value_type {
                StatType::Number => {
                    number_to_value(template.clamp(to_number(&value, &env.locale)?))
                }
                _ => value,
            };
            env.player.set_stat_value(&stat_id, value.clone());
            value
        }
        OpTag::StatAdd | OpTag::StatSubtract => {
            if template.value_type != StatType::Number {
                return Err(NodeError::ValidationError(format!(
                    "{} needs a number stat, '{}' is {}",
                    node.op,
                    stat_id,
                    template.value_type.target()
                )));
            }
            let amount = to_number(&input, &env.locale)?;
            if node.op == OpTag::StatAdd {
                env.player.add_to_stat(&stat_id, amount);
            } else {
                env.player.subtract_from_stat(&stat_id, amount);
            }

            let current = env.player.stat_value(&stat_id).unwrap_or(Value::Null);
            let current = to_number(&current, &env.locale)?;
            let clamped = template.clamp(current);
            if clamped != current {
                env.player
                    .set_stat_value(&stat_id, number_to_value(clamped));
            }
            number_to_value(clamped)
        }
        other => {
            return Err(NodeError::ValidationError(format!(
                "{} is not a stat node",
                other
            )))
        }
    };

    ctx.variables.set_contextual(stat_id, new_value.clone());
    Ok(new_value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{PlayerStore, StatTemplate};
    use crate::nodes::test_support::Fixture;
    use std::time::Duration;

    fn stat_node(op: OpTag, value: Value) -> Node {
        Node::new(op, "st")
            .with_param("statId", "energy")
            .with_param("value", json!({"value": value, "isLiteral": true}))
    }

    fn fixture() -> Fixture {
        Fixture::new().with_templates(vec![
            StatTemplate::number("energy").with_range(0.0, 100.0),
            StatTemplate::number("nickname").with_type(StatType::String),
        ])
    }

    #[tokio::test]
    async fn test_segment_add_and_remove() {
        let fx = Fixture::new();
        let mut ctx = ExecutionContext::new();
        let add = Node::new(OpTag::SegmentAdd, "s").with_param("segmentId", "vip");
        assert_eq!(
            segment_change(&add, &mut ctx, &Value::Null, &fx.env()).unwrap(),
            json!("vip")
        );
        assert!(fx.player.has_segment("vip"));
        assert_eq!(ctx.variables.contextual("segment"), Some(&json!(["vip"])));

        // adding again is a no-op without a second sync
        segment_change(&add, &mut ctx, &Value::Null, &fx.env()).unwrap();

        let remove = Node::new(OpTag::SegmentRemove, "s").with_param("segmentId", "vip");
        segment_change(&remove, &mut ctx, &Value::Null, &fx.env()).unwrap();
        assert!(!fx.player.has_segment("vip"));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(fx.backend.actions_named("addSegment").len(), 1);
        assert_eq!(fx.backend.actions_named("removeSegment").len(), 1);
    }

    #[tokio::test]
    async fn test_segment_id_from_previous_result() {
        let fx = Fixture::new();
        let mut ctx = ExecutionContext::new();
        let add = Node::new(OpTag::SegmentAdd, "s")
            .with_param("segmentId", json!({"value": "$previous"}));
        segment_change(&add, &mut ctx, &json!("returning"), &fx.env()).unwrap();
        assert!(fx.player.has_segment("returning"));
    }

    #[test]
    fn test_stat_set_clamps() {
        let fx = fixture();
        let mut ctx = ExecutionContext::new();
        let out = stat_change(&stat_node(OpTag::StatSet, json!("250")), &mut ctx, &Value::Null, &fx.env())
            .unwrap();
        assert_eq!(out, json!(100));
        assert_eq!(fx.player.stat_value("energy"), Some(json!(100)));
        assert_eq!(ctx.variables.contextual("energy"), Some(&json!(100)));
    }

    #[test]
    fn test_stat_add_subtract() {
        let fx = fixture();
        fx.player.set_stat_value("energy", json!(90));
        let mut ctx = ExecutionContext::new();

        let out = stat_change(&stat_node(OpTag::StatAdd, json!(5)), &mut ctx, &Value::Null, &fx.env())
            .unwrap();
        assert_eq!(out, json!(95));

        let out = stat_change(&stat_node(OpTag::StatAdd, json!(50)), &mut ctx, &Value::Null, &fx.env())
            .unwrap();
        assert_eq!(out, json!(100));
        assert_eq!(fx.player.stat_value("energy"), Some(json!(100)));

        let out = stat_change(
            &stat_node(OpTag::StatSubtract, json!(130)),
            &mut ctx,
            &Value::Null,
            &fx.env(),
        )
        .unwrap();
        assert_eq!(out, json!(0));
    }

    #[test]
    fn test_stat_add_requires_number_template() {
        let fx = fixture();
        let mut ctx = ExecutionContext::new();
        let node = Node::new(OpTag::StatAdd, "st")
            .with_param("statId", "nickname")
            .with_param("value", json!({"value": 1, "isLiteral": true}));
        assert!(matches!(
            stat_change(&node, &mut ctx, &Value::Null, &fx.env()),
            Err(NodeError::ValidationError(_))
        ));
    }

    #[test]
    fn test_unknown_stat() {
        let fx = fixture();
        let mut ctx = ExecutionContext::new();
        let node = Node::new(OpTag::StatSet, "st")
            .with_param("statId", "ghost")
            .with_param("value", json!({"value": 1, "isLiteral": true}));
        assert!(matches!(
            stat_change(&node, &mut ctx, &Value::Null, &fx.env()),
            Err(NodeError::LookupError(_))
        ));
    }
}
