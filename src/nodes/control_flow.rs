use serde_json::Value;

use super::{input_or_previous, NodeEnv};
use crate::core::ExecutionContext;
use crate::error::{NodeError, NodeResult};
use crate::evaluator::{
    cumulative_ladder, evaluate_conditions, find_sticky_split, pick_split, select_case,
    sticky_key, BranchCondition, Split, SwitchCase,
};
use crate::flow::Node;

// ================================
// Branch
// ================================

/// `i_branch`: boolean AND of `conditions`.
pub fn branch(
    node: &Node,
    ctx: &ExecutionContext,
    prev: &Value,
    env: &NodeEnv<'_>,
) -> NodeResult<Value> {
    let conditions: Vec<BranchCondition> = match node.param("conditions") {
        None => Vec::new(),
        Some(_) => node.typed_param("conditions")?,
    };
    let result = evaluate_conditions(&conditions, prev, &ctx.variables, &env.locale);
    tracing::debug!(
        flow_id = %ctx.flow_id,
        slot_id = %node.slot_id,
        conditions = conditions.len(),
        result,
        "branch evaluated"
    );
    Ok(Value::Bool(result))
}

// ================================
// Switch
// ================================

/// `i_switch`: index of the matching case, or `-1`.
pub fn switch(node: &Node, ctx: &ExecutionContext, prev: &Value) -> NodeResult<Value> {
    let field = node
        .require_value_ref("field")?
        .resolve_or_null(prev, &ctx.variables);
    let cases: Vec<SwitchCase> = node.typed_param("cases")?;
    let index = select_case(&field, node.str_param("fieldType"), &cases);
    tracing::debug!(
        flow_id = %ctx.flow_id,
        slot_id = %node.slot_id,
        index,
        "switch evaluated"
    );
    Ok(Value::from(index))
}

// ================================
// Split test
// ================================

/// `i_split_test`: sticky bucket if the player already has one, otherwise a
/// fresh draw that is persisted as a segment.
pub fn split_test(
    node: &Node,
    ctx: &mut ExecutionContext,
    env: &NodeEnv<'_>,
) -> NodeResult<Value> {
    let splits: Vec<Split> = node.typed_param("splits")?;
    let ladder = cumulative_ladder(&splits)?;

    if let Some(index) =
        find_sticky_split(&splits, &ctx.flow_id, &node.slot_id, |s| env.player.has_segment(s))
    {
        tracing::debug!(
            flow_id = %ctx.flow_id,
            slot_id = %node.slot_id,
            index,
            "split test already assigned"
        );
        return Ok(Value::from(index));
    }

    let draw = env.random.next_f64(0.0, 100.0);
    let index = pick_split(&ladder, draw);
    let split = splits.get(index).ok_or_else(|| {
        NodeError::ValidationError(format!("split index {} out of range", index))
    })?;
    let key = sticky_key(&ctx.flow_id, &node.slot_id, &split.slot_id);

    env.player.add_segment(&key);
    env.refresh_segments(ctx);
    env.sync_backend(
        &ctx.flow_id,
        "addSegment",
        serde_json::json!({ "segmentId": key }),
    );
    tracing::debug!(
        flow_id = %ctx.flow_id,
        slot_id = %node.slot_id,
        draw,
        index,
        "split test assigned"
    );
    Ok(Value::from(index))
}

// ================================
// Return
// ================================

/// `i_return`: `value` if given, else the previous result. The engine stops
/// the run after it.
pub fn return_value(node: &Node, ctx: &ExecutionContext, prev: &Value) -> NodeResult<Value> {
    input_or_previous(node, "value", ctx, prev)
}
