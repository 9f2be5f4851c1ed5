use serde_json::Value;

use super::{input_or_previous, NodeEnv};
use crate::core::ExecutionContext;
use crate::error::{NodeError, NodeResult};
use crate::evaluator::{apply_arithmetic, round_to, ArithmeticOp};
use crate::flow::{Node, OpTag};
use crate::value::{number_to_value, to_number};

fn operand(
    node: &Node,
    key: &str,
    ctx: &ExecutionContext,
    prev: &Value,
    env: &NodeEnv<'_>,
) -> NodeResult<f64> {
    let value = node
        .require_value_ref(key)?
        .resolve_or_null(prev, &ctx.variables);
    to_number(&value, &env.locale)
}

/// `ops_add` .. `ops_modulo`: `value1 <op> value2`.
pub fn arithmetic(
    node: &Node,
    ctx: &ExecutionContext,
    prev: &Value,
    env: &NodeEnv<'_>,
) -> NodeResult<Value> {
    let op = ArithmeticOp::from_op(node.op).ok_or_else(|| {
        NodeError::ValidationError(format!("{} is not an arithmetic node", node.op))
    })?;
    let a = operand(node, "value1", ctx, prev, env)?;
    let b = operand(node, "value2", ctx, prev, env)?;
    Ok(number_to_value(apply_arithmetic(op, a, b)))
}

/// `ops_ceil`, `ops_floor`, `ops_round` with optional `digits`.
pub fn rounding(
    node: &Node,
    ctx: &ExecutionContext,
    prev: &Value,
    env: &NodeEnv<'_>,
) -> NodeResult<Value> {
    let value = to_number(&input_or_previous(node, "value", ctx, prev)?, &env.locale)?;
    let digits = node
        .param("digits")
        .and_then(Value::as_i64)
        .unwrap_or(0)
        .clamp(0, 15) as i32;
    let factor = 10f64.powi(digits);

    let rounded = match node.op {
        OpTag::Ceil => (value * factor).ceil() / factor,
        OpTag::Floor => (value * factor).floor() / factor,
        OpTag::Round => round_to(value, digits),
        other => {
            return Err(NodeError::ValidationError(format!(
                "{} is not a rounding node",
                other
            )))
        }
    };
    Ok(number_to_value(rounded))
}

/// `ops_clamp`: `value` limited to `[min, max]`.
pub fn clamp(
    node: &Node,
    ctx: &ExecutionContext,
    prev: &Value,
    env: &NodeEnv<'_>,
) -> NodeResult<Value> {
    let value = to_number(&input_or_previous(node, "value", ctx, prev)?, &env.locale)?;
    let min = operand(node, "min", ctx, prev, env)?;
    let max = operand(node, "max", ctx, prev, env)?;
    if min > max {
        return Err(NodeError::ValidationError(format!(
            "ops_clamp min {} exceeds max {}",
            min, max
        )));
    }
    Ok(number_to_value(value.max(min).min(max)))
}

/// `ops_random`: uniform draw in `[min, max)`, or an inclusive integer when
/// `integer` is set.
pub fn random(
    node: &Node,
    ctx: &ExecutionContext,
    prev: &Value,
    env: &NodeEnv<'_>,
) -> NodeResult<Value> {
    let min = operand(node, "min", ctx, prev, env)?;
    let max = operand(node, "max", ctx, prev, env)?;
    if !(max - min).is_finite() {
        return Err(NodeError::ValidationError(format!(
            "ops_random needs finite bounds with a finite span, got [{}, {}]",
            min, max
        )));
    }
    if min > max {
        return Err(NodeError::ValidationError(format!(
            "ops_random min {} exceeds max {}",
            min, max
        )));
    }
    if node.bool_param("integer") {
        let lo = min.ceil() as i64;
        let hi = max.floor() as i64;
        if lo > hi {
            return Err(NodeError::ValidationError(format!(
                "ops_random has no integer in [{}, {}]",
                min, max
            )));
        }
        return Ok(Value::from(env.random.next_int(lo, hi)));
    }
    Ok(number_to_value(env.random.next_f64(min, max)))
}
