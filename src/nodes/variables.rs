use serde_json::Value;

use super::NodeEnv;
use crate::core::ExecutionContext;
use crate::error::NodeResult;
use crate::flow::Node;
use crate::value::coerce;

/// `ops_set_variable`: bind `name` to `value`, coerced to `valueType` when
/// given. `scope: "contextual"` writes a contextual variable instead of a
/// local one.
pub fn set_variable(
    node: &Node,
    ctx: &mut ExecutionContext,
    prev: &Value,
    env: &NodeEnv<'_>,
) -> NodeResult<Value> {
    let name = node.require_str("name")?.to_string();
    let mut value = node
        .require_value_ref("value")?
        .resolve_or_null(prev, &ctx.variables);
    if let Some(target) = node.str_param("valueType") {
        value = coerce(&value, target, &env.locale)?;
    }

    match node.str_param("scope") {
        Some("contextual") => ctx.variables.set_contextual(name, value.clone()),
        _ => ctx.variables.set_local(name, value.clone()),
    }
    Ok(value)
}

/// `ops_get_variable`: the referenced value, which must exist.
pub fn get_variable(node: &Node, ctx: &ExecutionContext, prev: &Value) -> NodeResult<Value> {
    node.require_value_ref("value")?.resolve(prev, &ctx.variables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NodeError;
    use crate::flow::OpTag;
    use crate::nodes::test_support::Fixture;
    use serde_json::json;

    #[test]
    fn test_set_local() {
        let fx = Fixture::new();
        let mut ctx = ExecutionContext::new();
        let node = Node::new(OpTag::SetVariable, "s")
            .with_param("name", "reward")
            .with_param("value", json!({"value": "$previous"}))
            .with_param("valueType", "number");
        let out = set_variable(&node, &mut ctx, &json!("25"), &fx.env()).unwrap();
        assert_eq!(out, json!(25));
        assert_eq!(ctx.variables.local("reward"), Some(&json!(25)));
    }

    #[test]
    fn test_set_contextual() {
        let fx = Fixture::new();
        let mut ctx = ExecutionContext::new();
        let node = Node::new(OpTag::SetVariable, "s")
            .with_param("name", "mood")
            .with_param("scope", "contextual")
            .with_param("value", json!({"value": "happy", "isLiteral": true}));
        set_variable(&node, &mut ctx, &Value::Null, &fx.env()).unwrap();
        assert_eq!(ctx.variables.contextual("mood"), Some(&json!("happy")));
        assert!(ctx.variables.locals().is_empty());
    }

    #[test]
    fn test_set_requires_name() {
        let fx = Fixture::new();
        let mut ctx = ExecutionContext::new();
        let node = Node::new(OpTag::SetVariable, "s")
            .with_param("value", json!({"value": 1, "isLiteral": true}));
        assert!(matches!(
            set_variable(&node, &mut ctx, &Value::Null, &fx.env()),
            Err(NodeError::ValidationError(_))
        ));
    }

    #[test]
    fn test_get_variable() {
        let mut ctx = ExecutionContext::new();
        ctx.variables.set_local("x", json!(3));
        let node = Node::new(OpTag::GetVariable, "g")
            .with_param("value", json!({"value": "x", "type": "variable"}));
        assert_eq!(get_variable(&node, &ctx, &Value::Null).unwrap(), json!(3));

        let missing = Node::new(OpTag::GetVariable, "g")
            .with_param("value", json!({"value": "y", "type": "variable"}));
        assert!(matches!(
            get_variable(&missing, &ctx, &Value::Null),
            Err(NodeError::LookupError(_))
        ));
    }
}
