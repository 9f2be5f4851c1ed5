use std::time::Duration;

use liveflow_sandbox_js::ScriptSandbox;
use serde_json::Value;

use crate::core::ExecutionContext;
use crate::error::{NodeError, NodeResult};
use crate::flow::Node;

/// `act_run_code`: run `code` in the sandbox with the run's variables as
/// `contextData` and the previous result as `previousResult`.
///
/// Contextual variables are overlaid with local ones. `timeoutMs` overrides
/// the engine default.
pub async fn run_code(
    node: &Node,
    ctx: &ExecutionContext,
    prev: &Value,
    sandbox: &ScriptSandbox,
    default_timeout: Duration,
) -> NodeResult<Value> {
    let code = node.require_str("code")?;
    let timeout = node
        .param("timeoutMs")
        .and_then(Value::as_u64)
        .map(Duration::from_millis)
        .unwrap_or(default_timeout);

    let outcome = sandbox
        .run_script(code, ctx.variables.merged_view(), prev.clone(), timeout)
        .await;

    tracing::debug!(
        flow_id = %ctx.flow_id,
        slot_id = %node.slot_id,
        success = outcome.success,
        elapsed_ms = outcome.execution_time.as_millis() as u64,
        "script finished"
    );

    if outcome.success {
        return Ok(outcome.result);
    }
    Err(outcome
        .error
        .map(NodeError::from)
        .unwrap_or_else(|| NodeError::ScriptError("script failed".to_string())))
}
