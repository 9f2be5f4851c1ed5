//! JavaScript sandbox for flow script nodes, built on boa_engine.
//!
//! - Deny-list vetting before any execution
//! - A fresh boa context per call, on its own worker thread
//! - Host-like globals shadowed and non-allowlisted globals deleted
//! - Wall-clock watchdog with a fixed buffer on top of the script budget
//! - Loop and recursion limits scaled to the budget, so abandoned workers end
//! - A cap on abandoned workers still running; further scripts are refused

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use boa_engine::error::JsNativeErrorKind;
use boa_engine::{js_string, Context, JsError, JsValue, Source};
use serde_json::Value;
use tokio::sync::{oneshot, RwLock};

use crate::builtins::BUILTIN_GLOBALS;
use crate::error::ScriptError;
use crate::types::{ScriptOutcome, ScriptRequest, ScriptStats};
use crate::vetting::vet_source;

/// Host globals that scripts must never reach.
const SHADOWED_HOST_GLOBALS: &[&str] = &[
    "window",
    "document",
    "location",
    "navigator",
    "globalThis",
    "self",
    "fetch",
    "XMLHttpRequest",
];

/// Script sandbox configuration
#[derive(Clone, Debug)]
pub struct ScriptSandboxConfig {
    /// Max source length (bytes)
    pub max_code_length: usize,

    /// Extra time the watchdog grants on top of the script budget
    pub watchdog_buffer: Duration,

    /// Loop iterations granted per millisecond of budget (watchdog buffer
    /// included)
    pub loop_iterations_per_ms: u64,

    /// Upper bound on the per-run loop iteration limit
    pub max_loop_iterations: u64,

    /// Max call depth inside a script
    pub max_recursion_depth: usize,

    /// Abandoned workers allowed to still be running before new scripts are
    /// refused
    pub max_abandoned_workers: usize,

    /// Worker thread stack size (bytes)
    pub worker_stack_size: usize,

    /// Freeze Object/Array/Function prototypes before user code runs
    pub freeze_prototypes: bool,

    /// Globals left in place; everything else is deleted
    pub allowed_globals: Vec<String>,
}

impl Default for ScriptSandboxConfig {
    fn default() -> Self {
        Self {
            max_code_length: 64 * 1024,
            watchdog_buffer: Duration::from_millis(250),
            loop_iterations_per_ms: 10_000,
            max_loop_iterations: 10_000_000,
            max_recursion_depth: 512,
            max_abandoned_workers: 4,
            worker_stack_size: 8 * 1024 * 1024,
            freeze_prototypes: true,
            allowed_globals: vec![
                "undefined".into(),
                "NaN".into(),
                "Infinity".into(),
                "JSON".into(),
                "Math".into(),
                "parseInt".into(),
                "parseFloat".into(),
                "isNaN".into(),
                "isFinite".into(),
                "Number".into(),
                "String".into(),
                "Boolean".into(),
                "Array".into(),
                "Object".into(),
                "Error".into(),
                "TypeError".into(),
                "RangeError".into(),
                "Date".into(),
                "RegExp".into(),
                "Map".into(),
                "Set".into(),
                "encodeURIComponent".into(),
                "decodeURIComponent".into(),
            ]
            .into_iter()
            .chain(BUILTIN_GLOBALS.iter().map(|name| name.to_string()))
            .collect(),
        }
    }
}

impl ScriptSandboxConfig {
    /// Loop iteration limit for a run with `timeout`: proportional to the
    /// watchdog window, capped by `max_loop_iterations`.
    pub fn loop_iteration_limit(&self, timeout: Duration) -> u64 {
        let window_ms = u64::try_from(timeout.saturating_add(self.watchdog_buffer).as_millis())
            .unwrap_or(u64::MAX)
            .max(1);
        self.loop_iterations_per_ms
            .saturating_mul(window_ms)
            .min(self.max_loop_iterations)
    }
}

const RUNNING: u8 = 0;
const FINISHED: u8 = 1;
const ABANDONED: u8 = 2;

/// Count of workers the watchdog gave up on that have not exited yet.
#[derive(Debug, Default, Clone)]
struct AbandonedWorkers {
    live: Arc<AtomicUsize>,
}

impl AbandonedWorkers {
    fn live(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    fn track(&self) -> WorkerSlot {
        WorkerSlot {
            state: Arc::new(AtomicU8::new(RUNNING)),
            live: Arc::clone(&self.live),
        }
    }
}

/// State of one worker, shared by the worker and its watchdog.
#[derive(Debug, Clone)]
struct WorkerSlot {
    state: Arc<AtomicU8>,
    live: Arc<AtomicUsize>,
}

impl WorkerSlot {
    fn abandon(&self) {
        if self
            .state
            .compare_exchange(RUNNING, ABANDONED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.live.fetch_add(1, Ordering::AcqRel);
        }
    }

    fn finish(&self) {
        if self.state.swap(FINISHED, Ordering::AcqRel) == ABANDONED {
            self.live.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

/// Marks the worker finished however its thread ends.
struct FinishOnDrop(WorkerSlot);

impl Drop for FinishOnDrop {
    fn drop(&mut self) {
        self.0.finish();
    }
}

/// Runs untrusted flow scripts.
///
/// Each call builds its own boa `Context` on a dedicated thread, so no state
/// survives between calls. When the watchdog gives up on a runaway script the
/// worker and its context are abandoned and the next call starts from a new
/// environment.
pub struct ScriptSandbox {
    config: ScriptSandboxConfig,
    stats: Arc<RwLock<ScriptStats>>,
    abandoned: AbandonedWorkers,
}

impl ScriptSandbox {
    pub fn new(config: ScriptSandboxConfig) -> Self {
        Self {
            config,
            stats: Arc::new(RwLock::new(ScriptStats::default())),
            abandoned: AbandonedWorkers::default(),
        }
    }

    pub fn config(&self) -> &ScriptSandboxConfig {
        &self.config
    }

    /// Vet a source without running it.
    pub fn validate(&self, source: &str) -> Result<(), ScriptError> {
        if source.len() > self.config.max_code_length {
            return Err(ScriptError::CodeTooLarge {
                max: self.config.max_code_length,
                actual: source.len(),
            });
        }
        vet_source(source)
    }

    /// Workers abandoned by the watchdog that are still running.
    pub fn abandoned_workers(&self) -> usize {
        self.abandoned.live()
    }

    /// Run a script snippet: `source` must evaluate to a function of
    /// `(contextData, previousResult)`.
    pub async fn run_script(
        &self,
        source: &str,
        variables: Vec<(String, Value)>,
        previous_result: Value,
        timeout: Duration,
    ) -> ScriptOutcome {
        let request = ScriptRequest::new(source)
            .with_variables(variables)
            .with_previous_result(previous_result)
            .with_timeout(timeout);
        self.execute(request).await
    }

    /// Execute a request. Never returns an error; failures are folded into
    /// the outcome.
    pub async fn execute(&self, request: ScriptRequest) -> ScriptOutcome {
        let start_time = Instant::now();

        if let Err(error) = self.validate(&request.source) {
            tracing::warn!(error = %error, "script rejected by vetting");
            let mut stats = self.stats.write().await;
            stats.total_runs += 1;
            stats.rejected += 1;
            return ScriptOutcome::failed(error, start_time.elapsed());
        }

        let abandoned = self.abandoned.live();
        if abandoned >= self.config.max_abandoned_workers {
            let error = ScriptError::Overloaded { abandoned };
            tracing::warn!(abandoned, "script refused; too many runaway workers still running");
            let mut stats = self.stats.write().await;
            stats.total_runs += 1;
            stats.rejected += 1;
            return ScriptOutcome::failed(error, start_time.elapsed());
        }

        let result = self.run_on_worker(&request).await;
        let execution_time = start_time.elapsed();
        self.update_stats(&result, execution_time).await;

        match result {
            Ok(value) => ScriptOutcome::succeeded(value, execution_time),
            Err(error) => ScriptOutcome::failed(error, execution_time),
        }
    }

    pub async fn get_stats(&self) -> ScriptStats {
        self.stats.read().await.clone()
    }

    async fn run_on_worker(&self, request: &ScriptRequest) -> Result<Value, ScriptError> {
        let timeout = request.timeout;
        let timeout_ms = timeout.as_millis() as u64;
        let source = request.source.clone();
        let context_data = request.context_data();
        let previous_result = request.previous_result.clone();
        let config = self.config.clone();
        let loop_limit = config.loop_iteration_limit(timeout);
        let slot = self.abandoned.track();
        let worker_slot = slot.clone();

        let (tx, rx) = oneshot::channel();
        // Detached on purpose: a runaway script must not block the caller or
        // the runtime shutdown.
        std::thread::Builder::new()
            .name("liveflow-script".into())
            .stack_size(config.worker_stack_size)
            .spawn(move || {
                let _finished = FinishOnDrop(worker_slot);
                let started = Instant::now();
                let result = execute_js(
                    &source,
                    &context_data,
                    &previous_result,
                    &config,
                    loop_limit,
                    timeout_ms,
                );
                let result = if started.elapsed() > timeout {
                    Err(ScriptError::Timeout { timeout_ms })
                } else {
                    result
                };
                let _ = tx.send(result);
            })
            .map_err(|e| ScriptError::InternalError(format!("Failed to spawn script worker: {}", e)))?;

        match tokio::time::timeout(timeout.saturating_add(self.config.watchdog_buffer), rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ScriptError::InternalError(
                "script worker exited without reporting".to_string(),
            )),
            Err(_) => {
                slot.abandon();
                tracing::warn!(
                    timeout_ms,
                    loop_limit,
                    "script exceeded its budget; abandoning the worker environment"
                );
                Err(ScriptError::Timeout { timeout_ms })
            }
        }
    }

    async fn update_stats(&self, result: &Result<Value, ScriptError>, execution_time: Duration) {
        let mut stats = self.stats.write().await;
        stats.total_runs += 1;
        match result {
            Ok(_) => stats.succeeded += 1,
            Err(ScriptError::Timeout { .. }) => stats.timed_out += 1,
            Err(_) => stats.failed += 1,
        }
        let executed = stats.succeeded + stats.failed + stats.timed_out;
        if executed == 1 {
            stats.avg_execution_time = execution_time;
        } else {
            let total_ns = stats.avg_execution_time.as_nanos() as u64 * (executed - 1)
                + execution_time.as_nanos() as u64;
            stats.avg_execution_time = Duration::from_nanos(total_ns / executed);
        }
    }
}

impl Default for ScriptSandbox {
    fn default() -> Self {
        Self::new(ScriptSandboxConfig::default())
    }
}

/// Removes every global not in the allowlist and optionally freezes the
/// shared prototypes. Runs before user code in a throwaway function scope.
fn isolation_prelude(config: &ScriptSandboxConfig) -> String {
    let allowed_list = config
        .allowed_globals
        .iter()
        .map(|s| format!("\"{}\"", s))
        .collect::<Vec<_>>()
        .join(",");
    let freeze = if config.freeze_prototypes {
        "freeze(Object.prototype); freeze(Array.prototype); freeze(Object.getPrototypeOf(function () {}));"
    } else {
        ""
    };
    format!(
        r#"
(function (allowed) {{
    var g = this;
    var freeze = Object.freeze;
    {freeze}
    Object.getOwnPropertyNames(g).forEach(function (key) {{
        if (allowed.indexOf(key) !== -1) {{ return; }}
        try {{ delete g[key]; }} catch (e) {{}}
        if (key in g) {{
            try {{ g[key] = undefined; }} catch (e) {{}}
        }}
    }});
}}).call(this, [{allowed_list}]);
"#,
        freeze = freeze,
        allowed_list = allowed_list,
    )
}

/// Wraps the user source so it evaluates to the script function with host
/// globals shadowed as `undefined`.
fn wrap_source(source: &str) -> String {
    let body = source.trim().trim_end_matches(';').trim_end();
    format!(
        "(function () {{\n\"use strict\";\nvar {shadowed};\nreturn (\n{body}\n);\n}})()",
        shadowed = SHADOWED_HOST_GLOBALS.join(", "),
        body = body,
    )
}

/// Running out of loop iterations or call depth counts as running out of
/// time: both limits derive from the script budget.
fn script_failure(error: JsError, timeout_ms: u64) -> ScriptError {
    match error.as_native() {
        Some(native) if matches!(native.kind, JsNativeErrorKind::RuntimeLimit) => {
            ScriptError::Timeout { timeout_ms }
        }
        _ => ScriptError::ExecutionError(error.to_string()),
    }
}

fn execute_js(
    source: &str,
    context_data: &Value,
    previous_result: &Value,
    config: &ScriptSandboxConfig,
    loop_limit: u64,
    timeout_ms: u64,
) -> Result<Value, ScriptError> {
    let mut context = Context::default();
    let limits = context.runtime_limits_mut();
    limits.set_loop_iteration_limit(loop_limit);
    limits.set_recursion_limit(config.max_recursion_depth);

    crate::builtins::register_all(&mut context)
        .map_err(|e| ScriptError::InternalError(format!("Failed to register builtins: {}", e)))?;

    context
        .eval(Source::from_bytes(&isolation_prelude(config)))
        .map_err(|e| ScriptError::InternalError(format!("Failed to isolate globals: {}", e)))?;

    let function_value = context
        .eval(Source::from_bytes(&wrap_source(source)))
        .map_err(|e| script_failure(e, timeout_ms))?;

    let function = function_value
        .as_callable()
        .cloned()
        .ok_or_else(|| {
            ScriptError::NotCallable(format!("got {}", function_value.display()))
        })?;

    let arity = function
        .get(js_string!("length"), &mut context)
        .and_then(|len| len.to_number(&mut context))
        .map_err(|e| ScriptError::ExecutionError(e.to_string()))?;
    if arity != 2.0 {
        return Err(ScriptError::NotCallable(format!(
            "expected 2 parameters, found {}",
            arity
        )));
    }

    let context_arg = JsValue::from_json(context_data, &mut context)
        .map_err(|e| ScriptError::SerializationError(e.to_string()))?;
    let previous_arg = JsValue::from_json(previous_result, &mut context)
        .map_err(|e| ScriptError::SerializationError(e.to_string()))?;

    let result = function
        .call(&JsValue::undefined(), &[context_arg, previous_arg], &mut context)
        .map_err(|e| script_failure(e, timeout_ms))?;

    if result.is_undefined() {
        return Ok(Value::Null);
    }
    result
        .to_json(&mut context)
        .map_err(|e| ScriptError::SerializationError(e.to_string()))
}

// ================================
// Tests
// ================================
