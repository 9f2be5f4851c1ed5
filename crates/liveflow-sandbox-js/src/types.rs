use std::time::Duration;

use serde_json::Value;

use crate::error::ScriptError;

/// Placeholder result reported by failed runs.
pub const FAILED_RESULT: &str = "none";

// ================================
// Request / Outcome / Config
// ================================

/// A single script invocation
#[derive(Debug, Clone)]
pub struct ScriptRequest {
    /// Source that must evaluate to `function (contextData, previousResult)`
    pub source: String,

    /// Variables exposed to the script as the `contextData` object
    pub variables: Vec<(String, Value)>,

    /// Value passed as `previousResult`
    pub previous_result: Value,

    /// Script budget; the watchdog adds the configured buffer on top
    pub timeout: Duration,
}

impl ScriptRequest {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            variables: Vec::new(),
            previous_result: Value::Null,
            timeout: Duration::from_millis(1000),
        }
    }

    pub fn with_variables(mut self, variables: Vec<(String, Value)>) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_previous_result(mut self, previous_result: Value) -> Self {
        self.previous_result = previous_result;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the `contextData` object. Later duplicates win.
    pub fn context_data(&self) -> Value {
        let mut map = serde_json::Map::with_capacity(self.variables.len());
        for (id, value) in &self.variables {
            map.insert(id.clone(), value.clone());
        }
        Value::Object(map)
    }
}

/// Outcome of a script run. Failures never escape as panics or `Err`.
#[derive(Debug, Clone)]
pub struct ScriptOutcome {
    /// Whether the script ran to completion
    pub success: bool,

    /// Returned value, or `"none"` on failure
    pub result: Value,

    /// Failure cause (if failed)
    pub error: Option<ScriptError>,

    /// Wall-clock time spent waiting for the script
    pub execution_time: Duration,
}

impl ScriptOutcome {
    pub fn succeeded(result: Value, execution_time: Duration) -> Self {
        Self {
            success: true,
            result,
            error: None,
            execution_time,
        }
    }

    pub fn failed(error: ScriptError, execution_time: Duration) -> Self {
        Self {
            success: false,
            result: Value::String(FAILED_RESULT.to_string()),
            error: Some(error),
            execution_time,
        }
    }

    /// Error message, empty on success
    pub fn error_message(&self) -> String {
        self.error
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_default()
    }

    pub fn into_result(self) -> Result<Value, ScriptError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result),
        }
    }
}

/// Sandbox statistics
#[derive(Debug, Clone, Default)]
pub struct ScriptStats {
    /// Total runs, including rejected ones
    pub total_runs: u64,

    /// Runs that returned a value
    pub succeeded: u64,

    /// Runs that threw or returned something unusable
    pub failed: u64,

    /// Runs refused by static vetting
    pub rejected: u64,

    /// Runs abandoned by the watchdog
    pub timed_out: u64,

    /// Average wall-clock time of executed runs
    pub avg_execution_time: Duration,
}
