use thiserror::Error;

/// Node-level errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NodeError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Cannot coerce {value} to {target}")]
    TypeCoercionError { value: String, target: String },
    #[error("Lookup error: {0}")]
    LookupError(String),
    #[error("Unsafe code rejected: {0}")]
    UnsafeCodeError(String),
    #[error("Timeout: script exceeded {0} ms")]
    TimeoutError(u64),
    #[error("Script error: {0}")]
    ScriptError(String),
    #[error("Backend sync error: {0}")]
    BackendSyncError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl NodeError {
    pub fn type_coercion(value: impl std::fmt::Display, target: impl Into<String>) -> Self {
        NodeError::TypeCoercionError {
            value: value.to_string(),
            target: target.into(),
        }
    }

    /// Stable identifier used in structured logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            NodeError::ValidationError(_) => "validation_error",
            NodeError::TypeCoercionError { .. } => "type_coercion_error",
            NodeError::LookupError(_) => "lookup_error",
            NodeError::UnsafeCodeError(_) => "unsafe_code",
            NodeError::TimeoutError(_) => "timeout",
            NodeError::ScriptError(_) => "script_error",
            NodeError::BackendSyncError(_) => "backend_sync_error",
            NodeError::SerializationError(_) => "serialization_error",
        }
    }
}

impl From<serde_json::Error> for NodeError {
    fn from(e: serde_json::Error) -> Self {
        NodeError::SerializationError(e.to_string())
    }
}

#[cfg(feature = "builtin-sandbox-js")]
impl From<liveflow_sandbox_js::ScriptError> for NodeError {
    fn from(e: liveflow_sandbox_js::ScriptError) -> Self {
        use liveflow_sandbox_js::ScriptError;
        match e {
            ScriptError::UnsafeCode(msg) => NodeError::UnsafeCodeError(msg),
            ScriptError::Timeout { timeout_ms } => NodeError::TimeoutError(timeout_ms),
            ScriptError::SerializationError(msg) => NodeError::SerializationError(msg),
            other => NodeError::ScriptError(other.to_string()),
        }
    }
}
