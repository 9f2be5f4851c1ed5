/// Script sandbox errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScriptError {
    #[error("Script too large (max {max} bytes, got {actual} bytes)")]
    CodeTooLarge { max: usize, actual: usize },

    #[error("Unsafe code rejected: {0}")]
    UnsafeCode(String),

    #[error("Script must evaluate to a function (contextData, previousResult): {0}")]
    NotCallable(String),

    #[error("Script error: {0}")]
    ExecutionError(String),

    #[error("Script timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("Script refused: {abandoned} timed-out workers still running")]
    Overloaded { abandoned: usize },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ScriptError {
    /// Stable identifier used in structured logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            ScriptError::CodeTooLarge { .. } => "script_too_large",
            ScriptError::UnsafeCode(_) => "unsafe_code",
            ScriptError::NotCallable(_) => "script_not_callable",
            ScriptError::ExecutionError(_) => "script_execution_error",
            ScriptError::Timeout { .. } => "script_timeout",
            ScriptError::Overloaded { .. } => "script_overloaded",
            ScriptError::SerializationError(_) => "serialization_error",
            ScriptError::InternalError(_) => "internal_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_error_display() {
        assert_eq!(
            ScriptError::Timeout { timeout_ms: 1000 }.to_string(),
            "Script timed out after 1000 ms"
        );
        assert_eq!(
            ScriptError::CodeTooLarge { max: 10, actual: 20 }.to_string(),
            "Script too large (max 10 bytes, got 20 bytes)"
        );
        assert!(ScriptError::UnsafeCode("eval(".into())
            .to_string()
            .contains("eval("));
    }

    #[test]
    fn test_script_error_codes() {
        assert_eq!(ScriptError::UnsafeCode(String::new()).error_code(), "unsafe_code");
        assert_eq!(
            ScriptError::Timeout { timeout_ms: 1 }.error_code(),
            "script_timeout"
        );
        assert_eq!(
            ScriptError::Overloaded { abandoned: 4 }.error_code(),
            "script_overloaded"
        );
    }
}
