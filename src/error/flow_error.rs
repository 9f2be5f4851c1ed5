//! Flow-level error types.

use super::NodeError;
use thiserror::Error;

/// Errors raised while loading flows and configuration
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Flow parse error: {0}")]
    ParseError(String),
    #[error("Flow not found: {0}")]
    FlowNotFound(String),
    #[error("Config error: {0}")]
    ConfigError(String),
    #[error("Node error: {0}")]
    NodeError(Box<NodeError>),
}

impl From<NodeError> for FlowError {
    fn from(value: NodeError) -> Self {
        FlowError::NodeError(Box::new(value))
    }
}
