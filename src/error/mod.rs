//! Error types for the flow engine.
//!
//! - [`NodeError`]: errors raised by a single node handler; they stop only
//!   that node's subtree.
//! - [`FlowError`]: errors raised while loading flows or engine configuration.

pub mod flow_error;
pub mod node_error;

pub use flow_error::FlowError;
pub use node_error::NodeError;

/// Convenience alias for flow-level results.
pub type FlowResult<T> = Result<T, FlowError>;
/// Convenience alias for node-level results.
pub type NodeResult<T> = Result<T, NodeError>;
