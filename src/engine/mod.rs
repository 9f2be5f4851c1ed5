//! Execution engine: configuration, the tree-walking interpreter and trigger
//! routing.

pub mod config;
pub mod flow_engine;
pub mod triggers;

pub use config::EngineConfig;
pub use flow_engine::{FlowEngine, FlowEngineBuilder, FlowInvocation, FlowRunResult};
pub use triggers::{param_matches, TriggerRunResult};
