//! Per-run state: variable store, execution context and the context pool.

pub mod context_pool;
pub mod execution_context;
pub mod variable_store;

pub use context_pool::{ContextPool, PoolStats};
pub use execution_context::ExecutionContext;
pub use variable_store::VariableStore;
