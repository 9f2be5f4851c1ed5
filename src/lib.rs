//! # LiveFlow: a flow interpreter for live-ops game events
//!
//! `liveflow` runs designer-authored flows: trees of nodes that react to game
//! events (session start, offer shown, stat changed, ...) by reading and
//! writing player state. A run walks the tree depth-first and feeds each
//! node's result to its children as the previous result.
//!
//! - **Nodes**: arithmetic, variables, branches, switches, sticky split tests,
//!   segment and stat changes, config rewrites, offers, analytics events,
//!   nested custom flows and sandboxed JavaScript.
//! - **Isolation**: a failing node is logged and only its subtree is skipped.
//! - **Context pool**: per-run state is recycled instead of reallocated.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use liveflow::{parse_flow, FlowEngine, FlowFormat};
//!
//! #[tokio::main]
//! async fn main() {
//!     let json = std::fs::read_to_string("flow.json").unwrap();
//!     let flow = parse_flow(&json, FlowFormat::Json).unwrap();
//!     let engine = FlowEngine::builder().build();
//!     let locals = engine.execute(&flow, None, None).await;
//!     println!("{:?}", locals);
//! }
//! ```
//!
//! # Feature Flags
//!
//! | Flag | Description |
//! |------|-------------|
//! | `builtin-sandbox-js` | Bundles the JavaScript sandbox (Boa engine) behind `act_run_code` |

pub mod collaborators;
pub mod core;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod flow;
pub mod nodes;
pub mod value;

pub use crate::collaborators::{
    BackendAction, BackendActionSender, BackendCredentials, CustomFlowDispatcher, EntityConfig,
    EntityRegistry, FlowRegistry, OfferSnapshot, PlayerStore, RandomSource, StatTemplate,
    StatType, TemplateRegistry,
};
pub use crate::core::{ContextPool, ExecutionContext, PoolStats, VariableStore};
pub use crate::engine::{
    EngineConfig, FlowEngine, FlowEngineBuilder, FlowInvocation, FlowRunResult,
    TriggerRunResult,
};
pub use crate::error::{FlowError, FlowResult, NodeError, NodeResult};
pub use crate::flow::{parse_flow, parse_flows, FlowDefinition, FlowFormat, Node, OpTag};
pub use crate::value::{NumberLocale, ValueRef, ValueType};
