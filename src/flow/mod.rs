//! Flow graph model and loader.

pub mod model;
pub mod parser;

pub use model::{FlowDefinition, Node, OpTag};
pub use parser::{parse_flow, parse_flows, FlowFormat};
