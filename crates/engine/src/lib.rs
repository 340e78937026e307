//! Workflow node engine
//!
//! Typed execution of call-flow nodes: a registry of node contracts, schema
//! validation that reports every violation at once, condition evaluation for
//! branch nodes, and a dispatcher that turns validated node data into
//! structured call-control decisions.

pub mod condition;
pub mod data;
pub mod engine;
pub mod result;
pub mod types;

pub use condition::{evaluate_condition, Operator};
pub use data::{validate_node_data, NodeData, Validation};
pub use engine::{ExecutionContext, WorkflowEngine};
pub use result::ExecutionResult;
pub use types::{node_config, ExecutionFlags, NodeCategory, NodeConfig, NodeType};
