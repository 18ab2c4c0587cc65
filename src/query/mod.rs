// Query Processing Module
//
// Statement representation handed over by the dialect layer, and the planner that
// optimizes it.

pub mod planner;
pub mod sql_node;

pub use planner::{OptimizedPlan, OptimizerContext, OptimizerError};
pub use sql_node::SqlSelect;
