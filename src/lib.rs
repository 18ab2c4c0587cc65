// Fedplan Federated Query Optimizer

pub mod catalog;
pub mod config;
pub mod query;
pub mod readwrite;

// Re-export key items for convenient access
pub use catalog::ClusterMetadata;
pub use config::{ConfigError, OptimizerConfig};
pub use query::planner::{OptimizedPlan, OptimizerContext, OptimizerError, PlanRef};
pub use query::sql_node::SqlSelect;
pub use readwrite::{ReadQueryLoadBalancer, RoutingError};
