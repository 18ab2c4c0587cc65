//! Read/Write Splitting
//!
//! Collaborators of the federation layer that route read queries to replicas of a
//! logical data source, and the introspection rows describing the configured
//! splitting rules.

mod load_balancer;
mod rule_config;
mod rule_query;

use thiserror::Error;

pub use self::load_balancer::{
    create_load_balancer, RandomLoadBalancer, ReadQueryLoadBalancer, RoundRobinLoadBalancer,
    DEFAULT_LOAD_BALANCER_TYPE,
};
pub use self::rule_config::{
    AlgorithmConfig, DataSourceRuleConfig, DiscoveryExport, DynamicStrategyConfig,
    ExportedDataSources, ReadwriteSplittingRuleConfig, StaticStrategyConfig,
};
pub use self::rule_query::{ReadwriteSplittingRuleQuery, ReadwriteSplittingRuleRow, SourceCell};

/// Errors raised while routing or describing read/write splitting rules
#[derive(Error, Debug)]
pub enum RoutingError {
    #[error("Unknown load balancer type: {0}")]
    UnknownLoadBalancer(String),

    #[error("Invalid readwrite-splitting rule '{name}': {reason}")]
    InvalidRule {
        name: String,
        reason: String,
    },

    #[error("Failed to parse readwrite-splitting rules: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RoutingError>;
