// Read Query Load Balancers
//
// Choose the data source serving a read query among the replicas of a splitting rule.

use std::sync::atomic::{AtomicUsize, Ordering};

use linked_hash_map::LinkedHashMap;
use log::trace;
use rand::Rng;

use super::rule_config::AlgorithmConfig;
use super::{Result, RoutingError};

pub const DEFAULT_LOAD_BALANCER_TYPE: &str = "ROUND_ROBIN";

/// Picks the data source for a read query
pub trait ReadQueryLoadBalancer: Send + Sync {
    /// Type name used in rule configuration
    fn balancer_type(&self) -> &str;

    /// Properties the balancer was created with
    fn props(&self) -> &LinkedHashMap<String, String>;

    /// Data source for one read query of rule `name`.
    ///
    /// Queries inside a transaction, and rules without read sources, go to `write`.
    fn select_data_source(&self, name: &str, write: &str, reads: &[String], in_transaction: bool) -> Result<String>;
}

/// Cycles through the read sources in order
#[derive(Debug, Default)]
pub struct RoundRobinLoadBalancer {
    counter: AtomicUsize,
    props: LinkedHashMap<String, String>,
}

impl RoundRobinLoadBalancer {
    pub fn new(props: LinkedHashMap<String, String>) -> Self {
        RoundRobinLoadBalancer {
            counter: AtomicUsize::new(0),
            props,
        }
    }
}

impl ReadQueryLoadBalancer for RoundRobinLoadBalancer {
    fn balancer_type(&self) -> &str {
        DEFAULT_LOAD_BALANCER_TYPE
    }

    fn props(&self) -> &LinkedHashMap<String, String> {
        &self.props
    }

    fn select_data_source(&self, name: &str, write: &str, reads: &[String], in_transaction: bool) -> Result<String> {
        if in_transaction || reads.is_empty() {
            return Ok(write.to_string());
        }
        let index = self.counter.fetch_add(1, Ordering::Relaxed) % reads.len();
        trace!("Rule {} routed read query to {}", name, reads[index]);
        Ok(reads[index].clone())
    }
}

/// Picks a read source uniformly at random
#[derive(Debug, Default)]
pub struct RandomLoadBalancer {
    props: LinkedHashMap<String, String>,
}

impl RandomLoadBalancer {
    pub fn new(props: LinkedHashMap<String, String>) -> Self {
        RandomLoadBalancer { props }
    }
}

impl ReadQueryLoadBalancer for RandomLoadBalancer {
    fn balancer_type(&self) -> &str {
        "RANDOM"
    }

    fn props(&self) -> &LinkedHashMap<String, String> {
        &self.props
    }

    fn select_data_source(&self, name: &str, write: &str, reads: &[String], in_transaction: bool) -> Result<String> {
        if in_transaction || reads.is_empty() {
            return Ok(write.to_string());
        }
        let index = rand::thread_rng().gen_range(0..reads.len());
        trace!("Rule {} routed read query to {}", name, reads[index]);
        Ok(reads[index].clone())
    }
}

/// Build the balancer named by `config`; the type is matched case-insensitively
pub fn create_load_balancer(config: &AlgorithmConfig) -> Result<Box<dyn ReadQueryLoadBalancer>> {
    match config.algorithm_type.to_uppercase().as_str() {
        "ROUND_ROBIN" => Ok(Box::new(RoundRobinLoadBalancer::new(config.props.clone()))),
        "RANDOM" => Ok(Box::new(RandomLoadBalancer::new(config.props.clone()))),
        _ => Err(RoutingError::UnknownLoadBalancer(config.algorithm_type.clone())),
    }
}
