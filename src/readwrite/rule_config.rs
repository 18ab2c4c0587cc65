// Read/Write Splitting Rule Configuration

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use linked_hash_map::LinkedHashMap;
use serde::{Deserialize, Serialize};

use super::{Result, RoutingError};

/// Named algorithm with its properties, in declaration order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmConfig {
    #[serde(rename = "type")]
    pub algorithm_type: String,
    #[serde(default)]
    pub props: LinkedHashMap<String, String>,
}

impl AlgorithmConfig {
    pub fn new(algorithm_type: impl Into<String>) -> Self {
        AlgorithmConfig {
            algorithm_type: algorithm_type.into(),
            props: LinkedHashMap::new(),
        }
    }

    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    /// Properties as `k=v` pairs joined by commas
    pub fn props_string(&self) -> String {
        self.props.iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Write and read sources listed explicitly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticStrategyConfig {
    pub write_data_source_name: String,
    #[serde(default)]
    pub read_data_source_names: Vec<String>,
}

/// Sources discovered at runtime from an auto-aware data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicStrategyConfig {
    pub auto_aware_data_source_name: String,
    #[serde(default = "default_write_query_enabled")]
    pub write_data_source_query_enabled: bool,
}

fn default_write_query_enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSourceRuleConfig {
    pub name: String,
    #[serde(default)]
    pub static_strategy: Option<StaticStrategyConfig>,
    #[serde(default)]
    pub dynamic_strategy: Option<DynamicStrategyConfig>,
    #[serde(default)]
    pub load_balancer_name: Option<String>,
}

impl DataSourceRuleConfig {
    pub fn with_static(name: impl Into<String>, write: impl Into<String>, reads: &[&str]) -> Self {
        DataSourceRuleConfig {
            name: name.into(),
            static_strategy: Some(StaticStrategyConfig {
                write_data_source_name: write.into(),
                read_data_source_names: reads.iter().map(|s| s.to_string()).collect(),
            }),
            dynamic_strategy: None,
            load_balancer_name: None,
        }
    }

    pub fn with_dynamic(name: impl Into<String>, auto_aware: impl Into<String>) -> Self {
        DataSourceRuleConfig {
            name: name.into(),
            static_strategy: None,
            dynamic_strategy: Some(DynamicStrategyConfig {
                auto_aware_data_source_name: auto_aware.into(),
                write_data_source_query_enabled: true,
            }),
            load_balancer_name: None,
        }
    }

    pub fn with_load_balancer(mut self, name: impl Into<String>) -> Self {
        self.load_balancer_name = Some(name.into());
        self
    }
}

/// All splitting rules of one logical database
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadwriteSplittingRuleConfig {
    pub data_sources: Vec<DataSourceRuleConfig>,
    pub load_balancers: LinkedHashMap<String, AlgorithmConfig>,
}

impl ReadwriteSplittingRuleConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ReadwriteSplittingRuleConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Each rule names exactly one strategy and, if any, a declared balancer
    pub fn validate(&self) -> Result<()> {
        for rule in &self.data_sources {
            let invalid = |reason: &str| RoutingError::InvalidRule {
                name: rule.name.clone(),
                reason: reason.to_string(),
            };
            match (&rule.static_strategy, &rule.dynamic_strategy) {
                (None, None) => return Err(invalid("no static or dynamic strategy")),
                (Some(_), Some(_)) => return Err(invalid("both static and dynamic strategy")),
                _ => {}
            }
            if let Some(balancer) = &rule.load_balancer_name {
                if !self.load_balancers.contains_key(balancer) {
                    return Err(invalid(&format!("unknown load balancer '{}'", balancer)));
                }
            }
        }
        Ok(())
    }
}

/// Write and read sources as currently known for one rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedDataSources {
    pub primary_data_source_name: String,
    #[serde(default)]
    pub replica_data_source_names: Vec<String>,
}

/// Source assignments exported by the discovery and splitting rules, keyed by rule name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryExport {
    pub dynamic: HashMap<String, ExportedDataSources>,
    #[serde(rename = "static")]
    pub static_sources: HashMap<String, ExportedDataSources>,
}
