// Readwrite Splitting Rule Introspection
//
// Builds the rows of `SHOW READWRITE_SPLITTING RULES` from the rule configuration and
// the sources exported by discovery.

use std::fmt;

use serde::Serialize;

use super::rule_config::{DataSourceRuleConfig, DiscoveryExport, ExportedDataSources, ReadwriteSplittingRuleConfig};

/// A source column whose value may not be known yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SourceCell {
    Known(String),
    /// Dynamic strategy whose discovery data has not been published
    Unknown,
}

impl fmt::Display for SourceCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceCell::Known(value) => write!(f, "{}", value),
            SourceCell::Unknown => write!(f, "<unknown>"),
        }
    }
}

/// One row per configured data source rule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadwriteSplittingRuleRow {
    pub name: String,
    pub auto_aware_data_source_name: String,
    pub write_data_source_query_enabled: String,
    pub write_data_source_name: SourceCell,
    pub read_data_source_names: SourceCell,
    pub load_balancer_type: String,
    pub load_balancer_props: String,
}

impl ReadwriteSplittingRuleRow {
    pub fn cells(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.auto_aware_data_source_name.clone(),
            self.write_data_source_query_enabled.clone(),
            self.write_data_source_name.to_string(),
            self.read_data_source_names.to_string(),
            self.load_balancer_type.clone(),
            self.load_balancer_props.clone(),
        ]
    }
}

pub struct ReadwriteSplittingRuleQuery<'a> {
    config: &'a ReadwriteSplittingRuleConfig,
    export: &'a DiscoveryExport,
}

impl<'a> ReadwriteSplittingRuleQuery<'a> {
    pub const COLUMN_NAMES: [&'static str; 7] = [
        "name",
        "auto_aware_data_source_name",
        "write_data_source_query_enabled",
        "write_data_source_name",
        "read_data_source_names",
        "load_balancer_type",
        "load_balancer_props",
    ];

    pub fn new(config: &'a ReadwriteSplittingRuleConfig, export: &'a DiscoveryExport) -> Self {
        ReadwriteSplittingRuleQuery { config, export }
    }

    pub fn rows(&self) -> Vec<ReadwriteSplittingRuleRow> {
        self.config.data_sources.iter().map(|rule| self.row(rule)).collect()
    }

    fn row(&self, rule: &DataSourceRuleConfig) -> ReadwriteSplittingRuleRow {
        let balancer = rule.load_balancer_name.as_ref()
            .and_then(|name| self.config.load_balancers.get(name));
        let (write, reads) = self.sources(rule);
        ReadwriteSplittingRuleRow {
            name: rule.name.clone(),
            auto_aware_data_source_name: rule.dynamic_strategy.as_ref()
                .map(|d| d.auto_aware_data_source_name.clone())
                .unwrap_or_default(),
            write_data_source_query_enabled: rule.dynamic_strategy.as_ref()
                .map(|d| d.write_data_source_query_enabled.to_string())
                .unwrap_or_default(),
            write_data_source_name: write,
            read_data_source_names: reads,
            load_balancer_type: balancer.map(|b| b.algorithm_type.clone()).unwrap_or_default(),
            load_balancer_props: balancer.map(|b| b.props_string()).unwrap_or_default(),
        }
    }

    /// Exported sources win over the static configuration
    fn sources(&self, rule: &DataSourceRuleConfig) -> (SourceCell, SourceCell) {
        let exported = if rule.dynamic_strategy.is_some() {
            self.export.dynamic.get(&rule.name)
        } else {
            self.export.static_sources.get(&rule.name)
        };
        if let Some(ExportedDataSources { primary_data_source_name, replica_data_source_names }) = exported {
            return (
                SourceCell::Known(primary_data_source_name.clone()),
                SourceCell::Known(replica_data_source_names.join(",")),
            );
        }
        match &rule.static_strategy {
            Some(strategy) => (
                SourceCell::Known(strategy.write_data_source_name.clone()),
                SourceCell::Known(strategy.read_data_source_names.join(",")),
            ),
            None => (SourceCell::Unknown, SourceCell::Unknown),
        }
    }
}
