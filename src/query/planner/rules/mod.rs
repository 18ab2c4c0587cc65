//! Rewrite Rules
//!
//! Pattern-matched local rewrites used by the heuristic planner. Every rule fires on a
//! single operator kind, inspects the node (and its inputs) and returns zero or more
//! equivalent replacements with exactly the input's row type.

mod filter_pushdown;
mod projection;
mod scan_pushdown;

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::config::{ConfigError, OptimizerConfig};
use crate::query::planner::error::Result;
use crate::query::planner::expression::ScalarExpr;
use crate::query::planner::plan_node::{Operator, OperatorKind, PlanNode, PlanRef};

pub use self::filter_pushdown::{
    FilterAggregateTransposeRule, FilterJoinRule, FilterMergeRule, FilterProjectTransposeRule,
    FilterReduceTrueRule, JoinConditionPushRule,
};
pub use self::projection::{ProjectMergeRule, ProjectRemoveRule, SortRemoveRule};
pub use self::scan_pushdown::{FilterIntoScanRule, ProjectIntoScanRule};

/// A rewrite rule
pub trait Rule: Send + Sync {
    /// Name used in configuration and logs
    fn name(&self) -> &'static str;

    /// Operator kind of the nodes this rule inspects
    fn pattern(&self) -> OperatorKind;

    /// Equivalent replacements for `node`; empty when the rule does not apply
    fn apply(&self, node: &PlanRef) -> Result<Vec<PlanRef>>;
}

/// Process-wide registry holding every shipped rule
pub static DEFAULT_REGISTRY: Lazy<Arc<RuleRegistry>> = Lazy::new(|| Arc::new(RuleRegistry::default_rules()));

/// Ordered, immutable rule collection indexed by operator kind
pub struct RuleRegistry {
    rules: Vec<Arc<dyn Rule>>,
    by_kind: HashMap<OperatorKind, Vec<usize>>,
}

impl RuleRegistry {
    pub fn new(rules: Vec<Arc<dyn Rule>>) -> Self {
        let mut by_kind: HashMap<OperatorKind, Vec<usize>> = HashMap::new();
        for (position, rule) in rules.iter().enumerate() {
            by_kind.entry(rule.pattern()).or_default().push(position);
        }
        RuleRegistry { rules, by_kind }
    }

    /// Every shipped rule, in firing order
    pub fn default_rules() -> Self {
        RuleRegistry::new(all_rules())
    }

    /// Shipped rules restricted to `names`, keeping the default firing order
    pub fn with_enabled(names: &[String]) -> std::result::Result<Self, ConfigError> {
        let rules = all_rules();
        if let Some(unknown) = names.iter().find(|n| !rules.iter().any(|r| r.name() == n.as_str())) {
            return Err(ConfigError::UnknownRule(unknown.clone()));
        }
        Ok(RuleRegistry::new(
            rules.into_iter().filter(|r| names.iter().any(|n| n == r.name())).collect(),
        ))
    }

    /// Registry selected by `config.enabled_rules`
    pub fn from_config(config: &OptimizerConfig) -> std::result::Result<Arc<Self>, ConfigError> {
        match &config.enabled_rules {
            None => Ok(DEFAULT_REGISTRY.clone()),
            Some(names) => Ok(Arc::new(RuleRegistry::with_enabled(names)?)),
        }
    }

    /// Rules firing on `kind`, in registry order
    pub fn rules_for(&self, kind: OperatorKind) -> impl Iterator<Item = &Arc<dyn Rule>> + '_ {
        self.by_kind.get(&kind).into_iter().flatten().map(move |i| &self.rules[*i])
    }

    pub fn rules(&self) -> &[Arc<dyn Rule>] {
        &self.rules
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn all_rules() -> Vec<Arc<dyn Rule>> {
    vec![
        Arc::new(FilterReduceTrueRule),
        Arc::new(FilterMergeRule),
        Arc::new(FilterIntoScanRule),
        Arc::new(FilterProjectTransposeRule),
        Arc::new(FilterJoinRule),
        Arc::new(FilterAggregateTransposeRule),
        Arc::new(JoinConditionPushRule),
        Arc::new(ProjectRemoveRule),
        Arc::new(ProjectMergeRule),
        Arc::new(ProjectIntoScanRule),
        Arc::new(SortRemoveRule),
    ]
}

/// `Filter(conjuncts)` over `input`, or `input` itself when there is nothing to filter
pub(crate) fn filter_over(input: PlanRef, conjuncts: Vec<ScalarExpr>) -> Result<PlanRef> {
    match ScalarExpr::conjunction(conjuncts) {
        Some(predicate) => PlanNode::new(Operator::Filter { predicate }, vec![input]),
        None => Ok(input),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_index() {
        let registry = RuleRegistry::default_rules();
        let filter_rules: Vec<&str> = registry.rules_for(OperatorKind::Filter).map(|r| r.name()).collect();
        assert_eq!(filter_rules[0], "FilterReduceTrueRule");
        assert!(filter_rules.contains(&"FilterJoinRule"));
        assert!(!filter_rules.contains(&"ProjectMergeRule"));
        assert_eq!(registry.rules_for(OperatorKind::HashJoin).count(), 0);
    }

    #[test]
    fn test_enabled_rules_keep_default_order() {
        let names = vec!["ProjectMergeRule".to_string(), "FilterMergeRule".to_string()];
        let registry = RuleRegistry::with_enabled(&names).unwrap();
        assert_eq!(registry.names(), vec!["FilterMergeRule", "ProjectMergeRule"]);

        let unknown = RuleRegistry::with_enabled(&["NoSuchRule".to_string()]);
        assert!(matches!(unknown, Err(ConfigError::UnknownRule(name)) if name == "NoSuchRule"));
    }

    #[test]
    fn test_default_config_shares_static_registry() {
        let registry = RuleRegistry::from_config(&OptimizerConfig::default()).unwrap();
        assert!(Arc::ptr_eq(&registry, &DEFAULT_REGISTRY));
    }
}
