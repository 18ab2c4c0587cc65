// Heuristic Planner
//
// Rule-based rewrite phase. Applies the registry's rules bottom-up until a full pass
// over the tree fires nothing. No costs are compared: the rules only remove redundant
// structure and push work towards the data sources.

use std::sync::Arc;

use log::{debug, error, trace};

use crate::query::planner::error::{OptimizerError, Result};
use crate::query::planner::plan_node::PlanRef;
use crate::query::planner::rules::RuleRegistry;

/// Default cap on rule firings per statement
pub const DEFAULT_MAX_RULE_APPLICATIONS: usize = 1000;

/// Shared, immutable recipe for heuristic planners of one (database, schema) pair
#[derive(Clone)]
pub struct HeuristicPlannerBuilder {
    registry: Arc<RuleRegistry>,
    max_rule_applications: usize,
}

impl HeuristicPlannerBuilder {
    pub fn new(registry: Arc<RuleRegistry>) -> Self {
        HeuristicPlannerBuilder {
            registry,
            max_rule_applications: DEFAULT_MAX_RULE_APPLICATIONS,
        }
    }

    pub fn max_rule_applications(mut self, limit: usize) -> Self {
        self.max_rule_applications = limit;
        self
    }

    pub fn registry(&self) -> &Arc<RuleRegistry> {
        &self.registry
    }

    /// Fresh planner state for one optimization call
    pub fn build(&self) -> HeuristicPlanner {
        HeuristicPlanner {
            registry: self.registry.clone(),
            max_rule_applications: self.max_rule_applications,
            root: None,
            applications: 0,
        }
    }
}

/// Single-use rewrite planner
pub struct HeuristicPlanner {
    registry: Arc<RuleRegistry>,
    max_rule_applications: usize,
    root: Option<PlanRef>,
    applications: usize,
}

impl HeuristicPlanner {
    pub fn set_root(&mut self, plan: PlanRef) {
        self.root = Some(plan);
    }

    /// Rule firings so far
    pub fn applications(&self) -> usize {
        self.applications
    }

    /// Rewrite the root to a fixpoint
    pub fn find_best(mut self) -> Result<PlanRef> {
        let mut current = self.root.take()
            .ok_or_else(|| OptimizerError::internal("heuristic planner has no root"))?;
        let mut passes = 0;
        loop {
            passes += 1;
            let (next, changed) = self.rewrite(&current)?;
            current = next;
            if !changed {
                break;
            }
        }
        debug!("Heuristic rewrite finished after {} pass(es) and {} rule application(s)", passes, self.applications);
        Ok(current)
    }

    /// One bottom-up pass
    fn rewrite(&mut self, node: &PlanRef) -> Result<(PlanRef, bool)> {
        let mut changed = false;
        let mut inputs = Vec::with_capacity(node.inputs().len());
        for input in node.inputs() {
            let (rewritten, input_changed) = self.rewrite(input)?;
            changed |= input_changed;
            inputs.push(rewritten);
        }
        let node = if changed { node.with_inputs(inputs)? } else { node.clone() };
        let (node, fired) = self.apply_rules(node)?;
        Ok((node, changed || fired))
    }

    /// Fire rules on `node` until none matches
    fn apply_rules(&mut self, mut node: PlanRef) -> Result<(PlanRef, bool)> {
        let mut fired_any = false;
        'fixpoint: loop {
            let registry = self.registry.clone();
            for rule in registry.rules_for(node.kind()) {
                let mut outputs = rule.apply(&node)?;
                if outputs.is_empty() {
                    continue;
                }
                let replacement = outputs.swap_remove(0);
                if replacement.row_type() != node.row_type() {
                    return Err(OptimizerError::internal(format!(
                        "{} changed the row type of {}", rule.name(), node.op()
                    )));
                }
                self.applications += 1;
                if self.applications > self.max_rule_applications {
                    error!("Rewrite did not converge: {} exceeded {} rule applications",
                           rule.name(), self.max_rule_applications);
                    return Err(OptimizerError::RuleDivergence {
                        limit: self.max_rule_applications,
                        rule: rule.name().to_string(),
                    });
                }
                trace!("{} fired on {}", rule.name(), node.op());
                node = replacement;
                fired_any = true;
                continue 'fixpoint;
            }
            break;
        }
        Ok((node, fired_any))
    }
}
