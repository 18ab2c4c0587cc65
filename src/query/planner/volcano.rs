// Cost-Based Planner
//
// Memo-based physical search. The rewritten logical tree is registered into groups of
// equivalent expressions; the search then asks every group, top-down, for its cheapest
// executable plan under a trait requirement and memoises the answer per
// (group, traits). A sort enforcer is considered whenever an ordering is required.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, trace, warn};

use crate::config::OptimizerConfig;
use crate::query::planner::cost_model::{Cost, CostModel};
use crate::query::planner::error::{OptimizerError, Result};
use crate::query::planner::implementation::{ImplementationRule, DEFAULT_IMPLEMENTATIONS};
use crate::query::planner::plan_node::{Operator, PlanNode, PlanRef, RowType};
use crate::query::planner::traits::{Convention, TraitSet};

/// Index of a group in the memo
pub type GroupId = usize;

/// Immutable state shared by every cost-based planner of an optimizer context
#[derive(Clone)]
pub struct PlannerCluster {
    cost_model: CostModel,
    implementations: Arc<Vec<Box<dyn ImplementationRule>>>,
    max_search_steps: Option<usize>,
    search_timeout: Option<Duration>,
}

impl PlannerCluster {
    pub fn new(config: &OptimizerConfig) -> Self {
        PlannerCluster {
            cost_model: CostModel::new(config.io_cost_weight),
            implementations: DEFAULT_IMPLEMENTATIONS.clone(),
            max_search_steps: config.max_search_steps,
            search_timeout: config.search_timeout_ms.map(Duration::from_millis),
        }
    }

    pub fn cost_model(&self) -> &CostModel {
        &self.cost_model
    }

    /// Fresh planner state for one optimization call
    pub fn build_planner(&self) -> VolcanoPlanner<'_> {
        VolcanoPlanner {
            cluster: self,
            groups: Vec::new(),
            dedup: HashMap::new(),
            in_progress: HashSet::new(),
            steps: 0,
            deadline: self.search_timeout.map(|t| Instant::now() + t),
            budget_exhausted: false,
            first_failure: None,
        }
    }
}

/// A logical expression whose inputs are groups
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MemoExpr {
    op: Operator,
    inputs: Vec<GroupId>,
}

#[derive(Debug, Clone)]
struct Winner {
    plan: PlanRef,
    cost: Cost,
}

/// Equivalence set: logical expressions producing the same rows
#[derive(Debug)]
struct Group {
    exprs: Vec<MemoExpr>,
    rows: f64,
    row_type: RowType,
    /// Cheapest plan per required trait set; `None` when none exists
    winners: HashMap<TraitSet, Option<Winner>>,
}

/// Single-use cost-based planner
pub struct VolcanoPlanner<'a> {
    cluster: &'a PlannerCluster,
    groups: Vec<Group>,
    dedup: HashMap<MemoExpr, GroupId>,
    in_progress: HashSet<(GroupId, TraitSet)>,
    steps: usize,
    deadline: Option<Instant>,
    budget_exhausted: bool,
    first_failure: Option<String>,
}

impl<'a> VolcanoPlanner<'a> {
    /// Register a logical tree; identical subtrees land in the same group
    pub fn register(&mut self, plan: &PlanRef) -> Result<GroupId> {
        if plan.traits().convention != Convention::Logical {
            return Err(OptimizerError::internal(format!(
                "cannot register executable node {} in the memo", plan.op()
            )));
        }
        let mut inputs = Vec::with_capacity(plan.inputs().len());
        for input in plan.inputs() {
            inputs.push(self.register(input)?);
        }
        let expr = MemoExpr { op: plan.op().clone(), inputs };
        if let Some(group) = self.dedup.get(&expr) {
            return Ok(*group);
        }

        let input_rows: Vec<f64> = expr.inputs.iter().map(|g| self.groups[*g].rows).collect();
        let rows = self.cluster.cost_model.estimate_rows(&expr.op, &input_rows);
        let id = self.groups.len();
        self.groups.push(Group {
            exprs: vec![expr.clone()],
            rows,
            row_type: plan.row_type().clone(),
            winners: HashMap::new(),
        });
        self.dedup.insert(expr, id);
        Ok(id)
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Alternatives costed so far
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Register `root` and return its cheapest plan satisfying `required`
    pub fn find_best(mut self, root: &PlanRef, required: &TraitSet) -> Result<(PlanRef, Cost)> {
        let group = self.register(root)?;
        debug!("Memo holds {} group(s) for a {}-node plan", self.groups.len(), root.node_count());
        match self.optimize_group(group, required)? {
            Some(winner) => {
                debug!("Cost-based search costed {} alternative(s); best cost {}", self.steps, winner.cost);
                Ok((winner.plan, winner.cost))
            }
            None => {
                let reason = if self.budget_exhausted {
                    format!("search budget exhausted after {} step(s) before a plan satisfying {} was found",
                            self.steps, required)
                } else {
                    self.first_failure.unwrap_or_else(|| format!("no plan satisfies {}", required))
                };
                Err(OptimizerError::NoFeasiblePlan(reason))
            }
        }
    }

    fn budget_left(&mut self) -> bool {
        if self.budget_exhausted {
            return false;
        }
        let over_steps = self.cluster.max_search_steps.is_some_and(|max| self.steps >= max);
        let over_time = self.deadline.is_some_and(|d| Instant::now() >= d);
        if over_steps || over_time {
            warn!("Cost-based search budget exhausted after {} step(s)", self.steps);
            self.budget_exhausted = true;
            return false;
        }
        self.steps += 1;
        true
    }

    fn optimize_group(&mut self, group: GroupId, required: &TraitSet) -> Result<Option<Winner>> {
        if let Some(winner) = self.groups[group].winners.get(required) {
            return Ok(winner.clone());
        }
        let key = (group, required.clone());
        if !self.in_progress.insert(key.clone()) {
            return Ok(None);
        }

        let mut best: Option<Winner> = None;
        let exprs = self.groups[group].exprs.clone();
        for expr in &exprs {
            for candidate in self.implement_expr(group, expr, required)? {
                self.consider(&mut best, candidate, required);
            }
        }
        if !required.collation.is_empty() {
            if let Some(candidate) = self.enforce_sort(group, required)? {
                self.consider(&mut best, candidate, required);
            }
        }

        self.in_progress.remove(&key);
        // Results found after the budget ran out may be incomplete; do not memoise them
        if best.is_some() || !self.budget_exhausted {
            self.groups[group].winners.insert(required.clone(), best.clone());
        }
        if best.is_none() && self.first_failure.is_none() && !self.budget_exhausted {
            let op = &self.groups[group].exprs[0].op;
            self.first_failure = Some(format!("no executable implementation of {} satisfies {}", op, required));
        }
        Ok(best)
    }

    fn consider(&self, best: &mut Option<Winner>, candidate: Winner, required: &TraitSet) {
        if !candidate.plan.traits().satisfies(required) {
            return;
        }
        let better = match best {
            Some(current) => self.cluster.cost_model.is_cheaper(&candidate.cost, &current.cost),
            None => true,
        };
        if better {
            trace!("New winner {} at {}", candidate.plan.op(), candidate.cost);
            *best = Some(candidate);
        }
    }

    /// Executable candidates for one logical expression
    fn implement_expr(&mut self, group: GroupId, expr: &MemoExpr, required: &TraitSet) -> Result<Vec<Winner>> {
        let cluster = self.cluster;
        let input_widths: Vec<usize> = expr.inputs.iter().map(|g| self.groups[*g].row_type.len()).collect();
        let mut candidates = Vec::new();

        for rule in cluster.implementations.iter().filter(|r| r.pattern() == expr.op.kind()) {
            for alternative in rule.implement(&expr.op, &input_widths, required) {
                if !self.budget_left() {
                    return Ok(candidates);
                }
                let mut input_winners = Vec::with_capacity(expr.inputs.len());
                for (input, traits) in expr.inputs.iter().zip(&alternative.input_traits) {
                    match self.optimize_group(*input, traits)? {
                        Some(winner) => input_winners.push(winner),
                        None => break,
                    }
                }
                if input_winners.len() != expr.inputs.len() {
                    continue;
                }

                let candidate = match alternative.op {
                    None => input_winners.swap_remove(0),
                    Some(op) => {
                        let input_rows: Vec<f64> = expr.inputs.iter().map(|g| self.groups[*g].rows).collect();
                        let own = cluster.cost_model.incremental_cost(&op, self.groups[group].rows, &input_rows);
                        let cost = input_winners.iter().map(|w| w.cost).sum::<Cost>() + own;
                        let plan = PlanNode::new(op, input_winners.into_iter().map(|w| w.plan).collect())?;
                        Winner { plan, cost }
                    }
                };
                trace!("{} proposed {}", rule.name(), candidate.plan.op());
                candidates.push(candidate);
            }
        }
        Ok(candidates)
    }

    /// Cheapest unordered plan of the group with a sort on top
    fn enforce_sort(&mut self, group: GroupId, required: &TraitSet) -> Result<Option<Winner>> {
        let unordered = required.clone().with_collation(Vec::new());
        let Some(input) = self.optimize_group(group, &unordered)? else {
            return Ok(None);
        };
        if !self.budget_left() {
            return Ok(None);
        }
        let rows = self.groups[group].rows;
        let op = Operator::ExecSort { keys: required.collation.clone(), offset: None, fetch: None };
        let own = self.cluster.cost_model.incremental_cost(&op, rows, &[rows]);
        let plan = PlanNode::new(op, vec![input.plan])?;
        Ok(Some(Winner { plan, cost: input.cost + own }))
    }
}
