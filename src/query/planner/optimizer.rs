// Query Optimizer Implementation
//
// The full pipeline for one statement: conversion to a logical plan, heuristic rewrite,
// then cost-based search for the cheapest executable plan.

use std::fmt;

use log::debug;

use crate::catalog::Schema;
use crate::query::planner::converter::SqlToPlanConverter;
use crate::query::planner::cost_model::Cost;
use crate::query::planner::error::Result;
use crate::query::planner::heuristic::HeuristicPlannerBuilder;
use crate::query::planner::plan_node::PlanRef;
use crate::query::planner::traits::TraitSet;
use crate::query::planner::volcano::PlannerCluster;
use crate::query::sql_node::SqlSelect;

/// Outcome of optimizing one statement
#[derive(Debug, Clone)]
pub struct OptimizedPlan {
    /// Executable plan handed to the execution layer
    pub plan: PlanRef,
    /// Estimated cost of `plan`
    pub cost: Cost,
    /// Logical plan after the rewrite phase
    pub rewritten: PlanRef,
}

impl OptimizedPlan {
    pub fn explain(&self) -> String {
        self.plan.explain()
    }
}

impl fmt::Display for OptimizedPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}cost: {}", self.plan.explain(), self.cost)
    }
}

/// Runs the optimization pipeline for statements addressed to one schema
pub struct Optimizer<'a> {
    schema: &'a Schema,
    heuristic: &'a HeuristicPlannerBuilder,
    cluster: &'a PlannerCluster,
    default_table_rows: u64,
}

impl<'a> Optimizer<'a> {
    pub fn new(
        schema: &'a Schema,
        heuristic: &'a HeuristicPlannerBuilder,
        cluster: &'a PlannerCluster,
        default_table_rows: u64,
    ) -> Self {
        Optimizer {
            schema,
            heuristic,
            cluster,
            default_table_rows,
        }
    }

    /// Statement to logical plan
    pub fn convert(&self, select: &SqlSelect) -> Result<PlanRef> {
        SqlToPlanConverter::new(self.schema, self.default_table_rows).convert(select)
    }

    /// Rule-based rewrite with a fresh heuristic planner
    pub fn rewrite(&self, plan: PlanRef) -> Result<PlanRef> {
        let mut planner = self.heuristic.build();
        planner.set_root(plan);
        planner.find_best()
    }

    /// Cheapest executable plan with a fresh cost-based planner
    pub fn implement(&self, plan: &PlanRef) -> Result<(PlanRef, Cost)> {
        self.cluster.build_planner().find_best(plan, &TraitSet::executable())
    }

    /// Optimize a statement
    pub fn optimize(&self, select: &SqlSelect) -> Result<OptimizedPlan> {
        let logical = self.convert(select)?;
        debug!("Converted plan:\n{}", logical.explain());
        let rewritten = self.rewrite(logical)?;
        debug!("Rewritten plan:\n{}", rewritten.explain());
        let (plan, cost) = self.implement(&rewritten)?;
        debug!("Executable plan ({}):\n{}", cost, plan.explain());
        Ok(OptimizedPlan { plan, cost, rewritten })
    }
}
