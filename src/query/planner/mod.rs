// Query Planner Module
//
// Turns a statement into an executable plan: conversion to a logical operator tree,
// rule-based rewriting, then cost-based selection of executable operators.

pub mod context;
pub mod converter;
pub mod cost_model;
pub mod error;
pub mod expression;
pub mod heuristic;
pub mod implementation;
pub mod optimizer;
pub mod plan_node;
pub mod rules;
pub mod traits;
pub mod volcano;

// Export key types
pub use self::context::{ContextSnapshot, OptimizerContext};
pub use self::converter::SqlToPlanConverter;
pub use self::cost_model::{Cost, CostModel};
pub use self::error::{OptimizerError, Result};
pub use self::heuristic::{HeuristicPlanner, HeuristicPlannerBuilder};
pub use self::optimizer::{OptimizedPlan, Optimizer};
pub use self::plan_node::{Operator, OperatorKind, PlanNode, PlanRef};
pub use self::rules::{Rule, RuleRegistry};
pub use self::traits::{Convention, SortKey, TraitSet};
pub use self::volcano::{PlannerCluster, VolcanoPlanner};
