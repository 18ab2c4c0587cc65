// Projection and Sort Simplification Rules

use crate::query::planner::error::Result;
use crate::query::planner::plan_node::{Operator, OperatorKind, PlanNode, PlanRef};
use crate::query::planner::rules::Rule;

/// `Project(outer)` over `Project(inner)` becomes a single projection
pub struct ProjectMergeRule;

impl Rule for ProjectMergeRule {
    fn name(&self) -> &'static str {
        "ProjectMergeRule"
    }

    fn pattern(&self) -> OperatorKind {
        OperatorKind::Project
    }

    fn apply(&self, node: &PlanRef) -> Result<Vec<PlanRef>> {
        let (Operator::Project { exprs: outer, names }, Operator::Project { exprs: inner, .. }) =
            (node.op(), node.input(0).op()) else {
            return Ok(vec![]);
        };
        let exprs = outer.iter().map(|e| e.substitute(inner)).collect();
        let input = node.input(0).input(0).clone();
        Ok(vec![PlanNode::new(Operator::Project { exprs, names: names.clone() }, vec![input])?])
    }
}

/// Drops a projection that returns its input unchanged
pub struct ProjectRemoveRule;

impl Rule for ProjectRemoveRule {
    fn name(&self) -> &'static str {
        "ProjectRemoveRule"
    }

    fn pattern(&self) -> OperatorKind {
        OperatorKind::Project
    }

    fn apply(&self, node: &PlanRef) -> Result<Vec<PlanRef>> {
        let Operator::Project { exprs, .. } = node.op() else {
            return Ok(vec![]);
        };
        let input = node.input(0);
        let is_identity = exprs.len() == input.row_type().len()
            && exprs.iter().enumerate().all(|(i, e)| e.as_input_ref() == Some(i))
            && node.row_type() == input.row_type();
        if is_identity {
            Ok(vec![input.clone()])
        } else {
            Ok(vec![])
        }
    }
}

/// Drops a sort that neither orders nor limits
pub struct SortRemoveRule;

impl Rule for SortRemoveRule {
    fn name(&self) -> &'static str {
        "SortRemoveRule"
    }

    fn pattern(&self) -> OperatorKind {
        OperatorKind::Sort
    }

    fn apply(&self, node: &PlanRef) -> Result<Vec<PlanRef>> {
        match node.op() {
            Operator::Sort { keys, offset, fetch }
                if keys.is_empty() && offset.unwrap_or(0) == 0 && fetch.is_none() =>
            {
                Ok(vec![node.input(0).clone()])
            }
            _ => Ok(vec![]),
        }
    }
}
