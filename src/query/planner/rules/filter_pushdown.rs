// Filter Pushdown Rules
//
// Move predicates as close to the data sources as the operator semantics allow.
// Every rule returns nothing when it would leave the tree unchanged.

use log::trace;

use crate::query::planner::error::Result;
use crate::query::planner::expression::ScalarExpr;
use crate::query::planner::plan_node::{JoinType, Operator, OperatorKind, PlanNode, PlanRef};
use crate::query::planner::rules::{filter_over, Rule};

/// `Filter(p1)` over `Filter(p2)` becomes one `Filter(p2 AND p1)`
pub struct FilterMergeRule;

impl Rule for FilterMergeRule {
    fn name(&self) -> &'static str {
        "FilterMergeRule"
    }

    fn pattern(&self) -> OperatorKind {
        OperatorKind::Filter
    }

    fn apply(&self, node: &PlanRef) -> Result<Vec<PlanRef>> {
        let (Operator::Filter { predicate: outer }, Operator::Filter { predicate: inner }) =
            (node.op(), node.input(0).op()) else {
            return Ok(vec![]);
        };
        let merged = ScalarExpr::and(inner.clone(), outer.clone());
        let input = node.input(0).input(0).clone();
        Ok(vec![PlanNode::new(Operator::Filter { predicate: merged }, vec![input])?])
    }
}

/// Removes a filter whose predicate is always true
pub struct FilterReduceTrueRule;

impl Rule for FilterReduceTrueRule {
    fn name(&self) -> &'static str {
        "FilterReduceTrueRule"
    }

    fn pattern(&self) -> OperatorKind {
        OperatorKind::Filter
    }

    fn apply(&self, node: &PlanRef) -> Result<Vec<PlanRef>> {
        match node.op() {
            Operator::Filter { predicate } if predicate.split_conjunction().is_empty() => {
                Ok(vec![node.input(0).clone()])
            }
            _ => Ok(vec![]),
        }
    }
}

/// `Filter` over `Project` becomes `Project` over `Filter`, with the predicate
/// rewritten in terms of the projection's input
pub struct FilterProjectTransposeRule;

impl Rule for FilterProjectTransposeRule {
    fn name(&self) -> &'static str {
        "FilterProjectTransposeRule"
    }

    fn pattern(&self) -> OperatorKind {
        OperatorKind::Filter
    }

    fn apply(&self, node: &PlanRef) -> Result<Vec<PlanRef>> {
        let (Operator::Filter { predicate }, Operator::Project { exprs, .. }) = (node.op(), node.input(0).op()) else {
            return Ok(vec![]);
        };
        let project = node.input(0);
        let pushed = predicate.substitute(exprs);
        let filter = PlanNode::new(Operator::Filter { predicate: pushed }, vec![project.input(0).clone()])?;
        Ok(vec![project.with_inputs(vec![filter])?])
    }
}

/// Which sides of a join a predicate may be pushed to without changing the result
fn pushable_sides(join_type: JoinType) -> (bool, bool) {
    match join_type {
        JoinType::Inner => (true, true),
        JoinType::Left => (true, false),
        JoinType::Right => (false, true),
        JoinType::Full => (false, false),
    }
}

/// Pushes conjuncts of a filter above a join into the join inputs, or into the join
/// condition for inner joins. Conjuncts over the null-generating side of an outer
/// join stay above it.
pub struct FilterJoinRule;

impl Rule for FilterJoinRule {
    fn name(&self) -> &'static str {
        "FilterJoinRule"
    }

    fn pattern(&self) -> OperatorKind {
        OperatorKind::Filter
    }

    fn apply(&self, node: &PlanRef) -> Result<Vec<PlanRef>> {
        let (Operator::Filter { predicate }, Operator::Join { join_type, condition }) =
            (node.op(), node.input(0).op()) else {
            return Ok(vec![]);
        };
        let join = node.input(0);
        let left_width = join.input(0).row_type().len();
        let (push_left, push_right) = pushable_sides(*join_type);

        let mut left_preds = Vec::new();
        let mut right_preds = Vec::new();
        let mut join_preds = condition.split_conjunction();
        let mut remaining = Vec::new();
        let mut changed = false;

        for conjunct in predicate.split_conjunction() {
            let refs = conjunct.input_refs();
            if push_left && refs.iter().all(|i| *i < left_width) {
                left_preds.push(conjunct);
                changed = true;
            } else if push_right && !refs.is_empty() && refs.iter().all(|i| *i >= left_width) {
                right_preds.push(conjunct.shift(-(left_width as isize)));
                changed = true;
            } else if *join_type == JoinType::Inner {
                join_preds.push(conjunct);
                changed = true;
            } else {
                remaining.push(conjunct);
            }
        }
        if !changed {
            return Ok(vec![]);
        }

        trace!("FilterJoinRule: {} left, {} right, {} kept above", left_preds.len(), right_preds.len(), remaining.len());
        let left = filter_over(join.input(0).clone(), left_preds)?;
        let right = filter_over(join.input(1).clone(), right_preds)?;
        let condition = ScalarExpr::conjunction(join_preds).unwrap_or_else(ScalarExpr::true_literal);
        let new_join = PlanNode::new(Operator::Join { join_type: *join_type, condition }, vec![left, right])?;
        Ok(vec![filter_over(new_join, remaining)?])
    }
}

/// Pushes single-sided conjuncts of a join condition into the join inputs. For outer
/// joins only the null-generating side may be restricted this way.
pub struct JoinConditionPushRule;

impl Rule for JoinConditionPushRule {
    fn name(&self) -> &'static str {
        "JoinConditionPushRule"
    }

    fn pattern(&self) -> OperatorKind {
        OperatorKind::Join
    }

    fn apply(&self, node: &PlanRef) -> Result<Vec<PlanRef>> {
        let Operator::Join { join_type, condition } = node.op() else {
            return Ok(vec![]);
        };
        if condition.is_true() {
            return Ok(vec![]);
        }
        let left_width = node.input(0).row_type().len();
        // In an ON clause the preserved side is never filtered, the other side may be
        let (push_left, push_right) = match join_type {
            JoinType::Inner => (true, true),
            JoinType::Left => (false, true),
            JoinType::Right => (true, false),
            JoinType::Full => (false, false),
        };

        let mut left_preds = Vec::new();
        let mut right_preds = Vec::new();
        let mut kept = Vec::new();
        for conjunct in condition.split_conjunction() {
            let refs = conjunct.input_refs();
            if refs.is_empty() {
                kept.push(conjunct);
            } else if push_left && refs.iter().all(|i| *i < left_width) {
                left_preds.push(conjunct);
            } else if push_right && refs.iter().all(|i| *i >= left_width) {
                right_preds.push(conjunct.shift(-(left_width as isize)));
            } else {
                kept.push(conjunct);
            }
        }
        if left_preds.is_empty() && right_preds.is_empty() {
            return Ok(vec![]);
        }

        let left = filter_over(node.input(0).clone(), left_preds)?;
        let right = filter_over(node.input(1).clone(), right_preds)?;
        let condition = ScalarExpr::conjunction(kept).unwrap_or_else(ScalarExpr::true_literal);
        Ok(vec![PlanNode::new(Operator::Join { join_type: *join_type, condition }, vec![left, right])?])
    }
}

/// Pushes conjuncts that only read group keys below an aggregate
pub struct FilterAggregateTransposeRule;

impl Rule for FilterAggregateTransposeRule {
    fn name(&self) -> &'static str {
        "FilterAggregateTransposeRule"
    }

    fn pattern(&self) -> OperatorKind {
        OperatorKind::Filter
    }

    fn apply(&self, node: &PlanRef) -> Result<Vec<PlanRef>> {
        let (Operator::Filter { predicate }, Operator::Aggregate { group_keys, .. }) =
            (node.op(), node.input(0).op()) else {
            return Ok(vec![]);
        };
        let aggregate = node.input(0);
        let key_count = group_keys.len();

        let (pushed, remaining): (Vec<ScalarExpr>, Vec<ScalarExpr>) = predicate
            .split_conjunction()
            .into_iter()
            .partition(|c| {
                let refs = c.input_refs();
                !refs.is_empty() && refs.iter().all(|i| *i < key_count)
            });
        if pushed.is_empty() {
            return Ok(vec![]);
        }

        let below: Vec<ScalarExpr> = pushed.iter().map(|c| c.map_input_refs(&|i| group_keys[i])).collect();
        let input = filter_over(aggregate.input(0).clone(), below)?;
        let new_aggregate = aggregate.with_inputs(vec![input])?;
        Ok(vec![filter_over(new_aggregate, remaining)?])
    }
}
