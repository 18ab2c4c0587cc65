// Implementation Rules
//
// Map each logical operator to the executable operators able to run it. An
// alternative states which traits it needs from each input; the cost-based planner
// fetches the cheapest input plans for those traits and costs the result.

use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::query::planner::expression::ScalarExpr;
use crate::query::planner::plan_node::{JoinType, Operator, OperatorKind};
use crate::query::planner::traits::{SortKey, TraitSet};

/// One executable way to run a logical operator
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalAlternative {
    /// Executable operator; `None` hands the single input through unchanged
    pub op: Option<Operator>,
    /// Traits required of each input
    pub input_traits: Vec<TraitSet>,
}

impl PhysicalAlternative {
    fn new(op: Operator, input_traits: Vec<TraitSet>) -> Self {
        PhysicalAlternative { op: Some(op), input_traits }
    }

    fn passthrough(input_traits: TraitSet) -> Self {
        PhysicalAlternative { op: None, input_traits: vec![input_traits] }
    }
}

/// Produces executable alternatives for one logical operator kind
pub trait ImplementationRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn pattern(&self) -> OperatorKind;

    /// Alternatives for `op`, whose inputs have `input_widths` fields, under the
    /// `required` traits. Alternatives need not satisfy `required` themselves.
    fn implement(&self, op: &Operator, input_widths: &[usize], required: &TraitSet) -> Vec<PhysicalAlternative>;
}

/// Every shipped implementation rule
pub static DEFAULT_IMPLEMENTATIONS: Lazy<Arc<Vec<Box<dyn ImplementationRule>>>> = Lazy::new(|| {
    Arc::new(vec![
        Box::new(ScanImplementation),
        Box::new(FilterImplementation),
        Box::new(ProjectImplementation),
        Box::new(NestedLoopJoinImplementation),
        Box::new(HashJoinImplementation),
        Box::new(MergeJoinImplementation),
        Box::new(AggregateImplementation),
        Box::new(SortImplementation),
    ])
});

fn executable(collation: Vec<SortKey>) -> TraitSet {
    TraitSet::executable().with_collation(collation)
}

pub struct ScanImplementation;

impl ImplementationRule for ScanImplementation {
    fn name(&self) -> &'static str {
        "ExecTableScanRule"
    }

    fn pattern(&self) -> OperatorKind {
        OperatorKind::TableScan
    }

    fn implement(&self, op: &Operator, _input_widths: &[usize], _required: &TraitSet) -> Vec<PhysicalAlternative> {
        match op {
            Operator::TableScan(scan) => vec![PhysicalAlternative::new(Operator::ExecTableScan(scan.clone()), vec![])],
            _ => vec![],
        }
    }
}

/// Filters keep the order of their input, so a required ordering is passed down
pub struct FilterImplementation;

impl ImplementationRule for FilterImplementation {
    fn name(&self) -> &'static str {
        "ExecFilterRule"
    }

    fn pattern(&self) -> OperatorKind {
        OperatorKind::Filter
    }

    fn implement(&self, op: &Operator, _input_widths: &[usize], required: &TraitSet) -> Vec<PhysicalAlternative> {
        match op {
            Operator::Filter { predicate } => vec![PhysicalAlternative::new(
                Operator::ExecFilter { predicate: predicate.clone() },
                vec![executable(required.collation.clone())],
            )],
            _ => vec![],
        }
    }
}

/// Projections pass a required ordering down when every key is a plain column
pub struct ProjectImplementation;

impl ImplementationRule for ProjectImplementation {
    fn name(&self) -> &'static str {
        "ExecProjectRule"
    }

    fn pattern(&self) -> OperatorKind {
        OperatorKind::Project
    }

    fn implement(&self, op: &Operator, _input_widths: &[usize], required: &TraitSet) -> Vec<PhysicalAlternative> {
        let Operator::Project { exprs, names } = op else {
            return vec![];
        };
        let input_collation: Option<Vec<SortKey>> = required.collation.iter()
            .map(|k| exprs[k.index].as_input_ref().map(|index| SortKey { index, descending: k.descending }))
            .collect();
        vec![PhysicalAlternative::new(
            Operator::ExecProject { exprs: exprs.clone(), names: names.clone() },
            vec![executable(input_collation.unwrap_or_default())],
        )]
    }
}

/// Equi-join key pairs of a join condition
pub fn equi_join_keys(condition: &ScalarExpr, left_width: usize) -> (Vec<usize>, Vec<usize>) {
    condition.split_conjunction().iter()
        .filter_map(|c| c.as_equi_join_key(left_width))
        .unzip()
}

pub struct NestedLoopJoinImplementation;

impl ImplementationRule for NestedLoopJoinImplementation {
    fn name(&self) -> &'static str {
        "NestedLoopJoinRule"
    }

    fn pattern(&self) -> OperatorKind {
        OperatorKind::Join
    }

    fn implement(&self, op: &Operator, input_widths: &[usize], required: &TraitSet) -> Vec<PhysicalAlternative> {
        let Operator::Join { join_type, condition } = op else {
            return vec![];
        };
        if *join_type == JoinType::Full {
            return vec![];
        }
        // The outer loop runs over the left input, whose order survives inner and left joins
        let left_collation = if matches!(join_type, JoinType::Inner | JoinType::Left)
            && required.collation.iter().all(|k| k.index < input_widths[0])
        {
            required.collation.clone()
        } else {
            Vec::new()
        };
        vec![PhysicalAlternative::new(
            Operator::NestedLoopJoin { join_type: *join_type, condition: condition.clone() },
            vec![executable(left_collation), TraitSet::executable()],
        )]
    }
}

pub struct HashJoinImplementation;

impl ImplementationRule for HashJoinImplementation {
    fn name(&self) -> &'static str {
        "HashJoinRule"
    }

    fn pattern(&self) -> OperatorKind {
        OperatorKind::Join
    }

    fn implement(&self, op: &Operator, input_widths: &[usize], _required: &TraitSet) -> Vec<PhysicalAlternative> {
        let Operator::Join { join_type, condition } = op else {
            return vec![];
        };
        let (left_keys, right_keys) = equi_join_keys(condition, input_widths[0]);
        if left_keys.is_empty() {
            return vec![];
        }
        vec![PhysicalAlternative::new(
            Operator::HashJoin { join_type: *join_type, condition: condition.clone(), left_keys, right_keys },
            vec![TraitSet::executable(), TraitSet::executable()],
        )]
    }
}

pub struct MergeJoinImplementation;

impl ImplementationRule for MergeJoinImplementation {
    fn name(&self) -> &'static str {
        "MergeJoinRule"
    }

    fn pattern(&self) -> OperatorKind {
        OperatorKind::Join
    }

    fn implement(&self, op: &Operator, input_widths: &[usize], _required: &TraitSet) -> Vec<PhysicalAlternative> {
        let Operator::Join { join_type, condition } = op else {
            return vec![];
        };
        if !matches!(join_type, JoinType::Inner | JoinType::Left) {
            return vec![];
        }
        let (left_keys, right_keys) = equi_join_keys(condition, input_widths[0]);
        if left_keys.is_empty() {
            return vec![];
        }
        let left_collation = left_keys.iter().map(|k| SortKey::asc(*k)).collect();
        let right_collation = right_keys.iter().map(|k| SortKey::asc(*k)).collect();
        vec![PhysicalAlternative::new(
            Operator::MergeJoin { join_type: *join_type, condition: condition.clone(), left_keys, right_keys },
            vec![executable(left_collation), executable(right_collation)],
        )]
    }
}

pub struct AggregateImplementation;

impl ImplementationRule for AggregateImplementation {
    fn name(&self) -> &'static str {
        "AggregateRule"
    }

    fn pattern(&self) -> OperatorKind {
        OperatorKind::Aggregate
    }

    fn implement(&self, op: &Operator, _input_widths: &[usize], _required: &TraitSet) -> Vec<PhysicalAlternative> {
        let Operator::Aggregate { group_keys, aggs } = op else {
            return vec![];
        };
        let mut alternatives = vec![PhysicalAlternative::new(
            Operator::HashAggregate { group_keys: group_keys.clone(), aggs: aggs.clone() },
            vec![TraitSet::executable()],
        )];
        if !group_keys.is_empty() {
            let collation = group_keys.iter().map(|k| SortKey::asc(*k)).collect();
            alternatives.push(PhysicalAlternative::new(
                Operator::SortAggregate { group_keys: group_keys.clone(), aggs: aggs.clone() },
                vec![executable(collation)],
            ));
        }
        alternatives
    }
}

/// A sort either sorts, or relies on an input that is already in order
pub struct SortImplementation;

impl ImplementationRule for SortImplementation {
    fn name(&self) -> &'static str {
        "SortRule"
    }

    fn pattern(&self) -> OperatorKind {
        OperatorKind::Sort
    }

    fn implement(&self, op: &Operator, _input_widths: &[usize], _required: &TraitSet) -> Vec<PhysicalAlternative> {
        let Operator::Sort { keys, offset, fetch } = op else {
            return vec![];
        };
        let mut alternatives = Vec::new();
        if !keys.is_empty() {
            alternatives.push(PhysicalAlternative::new(
                Operator::ExecSort { keys: keys.clone(), offset: *offset, fetch: *fetch },
                vec![TraitSet::executable()],
            ));
        }
        if offset.is_some() || fetch.is_some() {
            alternatives.push(PhysicalAlternative::new(
                Operator::ExecLimit { offset: *offset, fetch: *fetch },
                vec![executable(keys.clone())],
            ));
        } else if !keys.is_empty() {
            alternatives.push(PhysicalAlternative::passthrough(executable(keys.clone())));
        }
        alternatives
    }
}
