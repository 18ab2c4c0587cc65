// Scan Pushdown Rules
//
// Hand filters and column pruning to the data source that owns the table, so fewer
// rows and columns travel through the federation layer.

use std::collections::BTreeSet;

use crate::query::planner::error::Result;
use crate::query::planner::expression::ScalarExpr;
use crate::query::planner::plan_node::{Operator, OperatorKind, PlanNode, PlanRef, ScanSpec};
use crate::query::planner::rules::Rule;

/// Moves a filter directly above a table scan into the scan
pub struct FilterIntoScanRule;

impl Rule for FilterIntoScanRule {
    fn name(&self) -> &'static str {
        "FilterIntoScanRule"
    }

    fn pattern(&self) -> OperatorKind {
        OperatorKind::Filter
    }

    fn apply(&self, node: &PlanRef) -> Result<Vec<PlanRef>> {
        let (Operator::Filter { predicate }, Operator::TableScan(scan)) = (node.op(), node.input(0).op()) else {
            return Ok(vec![]);
        };
        // Scan filters are expressed over the table columns, not the scan output
        let output = scan.output_columns();
        let mut filters = scan.filters.clone();
        filters.extend(predicate.split_conjunction().iter().map(|c| c.map_input_refs(&|i| output[i])));
        let spec = ScanSpec { filters, ..scan.clone() };
        Ok(vec![PlanNode::new(Operator::TableScan(spec), vec![])?])
    }
}

/// Prunes the columns a table scan reads to those a projection above it uses. A
/// projection of plain columns is absorbed into the scan entirely.
pub struct ProjectIntoScanRule;

impl Rule for ProjectIntoScanRule {
    fn name(&self) -> &'static str {
        "ProjectIntoScanRule"
    }

    fn pattern(&self) -> OperatorKind {
        OperatorKind::Project
    }

    fn apply(&self, node: &PlanRef) -> Result<Vec<PlanRef>> {
        let (Operator::Project { exprs, names }, Operator::TableScan(scan)) = (node.op(), node.input(0).op()) else {
            return Ok(vec![]);
        };
        let output = scan.output_columns();

        let refs: Option<Vec<usize>> = exprs.iter().map(|e| e.as_input_ref()).collect();
        if let Some(refs) = refs {
            let spec = ScanSpec {
                projection: Some(refs.iter().map(|i| output[*i]).collect()),
                ..scan.clone()
            };
            let absorbed = PlanNode::new(Operator::TableScan(spec), vec![])?;
            if absorbed.row_type() == node.row_type() {
                return Ok(vec![absorbed]);
            }
        }

        let used: BTreeSet<usize> = exprs.iter().flat_map(|e| e.input_refs()).collect();
        if used.len() >= output.len() {
            return Ok(vec![]);
        }
        let used: Vec<usize> = used.into_iter().collect();
        let spec = ScanSpec {
            projection: Some(used.iter().map(|i| output[*i]).collect()),
            ..scan.clone()
        };
        let narrowed = PlanNode::new(Operator::TableScan(spec), vec![])?;
        let remapped: Vec<ScalarExpr> = exprs.iter()
            .map(|e| e.map_input_refs(&|i| used.iter().position(|u| *u == i).unwrap_or(i)))
            .collect();
        Ok(vec![PlanNode::new(Operator::Project { exprs: remapped, names: names.clone() }, vec![narrowed])?])
    }
}
