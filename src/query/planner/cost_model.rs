// Cost Model for Query Optimization
//
// Row-count estimation and per-operator incremental costs. The cost of a plan is the
// sum of the incremental costs of its nodes, so a subtree's cost never changes when
// something above it is replaced.

use std::fmt;
use std::ops::Add;

use crate::query::planner::expression::{BinaryOperator, Literal, ScalarExpr, UnaryOperator};
use crate::query::planner::plan_node::{JoinType, Operator, PlanRef};

/// Default weight of one unit of I/O relative to one unit of CPU
pub const DEFAULT_IO_WEIGHT: f64 = 4.0;

/// Estimated cost of a plan or of one operator
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Cost {
    /// Rows produced
    pub rows: f64,
    /// Rows processed
    pub cpu: f64,
    /// Rows (scaled by width) pulled from data sources
    pub io: f64,
}

impl Cost {
    pub fn new(rows: f64, cpu: f64, io: f64) -> Self {
        Cost { rows, cpu, io }
    }

    pub fn zero() -> Self {
        Cost::default()
    }

    /// Single comparable figure
    pub fn total(&self, io_weight: f64) -> f64 {
        self.cpu + self.io * io_weight
    }

    pub fn is_non_negative(&self) -> bool {
        self.rows >= 0.0 && self.cpu >= 0.0 && self.io >= 0.0
    }
}

impl Add for Cost {
    type Output = Cost;

    fn add(self, other: Cost) -> Cost {
        Cost {
            rows: self.rows + other.rows,
            cpu: self.cpu + other.cpu,
            io: self.io + other.io,
        }
    }
}

impl std::iter::Sum for Cost {
    fn sum<I: Iterator<Item = Cost>>(iter: I) -> Cost {
        iter.fold(Cost::zero(), |acc, c| acc + c)
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{:.1} rows, {:.1} cpu, {:.1} io}}", self.rows, self.cpu, self.io)
    }
}

/// Cardinality and cost estimation
#[derive(Debug, Clone, Copy)]
pub struct CostModel {
    io_weight: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self::new(DEFAULT_IO_WEIGHT)
    }
}

impl CostModel {
    pub fn new(io_weight: f64) -> Self {
        CostModel { io_weight }
    }

    pub fn io_weight(&self) -> f64 {
        self.io_weight
    }

    /// Whether `a` is strictly cheaper than `b`
    pub fn is_cheaper(&self, a: &Cost, b: &Cost) -> bool {
        let (ta, tb) = (a.total(self.io_weight), b.total(self.io_weight));
        ta < tb || (ta == tb && a.rows < b.rows)
    }

    /// Fraction of rows that satisfy `predicate`
    pub fn selectivity(&self, predicate: &ScalarExpr) -> f64 {
        predicate.split_conjunction().iter()
            .map(|c| self.conjunct_selectivity(c))
            .product()
    }

    fn conjunct_selectivity(&self, expr: &ScalarExpr) -> f64 {
        match expr {
            ScalarExpr::Literal(Literal::Boolean(true)) => 1.0,
            ScalarExpr::Literal(Literal::Boolean(false)) | ScalarExpr::Literal(Literal::Null) => 0.0,
            ScalarExpr::Binary { op: BinaryOperator::Eq, .. } => 0.15,
            ScalarExpr::Binary { op: BinaryOperator::NotEq, .. } => 0.85,
            ScalarExpr::Binary { op: BinaryOperator::Lt | BinaryOperator::LtEq | BinaryOperator::Gt | BinaryOperator::GtEq, .. } => 0.5,
            ScalarExpr::Binary { op: BinaryOperator::And, .. } => self.selectivity(expr),
            ScalarExpr::Binary { op: BinaryOperator::Or, left, right, .. } => {
                (self.selectivity(left) + self.selectivity(right)).min(1.0)
            }
            ScalarExpr::Unary { op: UnaryOperator::Not, expr } => 1.0 - self.selectivity(expr),
            ScalarExpr::IsNull { negated: false, .. } => 0.1,
            ScalarExpr::IsNull { negated: true, .. } => 0.9,
            _ => 0.25,
        }
    }

    /// Output rows of `op` given the output rows of its inputs
    pub fn estimate_rows(&self, op: &Operator, input_rows: &[f64]) -> f64 {
        let rows = match op {
            Operator::TableScan(scan) | Operator::ExecTableScan(scan) => {
                let selectivity: f64 = scan.filters.iter().map(|f| self.selectivity(f)).product();
                scan.row_count as f64 * selectivity
            }
            Operator::Filter { predicate } | Operator::ExecFilter { predicate } => {
                input_rows[0] * self.selectivity(predicate)
            }
            Operator::Project { .. } | Operator::ExecProject { .. } => input_rows[0],
            Operator::Join { join_type, condition }
            | Operator::NestedLoopJoin { join_type, condition }
            | Operator::HashJoin { join_type, condition, .. }
            | Operator::MergeJoin { join_type, condition, .. } => {
                self.join_rows(*join_type, condition, input_rows[0], input_rows[1])
            }
            Operator::Aggregate { group_keys, .. }
            | Operator::HashAggregate { group_keys, .. }
            | Operator::SortAggregate { group_keys, .. } => {
                if group_keys.is_empty() {
                    1.0
                } else {
                    (input_rows[0] * 0.1).max(1.0).min(input_rows[0].max(1.0))
                }
            }
            Operator::Sort { offset, fetch, .. }
            | Operator::ExecSort { offset, fetch, .. }
            | Operator::ExecLimit { offset, fetch } => {
                let after_offset = (input_rows[0] - offset.unwrap_or(0) as f64).max(0.0);
                match fetch {
                    Some(fetch) => after_offset.min(*fetch as f64),
                    None => after_offset,
                }
            }
        };
        rows.max(0.0)
    }

    fn join_rows(&self, join_type: JoinType, condition: &ScalarExpr, left: f64, right: f64) -> f64 {
        // Equi conjuncts make the join behave like a lookup on the larger side
        let (equi, other): (Vec<ScalarExpr>, Vec<ScalarExpr>) = condition.split_conjunction()
            .into_iter()
            .partition(|c| matches!(c, ScalarExpr::Binary { op: BinaryOperator::Eq, left, right, .. }
                if left.as_input_ref().is_some() && right.as_input_ref().is_some()));
        let residual: f64 = other.iter().map(|c| self.conjunct_selectivity(c)).product();
        let inner = if equi.is_empty() {
            left * right * residual
        } else {
            left.max(right) * residual
        };
        match join_type {
            JoinType::Inner => inner,
            JoinType::Left => inner.max(left),
            JoinType::Right => inner.max(right),
            JoinType::Full => inner.max(left).max(right),
        }
    }

    /// Cost of `op` itself, excluding its inputs
    pub fn incremental_cost(&self, op: &Operator, rows: f64, input_rows: &[f64]) -> Cost {
        let (cpu, io) = match op {
            Operator::ExecTableScan(scan) => {
                let width = scan.output_columns().len() as f64;
                let fraction = if scan.columns.is_empty() { 1.0 } else { (width / scan.columns.len() as f64).max(0.1) };
                (rows, rows * fraction)
            }
            Operator::ExecFilter { .. } => (input_rows[0], 0.0),
            Operator::ExecProject { .. } => (input_rows[0] * 0.1, 0.0),
            Operator::NestedLoopJoin { .. } => (input_rows[0] * input_rows[1], 0.0),
            Operator::HashJoin { .. } => (input_rows[0] + 2.0 * input_rows[1], 0.0),
            Operator::MergeJoin { .. } => (input_rows[0] + input_rows[1], 0.0),
            Operator::HashAggregate { .. } => (1.5 * input_rows[0], 0.0),
            Operator::SortAggregate { .. } => (input_rows[0], 0.0),
            Operator::ExecSort { offset, fetch, .. } => {
                let n = input_rows[0];
                // A bounded sort only keeps offset + fetch rows in its heap
                let kept = match fetch {
                    Some(fetch) => fetch.saturating_add(offset.unwrap_or(0)) as f64,
                    None => n,
                };
                (n * (kept.min(n) + 1.0).log2(), 0.0)
            }
            Operator::ExecLimit { offset, fetch } => {
                let n = input_rows[0];
                let read = match fetch {
                    Some(fetch) => (fetch.saturating_add(offset.unwrap_or(0)) as f64).min(n),
                    None => n,
                };
                (read, 0.0)
            }
            // Logical operators are never costed
            _ => (0.0, 0.0),
        };
        Cost::new(rows, cpu.max(0.0), io.max(0.0))
    }

    /// Output rows and cumulative cost of a whole plan
    pub fn plan_cost(&self, plan: &PlanRef) -> (f64, Cost) {
        let mut input_rows = Vec::with_capacity(plan.inputs().len());
        let mut total = Cost::zero();
        for input in plan.inputs() {
            let (rows, cost) = self.plan_cost(input);
            input_rows.push(rows);
            total = total + cost;
        }
        let rows = self.estimate_rows(plan.op(), &input_rows);
        (rows, total + self.incremental_cost(plan.op(), rows, &input_rows))
    }
}
