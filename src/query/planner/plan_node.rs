// Plan Node Implementation
//
// Immutable relational operator trees. A node owns its operator and shares its inputs
// through `Arc`, so rewrites rebuild only the path from the changed node to the root.
// Row type and traits are derived in `PlanNode::new` from the operator and the inputs
// alone, which is what lets the cost-based planner share sub-plans between alternatives.

use std::fmt;
use std::sync::Arc;

use crate::catalog::{DataType, Table};
use crate::query::planner::error::{OptimizerError, Result};
use crate::query::planner::expression::{AggCall, ScalarExpr};
use crate::query::planner::traits::{Convention, SortKey, TraitSet};

/// Shared handle to an immutable plan node
pub type PlanRef = Arc<PlanNode>;

/// One output column of a plan node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Field {
            name: name.into(),
            data_type,
            nullable,
        }
    }
}

/// Ordered output columns of a plan node
pub type RowType = Vec<Field>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JoinType::Inner => "inner",
            JoinType::Left => "left",
            JoinType::Right => "right",
            JoinType::Full => "full",
        };
        write!(f, "{}", name)
    }
}

/// Table access, including everything pushed down to the data source
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScanSpec {
    pub table: String,
    /// Physical data source holding the table
    pub data_source: String,
    /// Every column of the table
    pub columns: Vec<Field>,
    /// Estimated number of rows in the table
    pub row_count: u64,
    /// Columns read, as indexes into `columns`; `None` reads all of them
    pub projection: Option<Vec<usize>>,
    /// Conjuncts evaluated by the data source, referencing `columns` positions
    pub filters: Vec<ScalarExpr>,
}

impl ScanSpec {
    /// Full scan of a catalog table
    pub fn from_table(table: &Table, default_rows: u64) -> Self {
        ScanSpec {
            table: table.name().to_string(),
            data_source: table.data_source().to_string(),
            columns: table.columns().iter()
                .map(|c| Field::new(c.name(), *c.data_type(), c.is_nullable()))
                .collect(),
            row_count: table.row_count().unwrap_or(default_rows),
            projection: None,
            filters: Vec::new(),
        }
    }

    /// Output column positions, as indexes into `columns`
    pub fn output_columns(&self) -> Vec<usize> {
        match &self.projection {
            Some(projection) => projection.clone(),
            None => (0..self.columns.len()).collect(),
        }
    }

    pub fn row_type(&self) -> RowType {
        self.output_columns().into_iter().map(|i| self.columns[i].clone()).collect()
    }
}

/// Relational operators, logical and executable
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operator {
    // Logical convention
    TableScan(ScanSpec),
    Filter {
        predicate: ScalarExpr,
    },
    Project {
        exprs: Vec<ScalarExpr>,
        names: Vec<String>,
    },
    Join {
        join_type: JoinType,
        condition: ScalarExpr,
    },
    Aggregate {
        group_keys: Vec<usize>,
        aggs: Vec<AggCall>,
    },
    Sort {
        keys: Vec<SortKey>,
        offset: Option<u64>,
        fetch: Option<u64>,
    },

    // Executable convention
    ExecTableScan(ScanSpec),
    ExecFilter {
        predicate: ScalarExpr,
    },
    ExecProject {
        exprs: Vec<ScalarExpr>,
        names: Vec<String>,
    },
    NestedLoopJoin {
        join_type: JoinType,
        condition: ScalarExpr,
    },
    HashJoin {
        join_type: JoinType,
        condition: ScalarExpr,
        left_keys: Vec<usize>,
        right_keys: Vec<usize>,
    },
    MergeJoin {
        join_type: JoinType,
        condition: ScalarExpr,
        left_keys: Vec<usize>,
        right_keys: Vec<usize>,
    },
    HashAggregate {
        group_keys: Vec<usize>,
        aggs: Vec<AggCall>,
    },
    SortAggregate {
        group_keys: Vec<usize>,
        aggs: Vec<AggCall>,
    },
    ExecSort {
        keys: Vec<SortKey>,
        offset: Option<u64>,
        fetch: Option<u64>,
    },
    ExecLimit {
        offset: Option<u64>,
        fetch: Option<u64>,
    },
}

/// Operator discriminant; rules are indexed by it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperatorKind {
    TableScan,
    Filter,
    Project,
    Join,
    Aggregate,
    Sort,
    ExecTableScan,
    ExecFilter,
    ExecProject,
    NestedLoopJoin,
    HashJoin,
    MergeJoin,
    HashAggregate,
    SortAggregate,
    ExecSort,
    ExecLimit,
}

impl Operator {
    pub fn kind(&self) -> OperatorKind {
        match self {
            Operator::TableScan(_) => OperatorKind::TableScan,
            Operator::Filter { .. } => OperatorKind::Filter,
            Operator::Project { .. } => OperatorKind::Project,
            Operator::Join { .. } => OperatorKind::Join,
            Operator::Aggregate { .. } => OperatorKind::Aggregate,
            Operator::Sort { .. } => OperatorKind::Sort,
            Operator::ExecTableScan(_) => OperatorKind::ExecTableScan,
            Operator::ExecFilter { .. } => OperatorKind::ExecFilter,
            Operator::ExecProject { .. } => OperatorKind::ExecProject,
            Operator::NestedLoopJoin { .. } => OperatorKind::NestedLoopJoin,
            Operator::HashJoin { .. } => OperatorKind::HashJoin,
            Operator::MergeJoin { .. } => OperatorKind::MergeJoin,
            Operator::HashAggregate { .. } => OperatorKind::HashAggregate,
            Operator::SortAggregate { .. } => OperatorKind::SortAggregate,
            Operator::ExecSort { .. } => OperatorKind::ExecSort,
            Operator::ExecLimit { .. } => OperatorKind::ExecLimit,
        }
    }

    pub fn convention(&self) -> Convention {
        match self {
            Operator::TableScan(_)
            | Operator::Filter { .. }
            | Operator::Project { .. }
            | Operator::Join { .. }
            | Operator::Aggregate { .. }
            | Operator::Sort { .. } => Convention::Logical,
            _ => Convention::Executable,
        }
    }

    /// Number of inputs the operator takes
    pub fn arity(&self) -> usize {
        match self {
            Operator::TableScan(_) | Operator::ExecTableScan(_) => 0,
            Operator::Join { .. }
            | Operator::NestedLoopJoin { .. }
            | Operator::HashJoin { .. }
            | Operator::MergeJoin { .. } => 2,
            _ => 1,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Operator::TableScan(_) => "TableScan",
            Operator::Filter { .. } => "Filter",
            Operator::Project { .. } => "Project",
            Operator::Join { .. } => "Join",
            Operator::Aggregate { .. } => "Aggregate",
            Operator::Sort { .. } => "Sort",
            Operator::ExecTableScan(_) => "ExecTableScan",
            Operator::ExecFilter { .. } => "ExecFilter",
            Operator::ExecProject { .. } => "ExecProject",
            Operator::NestedLoopJoin { .. } => "NestedLoopJoin",
            Operator::HashJoin { .. } => "HashJoin",
            Operator::MergeJoin { .. } => "MergeJoin",
            Operator::HashAggregate { .. } => "HashAggregate",
            Operator::SortAggregate { .. } => "SortAggregate",
            Operator::ExecSort { .. } => "ExecSort",
            Operator::ExecLimit { .. } => "ExecLimit",
        }
    }
}

fn join_list<T: fmt::Display>(items: &[T]) -> String {
    items.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(", ")
}

fn fmt_limit(f: &mut fmt::Formatter<'_>, offset: &Option<u64>, fetch: &Option<u64>) -> fmt::Result {
    if let Some(offset) = offset {
        write!(f, ", offset=[{}]", offset)?;
    }
    if let Some(fetch) = fetch {
        write!(f, ", fetch=[{}]", fetch)?;
    }
    Ok(())
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name())?;
        match self {
            Operator::TableScan(scan) | Operator::ExecTableScan(scan) => {
                write!(f, "table=[{}], source=[{}]", scan.table, scan.data_source)?;
                if let Some(projection) = &scan.projection {
                    let names: Vec<&str> = projection.iter().map(|i| scan.columns[*i].name.as_str()).collect();
                    write!(f, ", columns=[{}]", names.join(", "))?;
                }
                if !scan.filters.is_empty() {
                    write!(f, ", filters=[{}]", join_list(&scan.filters))?;
                }
            }
            Operator::Filter { predicate } | Operator::ExecFilter { predicate } => {
                write!(f, "condition=[{}]", predicate)?;
            }
            Operator::Project { exprs, names } | Operator::ExecProject { exprs, names } => {
                let items: Vec<String> = names.iter().zip(exprs).map(|(n, e)| format!("{}=[{}]", n, e)).collect();
                write!(f, "{}", items.join(", "))?;
            }
            Operator::Join { join_type, condition } | Operator::NestedLoopJoin { join_type, condition } => {
                write!(f, "condition=[{}], joinType=[{}]", condition, join_type)?;
            }
            Operator::HashJoin { join_type, condition, left_keys, right_keys }
            | Operator::MergeJoin { join_type, condition, left_keys, right_keys } => {
                write!(f, "condition=[{}], joinType=[{}], leftKeys=[{}], rightKeys=[{}]",
                       condition, join_type, join_list(left_keys), join_list(right_keys))?;
            }
            Operator::Aggregate { group_keys, aggs }
            | Operator::HashAggregate { group_keys, aggs }
            | Operator::SortAggregate { group_keys, aggs } => {
                let keys: Vec<String> = group_keys.iter().map(|k| format!("${}", k)).collect();
                write!(f, "group=[{{{}}}]", keys.join(", "))?;
                for agg in aggs {
                    write!(f, ", {}=[{}]", agg.name, agg)?;
                }
            }
            Operator::Sort { keys, offset, fetch } | Operator::ExecSort { keys, offset, fetch } => {
                write!(f, "sort=[{}]", join_list(keys))?;
                fmt_limit(f, offset, fetch)?;
            }
            Operator::ExecLimit { offset, fetch } => {
                write!(f, "limit")?;
                fmt_limit(f, offset, fetch)?;
            }
        }
        write!(f, ")")
    }
}

/// A node in a query plan
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct PlanNode {
    op: Operator,
    inputs: Vec<PlanRef>,
    row_type: RowType,
    traits: TraitSet,
}

impl PlanNode {
    /// Build a node, deriving its row type and traits from the operator and its inputs
    pub fn new(op: Operator, inputs: Vec<PlanRef>) -> Result<PlanRef> {
        if op.arity() != inputs.len() {
            return Err(OptimizerError::internal(format!(
                "{} expects {} input(s), got {}", op.name(), op.arity(), inputs.len()
            )));
        }
        let input_types: Vec<&RowType> = inputs.iter().map(|i| &i.row_type).collect();
        let row_type = derive_row_type(&op, &input_types)?;
        let input_traits: Vec<&TraitSet> = inputs.iter().map(|i| &i.traits).collect();
        let traits = derive_traits(&op, &input_traits);
        Ok(Arc::new(PlanNode {
            op,
            inputs,
            row_type,
            traits,
        }))
    }

    pub fn op(&self) -> &Operator {
        &self.op
    }

    pub fn kind(&self) -> OperatorKind {
        self.op.kind()
    }

    pub fn inputs(&self) -> &[PlanRef] {
        &self.inputs
    }

    pub fn input(&self, index: usize) -> &PlanRef {
        &self.inputs[index]
    }

    pub fn row_type(&self) -> &RowType {
        &self.row_type
    }

    pub fn traits(&self) -> &TraitSet {
        &self.traits
    }

    /// Same operator over different inputs
    pub fn with_inputs(&self, inputs: Vec<PlanRef>) -> Result<PlanRef> {
        PlanNode::new(self.op.clone(), inputs)
    }

    /// Number of nodes in the tree rooted here
    pub fn node_count(&self) -> usize {
        1 + self.inputs.iter().map(|i| i.node_count()).sum::<usize>()
    }

    /// Whether any node in the tree rooted here satisfies `pred`
    pub fn any(&self, pred: &impl Fn(&PlanNode) -> bool) -> bool {
        pred(self) || self.inputs.iter().any(|i| i.any(pred))
    }

    /// Indented text form, one operator per line
    pub fn explain(&self) -> String {
        let mut out = String::new();
        self.explain_into(0, &mut out);
        out
    }

    fn explain_into(&self, depth: usize, out: &mut String) {
        out.push_str(&"  ".repeat(depth));
        out.push_str(&self.op.to_string());
        out.push('\n');
        for input in &self.inputs {
            input.explain_into(depth + 1, out);
        }
    }
}

impl fmt::Display for PlanNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.explain().trim_end())
    }
}

fn check_refs(op: &Operator, exprs: &[&ScalarExpr], width: usize) -> Result<()> {
    for expr in exprs {
        if let Some(bad) = expr.input_refs().into_iter().find(|i| *i >= width) {
            return Err(OptimizerError::internal(format!(
                "{} references ${} but its input has {} field(s)", op.name(), bad, width
            )));
        }
    }
    Ok(())
}

fn check_keys(op: &Operator, keys: &[usize], width: usize) -> Result<()> {
    if let Some(bad) = keys.iter().find(|k| **k >= width) {
        return Err(OptimizerError::internal(format!(
            "{} uses key ${} but its input has {} field(s)", op.name(), bad, width
        )));
    }
    Ok(())
}

/// Row type of `op` applied to inputs with the given row types
pub fn derive_row_type(op: &Operator, inputs: &[&RowType]) -> Result<RowType> {
    match op {
        Operator::TableScan(scan) | Operator::ExecTableScan(scan) => {
            let width = scan.columns.len();
            check_keys(op, &scan.output_columns(), width)?;
            check_refs(op, &scan.filters.iter().collect::<Vec<_>>(), width)?;
            Ok(scan.row_type())
        }
        Operator::Filter { predicate } | Operator::ExecFilter { predicate } => {
            check_refs(op, &[predicate], inputs[0].len())?;
            Ok(inputs[0].clone())
        }
        Operator::Project { exprs, names } | Operator::ExecProject { exprs, names } => {
            if exprs.len() != names.len() {
                return Err(OptimizerError::internal("projection names do not match its expressions"));
            }
            check_refs(op, &exprs.iter().collect::<Vec<_>>(), inputs[0].len())?;
            Ok(exprs.iter().zip(names)
                .map(|(e, n)| Field::new(n.clone(), e.data_type(), e.nullable()))
                .collect())
        }
        Operator::Join { join_type, condition }
        | Operator::NestedLoopJoin { join_type, condition }
        | Operator::HashJoin { join_type, condition, .. }
        | Operator::MergeJoin { join_type, condition, .. } => {
            let (left, right) = (inputs[0], inputs[1]);
            check_refs(op, &[condition], left.len() + right.len())?;
            if let Operator::HashJoin { left_keys, right_keys, .. } | Operator::MergeJoin { left_keys, right_keys, .. } = op {
                check_keys(op, left_keys, left.len())?;
                check_keys(op, right_keys, right.len())?;
            }
            let left_nullable = matches!(join_type, JoinType::Right | JoinType::Full);
            let right_nullable = matches!(join_type, JoinType::Left | JoinType::Full);
            let mut row_type = Vec::with_capacity(left.len() + right.len());
            for field in left.iter() {
                row_type.push(Field { nullable: field.nullable || left_nullable, ..field.clone() });
            }
            for field in right.iter() {
                row_type.push(Field { nullable: field.nullable || right_nullable, ..field.clone() });
            }
            Ok(row_type)
        }
        Operator::Aggregate { group_keys, aggs }
        | Operator::HashAggregate { group_keys, aggs }
        | Operator::SortAggregate { group_keys, aggs } => {
            let input = inputs[0];
            check_keys(op, group_keys, input.len())?;
            check_keys(op, &aggs.iter().filter_map(|a| a.arg).collect::<Vec<_>>(), input.len())?;
            let mut row_type: RowType = group_keys.iter().map(|k| input[*k].clone()).collect();
            row_type.extend(aggs.iter().map(|a| a.field()));
            Ok(row_type)
        }
        Operator::Sort { keys, .. } | Operator::ExecSort { keys, .. } => {
            check_keys(op, &keys.iter().map(|k| k.index).collect::<Vec<_>>(), inputs[0].len())?;
            Ok(inputs[0].clone())
        }
        Operator::ExecLimit { .. } => Ok(inputs[0].clone()),
    }
}

/// Traits `op` provides given the traits of its inputs
pub fn derive_traits(op: &Operator, inputs: &[&TraitSet]) -> TraitSet {
    if op.convention() == Convention::Logical {
        return TraitSet::logical();
    }
    let collation = match op {
        Operator::ExecFilter { .. } | Operator::ExecLimit { .. } => inputs[0].collation.clone(),
        // Unmatched right rows are emitted last, so only inner and left joins keep the order
        Operator::NestedLoopJoin { join_type: JoinType::Inner | JoinType::Left, .. } => inputs[0].collation.clone(),
        Operator::ExecProject { exprs, .. } => {
            // Keep the longest prefix of the input ordering that survives the projection
            let mut collation = Vec::new();
            for key in &inputs[0].collation {
                match exprs.iter().position(|e| e.as_input_ref() == Some(key.index)) {
                    Some(index) => collation.push(SortKey { index, descending: key.descending }),
                    None => break,
                }
            }
            collation
        }
        Operator::MergeJoin { left_keys, .. } => left_keys.iter().map(|k| SortKey::asc(*k)).collect(),
        Operator::SortAggregate { group_keys, .. } => (0..group_keys.len()).map(SortKey::asc).collect(),
        Operator::ExecSort { keys, .. } => keys.clone(),
        _ => Vec::new(),
    };
    TraitSet::executable().with_collation(collation)
}
