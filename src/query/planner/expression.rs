// Bound Scalar Expressions
//
// Expressions after name resolution. Column references are positional (`$i` refers to
// the i-th field of the operator's input row type), so an expression means the same
// thing wherever the same input row type appears.

use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::catalog::DataType;
use crate::query::planner::error::{OptimizerError, Result};
use crate::query::planner::plan_node::Field;

/// Constant value
#[derive(Debug, Clone)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Literal::Null, Literal::Null) => true,
            (Literal::Boolean(a), Literal::Boolean(b)) => a == b,
            (Literal::Integer(a), Literal::Integer(b)) => a == b,
            // Bitwise so that Eq and Hash agree
            (Literal::Float(a), Literal::Float(b)) => a.to_bits() == b.to_bits(),
            (Literal::Text(a), Literal::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Literal {}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Literal::Null => 0.hash(state),
            Literal::Boolean(b) => { 1.hash(state); b.hash(state); }
            Literal::Integer(i) => { 2.hash(state); i.hash(state); }
            Literal::Float(f) => { 3.hash(state); f.to_bits().hash(state); }
            Literal::Text(s) => { 4.hash(state); s.hash(state); }
        }
    }
}

impl Literal {
    pub fn data_type(&self) -> DataType {
        match self {
            Literal::Null => DataType::Null,
            Literal::Boolean(_) => DataType::Boolean,
            Literal::Integer(_) => DataType::Integer,
            Literal::Float(_) => DataType::Float,
            Literal::Text(_) => DataType::Text,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "NULL"),
            Literal::Boolean(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            Literal::Integer(i) => write!(f, "{}", i),
            Literal::Float(v) => write!(f, "{:?}", v),
            Literal::Text(s) => write!(f, "'{}'", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
}

impl BinaryOperator {
    pub fn is_comparison(&self) -> bool {
        matches!(self, BinaryOperator::Eq | BinaryOperator::NotEq | BinaryOperator::Lt
            | BinaryOperator::LtEq | BinaryOperator::Gt | BinaryOperator::GtEq)
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOperator::And | BinaryOperator::Or)
    }

    fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Eq => "=",
            BinaryOperator::NotEq => "<>",
            BinaryOperator::Lt => "<",
            BinaryOperator::LtEq => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::GtEq => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Not,
    Negate,
}

/// Scalar functions every federated data source is able to evaluate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarFunction {
    Upper,
    Lower,
    Length,
    Abs,
    Coalesce,
    Concat,
}

impl ScalarFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_uppercase().as_str() {
            "UPPER" => Some(ScalarFunction::Upper),
            "LOWER" => Some(ScalarFunction::Lower),
            "LENGTH" | "CHAR_LENGTH" => Some(ScalarFunction::Length),
            "ABS" => Some(ScalarFunction::Abs),
            "COALESCE" | "IFNULL" => Some(ScalarFunction::Coalesce),
            "CONCAT" => Some(ScalarFunction::Concat),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScalarFunction::Upper => "UPPER",
            ScalarFunction::Lower => "LOWER",
            ScalarFunction::Length => "LENGTH",
            ScalarFunction::Abs => "ABS",
            ScalarFunction::Coalesce => "COALESCE",
            ScalarFunction::Concat => "CONCAT",
        }
    }

    /// Type-check the arguments and derive the result type
    pub fn return_type(&self, args: &[DataType]) -> Result<DataType> {
        let expect_arity = |n: usize| -> Result<()> {
            if args.len() != n {
                return Err(OptimizerError::type_mismatch(format!(
                    "{} expects {} argument(s), got {}", self.name(), n, args.len()
                )));
            }
            Ok(())
        };
        match self {
            ScalarFunction::Upper | ScalarFunction::Lower => {
                expect_arity(1)?;
                if !matches!(args[0], DataType::Text | DataType::Null) {
                    return Err(OptimizerError::type_mismatch(format!("{} expects TEXT, got {}", self.name(), args[0])));
                }
                Ok(DataType::Text)
            }
            ScalarFunction::Length => {
                expect_arity(1)?;
                if !matches!(args[0], DataType::Text | DataType::Blob | DataType::Null) {
                    return Err(OptimizerError::type_mismatch(format!("LENGTH expects TEXT, got {}", args[0])));
                }
                Ok(DataType::Integer)
            }
            ScalarFunction::Abs => {
                expect_arity(1)?;
                if !args[0].is_numeric() {
                    return Err(OptimizerError::type_mismatch(format!("ABS expects a number, got {}", args[0])));
                }
                Ok(args[0])
            }
            ScalarFunction::Coalesce => {
                if args.is_empty() {
                    return Err(OptimizerError::type_mismatch("COALESCE expects at least one argument"));
                }
                let first = args.iter().copied().find(|t| *t != DataType::Null).unwrap_or(DataType::Null);
                if let Some(bad) = args.iter().find(|t| !t.is_comparable_with(&first)) {
                    return Err(OptimizerError::type_mismatch(format!("COALESCE mixes {} and {}", first, bad)));
                }
                Ok(first)
            }
            ScalarFunction::Concat => {
                if args.is_empty() {
                    return Err(OptimizerError::type_mismatch("CONCAT expects at least one argument"));
                }
                Ok(DataType::Text)
            }
        }
    }
}

/// Bound scalar expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScalarExpr {
    /// Reference to the `index`-th input field
    InputRef {
        index: usize,
        data_type: DataType,
        nullable: bool,
    },
    Literal(Literal),
    Binary {
        op: BinaryOperator,
        left: Box<ScalarExpr>,
        right: Box<ScalarExpr>,
        data_type: DataType,
    },
    Unary {
        op: UnaryOperator,
        expr: Box<ScalarExpr>,
    },
    IsNull {
        expr: Box<ScalarExpr>,
        negated: bool,
    },
    Function {
        func: ScalarFunction,
        args: Vec<ScalarExpr>,
        data_type: DataType,
    },
}

impl ScalarExpr {
    /// Reference to an input field
    pub fn input_ref(index: usize, field: &Field) -> Self {
        ScalarExpr::InputRef {
            index,
            data_type: field.data_type,
            nullable: field.nullable,
        }
    }

    pub fn literal(value: Literal) -> Self {
        ScalarExpr::Literal(value)
    }

    pub fn true_literal() -> Self {
        ScalarExpr::Literal(Literal::Boolean(true))
    }

    /// Type-checked binary expression
    pub fn binary(op: BinaryOperator, left: ScalarExpr, right: ScalarExpr) -> Result<Self> {
        let (lt, rt) = (left.data_type(), right.data_type());
        let data_type = if op.is_comparison() {
            if !lt.is_comparable_with(&rt) {
                return Err(OptimizerError::type_mismatch(format!(
                    "cannot compare {} with {} in {} {} {}", lt, rt, left, op.symbol(), right
                )));
            }
            DataType::Boolean
        } else if op.is_logical() {
            for t in [lt, rt] {
                if !matches!(t, DataType::Boolean | DataType::Null) {
                    return Err(OptimizerError::type_mismatch(format!(
                        "{} expects BOOLEAN operands, got {}", op.symbol(), t
                    )));
                }
            }
            DataType::Boolean
        } else {
            if !lt.is_numeric() || !rt.is_numeric() {
                return Err(OptimizerError::type_mismatch(format!(
                    "arithmetic {} on {} and {}", op.symbol(), lt, rt
                )));
            }
            if lt == DataType::Float || rt == DataType::Float {
                DataType::Float
            } else if lt == DataType::Null && rt == DataType::Null {
                DataType::Null
            } else {
                DataType::Integer
            }
        };
        Ok(ScalarExpr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            data_type,
        })
    }

    /// Type-checked unary expression
    pub fn unary(op: UnaryOperator, expr: ScalarExpr) -> Result<Self> {
        let t = expr.data_type();
        match op {
            UnaryOperator::Not if !matches!(t, DataType::Boolean | DataType::Null) => {
                Err(OptimizerError::type_mismatch(format!("NOT expects BOOLEAN, got {}", t)))
            }
            UnaryOperator::Negate if !t.is_numeric() => {
                Err(OptimizerError::type_mismatch(format!("unary minus expects a number, got {}", t)))
            }
            _ => Ok(ScalarExpr::Unary { op, expr: Box::new(expr) }),
        }
    }

    /// Type-checked function call
    pub fn function(func: ScalarFunction, args: Vec<ScalarExpr>) -> Result<Self> {
        let types: Vec<DataType> = args.iter().map(|a| a.data_type()).collect();
        let data_type = func.return_type(&types)?;
        Ok(ScalarExpr::Function { func, args, data_type })
    }

    /// Conjunction of two boolean expressions (operands are not re-checked)
    pub fn and(left: ScalarExpr, right: ScalarExpr) -> Self {
        ScalarExpr::Binary {
            op: BinaryOperator::And,
            left: Box::new(left),
            right: Box::new(right),
            data_type: DataType::Boolean,
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            ScalarExpr::InputRef { data_type, .. } => *data_type,
            ScalarExpr::Literal(lit) => lit.data_type(),
            ScalarExpr::Binary { data_type, .. } => *data_type,
            ScalarExpr::Unary { op: UnaryOperator::Not, .. } => DataType::Boolean,
            ScalarExpr::Unary { op: UnaryOperator::Negate, expr } => expr.data_type(),
            ScalarExpr::IsNull { .. } => DataType::Boolean,
            ScalarExpr::Function { data_type, .. } => *data_type,
        }
    }

    pub fn nullable(&self) -> bool {
        match self {
            ScalarExpr::InputRef { nullable, .. } => *nullable,
            ScalarExpr::Literal(lit) => matches!(lit, Literal::Null),
            ScalarExpr::Binary { left, right, .. } => left.nullable() || right.nullable(),
            ScalarExpr::Unary { expr, .. } => expr.nullable(),
            ScalarExpr::IsNull { .. } => false,
            ScalarExpr::Function { func: ScalarFunction::Coalesce, args, .. } => args.iter().all(|a| a.nullable()),
            ScalarExpr::Function { args, .. } => args.iter().any(|a| a.nullable()),
        }
    }

    pub fn as_input_ref(&self) -> Option<usize> {
        match self {
            ScalarExpr::InputRef { index, .. } => Some(*index),
            _ => None,
        }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, ScalarExpr::Literal(Literal::Boolean(true)))
    }

    /// All input fields this expression reads
    pub fn input_refs(&self) -> BTreeSet<usize> {
        let mut refs = BTreeSet::new();
        self.collect_input_refs(&mut refs);
        refs
    }

    fn collect_input_refs(&self, refs: &mut BTreeSet<usize>) {
        match self {
            ScalarExpr::InputRef { index, .. } => {
                refs.insert(*index);
            }
            ScalarExpr::Literal(_) => {}
            ScalarExpr::Binary { left, right, .. } => {
                left.collect_input_refs(refs);
                right.collect_input_refs(refs);
            }
            ScalarExpr::Unary { expr, .. } | ScalarExpr::IsNull { expr, .. } => expr.collect_input_refs(refs),
            ScalarExpr::Function { args, .. } => {
                for arg in args {
                    arg.collect_input_refs(refs);
                }
            }
        }
    }

    /// Rewrite every input reference index through `f`
    pub fn map_input_refs(&self, f: &impl Fn(usize) -> usize) -> ScalarExpr {
        match self {
            ScalarExpr::InputRef { index, data_type, nullable } => ScalarExpr::InputRef {
                index: f(*index),
                data_type: *data_type,
                nullable: *nullable,
            },
            ScalarExpr::Literal(_) => self.clone(),
            ScalarExpr::Binary { op, left, right, data_type } => ScalarExpr::Binary {
                op: *op,
                left: Box::new(left.map_input_refs(f)),
                right: Box::new(right.map_input_refs(f)),
                data_type: *data_type,
            },
            ScalarExpr::Unary { op, expr } => ScalarExpr::Unary {
                op: *op,
                expr: Box::new(expr.map_input_refs(f)),
            },
            ScalarExpr::IsNull { expr, negated } => ScalarExpr::IsNull {
                expr: Box::new(expr.map_input_refs(f)),
                negated: *negated,
            },
            ScalarExpr::Function { func, args, data_type } => ScalarExpr::Function {
                func: *func,
                args: args.iter().map(|a| a.map_input_refs(f)).collect(),
                data_type: *data_type,
            },
        }
    }

    /// Shift every input reference by `offset` (which may be negative)
    pub fn shift(&self, offset: isize) -> ScalarExpr {
        self.map_input_refs(&|i| (i as isize + offset) as usize)
    }

    /// Replace every `$i` with `exprs[i]`; used to move an expression below a projection
    pub fn substitute(&self, exprs: &[ScalarExpr]) -> ScalarExpr {
        match self {
            ScalarExpr::InputRef { index, .. } => exprs[*index].clone(),
            ScalarExpr::Literal(_) => self.clone(),
            ScalarExpr::Binary { op, left, right, data_type } => ScalarExpr::Binary {
                op: *op,
                left: Box::new(left.substitute(exprs)),
                right: Box::new(right.substitute(exprs)),
                data_type: *data_type,
            },
            ScalarExpr::Unary { op, expr } => ScalarExpr::Unary {
                op: *op,
                expr: Box::new(expr.substitute(exprs)),
            },
            ScalarExpr::IsNull { expr, negated } => ScalarExpr::IsNull {
                expr: Box::new(expr.substitute(exprs)),
                negated: *negated,
            },
            ScalarExpr::Function { func, args, data_type } => ScalarExpr::Function {
                func: *func,
                args: args.iter().map(|a| a.substitute(exprs)).collect(),
                data_type: *data_type,
            },
        }
    }

    /// Splits a predicate into its conjuncts: `A AND (B AND C)` becomes `[A, B, C]`
    pub fn split_conjunction(&self) -> Vec<ScalarExpr> {
        let mut conjuncts = Vec::new();
        split_conjunction_recursive(self, &mut conjuncts);
        conjuncts
    }

    /// Joins conjuncts back into one predicate; `None` for an empty list
    pub fn conjunction(mut conjuncts: Vec<ScalarExpr>) -> Option<ScalarExpr> {
        let mut current = conjuncts.pop()?;
        while let Some(next) = conjuncts.pop() {
            current = ScalarExpr::and(next, current);
        }
        Some(current)
    }

    /// If this is `$l = $r` with `l` on the left input and `r` on the right input of a
    /// join whose left input has `left_width` fields, return `(l, r - left_width)`
    pub fn as_equi_join_key(&self, left_width: usize) -> Option<(usize, usize)> {
        if let ScalarExpr::Binary { op: BinaryOperator::Eq, left, right, .. } = self {
            let (a, b) = (left.as_input_ref()?, right.as_input_ref()?);
            if a < left_width && b >= left_width {
                return Some((a, b - left_width));
            }
            if b < left_width && a >= left_width {
                return Some((b, a - left_width));
            }
        }
        None
    }
}

fn split_conjunction_recursive(predicate: &ScalarExpr, conjuncts: &mut Vec<ScalarExpr>) {
    match predicate {
        ScalarExpr::Binary { op: BinaryOperator::And, left, right, .. } => {
            split_conjunction_recursive(left, conjuncts);
            split_conjunction_recursive(right, conjuncts);
        }
        ScalarExpr::Literal(Literal::Boolean(true)) => {}
        _ => conjuncts.push(predicate.clone()),
    }
}

impl fmt::Display for ScalarExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarExpr::InputRef { index, .. } => write!(f, "${}", index),
            ScalarExpr::Literal(lit) => write!(f, "{}", lit),
            ScalarExpr::Binary { op, left, right, .. } => write!(f, "{}({}, {})", op.symbol(), left, right),
            ScalarExpr::Unary { op: UnaryOperator::Not, expr } => write!(f, "NOT({})", expr),
            ScalarExpr::Unary { op: UnaryOperator::Negate, expr } => write!(f, "-({})", expr),
            ScalarExpr::IsNull { expr, negated: false } => write!(f, "IS NULL({})", expr),
            ScalarExpr::IsNull { expr, negated: true } => write!(f, "IS NOT NULL({})", expr),
            ScalarExpr::Function { func, args, .. } => {
                let args = args.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
                write!(f, "{}({})", func.name(), args)
            }
        }
    }
}

/// Aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_uppercase().as_str() {
            "COUNT" => Some(AggFunction::Count),
            "SUM" => Some(AggFunction::Sum),
            "AVG" => Some(AggFunction::Avg),
            "MIN" => Some(AggFunction::Min),
            "MAX" => Some(AggFunction::Max),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AggFunction::Count => "COUNT",
            AggFunction::Sum => "SUM",
            AggFunction::Avg => "AVG",
            AggFunction::Min => "MIN",
            AggFunction::Max => "MAX",
        }
    }

    /// Result type and nullability for an argument of type `arg`
    pub fn return_type(&self, arg: Option<DataType>) -> Result<(DataType, bool)> {
        match (self, arg) {
            (AggFunction::Count, _) => Ok((DataType::Integer, false)),
            (_, None) => Err(OptimizerError::type_mismatch(format!("{}(*) is not allowed", self.name()))),
            (AggFunction::Sum, Some(t)) | (AggFunction::Avg, Some(t)) if !t.is_numeric() => {
                Err(OptimizerError::type_mismatch(format!("{} expects a number, got {}", self.name(), t)))
            }
            (AggFunction::Avg, Some(_)) => Ok((DataType::Float, true)),
            (AggFunction::Sum, Some(DataType::Null)) => Ok((DataType::Integer, true)),
            (_, Some(t)) => Ok((t, true)),
        }
    }
}

/// One aggregate call of an Aggregate operator
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AggCall {
    pub func: AggFunction,
    /// Input field aggregated; `None` for COUNT(*)
    pub arg: Option<usize>,
    pub distinct: bool,
    pub data_type: DataType,
    pub nullable: bool,
    /// Output field name
    pub name: String,
}

impl AggCall {
    pub fn field(&self) -> Field {
        Field::new(self.name.clone(), self.data_type, self.nullable)
    }
}

impl fmt::Display for AggCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let distinct = if self.distinct { "DISTINCT " } else { "" };
        match self.arg {
            Some(arg) => write!(f, "{}({}${})", self.func.name(), distinct, arg),
            None => write!(f, "{}()", self.func.name()),
        }
    }
}
