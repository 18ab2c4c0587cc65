// SQL Node Tree
//
// Database-agnostic representation of a query statement. The dialect layer translates
// its own AST into these nodes before handing them to the optimizer; the optimizer
// never sees dialect-specific syntax.

use std::fmt;
use serde::{Serialize, Deserialize};

/// SELECT statement representation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlSelect {
    /// SELECT DISTINCT
    pub distinct: bool,
    /// Items in SELECT clause
    pub projection: Vec<SqlSelectItem>,
    /// First table of the FROM clause
    pub from: Option<SqlTableRef>,
    /// JOIN clauses, applied left to right
    pub joins: Vec<SqlJoin>,
    /// WHERE clause
    pub selection: Option<SqlExpr>,
    pub group_by: Vec<SqlExpr>,
    pub having: Option<SqlExpr>,
    pub order_by: Vec<SqlOrderByItem>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Item in a SELECT list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlSelectItem {
    /// All columns (*)
    Wildcard,
    /// All columns of one table (t.*)
    QualifiedWildcard(String),
    /// Expression with optional alias
    Expr {
        expr: SqlExpr,
        #[serde(default)]
        alias: Option<String>,
    },
}

/// Table reference in FROM or JOIN
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlTableRef {
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlJoinType {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

/// JOIN clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlJoin {
    pub join_type: SqlJoinType,
    pub table: SqlTableRef,
    /// ON condition; absent for CROSS JOIN
    #[serde(default)]
    pub condition: Option<SqlExpr>,
}

/// ORDER BY item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlOrderByItem {
    pub expr: SqlExpr,
    #[serde(default = "default_asc")]
    pub asc: bool,
}

fn default_asc() -> bool {
    true
}

/// Literal values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlLiteral {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlBinaryOperator {
    // Comparison
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    // Logical
    And,
    Or,
    // Arithmetic
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlUnaryOperator {
    Not,
    Minus,
}

/// Function argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlFunctionArg {
    /// COUNT(*)
    Wildcard,
    Expr(SqlExpr),
}

/// OVER (...) clause of a window function
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlWindowSpec {
    pub partition_by: Vec<SqlExpr>,
    pub order_by: Vec<SqlOrderByItem>,
}

/// Function call, scalar or aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlFunction {
    pub name: String,
    #[serde(default)]
    pub args: Vec<SqlFunctionArg>,
    #[serde(default)]
    pub distinct: bool,
    #[serde(default)]
    pub over: Option<SqlWindowSpec>,
}

/// Expression in SQL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlExpr {
    /// Unqualified column
    Identifier(String),
    /// Qualified column, e.g. `t.a`
    CompoundIdentifier(Vec<String>),
    Literal(SqlLiteral),
    BinaryOp {
        left: Box<SqlExpr>,
        op: SqlBinaryOperator,
        right: Box<SqlExpr>,
    },
    UnaryOp {
        op: SqlUnaryOperator,
        expr: Box<SqlExpr>,
    },
    IsNull {
        expr: Box<SqlExpr>,
        #[serde(default)]
        negated: bool,
    },
    Function(SqlFunction),
    /// Scalar subquery
    Subquery(Box<SqlSelect>),
}

impl SqlExpr {
    pub fn ident(name: &str) -> Self {
        SqlExpr::Identifier(name.to_string())
    }

    pub fn qualified(table: &str, name: &str) -> Self {
        SqlExpr::CompoundIdentifier(vec![table.to_string(), name.to_string()])
    }

    pub fn int(value: i64) -> Self {
        SqlExpr::Literal(SqlLiteral::Integer(value))
    }

    pub fn string(value: &str) -> Self {
        SqlExpr::Literal(SqlLiteral::String(value.to_string()))
    }

    pub fn binary(left: SqlExpr, op: SqlBinaryOperator, right: SqlExpr) -> Self {
        SqlExpr::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn eq(left: SqlExpr, right: SqlExpr) -> Self {
        Self::binary(left, SqlBinaryOperator::Eq, right)
    }

    pub fn and(left: SqlExpr, right: SqlExpr) -> Self {
        Self::binary(left, SqlBinaryOperator::And, right)
    }

    /// Plain function call
    pub fn call(name: &str, args: Vec<SqlExpr>) -> Self {
        SqlExpr::Function(SqlFunction {
            name: name.to_string(),
            args: args.into_iter().map(SqlFunctionArg::Expr).collect(),
            distinct: false,
            over: None,
        })
    }

    /// COUNT(*)
    pub fn count_star() -> Self {
        SqlExpr::Function(SqlFunction {
            name: "COUNT".to_string(),
            args: vec![SqlFunctionArg::Wildcard],
            distinct: false,
            over: None,
        })
    }
}

impl SqlSelectItem {
    pub fn expr(expr: SqlExpr) -> Self {
        SqlSelectItem::Expr { expr, alias: None }
    }

    pub fn aliased(expr: SqlExpr, alias: &str) -> Self {
        SqlSelectItem::Expr {
            expr,
            alias: Some(alias.to_string()),
        }
    }
}

impl SqlTableRef {
    pub fn new(name: &str) -> Self {
        SqlTableRef {
            name: name.to_string(),
            alias: None,
        }
    }

    pub fn aliased(name: &str, alias: &str) -> Self {
        SqlTableRef {
            name: name.to_string(),
            alias: Some(alias.to_string()),
        }
    }
}

impl SqlSelect {
    /// `SELECT <items> FROM <table>`
    pub fn from_table(table: &str, projection: Vec<SqlSelectItem>) -> Self {
        SqlSelect {
            projection,
            from: Some(SqlTableRef::new(table)),
            ..Default::default()
        }
    }
}

impl fmt::Display for SqlBinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            SqlBinaryOperator::Eq => "=",
            SqlBinaryOperator::NotEq => "<>",
            SqlBinaryOperator::Lt => "<",
            SqlBinaryOperator::LtEq => "<=",
            SqlBinaryOperator::Gt => ">",
            SqlBinaryOperator::GtEq => ">=",
            SqlBinaryOperator::And => "AND",
            SqlBinaryOperator::Or => "OR",
            SqlBinaryOperator::Plus => "+",
            SqlBinaryOperator::Minus => "-",
            SqlBinaryOperator::Multiply => "*",
            SqlBinaryOperator::Divide => "/",
            SqlBinaryOperator::Modulo => "%",
        };
        write!(f, "{}", symbol)
    }
}

impl fmt::Display for SqlExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlExpr::Identifier(name) => write!(f, "{}", name),
            SqlExpr::CompoundIdentifier(parts) => write!(f, "{}", parts.join(".")),
            SqlExpr::Literal(SqlLiteral::Null) => write!(f, "NULL"),
            SqlExpr::Literal(SqlLiteral::Boolean(b)) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            SqlExpr::Literal(SqlLiteral::Integer(i)) => write!(f, "{}", i),
            SqlExpr::Literal(SqlLiteral::Float(v)) => write!(f, "{}", v),
            SqlExpr::Literal(SqlLiteral::String(s)) => write!(f, "'{}'", s),
            SqlExpr::BinaryOp { left, op, right } => write!(f, "{} {} {}", left, op, right),
            SqlExpr::UnaryOp { op: SqlUnaryOperator::Not, expr } => write!(f, "NOT {}", expr),
            SqlExpr::UnaryOp { op: SqlUnaryOperator::Minus, expr } => write!(f, "-{}", expr),
            SqlExpr::IsNull { expr, negated } => {
                write!(f, "{} IS {}NULL", expr, if *negated { "NOT " } else { "" })
            }
            SqlExpr::Function(func) => {
                let args = func.args.iter()
                    .map(|arg| match arg {
                        SqlFunctionArg::Wildcard => "*".to_string(),
                        SqlFunctionArg::Expr(e) => e.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                let distinct = if func.distinct { "DISTINCT " } else { "" };
                write!(f, "{}({}{})", func.name, distinct, args)?;
                if func.over.is_some() {
                    write!(f, " OVER (...)")?;
                }
                Ok(())
            }
            SqlExpr::Subquery(_) => write!(f, "(subquery)"),
        }
    }
}
