// Optimizer Errors
//
// Every failure is terminal for the statement being planned and leaves the shared
// optimizer context untouched.

use thiserror::Error;

/// Represents a query optimization error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptimizerError {
    /// Unknown or ambiguous table/column, or a column used outside GROUP BY
    #[error("Unresolved reference: {0}")]
    UnresolvedReference(String),
    /// SQL shape with no operator, rule or implementation mapping
    #[error("Unsupported construct: {0}")]
    UnsupportedConstruct(String),
    /// Expression types do not fit the operator
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),
    /// Cost-based search found no plan satisfying the required traits
    #[error("No feasible plan: {0}")]
    NoFeasiblePlan(String),
    /// Rewrite phase exceeded its rule application cap
    #[error("Rule divergence: rewrite did not converge within {limit} rule applications (last rule: {rule})")]
    RuleDivergence {
        limit: usize,
        rule: String,
    },
    /// No planner registered for the database/schema pair
    #[error("Unknown optimizer context: database '{database}', schema '{schema}'")]
    UnknownContext {
        database: String,
        schema: String,
    },
    /// Violated plan invariant; always a defect
    #[error("Internal optimizer error: {0}")]
    Internal(String),
}

impl OptimizerError {
    pub fn unresolved(msg: impl Into<String>) -> Self {
        OptimizerError::UnresolvedReference(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        OptimizerError::UnsupportedConstruct(msg.into())
    }

    pub fn type_mismatch(msg: impl Into<String>) -> Self {
        OptimizerError::TypeMismatch(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        OptimizerError::Internal(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, OptimizerError>;
