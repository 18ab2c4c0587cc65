// Statement-to-Plan Converter
//
// Binds a database-agnostic SELECT statement against one schema and produces the
// initial logical plan. Every column reference is resolved to a positional input
// reference with a concrete type; anything without an operator mapping is rejected.

use crate::catalog::{DataType, Schema, Table};
use crate::query::planner::error::{OptimizerError, Result};
use crate::query::planner::expression::{
    AggCall, AggFunction, BinaryOperator, Literal, ScalarExpr, ScalarFunction, UnaryOperator,
};
use crate::query::planner::plan_node::{Field, JoinType, Operator, PlanNode, PlanRef, RowType, ScanSpec};
use crate::query::planner::traits::SortKey;
use crate::query::sql_node::{
    SqlBinaryOperator, SqlExpr, SqlFunction, SqlFunctionArg, SqlJoinType, SqlLiteral, SqlSelect,
    SqlSelectItem, SqlTableRef, SqlUnaryOperator,
};

/// Column visible to name resolution
#[derive(Debug, Clone)]
struct ScopeColumn {
    /// Table alias, or the table name when there is none
    qualifier: String,
    field: Field,
}

/// Columns of the FROM clause, in plan order
#[derive(Debug, Clone, Default)]
struct Scope {
    columns: Vec<ScopeColumn>,
}

impl Scope {
    fn of_table(qualifier: &str, row_type: &RowType) -> Self {
        Scope {
            columns: row_type.iter()
                .map(|f| ScopeColumn { qualifier: qualifier.to_string(), field: f.clone() })
                .collect(),
        }
    }

    /// Columns of `self` followed by `other`, typed as the join output `row_type`
    fn join(&self, other: &Scope, row_type: &RowType) -> Self {
        Scope {
            columns: self.columns.iter()
                .chain(other.columns.iter())
                .zip(row_type)
                .map(|(c, f)| ScopeColumn { qualifier: c.qualifier.clone(), field: f.clone() })
                .collect(),
        }
    }

    fn has_qualifier(&self, qualifier: &str) -> bool {
        self.columns.iter().any(|c| c.qualifier.eq_ignore_ascii_case(qualifier))
    }

    fn resolve(&self, qualifier: Option<&str>, name: &str) -> Result<usize> {
        let matches: Vec<usize> = self.columns.iter()
            .enumerate()
            .filter(|(_, c)| c.field.name.eq_ignore_ascii_case(name)
                && qualifier.is_none_or(|q| c.qualifier.eq_ignore_ascii_case(q)))
            .map(|(i, _)| i)
            .collect();
        let display = match qualifier {
            Some(q) => format!("{}.{}", q, name),
            None => name.to_string(),
        };
        match matches.as_slice() {
            [index] => Ok(*index),
            [] => match qualifier {
                Some(q) if !self.has_qualifier(q) => {
                    Err(OptimizerError::unresolved(format!("table '{}' not found", q)))
                }
                _ => Err(OptimizerError::unresolved(format!("column '{}' not found", display))),
            },
            _ => Err(OptimizerError::unresolved(format!("column '{}' is ambiguous", display))),
        }
    }

    fn input_ref(&self, index: usize) -> ScalarExpr {
        ScalarExpr::input_ref(index, &self.columns[index].field)
    }
}

/// Binding state of an aggregate query: expressions above the aggregate may only read
/// group expressions and aggregate results
struct GroupedScope<'s> {
    scope: &'s Scope,
    group_exprs: Vec<ScalarExpr>,
    agg_calls: Vec<SqlFunction>,
    row_type: RowType,
}

enum Binder<'s> {
    Plain(&'s Scope),
    Grouped(GroupedScope<'s>),
}

fn is_aggregate_call(func: &SqlFunction) -> bool {
    func.over.is_none() && AggFunction::from_name(&func.name).is_some()
}

fn contains_aggregate(expr: &SqlExpr) -> bool {
    match expr {
        SqlExpr::Function(func) if is_aggregate_call(func) => true,
        SqlExpr::Function(func) => func.args.iter().any(|a| match a {
            SqlFunctionArg::Expr(e) => contains_aggregate(e),
            SqlFunctionArg::Wildcard => false,
        }),
        SqlExpr::BinaryOp { left, right, .. } => contains_aggregate(left) || contains_aggregate(right),
        SqlExpr::UnaryOp { expr, .. } | SqlExpr::IsNull { expr, .. } => contains_aggregate(expr),
        _ => false,
    }
}

/// Aggregate calls of `expr`, outermost first, without duplicates
fn collect_aggregates(expr: &SqlExpr, calls: &mut Vec<SqlFunction>) {
    match expr {
        SqlExpr::Function(func) if is_aggregate_call(func) => {
            if !calls.contains(func) {
                calls.push(func.clone());
            }
        }
        SqlExpr::Function(func) => {
            for arg in &func.args {
                if let SqlFunctionArg::Expr(e) = arg {
                    collect_aggregates(e, calls);
                }
            }
        }
        SqlExpr::BinaryOp { left, right, .. } => {
            collect_aggregates(left, calls);
            collect_aggregates(right, calls);
        }
        SqlExpr::UnaryOp { expr, .. } | SqlExpr::IsNull { expr, .. } => collect_aggregates(expr, calls),
        _ => {}
    }
}

fn binary_operator(op: SqlBinaryOperator) -> BinaryOperator {
    match op {
        SqlBinaryOperator::Eq => BinaryOperator::Eq,
        SqlBinaryOperator::NotEq => BinaryOperator::NotEq,
        SqlBinaryOperator::Lt => BinaryOperator::Lt,
        SqlBinaryOperator::LtEq => BinaryOperator::LtEq,
        SqlBinaryOperator::Gt => BinaryOperator::Gt,
        SqlBinaryOperator::GtEq => BinaryOperator::GtEq,
        SqlBinaryOperator::And => BinaryOperator::And,
        SqlBinaryOperator::Or => BinaryOperator::Or,
        SqlBinaryOperator::Plus => BinaryOperator::Plus,
        SqlBinaryOperator::Minus => BinaryOperator::Minus,
        SqlBinaryOperator::Multiply => BinaryOperator::Multiply,
        SqlBinaryOperator::Divide => BinaryOperator::Divide,
        SqlBinaryOperator::Modulo => BinaryOperator::Modulo,
    }
}

fn literal(value: &SqlLiteral) -> Literal {
    match value {
        SqlLiteral::Null => Literal::Null,
        SqlLiteral::Boolean(b) => Literal::Boolean(*b),
        SqlLiteral::Integer(i) => Literal::Integer(*i),
        SqlLiteral::Float(f) => Literal::Float(*f),
        SqlLiteral::String(s) => Literal::Text(s.clone()),
    }
}

fn check_boolean(expr: &ScalarExpr, clause: &str) -> Result<()> {
    match expr.data_type() {
        DataType::Boolean | DataType::Null => Ok(()),
        other => Err(OptimizerError::type_mismatch(format!("{} condition must be BOOLEAN, got {}", clause, other))),
    }
}

/// Converts `SqlSelect` statements into logical plans for one schema
pub struct SqlToPlanConverter<'a> {
    schema: &'a Schema,
    default_rows: u64,
}

impl<'a> SqlToPlanConverter<'a> {
    pub fn new(schema: &'a Schema, default_rows: u64) -> Self {
        SqlToPlanConverter { schema, default_rows }
    }

    /// Bind `select` and build its logical plan
    pub fn convert(&self, select: &SqlSelect) -> Result<PlanRef> {
        let (mut plan, scope) = self.convert_from(select)?;

        if let Some(selection) = &select.selection {
            if contains_aggregate(selection) {
                return Err(OptimizerError::unsupported("aggregate functions are not allowed in WHERE"));
            }
            let predicate = self.bind_expr(selection, &scope)?;
            check_boolean(&predicate, "WHERE")?;
            plan = PlanNode::new(Operator::Filter { predicate }, vec![plan])?;
        }

        let items = self.expand_select_items(&select.projection, &scope)?;
        let is_aggregate = !select.group_by.is_empty()
            || select.having.is_some()
            || items.iter().any(|(e, _)| contains_aggregate(e))
            || select.order_by.iter().any(|o| contains_aggregate(&o.expr));

        let binder = if is_aggregate {
            let (aggregated, grouped) = self.convert_aggregate(plan, &scope, select, &items)?;
            plan = aggregated;
            Binder::Grouped(grouped)
        } else {
            Binder::Plain(&scope)
        };

        // Select list, named by alias, by the column it reads, or by position
        let mut exprs = Vec::with_capacity(items.len());
        let mut names = Vec::with_capacity(items.len());
        for (position, (expr, alias)) in items.iter().enumerate() {
            let bound = self.bind(&binder, expr)?;
            let name = match (alias, expr, bound.as_input_ref()) {
                (Some(alias), _, _) => alias.clone(),
                (None, SqlExpr::Identifier(_) | SqlExpr::CompoundIdentifier(_), Some(index)) => {
                    plan.row_type()[index].name.clone()
                }
                _ => format!("EXPR${}", position),
            };
            exprs.push(bound);
            names.push(name);
        }
        let visible = exprs.len();

        let mut keys = Vec::with_capacity(select.order_by.len());
        for item in &select.order_by {
            let index = match self.order_by_position(&item.expr, &items, &names)? {
                Some(index) => index,
                None => {
                    let bound = self.bind(&binder, &item.expr)?;
                    match exprs.iter().position(|e| *e == bound) {
                        Some(index) => index,
                        None if select.distinct => {
                            return Err(OptimizerError::unsupported(format!(
                                "ORDER BY expression {} must appear in the select list of SELECT DISTINCT", item.expr
                            )));
                        }
                        None => {
                            names.push(format!("EXPR${}", exprs.len()));
                            exprs.push(bound);
                            exprs.len() - 1
                        }
                    }
                }
            };
            keys.push(SortKey { index, descending: !item.asc });
        }

        plan = PlanNode::new(Operator::Project { exprs, names: names.clone() }, vec![plan])?;
        if select.distinct {
            plan = PlanNode::new(Operator::Aggregate { group_keys: (0..visible).collect(), aggs: vec![] }, vec![plan])?;
        }
        if !keys.is_empty() || select.offset.is_some() || select.limit.is_some() {
            plan = PlanNode::new(Operator::Sort { keys, offset: select.offset, fetch: select.limit }, vec![plan])?;
        }
        if plan.row_type().len() > visible {
            // Drop the columns added only for ordering
            let row_type = plan.row_type().clone();
            let exprs = (0..visible).map(|i| ScalarExpr::input_ref(i, &row_type[i])).collect();
            plan = PlanNode::new(Operator::Project { exprs, names: names[..visible].to_vec() }, vec![plan])?;
        }
        Ok(plan)
    }

    fn lookup_table(&self, table_ref: &SqlTableRef) -> Result<&'a Table> {
        let name = match table_ref.name.split_once('.') {
            Some((schema, table)) if schema.eq_ignore_ascii_case(self.schema.name()) => table,
            Some((schema, _)) => {
                return Err(OptimizerError::unresolved(format!("schema '{}' not found", schema)));
            }
            None => table_ref.name.as_str(),
        };
        self.schema.get_table(name).ok_or_else(|| {
            OptimizerError::unresolved(format!("table '{}' not found in schema '{}'", table_ref.name, self.schema.name()))
        })
    }

    fn convert_table(&self, table_ref: &SqlTableRef) -> Result<(PlanRef, Scope, String)> {
        let table = self.lookup_table(table_ref)?;
        let qualifier = table_ref.alias.as_deref().unwrap_or(table.name()).to_string();
        let plan = PlanNode::new(Operator::TableScan(ScanSpec::from_table(table, self.default_rows)), vec![])?;
        let scope = Scope::of_table(&qualifier, plan.row_type());
        Ok((plan, scope, qualifier))
    }

    fn convert_from(&self, select: &SqlSelect) -> Result<(PlanRef, Scope)> {
        let from = select.from.as_ref()
            .ok_or_else(|| OptimizerError::unsupported("SELECT without FROM"))?;
        let (mut plan, mut scope, first) = self.convert_table(from)?;
        let mut qualifiers = vec![first];

        for join in &select.joins {
            let (right, right_scope, qualifier) = self.convert_table(&join.table)?;
            if qualifiers.iter().any(|q| q.eq_ignore_ascii_case(&qualifier)) {
                return Err(OptimizerError::unresolved(format!("table name '{}' is used more than once", qualifier)));
            }
            qualifiers.push(qualifier);
            let raw = Scope {
                columns: scope.columns.iter().chain(right_scope.columns.iter()).cloned().collect(),
            };
            let condition = match &join.condition {
                Some(condition) => {
                    if contains_aggregate(condition) {
                        return Err(OptimizerError::unsupported("aggregate functions are not allowed in ON"));
                    }
                    let bound = self.bind_expr(condition, &raw)?;
                    check_boolean(&bound, "ON")?;
                    bound
                }
                None => ScalarExpr::true_literal(),
            };
            let join_type = match join.join_type {
                SqlJoinType::Inner | SqlJoinType::Cross => JoinType::Inner,
                SqlJoinType::Left => JoinType::Left,
                SqlJoinType::Right => JoinType::Right,
                SqlJoinType::Full => JoinType::Full,
            };
            plan = PlanNode::new(Operator::Join { join_type, condition }, vec![plan, right])?;
            scope = scope.join(&right_scope, plan.row_type());
        }
        Ok((plan, scope))
    }

    /// Select items with wildcards replaced by qualified column references
    fn expand_select_items(&self, projection: &[SqlSelectItem], scope: &Scope) -> Result<Vec<(SqlExpr, Option<String>)>> {
        if projection.is_empty() {
            return Err(OptimizerError::unsupported("empty select list"));
        }
        let column = |c: &ScopeColumn| (SqlExpr::CompoundIdentifier(vec![c.qualifier.clone(), c.field.name.clone()]), None);
        let mut items = Vec::new();
        for item in projection {
            match item {
                SqlSelectItem::Wildcard => items.extend(scope.columns.iter().map(column)),
                SqlSelectItem::QualifiedWildcard(qualifier) => {
                    if !scope.has_qualifier(qualifier) {
                        return Err(OptimizerError::unresolved(format!("table '{}' not found", qualifier)));
                    }
                    items.extend(scope.columns.iter().filter(|c| c.qualifier.eq_ignore_ascii_case(qualifier)).map(column));
                }
                SqlSelectItem::Expr { expr, alias } => items.push((expr.clone(), alias.clone())),
            }
        }
        Ok(items)
    }

    /// Pre-projection, aggregate and HAVING filter of an aggregate query
    fn convert_aggregate<'s>(
        &self,
        input: PlanRef,
        scope: &'s Scope,
        select: &SqlSelect,
        items: &[(SqlExpr, Option<String>)],
    ) -> Result<(PlanRef, GroupedScope<'s>)> {
        let mut group_exprs: Vec<ScalarExpr> = Vec::new();
        for expr in &select.group_by {
            if contains_aggregate(expr) {
                return Err(OptimizerError::unsupported("aggregate functions are not allowed in GROUP BY"));
            }
            let bound = self.bind_expr(expr, scope)?;
            if !group_exprs.contains(&bound) {
                group_exprs.push(bound);
            }
        }

        let mut agg_calls = Vec::new();
        for (expr, _) in items {
            collect_aggregates(expr, &mut agg_calls);
        }
        if let Some(having) = &select.having {
            collect_aggregates(having, &mut agg_calls);
        }
        for item in &select.order_by {
            collect_aggregates(&item.expr, &mut agg_calls);
        }

        // Group expressions first, then aggregate arguments
        let key_count = group_exprs.len();
        let mut pre_exprs = group_exprs.clone();
        let mut aggs = Vec::with_capacity(agg_calls.len());
        for call in &agg_calls {
            let func = AggFunction::from_name(&call.name)
                .ok_or_else(|| OptimizerError::internal(format!("{} is not an aggregate", call.name)))?;
            let arg = match call.args.as_slice() {
                [] | [SqlFunctionArg::Wildcard] if func == AggFunction::Count => None,
                [SqlFunctionArg::Expr(expr)] => {
                    if contains_aggregate(expr) {
                        return Err(OptimizerError::unsupported(format!("nested aggregate in {}", SqlExpr::Function(call.clone()))));
                    }
                    let bound = self.bind_expr(expr, scope)?;
                    match pre_exprs.iter().position(|e| *e == bound) {
                        Some(index) => Some(index),
                        None => {
                            pre_exprs.push(bound);
                            Some(pre_exprs.len() - 1)
                        }
                    }
                }
                _ => {
                    return Err(OptimizerError::unsupported(format!(
                        "{} with {} argument(s)", func.name(), call.args.len()
                    )));
                }
            };
            let (data_type, nullable) = func.return_type(arg.map(|i| pre_exprs[i].data_type()))?;
            aggs.push(AggCall {
                func,
                arg,
                distinct: call.distinct,
                data_type,
                nullable,
                name: format!("$f{}", key_count + aggs.len()),
            });
        }

        let pre_names = pre_exprs.iter().enumerate()
            .map(|(i, e)| match e.as_input_ref() {
                Some(index) => scope.columns[index].field.name.clone(),
                None => format!("$f{}", i),
            })
            .collect();
        let pre = PlanNode::new(Operator::Project { exprs: pre_exprs, names: pre_names }, vec![input])?;
        let mut plan = PlanNode::new(Operator::Aggregate { group_keys: (0..key_count).collect(), aggs }, vec![pre])?;

        let grouped = GroupedScope {
            scope,
            group_exprs,
            agg_calls,
            row_type: plan.row_type().clone(),
        };
        if let Some(having) = &select.having {
            let predicate = self.bind_grouped(having, &grouped)?;
            check_boolean(&predicate, "HAVING")?;
            plan = PlanNode::new(Operator::Filter { predicate }, vec![plan])?;
        }
        Ok((plan, grouped))
    }

    /// Position of an ORDER BY item given as an ordinal, an output name or a select expression
    fn order_by_position(&self, expr: &SqlExpr, items: &[(SqlExpr, Option<String>)], names: &[String]) -> Result<Option<usize>> {
        match expr {
            SqlExpr::Literal(SqlLiteral::Integer(n)) => {
                if *n >= 1 && (*n as usize) <= items.len() {
                    Ok(Some(*n as usize - 1))
                } else {
                    Err(OptimizerError::unresolved(format!("ORDER BY position {} is not in the select list", n)))
                }
            }
            SqlExpr::Identifier(name) => {
                let matches: Vec<usize> = names[..items.len()].iter()
                    .enumerate()
                    .filter(|(_, n)| n.eq_ignore_ascii_case(name))
                    .map(|(i, _)| i)
                    .collect();
                match matches.as_slice() {
                    [] => Ok(items.iter().position(|(e, _)| e == expr)),
                    [index] => Ok(Some(*index)),
                    _ => Err(OptimizerError::unresolved(format!("ORDER BY column '{}' is ambiguous", name))),
                }
            }
            _ => Ok(items.iter().position(|(e, _)| e == expr)),
        }
    }

    fn bind(&self, binder: &Binder<'_>, expr: &SqlExpr) -> Result<ScalarExpr> {
        match binder {
            Binder::Plain(scope) => {
                if contains_aggregate(expr) {
                    return Err(OptimizerError::internal("aggregate outside an aggregate query"));
                }
                self.bind_expr(expr, scope)
            }
            Binder::Grouped(grouped) => self.bind_grouped(expr, grouped),
        }
    }

    /// Bind an expression evaluated above the aggregate
    fn bind_grouped(&self, expr: &SqlExpr, grouped: &GroupedScope<'_>) -> Result<ScalarExpr> {
        let key_count = grouped.group_exprs.len();
        if let SqlExpr::Function(func) = expr {
            if is_aggregate_call(func) {
                let index = grouped.agg_calls.iter().position(|c| c == func)
                    .ok_or_else(|| OptimizerError::internal(format!("aggregate {} was not collected", expr)))?;
                return Ok(ScalarExpr::input_ref(key_count + index, &grouped.row_type[key_count + index]));
            }
        }
        if !contains_aggregate(expr) {
            let bound = self.bind_expr(expr, grouped.scope)?;
            if let Some(index) = grouped.group_exprs.iter().position(|g| *g == bound) {
                return Ok(ScalarExpr::input_ref(index, &grouped.row_type[index]));
            }
            if bound.input_refs().is_empty() {
                return Ok(bound);
            }
        }
        match expr {
            SqlExpr::Identifier(_) | SqlExpr::CompoundIdentifier(_) => Err(OptimizerError::unresolved(format!(
                "column '{}' must appear in GROUP BY or be used in an aggregate function", expr
            ))),
            SqlExpr::BinaryOp { left, op, right } => ScalarExpr::binary(
                binary_operator(*op),
                self.bind_grouped(left, grouped)?,
                self.bind_grouped(right, grouped)?,
            ),
            SqlExpr::UnaryOp { op, expr } => {
                let inner = self.bind_grouped(expr, grouped)?;
                self.bind_unary(*op, inner)
            }
            SqlExpr::IsNull { expr, negated } => Ok(ScalarExpr::IsNull {
                expr: Box::new(self.bind_grouped(expr, grouped)?),
                negated: *negated,
            }),
            SqlExpr::Function(func) => {
                let scalar = self.scalar_function(func)?;
                let args = self.function_args(func)?
                    .into_iter()
                    .map(|a| self.bind_grouped(a, grouped))
                    .collect::<Result<Vec<_>>>()?;
                ScalarExpr::function(scalar, args)
            }
            SqlExpr::Literal(value) => Ok(ScalarExpr::literal(literal(value))),
            SqlExpr::Subquery(_) => Err(OptimizerError::unsupported("scalar subqueries")),
        }
    }

    /// Bind an expression against the FROM scope
    fn bind_expr(&self, expr: &SqlExpr, scope: &Scope) -> Result<ScalarExpr> {
        match expr {
            SqlExpr::Identifier(name) => Ok(scope.input_ref(scope.resolve(None, name)?)),
            SqlExpr::CompoundIdentifier(parts) => {
                let index = match parts.as_slice() {
                    [table, column] => scope.resolve(Some(table), column)?,
                    [schema, table, column] if schema.eq_ignore_ascii_case(self.schema.name()) => {
                        scope.resolve(Some(table), column)?
                    }
                    _ => return Err(OptimizerError::unresolved(format!("column '{}' not found", parts.join(".")))),
                };
                Ok(scope.input_ref(index))
            }
            SqlExpr::Literal(value) => Ok(ScalarExpr::literal(literal(value))),
            SqlExpr::BinaryOp { left, op, right } => ScalarExpr::binary(
                binary_operator(*op),
                self.bind_expr(left, scope)?,
                self.bind_expr(right, scope)?,
            ),
            SqlExpr::UnaryOp { op, expr } => {
                let inner = self.bind_expr(expr, scope)?;
                self.bind_unary(*op, inner)
            }
            SqlExpr::IsNull { expr, negated } => Ok(ScalarExpr::IsNull {
                expr: Box::new(self.bind_expr(expr, scope)?),
                negated: *negated,
            }),
            SqlExpr::Function(func) => {
                if is_aggregate_call(func) {
                    return Err(OptimizerError::unsupported(format!(
                        "aggregate function {} is not allowed here", func.name.to_uppercase()
                    )));
                }
                let scalar = self.scalar_function(func)?;
                let args = self.function_args(func)?
                    .into_iter()
                    .map(|a| self.bind_expr(a, scope))
                    .collect::<Result<Vec<_>>>()?;
                ScalarExpr::function(scalar, args)
            }
            SqlExpr::Subquery(_) => Err(OptimizerError::unsupported("scalar subqueries")),
        }
    }

    fn bind_unary(&self, op: SqlUnaryOperator, inner: ScalarExpr) -> Result<ScalarExpr> {
        match (op, inner) {
            (SqlUnaryOperator::Minus, ScalarExpr::Literal(Literal::Integer(i))) => {
                Ok(ScalarExpr::literal(Literal::Integer(i.wrapping_neg())))
            }
            (SqlUnaryOperator::Minus, ScalarExpr::Literal(Literal::Float(f))) => Ok(ScalarExpr::literal(Literal::Float(-f))),
            (SqlUnaryOperator::Minus, inner) => ScalarExpr::unary(UnaryOperator::Negate, inner),
            (SqlUnaryOperator::Not, inner) => ScalarExpr::unary(UnaryOperator::Not, inner),
        }
    }

    /// Scalar function named by `func`; window and unknown functions are rejected
    fn scalar_function(&self, func: &SqlFunction) -> Result<ScalarFunction> {
        if func.over.is_some() {
            return Err(OptimizerError::unsupported(format!("window function {}(...) OVER (...)", func.name.to_uppercase())));
        }
        if func.distinct {
            return Err(OptimizerError::unsupported(format!("DISTINCT in scalar function {}", func.name.to_uppercase())));
        }
        ScalarFunction::from_name(&func.name)
            .ok_or_else(|| OptimizerError::unsupported(format!("function {}", func.name.to_uppercase())))
    }

    fn function_args<'f>(&self, func: &'f SqlFunction) -> Result<Vec<&'f SqlExpr>> {
        func.args.iter()
            .map(|a| match a {
                SqlFunctionArg::Expr(e) => Ok(e),
                SqlFunctionArg::Wildcard => Err(OptimizerError::unsupported(format!("{}(*)", func.name.to_uppercase()))),
            })
            .collect()
    }
}
