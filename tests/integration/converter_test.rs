use anyhow::Result;

use fedplan::query::planner::converter::SqlToPlanConverter;
use fedplan::query::planner::plan_node::OperatorKind;
use fedplan::query::planner::OptimizerError;
use fedplan::query::sql_node::{SqlBinaryOperator, SqlExpr, SqlFunction, SqlFunctionArg, SqlJoin, SqlJoinType, SqlSelect, SqlSelectItem, SqlTableRef, SqlWindowSpec};

#[path = "../common/mod.rs"]
mod common;
use common::{columns, on_user_id, order_by, point_query, select, test_schema, users_join_orders};

#[test]
fn test_point_query_plan() -> Result<()> {
    let schema = test_schema();
    let plan = SqlToPlanConverter::new(&schema, 1000).convert(&point_query())?;
    assert_eq!(
        plan.explain(),
        "Project(a=[$0])\n  Filter(condition=[=($0, 1)])\n    TableScan(table=[t], source=[ds_0])\n"
    );
    Ok(())
}

#[test]
fn test_join_plan() -> Result<()> {
    let schema = test_schema();
    let plan = SqlToPlanConverter::new(&schema, 1000).convert(&users_join_orders(SqlJoinType::Inner, on_user_id()))?;
    assert_eq!(
        plan.explain(),
        "Project(id=[$0], amount=[$4])\n  Join(condition=[=($0, $3)], joinType=[inner])\n    TableScan(table=[users], source=[ds_0])\n    TableScan(table=[orders], source=[ds_1])\n"
    );

    let names: Vec<&str> = plan.row_type().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["id", "amount"]);
    assert!(!plan.row_type()[0].nullable);
    Ok(())
}

#[test]
fn test_outer_join_nullability() -> Result<()> {
    let schema = test_schema();
    let plan = SqlToPlanConverter::new(&schema, 1000).convert(&users_join_orders(SqlJoinType::Right, on_user_id()))?;
    // users is the null-generating side of a right join
    assert!(plan.row_type()[0].nullable);
    Ok(())
}

#[test]
fn test_missing_table() {
    let schema = test_schema();
    let statement = select("missing", vec![SqlSelectItem::Wildcard]);
    let result = SqlToPlanConverter::new(&schema, 1000).convert(&statement);
    assert!(matches!(result, Err(OptimizerError::UnresolvedReference(msg)) if msg.contains("missing")));
}

#[test]
fn test_window_function_is_unsupported() {
    let schema = test_schema();
    let window = SqlExpr::Function(SqlFunction {
        name: "SUM".to_string(),
        args: vec![SqlFunctionArg::Expr(SqlExpr::ident("a"))],
        distinct: false,
        over: Some(SqlWindowSpec::default()),
    });
    let statement = select("t", vec![SqlSelectItem::expr(window)]);
    let result = SqlToPlanConverter::new(&schema, 1000).convert(&statement);
    assert!(matches!(result, Err(OptimizerError::UnsupportedConstruct(_))));
}

#[test]
fn test_ambiguous_and_duplicate_tables() {
    let schema = test_schema();
    let converter = SqlToPlanConverter::new(&schema, 1000);

    let self_join = SqlSelect {
        projection: columns(&["id"]),
        from: Some(SqlTableRef::aliased("users", "u1")),
        joins: vec![SqlJoin {
            join_type: SqlJoinType::Inner,
            table: SqlTableRef::aliased("users", "u2"),
            condition: Some(SqlExpr::eq(SqlExpr::qualified("u1", "id"), SqlExpr::qualified("u2", "id"))),
        }],
        ..SqlSelect::default()
    };
    let result = converter.convert(&self_join);
    assert!(matches!(result, Err(OptimizerError::UnresolvedReference(msg)) if msg.contains("ambiguous")));

    let unaliased = SqlSelect {
        joins: vec![SqlJoin { join_type: SqlJoinType::Cross, table: SqlTableRef::new("users"), condition: None }],
        ..select("users", vec![SqlSelectItem::Wildcard])
    };
    assert!(matches!(converter.convert(&unaliased), Err(OptimizerError::UnresolvedReference(_))));
}

#[test]
fn test_cross_join_and_qualified_wildcard() -> Result<()> {
    let schema = test_schema();
    let statement = SqlSelect {
        joins: vec![SqlJoin { join_type: SqlJoinType::Cross, table: SqlTableRef::new("t"), condition: None }],
        ..select("users", vec![SqlSelectItem::QualifiedWildcard("t".to_string())])
    };
    let plan = SqlToPlanConverter::new(&schema, 1000).convert(&statement)?;
    assert_eq!(
        plan.explain(),
        "Project(a=[$2], b=[$3])\n  Join(condition=[true], joinType=[inner])\n    TableScan(table=[users], source=[ds_0])\n    TableScan(table=[t], source=[ds_0])\n"
    );
    Ok(())
}

#[test]
fn test_distinct_with_order_by() -> Result<()> {
    let schema = test_schema();
    let converter = SqlToPlanConverter::new(&schema, 1000);

    let statement = SqlSelect {
        distinct: true,
        order_by: vec![order_by(SqlExpr::ident("b"))],
        ..select("t", columns(&["b"]))
    };
    let plan = converter.convert(&statement)?;
    assert_eq!(plan.kind(), OperatorKind::Sort);
    assert_eq!(plan.input(0).kind(), OperatorKind::Aggregate);

    let hidden = SqlSelect {
        distinct: true,
        order_by: vec![order_by(SqlExpr::ident("a"))],
        ..select("t", columns(&["b"]))
    };
    assert!(matches!(converter.convert(&hidden), Err(OptimizerError::UnsupportedConstruct(_))));
    Ok(())
}

#[test]
fn test_having_and_aggregate_types() -> Result<()> {
    let schema = test_schema();
    let statement = SqlSelect {
        group_by: vec![SqlExpr::ident("user_id")],
        having: Some(SqlExpr::binary(
            SqlExpr::call("SUM", vec![SqlExpr::ident("amount")]),
            SqlBinaryOperator::Gt,
            SqlExpr::int(100),
        )),
        ..select("orders", vec![
            SqlSelectItem::expr(SqlExpr::ident("user_id")),
            SqlSelectItem::aliased(SqlExpr::count_star(), "cnt"),
        ])
    };
    let plan = SqlToPlanConverter::new(&schema, 1000).convert(&statement)?;
    assert_eq!(
        plan.explain(),
        "Project(user_id=[$0], cnt=[$1])\n  Filter(condition=[>($2, 100)])\n    Aggregate(group=[{$0}], $f1=[COUNT()], $f2=[SUM($1)])\n      Project(user_id=[$1], amount=[$2])\n        TableScan(table=[orders], source=[ds_1])\n"
    );

    let bad_where = SqlSelect {
        selection: Some(SqlExpr::eq(SqlExpr::count_star(), SqlExpr::int(1))),
        ..select("orders", columns(&["user_id"]))
    };
    assert!(matches!(
        SqlToPlanConverter::new(&schema, 1000).convert(&bad_where),
        Err(OptimizerError::UnsupportedConstruct(_))
    ));
    Ok(())
}
