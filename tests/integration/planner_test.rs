use anyhow::Result;

use fedplan::config::OptimizerConfig;
use fedplan::query::planner::plan_node::{OperatorKind, PlanNode};
use fedplan::query::planner::traits::{Convention, Distribution, SortKey};
use fedplan::query::planner::{OptimizerContext, OptimizerError};
use fedplan::query::sql_node::{SqlBinaryOperator, SqlExpr, SqlJoinType, SqlSelect, SqlSelectItem};

#[path = "../common/mod.rs"]
mod common;
use common::{columns, on_user_id, order_by, point_query, select, test_metadata, users_join_orders, DATABASE, SCHEMA};

fn context() -> OptimizerContext {
    OptimizerContext::new(&test_metadata(), OptimizerConfig::default()).unwrap()
}

fn all_executable(plan: &PlanNode) -> bool {
    !plan.any(&|n| n.traits().convention != Convention::Executable)
}

fn count(plan: &PlanNode, kind: OperatorKind) -> usize {
    let own = usize::from(plan.kind() == kind);
    own + plan.inputs().iter().map(|i| count(i, kind)).sum::<usize>()
}

#[test]
fn test_filter_pushed_into_scan() -> Result<()> {
    let optimized = context().optimize(DATABASE, SCHEMA, &point_query())?;

    assert!(!optimized.rewritten.any(&|n| n.kind() == OperatorKind::Filter));
    assert_eq!(optimized.plan.traits().convention, Convention::Executable);
    assert_eq!(
        optimized.explain(),
        "ExecTableScan(table=[t], source=[ds_0], columns=[a], filters=[=($0, 1)])\n"
    );
    Ok(())
}

#[test]
fn test_equi_join_uses_hash_join() -> Result<()> {
    let optimized = context().optimize(DATABASE, SCHEMA, &users_join_orders(SqlJoinType::Inner, on_user_id()))?;

    assert!(all_executable(&optimized.plan));
    assert_eq!(
        optimized.explain(),
        "ExecProject(id=[$0], amount=[$4])\n  HashJoin(condition=[=($0, $3)], joinType=[inner], leftKeys=[0], rightKeys=[1])\n    ExecTableScan(table=[users], source=[ds_0])\n    ExecTableScan(table=[orders], source=[ds_1])\n"
    );
    Ok(())
}

#[test]
fn test_filter_pushed_below_join() -> Result<()> {
    let statement = SqlSelect {
        selection: Some(SqlExpr::and(
            SqlExpr::binary(SqlExpr::qualified("o", "amount"), SqlBinaryOperator::Gt, SqlExpr::int(10)),
            SqlExpr::eq(SqlExpr::qualified("u", "name"), SqlExpr::string("alice")),
        )),
        ..users_join_orders(SqlJoinType::Inner, on_user_id())
    };
    let optimized = context().optimize(DATABASE, SCHEMA, &statement)?;

    assert!(!optimized.plan.any(&|n| n.kind() == OperatorKind::ExecFilter));
    let scans: Vec<String> = collect_scans(&optimized.plan);
    assert_eq!(scans, vec![
        "ExecTableScan(table=[users], source=[ds_0], filters=[=($1, 'alice')])".to_string(),
        "ExecTableScan(table=[orders], source=[ds_1], filters=[>($2, 10)])".to_string(),
    ]);
    Ok(())
}

fn collect_scans(plan: &PlanNode) -> Vec<String> {
    if plan.kind() == OperatorKind::ExecTableScan {
        return vec![plan.op().to_string()];
    }
    plan.inputs().iter().flat_map(|i| collect_scans(i)).collect()
}

#[test]
fn test_order_by_over_merge_join_skips_sort() -> Result<()> {
    let statement = SqlSelect {
        order_by: vec![order_by(SqlExpr::qualified("u", "id"))],
        ..users_join_orders(SqlJoinType::Inner, on_user_id())
    };
    let optimized = context().optimize(DATABASE, SCHEMA, &statement)?;
    let plan = &optimized.plan;

    assert_eq!(plan.kind(), OperatorKind::ExecProject);
    assert_eq!(plan.input(0).kind(), OperatorKind::MergeJoin);
    assert_eq!(plan.traits().collation, vec![SortKey::asc(0)]);
    // Only the merge join inputs are sorted
    assert_eq!(count(plan, OperatorKind::ExecSort), 2);
    Ok(())
}

#[test]
fn test_executable_plans_are_single_stream() -> Result<()> {
    let statement = SqlSelect {
        order_by: vec![order_by(SqlExpr::qualified("u", "id"))],
        ..users_join_orders(SqlJoinType::Left, on_user_id())
    };
    let optimized = context().optimize(DATABASE, SCHEMA, &statement)?;
    assert!(!optimized.plan.any(&|n| n.traits().distribution != Distribution::Singleton));
    Ok(())
}

#[test]
fn test_top_n_uses_bounded_sort() -> Result<()> {
    let statement = SqlSelect {
        order_by: vec![order_by(SqlExpr::ident("a"))],
        limit: Some(3),
        ..select("t", columns(&["a"]))
    };
    let optimized = context().optimize(DATABASE, SCHEMA, &statement)?;
    assert_eq!(
        optimized.explain(),
        "ExecSort(sort=[$0 ASC], fetch=[3])\n  ExecTableScan(table=[t], source=[ds_0], columns=[a])\n"
    );
    Ok(())
}

#[test]
fn test_limit_all_remaining_rows_after_offset() -> Result<()> {
    // LIMIT 95, 18446744073709551615
    let statement = SqlSelect {
        order_by: vec![order_by(SqlExpr::ident("a"))],
        offset: Some(95),
        limit: Some(u64::MAX),
        ..select("t", columns(&["a"]))
    };
    let optimized = context().optimize(DATABASE, SCHEMA, &statement)?;

    assert!(all_executable(&optimized.plan));
    assert!(optimized.cost.is_non_negative());
    assert!(optimized.cost.total(4.0).is_finite());
    Ok(())
}

#[test]
fn test_group_by_plan_is_executable() -> Result<()> {
    let statement = SqlSelect {
        group_by: vec![SqlExpr::ident("user_id")],
        ..select("orders", vec![
            SqlSelectItem::expr(SqlExpr::ident("user_id")),
            SqlSelectItem::expr(SqlExpr::call("sum", vec![SqlExpr::ident("amount")])),
        ])
    };
    let optimized = context().optimize(DATABASE, SCHEMA, &statement)?;

    assert!(all_executable(&optimized.plan));
    assert!(optimized.plan.any(&|n| matches!(n.kind(), OperatorKind::HashAggregate | OperatorKind::SortAggregate)));
    let names: Vec<&str> = optimized.plan.row_type().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["user_id", "EXPR$1"]);
    Ok(())
}

#[test]
fn test_full_theta_join_is_infeasible() {
    let condition = SqlExpr::binary(SqlExpr::qualified("u", "id"), SqlBinaryOperator::Lt, SqlExpr::qualified("o", "user_id"));
    let result = context().optimize(DATABASE, SCHEMA, &users_join_orders(SqlJoinType::Full, condition));
    assert!(matches!(result, Err(OptimizerError::NoFeasiblePlan(_))));
}

#[test]
fn test_full_equi_join_uses_hash_join() -> Result<()> {
    let optimized = context().optimize(DATABASE, SCHEMA, &users_join_orders(SqlJoinType::Full, on_user_id()))?;
    assert_eq!(optimized.plan.input(0).kind(), OperatorKind::HashJoin);
    Ok(())
}

#[test]
fn test_search_budget() {
    let config = OptimizerConfig { max_search_steps: Some(2), ..OptimizerConfig::default() };
    let context = OptimizerContext::new(&test_metadata(), config).unwrap();
    let result = context.optimize(DATABASE, SCHEMA, &users_join_orders(SqlJoinType::Inner, on_user_id()));
    assert!(matches!(result, Err(OptimizerError::NoFeasiblePlan(msg)) if msg.contains("budget")));
}

#[test]
fn test_disabled_rules_keep_filter() -> Result<()> {
    let config = OptimizerConfig {
        enabled_rules: Some(vec!["ProjectIntoScanRule".to_string()]),
        ..OptimizerConfig::default()
    };
    let context = OptimizerContext::new(&test_metadata(), config)?;
    let optimized = context.optimize(DATABASE, SCHEMA, &point_query())?;
    assert_eq!(
        optimized.explain(),
        "ExecProject(a=[$0])\n  ExecFilter(condition=[=($0, 1)])\n    ExecTableScan(table=[t], source=[ds_0])\n"
    );
    Ok(())
}

#[test]
fn test_unknown_context() {
    let result = context().optimize(DATABASE, "missing", &point_query());
    assert!(matches!(result, Err(OptimizerError::UnknownContext { schema, .. }) if schema == "missing"));
}
