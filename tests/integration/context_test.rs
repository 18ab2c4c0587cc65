use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;

use fedplan::catalog::{Column, DataType, Database, Schema, Table};
use fedplan::config::OptimizerConfig;
use fedplan::query::planner::heuristic::HeuristicPlannerBuilder;
use fedplan::query::planner::rules::DEFAULT_REGISTRY;
use fedplan::query::planner::{OptimizerContext, OptimizerError};
use fedplan::query::sql_node::{SqlJoinType, SqlSelectItem};

#[path = "../common/mod.rs"]
mod common;
use common::{on_user_id, point_query, replacement_metadata, select, test_metadata, test_schema, users_join_orders, DATABASE, SCHEMA};

#[test]
fn test_snapshot_outlives_reload() -> Result<()> {
    let context = OptimizerContext::new(&test_metadata(), OptimizerConfig::default())?;
    let in_flight = context.snapshot();

    context.reload(&replacement_metadata());

    // A call that started before the reload keeps the old mapping
    assert!(in_flight.optimize(DATABASE, SCHEMA, &point_query()).is_ok());
    // Calls that start afterwards see the new one
    assert!(matches!(
        context.optimize(DATABASE, SCHEMA, &point_query()),
        Err(OptimizerError::UnresolvedReference(_))
    ));
    assert!(context.optimize(DATABASE, SCHEMA, &select("t2", vec![SqlSelectItem::Wildcard])).is_ok());
    Ok(())
}

#[test]
fn test_readers_never_see_partial_mapping() -> Result<()> {
    let context = OptimizerContext::new(&test_metadata(), OptimizerConfig::default())?;
    let old_statement = point_query();
    let new_statement = select("t2", vec![SqlSelectItem::Wildcard]);
    let done = AtomicBool::new(false);

    crossbeam::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|_| {
                while !done.load(Ordering::Acquire) {
                    let snapshot = context.snapshot();
                    let old = snapshot.optimize(DATABASE, SCHEMA, &old_statement).is_ok();
                    let new = snapshot.optimize(DATABASE, SCHEMA, &new_statement).is_ok();
                    // Exactly one of the two mappings, never a mix
                    assert!(old != new, "snapshot version {} mixes mappings", snapshot.version());
                }
            });
        }
        s.spawn(|_| {
            for i in 0..50 {
                if i % 2 == 0 {
                    context.reload(&replacement_metadata());
                } else {
                    context.reload(&test_metadata());
                }
            }
            done.store(true, Ordering::Release);
        });
    }).unwrap();

    assert_eq!(context.snapshot().version(), 51);
    Ok(())
}

#[test]
fn test_concurrent_heuristic_planners_are_independent() -> Result<()> {
    let schema = test_schema();
    let builder = HeuristicPlannerBuilder::new(DEFAULT_REGISTRY.clone());
    let converter = fedplan::query::planner::converter::SqlToPlanConverter::new(&schema, 1000);
    let first = converter.convert(&point_query())?;
    let second = converter.convert(&users_join_orders(SqlJoinType::Inner, on_user_id()))?;

    let rewrite = |plan: &fedplan::query::planner::PlanRef| {
        let mut planner = builder.build();
        planner.set_root(plan.clone());
        planner.find_best()
    };
    let expected = (rewrite(&first)?, rewrite(&second)?);

    crossbeam::thread::scope(|s| {
        let a = s.spawn(|_| (0..20).map(|_| rewrite(&first)).collect::<Vec<_>>());
        let b = s.spawn(|_| (0..20).map(|_| rewrite(&second)).collect::<Vec<_>>());
        for result in a.join().unwrap() {
            assert_eq!(result.unwrap(), expected.0);
        }
        for result in b.join().unwrap() {
            assert_eq!(result.unwrap(), expected.1);
        }
    }).unwrap();
    Ok(())
}

#[test]
fn test_alter_and_drop_database() -> Result<()> {
    let context = OptimizerContext::new(&test_metadata(), OptimizerConfig::default())?;
    let before = context.snapshot();

    let analytics = Schema::new("reporting")
        .with_table(Table::new("daily", vec![Column::new("day", DataType::Date, false, false)]))
        .map_err(anyhow::Error::msg)?;
    context.alter_database(&Database::new("analytics_db").with_schema(analytics));

    let after = context.snapshot();
    assert_eq!(after.database_names(), vec!["analytics_db", DATABASE]);
    assert_eq!(before.database_names(), vec![DATABASE]);
    assert!(context.optimize("analytics_db", "reporting", &select("daily", vec![SqlSelectItem::Wildcard])).is_ok());

    assert!(context.drop_database(DATABASE));
    assert!(matches!(
        context.optimize(DATABASE, SCHEMA, &point_query()),
        Err(OptimizerError::UnknownContext { .. })
    ));
    // The earlier snapshot still resolves the dropped database
    assert!(before.optimize(DATABASE, SCHEMA, &point_query()).is_ok());
    Ok(())
}

#[test]
fn test_failed_call_leaves_context_untouched() -> Result<()> {
    let context = Arc::new(OptimizerContext::new(&test_metadata(), OptimizerConfig::default())?);
    let version = context.snapshot().version();

    assert!(context.optimize(DATABASE, SCHEMA, &select("missing", vec![SqlSelectItem::Wildcard])).is_err());
    assert_eq!(context.snapshot().version(), version);
    assert!(context.optimize(DATABASE, SCHEMA, &point_query()).is_ok());
    Ok(())
}
