#![allow(dead_code)]

use std::io::Write;

use anyhow::Result;
use tempfile::NamedTempFile;

use fedplan::catalog::{ClusterMetadata, Column, DataType, Database, Schema, Table};
use fedplan::query::sql_node::{SqlExpr, SqlJoin, SqlJoinType, SqlOrderByItem, SqlSelect, SqlSelectItem, SqlTableRef};

pub const DATABASE: &str = "sharding_db";
pub const SCHEMA: &str = "public";

// users: 100 rows on ds_0, orders: 10000 rows on ds_1, t: no statistics
pub fn test_schema() -> Schema {
    Schema::new(SCHEMA)
        .with_table(Table::new("users", vec![
            Column::new("id", DataType::Integer, false, true),
            Column::new("name", DataType::Text, true, false),
        ]).with_row_count(100))
        .and_then(|s| s.with_table(Table::new("orders", vec![
            Column::new("order_id", DataType::Integer, false, true),
            Column::new("user_id", DataType::Integer, false, false),
            Column::new("amount", DataType::Float, true, false),
        ]).with_row_count(10_000).with_data_source("ds_1")))
        .and_then(|s| s.with_table(Table::new("t", vec![
            Column::new("a", DataType::Integer, true, false),
            Column::new("b", DataType::Text, true, false),
        ])))
        .unwrap()
}

pub fn test_metadata() -> ClusterMetadata {
    ClusterMetadata::new().with_database(Database::new(DATABASE).with_schema(test_schema()))
}

// Same database with a single table `t2` instead of the test tables
pub fn replacement_metadata() -> ClusterMetadata {
    let schema = Schema::new(SCHEMA)
        .with_table(Table::new("t2", vec![Column::new("c", DataType::Integer, false, false)]))
        .unwrap();
    ClusterMetadata::new().with_database(Database::new(DATABASE).with_schema(schema))
}

pub fn select(table: &str, items: Vec<SqlSelectItem>) -> SqlSelect {
    SqlSelect::from_table(table, items)
}

pub fn columns(names: &[&str]) -> Vec<SqlSelectItem> {
    names.iter().map(|n| SqlSelectItem::expr(SqlExpr::ident(n))).collect()
}

// SELECT a FROM t WHERE a = 1
pub fn point_query() -> SqlSelect {
    SqlSelect {
        selection: Some(SqlExpr::eq(SqlExpr::ident("a"), SqlExpr::int(1))),
        ..select("t", columns(&["a"]))
    }
}

// SELECT u.id, o.amount FROM users u <join_type> JOIN orders o ON <condition>
pub fn users_join_orders(join_type: SqlJoinType, condition: SqlExpr) -> SqlSelect {
    SqlSelect {
        projection: vec![
            SqlSelectItem::expr(SqlExpr::qualified("u", "id")),
            SqlSelectItem::expr(SqlExpr::qualified("o", "amount")),
        ],
        from: Some(SqlTableRef::aliased("users", "u")),
        joins: vec![SqlJoin {
            join_type,
            table: SqlTableRef::aliased("orders", "o"),
            condition: Some(condition),
        }],
        ..SqlSelect::default()
    }
}

pub fn on_user_id() -> SqlExpr {
    SqlExpr::eq(SqlExpr::qualified("u", "id"), SqlExpr::qualified("o", "user_id"))
}

pub fn order_by(expr: SqlExpr) -> SqlOrderByItem {
    SqlOrderByItem { expr, asc: true }
}

// Write `contents` to a temporary file that lives as long as the handle
pub fn temp_file(contents: &str) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    Ok(file)
}
