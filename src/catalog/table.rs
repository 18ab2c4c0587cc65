//! Table Metadata Module
//!
//! This module defines the Table type: a logical table, the physical data source its
//! rows live on, and the statistics the cost model uses.

use std::collections::HashMap;
use super::column::Column;
use serde::{Serialize, Deserialize};

/// Data source used when the metadata does not name one
pub const DEFAULT_DATA_SOURCE: &str = "ds_0";

#[derive(Deserialize)]
struct TableDef {
    name: String,
    #[serde(default)]
    columns: Vec<Column>,
    #[serde(default)]
    data_source: Option<String>,
    #[serde(default)]
    row_count: Option<u64>,
}

/// Represents a logical table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "TableDef")]
pub struct Table {
    /// Table name
    name: String,
    /// Columns in the table
    columns: Vec<Column>,
    /// Lower-cased column name to index lookup
    #[serde(skip)]
    column_map: HashMap<String, usize>,
    /// Physical data source the rows are pulled from
    data_source: String,
    /// Row count statistic, if the governance layer collected one
    row_count: Option<u64>,
}

impl From<TableDef> for Table {
    fn from(def: TableDef) -> Self {
        let mut table = Table::new(def.name, def.columns);
        if let Some(ds) = def.data_source {
            table.data_source = ds;
        }
        table.row_count = def.row_count;
        table
    }
}

impl Table {
    /// Create a new table with the given name and columns
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        let mut column_map = HashMap::new();
        for (i, col) in columns.iter().enumerate() {
            column_map.entry(col.name().to_lowercase()).or_insert(i);
        }

        Table {
            name: name.into(),
            columns,
            column_map,
            data_source: DEFAULT_DATA_SOURCE.to_string(),
            row_count: None,
        }
    }

    /// Set the data source this table is stored on
    pub fn with_data_source(mut self, data_source: impl Into<String>) -> Self {
        self.data_source = data_source.into();
        self
    }

    /// Set the row count statistic
    pub fn with_row_count(mut self, rows: u64) -> Self {
        self.row_count = Some(rows);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn data_source(&self) -> &str {
        &self.data_source
    }

    pub fn row_count(&self) -> Option<u64> {
        self.row_count
    }

    /// Get a column by name (case-insensitive)
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.column_index(name).map(|idx| &self.columns[idx])
    }

    /// Get the column index for a column name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_map.get(&name.to_lowercase()).copied()
    }
}
