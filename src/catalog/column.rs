// Column Metadata Module
//
// This module defines the Column type that describes one column of a logical table.

use super::schema::DataType;
use serde::{Serialize, Deserialize};

/// Represents a column in a logical table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    name: String,
    /// Column data type
    data_type: DataType,
    /// Whether this column can contain NULL values
    #[serde(default = "default_nullable")]
    nullable: bool,
    /// Whether this column is part of the primary key
    #[serde(default)]
    primary_key: bool,
}

fn default_nullable() -> bool {
    true
}

impl Column {
    /// Create a new column
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool, primary_key: bool) -> Self {
        Column {
            name: name.into(),
            data_type,
            nullable,
            primary_key,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Check if the column can contain NULL values.
    /// Primary key columns never do, whatever the metadata says.
    pub fn is_nullable(&self) -> bool {
        self.nullable && !self.primary_key
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }
}
