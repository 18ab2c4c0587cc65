// Schema Metadata Module
//
// This module defines the data types known to the optimizer and the Schema type,
// a named collection of logical tables.

use std::collections::HashMap;
use std::fmt;
use super::table::Table;
use serde::{Serialize, Deserialize};

/// Data types supported by the federated catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataType {
    Integer,
    Float,
    Text,
    Boolean,
    Date,
    Timestamp,
    Blob,
    /// Type of an untyped NULL literal; never appears on a catalog column
    Null,
}

impl DataType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Integer | DataType::Float | DataType::Null)
    }

    /// Whether values of the two types can be compared with each other
    pub fn is_comparable_with(&self, other: &DataType) -> bool {
        match (self, other) {
            (DataType::Null, _) | (_, DataType::Null) => true,
            (a, b) if a.is_numeric() && b.is_numeric() => true,
            // Date and timestamp literals arrive as text from the dialect layer
            (DataType::Text, DataType::Date | DataType::Timestamp)
            | (DataType::Date | DataType::Timestamp, DataType::Text) => true,
            (DataType::Date, DataType::Timestamp) | (DataType::Timestamp, DataType::Date) => true,
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Integer => "INTEGER",
            DataType::Float => "FLOAT",
            DataType::Text => "TEXT",
            DataType::Boolean => "BOOLEAN",
            DataType::Date => "DATE",
            DataType::Timestamp => "TIMESTAMP",
            DataType::Blob => "BLOB",
            DataType::Null => "NULL",
        };
        write!(f, "{}", name)
    }
}

/// Serialized form of a schema
#[derive(Deserialize)]
struct SchemaDef {
    name: String,
    #[serde(default)]
    tables: Vec<Table>,
}

/// Represents a logical schema: the tables visible to one optimizer context
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "SchemaDef")]
pub struct Schema {
    /// Schema name
    name: String,
    /// Tables in declaration order
    tables: Vec<Table>,
    /// Lower-cased table name to position in `tables`
    #[serde(skip)]
    table_map: HashMap<String, usize>,
}

impl TryFrom<SchemaDef> for Schema {
    type Error = String;

    fn try_from(def: SchemaDef) -> Result<Self, Self::Error> {
        let mut schema = Schema::new(def.name);
        for table in def.tables {
            schema.add_table(table)?;
        }
        Ok(schema)
    }
}

impl Schema {
    /// Create a new, empty schema
    pub fn new(name: impl Into<String>) -> Self {
        Schema {
            name: name.into(),
            tables: Vec::new(),
            table_map: HashMap::new(),
        }
    }

    /// Get the schema name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a table to the schema
    pub fn add_table(&mut self, table: Table) -> Result<(), String> {
        let key = table.name().to_lowercase();
        if self.table_map.contains_key(&key) {
            return Err(format!("Table {} already exists in schema {}", table.name(), self.name));
        }
        self.table_map.insert(key, self.tables.len());
        self.tables.push(table);
        Ok(())
    }

    /// Builder-style variant of `add_table`
    pub fn with_table(mut self, table: Table) -> Result<Self, String> {
        self.add_table(table)?;
        Ok(self)
    }

    /// Check if a table exists in this schema (case-insensitive)
    pub fn has_table(&self, table_name: &str) -> bool {
        self.table_map.contains_key(&table_name.to_lowercase())
    }

    /// Get a table by name (case-insensitive)
    pub fn get_table(&self, table_name: &str) -> Option<&Table> {
        self.table_map
            .get(&table_name.to_lowercase())
            .map(|&idx| &self.tables[idx])
    }

    /// Get all tables in this schema
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }
}
