// Cluster Metadata Module
//
// Logical databases and the metadata snapshot handed to the optimizer on every reload.

use std::path::Path;
use serde::{Serialize, Deserialize};

use super::schema::Schema;

/// A logical database: one or more schemas whose tables may be spread over
/// several physical data sources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    name: String,
    #[serde(default)]
    schemas: Vec<Schema>,
}

impl Database {
    pub fn new(name: impl Into<String>) -> Self {
        Database {
            name: name.into(),
            schemas: Vec::new(),
        }
    }

    /// Add a schema, replacing any schema with the same name
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schemas.retain(|s| s.name() != schema.name());
        self.schemas.push(schema);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schemas(&self) -> &[Schema] {
        &self.schemas
    }

    pub fn get_schema(&self, name: &str) -> Option<&Schema> {
        self.schemas.iter().find(|s| s.name() == name)
    }
}

/// Everything the governance layer knows about the cluster at one point in time
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterMetadata {
    #[serde(default)]
    databases: Vec<Database>,
}

impl ClusterMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a database, replacing any database with the same name
    pub fn with_database(mut self, database: Database) -> Self {
        self.databases.retain(|d| d.name() != database.name());
        self.databases.push(database);
        self
    }

    pub fn databases(&self) -> &[Database] {
        &self.databases
    }

    pub fn get_database(&self, name: &str) -> Option<&Database> {
        self.databases.iter().find(|d| d.name() == name)
    }

    /// Load a metadata snapshot from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&text)?)
    }
}
