// Optimizer Context
//
// Maps (database, schema) to the planners used for statements addressed to it. The
// whole mapping is an immutable snapshot published behind a single pointer: reloads
// build a new snapshot and swap the pointer, so every call works against one complete
// mapping for its whole duration. Database and schema names match case-insensitively,
// like table names in the catalog.

use std::collections::HashMap;
use std::sync::Arc;

use log::info;
use parking_lot::{Mutex, RwLock};

use crate::catalog::{ClusterMetadata, Database, Schema};
use crate::config::{ConfigError, OptimizerConfig};
use crate::query::planner::error::{OptimizerError, Result};
use crate::query::planner::heuristic::HeuristicPlannerBuilder;
use crate::query::planner::optimizer::{OptimizedPlan, Optimizer};
use crate::query::planner::rules::RuleRegistry;
use crate::query::planner::volcano::PlannerCluster;
use crate::query::sql_node::SqlSelect;

/// Planner state for one schema
pub struct SchemaPlannerContext {
    schema: Schema,
    heuristic: HeuristicPlannerBuilder,
}

impl SchemaPlannerContext {
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn heuristic(&self) -> &HeuristicPlannerBuilder {
        &self.heuristic
    }
}

/// Planner state for every schema of one logical database
pub struct DatabasePlannerContext {
    name: String,
    schemas: HashMap<String, SchemaPlannerContext>,
}

impl DatabasePlannerContext {
    fn build(database: &Database, heuristic: &HeuristicPlannerBuilder) -> Self {
        let schemas = database.schemas().iter()
            .map(|schema| {
                (schema.name().to_lowercase(), SchemaPlannerContext {
                    schema: schema.clone(),
                    heuristic: heuristic.clone(),
                })
            })
            .collect();
        DatabasePlannerContext {
            name: database.name().to_string(),
            schemas,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemas.values().map(|s| s.schema.name()).collect();
        names.sort();
        names
    }
}

/// One published version of the context mapping
pub struct ContextSnapshot {
    version: u64,
    databases: HashMap<String, Arc<DatabasePlannerContext>>,
    heuristic: HeuristicPlannerBuilder,
    cluster: Arc<PlannerCluster>,
    default_table_rows: u64,
}

impl ContextSnapshot {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn database_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.databases.values().map(|d| d.name()).collect();
        names.sort();
        names
    }

    pub fn database(&self, name: &str) -> Option<&DatabasePlannerContext> {
        self.databases.get(&name.to_lowercase()).map(|d| d.as_ref())
    }

    pub fn planner_context(&self, database: &str, schema: &str) -> Result<&SchemaPlannerContext> {
        self.databases.get(&database.to_lowercase())
            .and_then(|d| d.schemas.get(&schema.to_lowercase()))
            .ok_or_else(|| OptimizerError::UnknownContext {
                database: database.to_string(),
                schema: schema.to_string(),
            })
    }

    /// Optimize a statement against this snapshot
    pub fn optimize(&self, database: &str, schema: &str, select: &SqlSelect) -> Result<OptimizedPlan> {
        let context = self.planner_context(database, schema)?;
        Optimizer::new(&context.schema, &context.heuristic, &self.cluster, self.default_table_rows).optimize(select)
    }

    /// Copy of this snapshot with `databases` as the mapping
    fn successor(&self, databases: HashMap<String, Arc<DatabasePlannerContext>>) -> Self {
        ContextSnapshot {
            version: self.version + 1,
            databases,
            heuristic: self.heuristic.clone(),
            cluster: self.cluster.clone(),
            default_table_rows: self.default_table_rows,
        }
    }
}

/// Shared entry point for optimizing statements of every logical database
pub struct OptimizerContext {
    current: RwLock<Arc<ContextSnapshot>>,
    /// Serializes writers; readers never take it
    reload_lock: Mutex<()>,
}

impl OptimizerContext {
    pub fn new(metadata: &ClusterMetadata, config: OptimizerConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        let registry = RuleRegistry::from_config(&config)?;
        let heuristic = HeuristicPlannerBuilder::new(registry)
            .max_rule_applications(config.max_rule_applications);
        let snapshot = ContextSnapshot {
            version: 1,
            databases: build_databases(metadata, &heuristic),
            heuristic,
            cluster: Arc::new(PlannerCluster::new(&config)),
            default_table_rows: config.default_table_rows,
        };
        info!("Optimizer context initialized with {} database(s)", snapshot.databases.len());
        Ok(OptimizerContext {
            current: RwLock::new(Arc::new(snapshot)),
            reload_lock: Mutex::new(()),
        })
    }

    /// The mapping as currently published
    pub fn snapshot(&self) -> Arc<ContextSnapshot> {
        self.current.read().clone()
    }

    /// Optimize a statement addressed to `database`.`schema`
    pub fn optimize(&self, database: &str, schema: &str, select: &SqlSelect) -> Result<OptimizedPlan> {
        self.snapshot().optimize(database, schema, select)
    }

    /// Replace the whole mapping with one built from `metadata`
    pub fn reload(&self, metadata: &ClusterMetadata) {
        let _writer = self.reload_lock.lock();
        let current = self.snapshot();
        let next = current.successor(build_databases(metadata, &current.heuristic));
        self.publish(next);
    }

    /// Publish a mapping with `database` added or replaced
    pub fn alter_database(&self, database: &Database) {
        let _writer = self.reload_lock.lock();
        let current = self.snapshot();
        let mut databases = current.databases.clone();
        databases.insert(
            database.name().to_lowercase(),
            Arc::new(DatabasePlannerContext::build(database, &current.heuristic)),
        );
        self.publish(current.successor(databases));
    }

    /// Publish a mapping without `name`; returns whether it was present
    pub fn drop_database(&self, name: &str) -> bool {
        let _writer = self.reload_lock.lock();
        let current = self.snapshot();
        let key = name.to_lowercase();
        if !current.databases.contains_key(&key) {
            return false;
        }
        let mut databases = current.databases.clone();
        databases.remove(&key);
        self.publish(current.successor(databases));
        true
    }

    fn publish(&self, snapshot: ContextSnapshot) {
        info!("Publishing optimizer context version {} with {} database(s)", snapshot.version, snapshot.databases.len());
        *self.current.write() = Arc::new(snapshot);
    }
}

fn build_databases(metadata: &ClusterMetadata, heuristic: &HeuristicPlannerBuilder) -> HashMap<String, Arc<DatabasePlannerContext>> {
    metadata.databases().iter()
        .map(|d| (d.name().to_lowercase(), Arc::new(DatabasePlannerContext::build(d, heuristic))))
        .collect()
}
