//! Catalog Module
//!
//! Federated metadata consumed by the optimizer: logical databases, their schemas,
//! tables, columns and column types. The catalog is plain immutable data; the
//! governance layer builds a new `ClusterMetadata` and hands it to
//! `OptimizerContext::reload` whenever something changes.

pub mod column;
pub mod metadata;
pub mod schema;
pub mod table;

// Re-export key types
pub use self::column::Column;
pub use self::metadata::{ClusterMetadata, Database};
pub use self::schema::{DataType, Schema};
pub use self::table::Table;
