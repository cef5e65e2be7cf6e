//! ShardBase Shard Routing Core
//!
//! Routes records of a logical entity across physically separate shard
//! tables and pages through the union of all shards as one table. Ships
//! with in-memory and file-backed storage; any [`storage::TableStore`]
//! implementation plugs in underneath.

pub mod data;
pub mod entity;
pub mod query;
pub mod sharding;
pub mod storage;

// Re-export main types
pub use data::{DataType, FieldDef, FieldSchema, Row, Value};
pub use entity::{DateGranularity, EntityCatalog, EntityDescriptor, ShardStrategy};
pub use query::{CompareOp, Filter};
pub use sharding::{
    PageResult, Resolution, ShardHandle, ShardKey, ShardRegistry, ShardRouter, NO_NEXT_PAGE,
};
pub use storage::{FileTableStore, MemTableStore, TableStore};

/// Routing core error type
#[derive(Debug, thiserror::Error)]
pub enum ShardError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Entity already exists: {0}")]
    EntityExists(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Table already exists: {0}")]
    TableExists(String),

    #[error("Field not found: {0}")]
    FieldNotFound(String),

    #[error("Type mismatch for field '{field}': expected {expected:?}")]
    TypeMismatch { field: String, expected: DataType },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Corrupt table file: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, ShardError>;
