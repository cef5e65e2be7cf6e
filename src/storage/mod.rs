//! Shard Storage
//!
//! The storage collaborator the routing core talks to. [`TableStore`] is the
//! whole contract: existence checks, schema materialization and row CRUD
//! against named physical tables. Two reference implementations ship here,
//! an in-memory store for tests and fast ephemeral use, and a file-backed
//! store with a checksummed on-disk format.

use std::collections::HashMap;

use crate::data::{FieldSchema, Row, Value};
use crate::query::Filter;
use crate::Result;

mod table;

pub mod file;
pub mod memory;

pub use file::FileTableStore;
pub use memory::MemTableStore;
pub use table::ShardTable;

/// Physical table backend the shard registry materializes against.
///
/// Implementations are shared across threads behind an `Arc`, so every
/// method takes `&self` and must be internally synchronized. Row lookups
/// that find nothing report it in the return type; `Err` is reserved for
/// storage faults.
pub trait TableStore: Send + Sync {
    /// Whether the physical table already exists
    fn exists(&self, table: &str) -> Result<bool>;

    /// Create the physical table with the given schema.
    /// Fails with [`crate::ShardError::TableExists`] if it is already there.
    fn create(&self, table: &str, schema: &FieldSchema) -> Result<()>;

    /// Count rows matching the filter (all rows when `None`)
    fn count(&self, table: &str, filter: Option<&Filter>) -> Result<u64>;

    /// Fetch up to `limit` matching rows starting at `offset`, in row id
    /// order. The offset counts matching rows, not raw rows.
    fn slice(
        &self,
        table: &str,
        filter: Option<&Filter>,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Row>>;

    /// Insert a row, returning it as stored (id assigned, defaults and
    /// auto-now fields filled). Unknown fields and type mismatches fail.
    fn insert_row(&self, table: &str, values: HashMap<String, Value>) -> Result<Row>;

    /// First row matching the filter, in row id order
    fn get_row(&self, table: &str, filter: &Filter) -> Result<Option<Row>>;

    /// Update the first matching row, returning it after the change
    fn update_row(
        &self,
        table: &str,
        filter: &Filter,
        changes: HashMap<String, Value>,
    ) -> Result<Option<Row>>;

    /// Delete the first matching row. Returns whether anything was deleted.
    fn delete_row(&self, table: &str, filter: &Filter) -> Result<bool>;
}
