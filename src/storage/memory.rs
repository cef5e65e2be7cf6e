//! In-memory table store.
//!
//! Reference [`TableStore`] backend with no persistence. Used by tests and
//! by callers that want routing semantics over ephemeral data.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::{ShardTable, TableStore};
use crate::data::{FieldSchema, Row, Value};
use crate::query::Filter;
use crate::{Result, ShardError};

#[derive(Debug, Default)]
pub struct MemTableStore {
    tables: RwLock<HashMap<String, ShardTable>>,
}

impl MemTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_table<T>(&self, table: &str, f: impl FnOnce(&ShardTable) -> T) -> Result<T> {
        let tables = self.tables.read();
        let t = tables
            .get(table)
            .ok_or_else(|| ShardError::TableNotFound(table.to_string()))?;
        Ok(f(t))
    }

    fn write_table<T>(&self, table: &str, f: impl FnOnce(&mut ShardTable) -> Result<T>) -> Result<T> {
        let mut tables = self.tables.write();
        let t = tables
            .get_mut(table)
            .ok_or_else(|| ShardError::TableNotFound(table.to_string()))?;
        f(t)
    }
}

impl TableStore for MemTableStore {
    fn exists(&self, table: &str) -> Result<bool> {
        Ok(self.tables.read().contains_key(table))
    }

    fn create(&self, table: &str, schema: &FieldSchema) -> Result<()> {
        let mut tables = self.tables.write();
        if tables.contains_key(table) {
            return Err(ShardError::TableExists(table.to_string()));
        }
        tables.insert(table.to_string(), ShardTable::new(schema.clone()));
        Ok(())
    }

    fn count(&self, table: &str, filter: Option<&Filter>) -> Result<u64> {
        self.read_table(table, |t| t.count(filter))
    }

    fn slice(
        &self,
        table: &str,
        filter: Option<&Filter>,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Row>> {
        self.read_table(table, |t| t.slice(filter, offset, limit))
    }

    fn insert_row(&self, table: &str, values: HashMap<String, Value>) -> Result<Row> {
        self.write_table(table, |t| t.insert(values))
    }

    fn get_row(&self, table: &str, filter: &Filter) -> Result<Option<Row>> {
        self.read_table(table, |t| t.first_match(filter))
    }

    fn update_row(
        &self,
        table: &str,
        filter: &Filter,
        changes: HashMap<String, Value>,
    ) -> Result<Option<Row>> {
        self.write_table(table, |t| t.update_first(filter, changes))
    }

    fn delete_row(&self, table: &str, filter: &Filter) -> Result<bool> {
        self.write_table(table, |t| Ok(t.delete_first(filter)))
    }
}
