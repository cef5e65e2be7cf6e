//! File-backed table store.
//!
//! One file per physical table under a base directory, written through on
//! every mutation and loaded lazily on first access. The format is a fixed
//! header plus a bincode payload:
//!
//! ```text
//! +-----------+------------+---------------+----------------+
//! | magic (8) | crc32 (4)  | payload len 8 | bincode payload|
//! +-----------+------------+---------------+----------------+
//! ```
//!
//! The checksum covers the payload, so torn or tampered files surface as
//! [`ShardError::Corrupt`] on load instead of decoding garbage.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use super::{ShardTable, TableStore};
use crate::data::{FieldSchema, Row, Value};
use crate::query::Filter;
use crate::{Result, ShardError};

const TABLE_MAGIC: &[u8; 8] = b"SBTBL001";
const HEADER_LEN: usize = 8 + 4 + 8;
const TABLE_FILE_EXT: &str = "tbl";

pub struct FileTableStore {
    base_dir: PathBuf,
    tables: RwLock<HashMap<String, ShardTable>>,
}

impl FileTableStore {
    /// Open a store rooted at `base_dir`, creating the directory if needed.
    /// Table files are loaded lazily, not scanned up front.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)?;
        log::debug!("file table store opened at {:?}", base_dir);
        Ok(Self {
            base_dir,
            tables: RwLock::new(HashMap::new()),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn table_path(&self, table: &str) -> PathBuf {
        self.base_dir.join(format!("{}.{}", table, TABLE_FILE_EXT))
    }

    fn encode(table: &ShardTable) -> Result<Vec<u8>> {
        let payload =
            bincode::serialize(table).map_err(|e| ShardError::Serialization(e.to_string()))?;
        let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
        buf.extend_from_slice(TABLE_MAGIC);
        buf.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
        buf.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        buf.extend_from_slice(&payload);
        Ok(buf)
    }

    fn decode(table: &str, bytes: &[u8]) -> Result<ShardTable> {
        if bytes.len() < HEADER_LEN {
            return Err(ShardError::Corrupt(format!(
                "table file for '{}' truncated: {} bytes",
                table,
                bytes.len()
            )));
        }
        if &bytes[0..8] != TABLE_MAGIC {
            return Err(ShardError::Corrupt(format!(
                "table file for '{}' has bad magic",
                table
            )));
        }
        let stored_crc = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
        let payload_len = u64::from_le_bytes(bytes[12..20].try_into().unwrap()) as usize;
        let payload = &bytes[HEADER_LEN..];
        if payload.len() != payload_len {
            return Err(ShardError::Corrupt(format!(
                "table file for '{}' has wrong payload length: {} != {}",
                table,
                payload.len(),
                payload_len
            )));
        }
        if crc32fast::hash(payload) != stored_crc {
            return Err(ShardError::Corrupt(format!(
                "table file for '{}' failed checksum",
                table
            )));
        }
        bincode::deserialize(payload).map_err(|e| ShardError::Serialization(e.to_string()))
    }

    fn persist(&self, table: &str, state: &ShardTable) -> Result<()> {
        let bytes = Self::encode(state)?;
        fs::write(self.table_path(table), bytes)?;
        Ok(())
    }

    /// Pull the table into memory if a file for it exists.
    /// Entries are never evicted, so a loaded table stays loaded.
    fn ensure_loaded(&self, table: &str) -> Result<()> {
        {
            if self.tables.read().contains_key(table) {
                return Ok(());
            }
        }
        let mut tables = self.tables.write();
        if tables.contains_key(table) {
            return Ok(());
        }
        let path = self.table_path(table);
        if !path.exists() {
            return Err(ShardError::TableNotFound(table.to_string()));
        }
        let state = Self::decode(table, &fs::read(&path)?)?;
        log::debug!("loaded table '{}' ({} rows) from {:?}", table, state.len(), path);
        tables.insert(table.to_string(), state);
        Ok(())
    }

    fn read_table<T>(&self, table: &str, f: impl FnOnce(&ShardTable) -> T) -> Result<T> {
        self.ensure_loaded(table)?;
        let tables = self.tables.read();
        let t = tables
            .get(table)
            .ok_or_else(|| ShardError::TableNotFound(table.to_string()))?;
        Ok(f(t))
    }

    /// Run a mutation and write the table through to disk when it reports
    /// dirty. A failed write leaves memory ahead of disk until the next
    /// successful one rewrites the full state.
    fn mutate<T>(
        &self,
        table: &str,
        f: impl FnOnce(&mut ShardTable) -> Result<(T, bool)>,
    ) -> Result<T> {
        self.ensure_loaded(table)?;
        let mut tables = self.tables.write();
        let t = tables
            .get_mut(table)
            .ok_or_else(|| ShardError::TableNotFound(table.to_string()))?;
        let (out, dirty) = f(t)?;
        if dirty {
            self.persist(table, t)?;
        }
        Ok(out)
    }
}

impl TableStore for FileTableStore {
    fn exists(&self, table: &str) -> Result<bool> {
        if self.tables.read().contains_key(table) {
            return Ok(true);
        }
        Ok(self.table_path(table).exists())
    }

    fn create(&self, table: &str, schema: &FieldSchema) -> Result<()> {
        let mut tables = self.tables.write();
        if tables.contains_key(table) || self.table_path(table).exists() {
            return Err(ShardError::TableExists(table.to_string()));
        }
        let state = ShardTable::new(schema.clone());
        self.persist(table, &state)?;
        tables.insert(table.to_string(), state);
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
        self.mutate(table, |t| t.insert(values).map(|row| (row, true)))
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
        self.mutate(table, |t| {
            let updated = t.update_first(filter, changes)?;
            let dirty = updated.is_some();
            Ok((updated, dirty))
        })
    }

    fn delete_row(&self, table: &str, filter: &Filter) -> Result<bool> {
        self.mutate(table, |t| {
            let deleted = t.delete_first(filter);
            Ok((deleted, deleted))
        })
    }
}
