//! Shard Registry
//!
//! Caches one handle per (entity, shard) pair and materializes the backing
//! table lazily, exactly once, no matter how many threads race on the first
//! touch. The creation slow path is serialized through a single gate; the
//! hot path is a read lock on the handle map.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::data::{Row, Value};
use crate::entity::EntityDescriptor;
use crate::query::Filter;
use crate::storage::TableStore;
use crate::Result;

// ==========================================================================
// Shard Handle
// ==========================================================================

/// A live handle to one shard's physical table.
///
/// Handles are cheap to clone (`Arc` inside the registry) and borrow the
/// registry's store, so row operations go straight to storage with the
/// physical table name already bound.
pub struct ShardHandle {
    entity: String,
    shard_id: String,
    physical_table: String,
    store: Arc<dyn TableStore>,
}

impl ShardHandle {
    /// Entity the shard belongs to
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Shard identifier within the entity
    pub fn shard_id(&self) -> &str {
        &self.shard_id
    }

    /// Physical table name backing this shard
    pub fn physical_table(&self) -> &str {
        &self.physical_table
    }

    /// Count rows in this shard, optionally restricted by a filter
    pub fn count(&self, filter: Option<&Filter>) -> Result<u64> {
        self.store.count(&self.physical_table, filter)
    }

    /// Fetch a window of rows in insertion order
    pub fn rows(&self, filter: Option<&Filter>, offset: u64, limit: u64) -> Result<Vec<Row>> {
        self.store.slice(&self.physical_table, filter, offset, limit)
    }

    /// Insert a row, returning it as stored (id assigned, defaults filled)
    pub fn insert_row(&self, values: HashMap<String, Value>) -> Result<Row> {
        self.store.insert_row(&self.physical_table, values)
    }

    /// First row matching the filter, if any
    pub fn get_row(&self, filter: &Filter) -> Result<Option<Row>> {
        self.store.get_row(&self.physical_table, filter)
    }

    /// Update the first row matching the filter, returning the new row
    pub fn update_row(
        &self,
        filter: &Filter,
        changes: HashMap<String, Value>,
    ) -> Result<Option<Row>> {
        self.store.update_row(&self.physical_table, filter, changes)
    }

    /// Delete the first row matching the filter. Returns whether a row went.
    pub fn delete_row(&self, filter: &Filter) -> Result<bool> {
        self.store.delete_row(&self.physical_table, filter)
    }
}

impl fmt::Debug for ShardHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardHandle")
            .field("entity", &self.entity)
            .field("shard_id", &self.shard_id)
            .field("physical_table", &self.physical_table)
            .finish()
    }
}

// ==========================================================================
// Shard Registry
// ==========================================================================

/// Registry of materialized shards over one [`TableStore`].
pub struct ShardRegistry {
    store: Arc<dyn TableStore>,
    handles: RwLock<HashMap<(String, String), Arc<ShardHandle>>>,
    // Serializes the exists/create slow path. Never held while a handle
    // is being used, only while one is being materialized.
    create_gate: Mutex<()>,
}

impl ShardRegistry {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self {
            store,
            handles: RwLock::new(HashMap::new()),
            create_gate: Mutex::new(()),
        }
    }

    /// Get the handle for `(entity, shard_id)`, materializing the backing
    /// table on first touch.
    ///
    /// Concurrent callers racing on an unmaterialized shard serialize on an
    /// internal gate and re-check the cache, so the table is created exactly
    /// once and every caller leaves with the same handle. A failed creation
    /// caches nothing; the next call retries from scratch.
    pub fn get_or_create(
        &self,
        desc: &EntityDescriptor,
        shard_id: &str,
    ) -> Result<Arc<ShardHandle>> {
        let key = (desc.name().to_string(), shard_id.to_string());

        {
            let handles = self.handles.read();
            if let Some(handle) = handles.get(&key) {
                return Ok(Arc::clone(handle));
            }
        }

        let _gate = self.create_gate.lock();

        // Another thread may have materialized the shard while this one
        // waited on the gate.
        {
            let handles = self.handles.read();
            if let Some(handle) = handles.get(&key) {
                return Ok(Arc::clone(handle));
            }
        }

        let physical_table = desc.physical_table_name(shard_id);
        if !self.store.exists(&physical_table)? {
            self.store.create(&physical_table, desc.schema())?;
            log::info!(
                "materialized shard '{}' of entity '{}' as table '{}'",
                shard_id,
                desc.name(),
                physical_table
            );
        }

        let handle = Arc::new(ShardHandle {
            entity: key.0.clone(),
            shard_id: key.1.clone(),
            physical_table,
            store: Arc::clone(&self.store),
        });
        self.handles.write().insert(key, Arc::clone(&handle));
        Ok(handle)
    }

    /// Number of handles currently cached
    pub fn handle_count(&self) -> usize {
        self.handles.read().len()
    }
}

impl fmt::Debug for ShardRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardRegistry")
            .field("handles", &self.handle_count())
            .finish()
    }
}
