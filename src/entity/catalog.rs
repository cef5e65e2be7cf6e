//! Entity catalog

use super::EntityDescriptor;
use crate::{Result, ShardError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of entity descriptors, keyed by entity name.
///
/// Descriptors are validated on `register` and immutable afterwards, so any
/// descriptor obtained from the catalog can be routed against without
/// re-checking its configuration.
pub struct EntityCatalog {
    entities: RwLock<HashMap<String, Arc<EntityDescriptor>>>,
}

impl EntityCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
        }
    }

    /// Register an entity. Fails on invalid configuration or a duplicate
    /// name; both are startup errors, never per-request ones.
    pub fn register(&self, desc: EntityDescriptor) -> Result<()> {
        desc.validate()?;
        let mut entities = self.entities.write();
        if entities.contains_key(desc.name()) {
            return Err(ShardError::EntityExists(desc.name().to_string()));
        }
        log::info!("registered entity '{}'", desc.name());
        entities.insert(desc.name().to_string(), Arc::new(desc));
        Ok(())
    }

    /// Look up a registered entity
    pub fn get(&self, name: &str) -> Result<Arc<EntityDescriptor>> {
        self.entities
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ShardError::EntityNotFound(name.to_string()))
    }

    /// Names of all registered entities, sorted
    pub fn entity_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entities.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for EntityCatalog {
    fn default() -> Self {
        Self::new()
    }
}
