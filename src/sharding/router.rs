//! Shard Router
//!
//! The application-facing facade. Owns the entity catalog, the shard
//! registry and the clock, and wires the resolver, enumerator and paginator
//! together so callers work in terms of entity names and sharding inputs.

use std::sync::Arc;

use super::clock::{Clock, SystemClock};
use super::enumerator;
use super::paginate::{self, PageResult};
use super::registry::{ShardHandle, ShardRegistry};
use super::resolver::{self, Resolution, ShardKey};
use crate::entity::{EntityCatalog, EntityDescriptor};
use crate::query::Filter;
use crate::storage::TableStore;
use crate::Result;

/// Routes entity operations to the shard that owns them.
///
/// One router instance is shared process-wide; all state lives behind
/// internal locks, so `&self` methods are safe to call from many threads.
pub struct ShardRouter {
    catalog: EntityCatalog,
    registry: ShardRegistry,
    clock: Arc<dyn Clock>,
}

impl ShardRouter {
    /// Router over `store` using the system clock
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Router with an injected clock, for deterministic date sharding
    pub fn with_clock(store: Arc<dyn TableStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            catalog: EntityCatalog::new(),
            registry: ShardRegistry::new(store),
            clock,
        }
    }

    /// Register an entity descriptor. Must happen before the entity is
    /// routed; configuration problems fail here, not per request.
    pub fn register(&self, desc: EntityDescriptor) -> Result<()> {
        self.catalog.register(desc)
    }

    pub fn catalog(&self) -> &EntityCatalog {
        &self.catalog
    }

    pub fn registry(&self) -> &ShardRegistry {
        &self.registry
    }

    /// Resolve a sharding input to the owning shard id
    pub fn resolve(&self, entity: &str, key: Option<&ShardKey>) -> Result<Resolution> {
        let desc = self.catalog.get(entity)?;
        Ok(resolver::resolve(&desc, key, self.clock.today()))
    }

    /// All shard ids the entity currently spans, in pagination order
    pub fn shard_ids(&self, entity: &str) -> Result<Vec<String>> {
        let desc = self.catalog.get(entity)?;
        Ok(enumerator::shard_ids(&desc, self.clock.today()))
    }

    /// Resolve a sharding input and return the owning shard's handle,
    /// materializing it on first touch
    pub fn shard(&self, entity: &str, key: Option<&ShardKey>) -> Result<Arc<ShardHandle>> {
        let desc = self.catalog.get(entity)?;
        let resolution = resolver::resolve(&desc, key, self.clock.today());
        self.registry.get_or_create(&desc, &resolution.shard_id)
    }

    /// Handle for an explicit shard id, materializing it on first touch
    pub fn shard_by_id(&self, entity: &str, shard_id: &str) -> Result<Arc<ShardHandle>> {
        let desc = self.catalog.get(entity)?;
        self.registry.get_or_create(&desc, shard_id)
    }

    /// One global page across every shard of the entity
    pub fn paginate(
        &self,
        entity: &str,
        filter: Option<&Filter>,
        page: u64,
        page_size: u64,
    ) -> Result<PageResult> {
        let desc = self.catalog.get(entity)?;
        paginate::paginate(
            &desc,
            &self.registry,
            self.clock.today(),
            filter,
            page,
            page_size,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{FieldDef, FieldSchema, Value};
    use crate::entity::DateGranularity;
    use crate::sharding::clock::FixedClock;
    use crate::sharding::NO_NEXT_PAGE;
    use crate::storage::MemTableStore;
    use crate::ShardError;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    fn router() -> ShardRouter {
        let clock = FixedClock(NaiveDate::from_ymd_opt(2020, 4, 15).unwrap());
        let router = ShardRouter::with_clock(Arc::new(MemTableStore::new()), Arc::new(clock));
        router
            .register(
                EntityDescriptor::bucketed("user").with_schema(
                    FieldSchema::new()
                        .field(FieldDef::string("user_name"))
                        .field(FieldDef::string("name"))
                        .field(FieldDef::int("age").with_default(18i64))
                        .field(FieldDef::bool("active").with_default(true))
                        .field(FieldDef::timestamp("created_at").auto_now()),
                ),
            )
            .unwrap();
        router
            .register(
                EntityDescriptor::date("log")
                    .with_date_start(NaiveDate::from_ymd_opt(2020, 3, 1).unwrap())
                    .with_granularity(DateGranularity::Month)
                    .with_schema(
                        FieldSchema::new()
                            .field(FieldDef::string("content"))
                            .field(FieldDef::int("level").with_default(0i64))
                            .field(FieldDef::timestamp("time").auto_now()),
                    ),
            )
            .unwrap();
        router
    }

    fn user_row(name: &str) -> HashMap<String, Value> {
        let mut values = HashMap::new();
        values.insert("user_name".to_string(), Value::from(name));
        values
    }

    #[test]
    fn test_unknown_entity_rejected() {
        let router = router();
        let err = router.resolve("ghost", None).unwrap_err();
        assert!(matches!(err, ShardError::EntityNotFound(_)));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let router = router();
        let err = router
            .register(EntityDescriptor::bucketed("user"))
            .unwrap_err();
        assert!(matches!(err, ShardError::EntityExists(_)));
    }

    #[test]
    fn test_user_routes_to_stable_shard() {
        let router = router();
        let key = ShardKey::digest("alice");

        let shard = router.shard("user", Some(&key)).unwrap();
        shard.insert_row(user_row("alice")).unwrap();

        // Same key, same shard, row visible with defaults applied.
        let again = router.shard("user", Some(&key)).unwrap();
        assert_eq!(shard.shard_id(), again.shard_id());
        let row = again
            .get_row(&Filter::eq("user_name", "alice"))
            .unwrap()
            .unwrap();
        assert_eq!(row.get("age"), Some(&Value::Int64(18)));
        assert_eq!(row.get("active"), Some(&Value::Bool(true)));
        assert!(matches!(row.get("created_at"), Some(Value::Timestamp(_))));
    }

    #[test]
    fn test_update_and_delete_through_handle() {
        let router = router();
        let key = ShardKey::digest("bob");
        let shard = router.shard("user", Some(&key)).unwrap();
        shard.insert_row(user_row("bob")).unwrap();

        let filter = Filter::eq("user_name", "bob");
        let mut changes = HashMap::new();
        changes.insert("age".to_string(), Value::from(19i64));
        let updated = shard.update_row(&filter, changes).unwrap().unwrap();
        assert_eq!(updated.get("age"), Some(&Value::Int64(19)));

        assert!(shard.delete_row(&filter).unwrap());
        assert!(shard.get_row(&filter).unwrap().is_none());
        assert!(!shard.delete_row(&filter).unwrap());
    }

    #[test]
    fn test_log_period_routing_and_fallback() {
        let router = router();
        assert_eq!(router.shard_ids("log").unwrap(), vec!["202003", "202004"]);

        let hit = router.resolve("log", Some(&ShardKey::from("202003"))).unwrap();
        assert_eq!(hit.shard_id, "202003");
        assert!(!hit.fallback_used);

        let miss = router.resolve("log", Some(&ShardKey::from("201001"))).unwrap();
        assert_eq!(miss.shard_id, "202004");
        assert!(miss.fallback_used);

        let default = router.shard("log", None).unwrap();
        assert_eq!(default.physical_table(), "log_202004");
    }

    #[test]
    fn test_paginate_across_period_shards() {
        let router = router();
        for (period, count) in [("202003", 3u64), ("202004", 2)] {
            let shard = router.shard_by_id("log", period).unwrap();
            for i in 0..count {
                let mut values = HashMap::new();
                values.insert(
                    "content".to_string(),
                    Value::from(format!("{} #{}", period, i)),
                );
                shard.insert_row(values).unwrap();
            }
        }

        let first = router.paginate("log", None, 1, 4).unwrap();
        assert_eq!(first.total_count, 5);
        assert_eq!(first.rows.len(), 4);
        assert_eq!(first.next_page, 2);
        assert_eq!(
            first.rows[0].get("content"),
            Some(&Value::String("202003 #0".into()))
        );
        assert_eq!(
            first.rows[3].get("content"),
            Some(&Value::String("202004 #0".into()))
        );

        let second = router.paginate("log", None, 2, 4).unwrap();
        assert_eq!(second.rows.len(), 1);
        assert_eq!(second.next_page, NO_NEXT_PAGE);

        // auto_now stamped the rows on the way in.
        assert!(matches!(first.rows[0].get("time"), Some(Value::Timestamp(_))));
    }

    #[test]
    fn test_shard_by_id_materializes_table() {
        let router = router();
        let handle = router.shard_by_id("user", "7").unwrap();
        assert_eq!(handle.physical_table(), "user_7");
        assert_eq!(router.registry().handle_count(), 1);
    }
}
