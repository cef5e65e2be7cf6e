//! Entity descriptors: per-entity sharding configuration.
//!
//! An entity descriptor declares how one logical table is split into shards
//! (fixed buckets or calendar periods), the base name its physical tables
//! derive from, and its field layout. Descriptors are validated and frozen
//! at registration; changing a live entity's bucket count or date format is
//! a breaking migration and is not supported.

mod catalog;

pub use catalog::EntityCatalog;

use crate::data::FieldSchema;
use crate::{Result, ShardError};
use chrono::NaiveDate;

/// Bucket count applied when a bucketed entity does not set one
pub const DEFAULT_BUCKET_COUNT: u32 = 10;

/// Date-sequence start applied when a date entity does not set one
fn default_date_start() -> NaiveDate {
    // 2020-01-01, always valid
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

/// Granularity of a date-sharded entity's period keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateGranularity {
    /// `"2020"`
    Year,
    /// `"202003"`
    Month,
    /// `"20200301"`
    Day,
}

impl DateGranularity {
    /// Format a date as a period string at this granularity
    pub fn period_string(&self, date: NaiveDate) -> String {
        use chrono::Datelike;
        self.period_string_ymd(date.year(), date.month(), date.day())
    }

    /// Same formatting from raw calendar components
    pub(crate) fn period_string_ymd(&self, year: i32, month: u32, day: u32) -> String {
        match self {
            DateGranularity::Year => format!("{:04}", year),
            DateGranularity::Month => format!("{:04}{:02}", year, month),
            DateGranularity::Day => format!("{:04}{:02}{:02}", year, month, day),
        }
    }
}

/// How an entity maps rows to shards
#[derive(Debug, Clone, PartialEq)]
pub enum ShardStrategy {
    /// Fixed-count modulo routing on an integer key
    Bucketed { bucket_count: u32 },
    /// One shard per calendar period from `start` to the current period
    Date {
        start: NaiveDate,
        granularity: DateGranularity,
    },
}

/// Static sharding configuration of one entity
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDescriptor {
    name: String,
    base_table: String,
    strategy: ShardStrategy,
    schema: FieldSchema,
}

impl EntityDescriptor {
    /// Create a bucketed entity with the default bucket count
    pub fn bucketed(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            base_table: name.clone(),
            name,
            strategy: ShardStrategy::Bucketed {
                bucket_count: DEFAULT_BUCKET_COUNT,
            },
            schema: FieldSchema::new(),
        }
    }

    /// Create a date entity with the default start and month granularity
    pub fn date(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            base_table: name.clone(),
            name,
            strategy: ShardStrategy::Date {
                start: default_date_start(),
                granularity: DateGranularity::Month,
            },
            schema: FieldSchema::new(),
        }
    }

    /// Set the bucket count (bucketed entities)
    pub fn with_bucket_count(mut self, count: u32) -> Self {
        if let ShardStrategy::Bucketed { bucket_count } = &mut self.strategy {
            *bucket_count = count;
        }
        self
    }

    /// Set the date-sequence start (date entities)
    pub fn with_date_start(mut self, start: NaiveDate) -> Self {
        if let ShardStrategy::Date { start: s, .. } = &mut self.strategy {
            *s = start;
        }
        self
    }

    /// Set the period granularity (date entities)
    pub fn with_granularity(mut self, granularity: DateGranularity) -> Self {
        if let ShardStrategy::Date { granularity: g, .. } = &mut self.strategy {
            *g = granularity;
        }
        self
    }

    /// Set the base physical table name (defaults to the entity name)
    pub fn with_base_table(mut self, base: impl Into<String>) -> Self {
        self.base_table = base.into();
        self
    }

    /// Set the field layout
    pub fn with_schema(mut self, schema: FieldSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Entity name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base physical table name
    pub fn base_table(&self) -> &str {
        &self.base_table
    }

    /// Sharding strategy
    pub fn strategy(&self) -> &ShardStrategy {
        &self.strategy
    }

    /// Field layout
    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    /// Physical table name of one shard, e.g. `user_3` or `log_202003`
    pub fn physical_table_name(&self, shard_id: &str) -> String {
        format!("{}_{}", self.base_table, shard_id)
    }

    /// Validate the configuration. Called at registration; a descriptor in
    /// the catalog is always valid.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(ShardError::Config("empty entity name".to_string()));
        }
        if self.base_table.is_empty() {
            return Err(ShardError::Config(format!(
                "entity '{}' has an empty base table name",
                self.name
            )));
        }
        if let ShardStrategy::Bucketed { bucket_count } = self.strategy {
            if bucket_count == 0 {
                return Err(ShardError::Config(format!(
                    "entity '{}' has bucket count 0",
                    self.name
                )));
            }
        }
        self.schema
            .validate()
            .map_err(|e| ShardError::Config(format!("entity '{}': {}", self.name, e)))?;
        Ok(())
    }
}
