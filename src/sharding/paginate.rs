//! Cross-Shard Paginator
//!
//! Stitches per-shard pages into one global page. Shards are walked in
//! enumeration order; only the shards whose row ranges overlap the requested
//! page are sliced, so a page touches O(contributing shards) row data while
//! counts stay O(all shards).
//!
//! Counts are read once up front and not re-read mid-walk. Under concurrent
//! writes the total and the page contents may lag each other by a call; this
//! is a documented consistency relaxation, not a bug.

use chrono::NaiveDate;

use super::enumerator;
use super::registry::ShardRegistry;
use crate::data::Row;
use crate::entity::EntityDescriptor;
use crate::query::Filter;
use crate::Result;

/// Sentinel `next_page` value meaning "no further page"
pub const NO_NEXT_PAGE: i64 = -1;

/// One assembled page across all shards of an entity
#[derive(Debug, Clone)]
pub struct PageResult {
    /// Rows in shard order, each shard's internal order preserved
    pub rows: Vec<Row>,
    /// Total matching rows across all shards at query time
    pub total_count: u64,
    /// The page actually served, after clamping
    pub page: u64,
    /// Next page number, or [`NO_NEXT_PAGE`] when this is the last page
    pub next_page: i64,
}

/// Assemble one global page across every shard of `desc`.
///
/// `page` and `page_size` are clamped to at least 1, and `page` is clamped
/// down to the last page when it runs past the end. Every enumerated shard
/// is materialized through the registry before counting, so a fresh entity
/// leaves this call with its full shard set created.
pub fn paginate(
    desc: &EntityDescriptor,
    registry: &ShardRegistry,
    today: NaiveDate,
    filter: Option<&Filter>,
    page: u64,
    page_size: u64,
) -> Result<PageResult> {
    let page_size = page_size.max(1);
    let requested = page.max(1);

    let mut counts = Vec::new();
    let mut total_count: u64 = 0;
    for shard_id in enumerator::shard_ids(desc, today) {
        let handle = registry.get_or_create(desc, &shard_id)?;
        let count = handle.count(filter)?;
        total_count += count;
        counts.push((handle, count));
    }

    let max_page = total_count.div_ceil(page_size).max(1);
    let page = requested.min(max_page);
    log::debug!(
        "paginate entity '{}': {} shards, {} rows, serving page {}/{}",
        desc.name(),
        counts.len(),
        total_count,
        page,
        max_page
    );

    let mut rows: Vec<Row> = Vec::new();
    let mut accumulated: u64 = 0;
    for (handle, count) in &counts {
        accumulated += count;
        if *count == 0 {
            continue;
        }
        // Page number of this shard's last row. Shards ending before the
        // requested page are skipped without fetching rows.
        if accumulated.div_ceil(page_size) < page {
            continue;
        }
        if rows.is_empty() {
            // First contributing shard: the page starts partway into it.
            // Counts are a snapshot, so if an earlier shard returned fewer
            // rows than it counted, clamp to the shard front rather than
            // underflow.
            let start = count.saturating_sub(accumulated - (page - 1) * page_size);
            rows.extend(handle.rows(filter, start, page_size)?);
        } else {
            let needed = page_size - rows.len() as u64;
            rows.extend(handle.rows(filter, 0, needed)?);
        }
        if rows.len() as u64 >= page_size {
            break;
        }
    }

    let next_page = if page < max_page {
        (page + 1) as i64
    } else {
        NO_NEXT_PAGE
    };
    Ok(PageResult {
        rows,
        total_count,
        page,
        next_page,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{FieldDef, FieldSchema, Value};
    use crate::entity::DateGranularity;
    use crate::query::CompareOp;
    use crate::storage::MemTableStore;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 4, 15).unwrap()
    }

    /// Bucketed entity with one shard per entry of `sizes`; shard `i`
    /// holds rows named `"s{i}r{j}"` for `j` in insertion order.
    fn seeded(sizes: &[u64]) -> (EntityDescriptor, ShardRegistry) {
        let desc = EntityDescriptor::bucketed("user")
            .with_bucket_count(sizes.len() as u32)
            .with_schema(FieldSchema::new().field(FieldDef::string("name")));
        let registry = ShardRegistry::new(Arc::new(MemTableStore::new()));
        for (shard, &size) in sizes.iter().enumerate() {
            let handle = registry.get_or_create(&desc, &shard.to_string()).unwrap();
            for i in 0..size {
                let mut values = HashMap::new();
                values.insert("name".to_string(), Value::from(format!("s{}r{}", shard, i)));
                handle.insert_row(values).unwrap();
            }
        }
        (desc, registry)
    }

    fn names(result: &PageResult) -> Vec<String> {
        result
            .rows
            .iter()
            .map(|row| match row.get("name") {
                Some(Value::String(s)) => s.clone(),
                other => panic!("unexpected name value: {:?}", other),
            })
            .collect()
    }

    #[test]
    fn test_page_straddles_shard_boundary() {
        let (desc, registry) = seeded(&[7, 3, 10]);
        let result = paginate(&desc, &registry, today(), None, 1, 10).unwrap();

        assert_eq!(result.total_count, 20);
        assert_eq!(result.page, 1);
        assert_eq!(result.next_page, 2);
        let expected: Vec<String> = (0..7)
            .map(|i| format!("s0r{}", i))
            .chain((0..3).map(|i| format!("s1r{}", i)))
            .collect();
        assert_eq!(names(&result), expected);
    }

    #[test]
    fn test_last_page_from_single_shard() {
        let (desc, registry) = seeded(&[7, 3, 10]);
        let result = paginate(&desc, &registry, today(), None, 2, 10).unwrap();

        assert_eq!(result.page, 2);
        assert_eq!(result.next_page, NO_NEXT_PAGE);
        let expected: Vec<String> = (0..10).map(|i| format!("s2r{}", i)).collect();
        assert_eq!(names(&result), expected);
    }

    #[test]
    fn test_page_past_end_clamps_to_last() {
        let (desc, registry) = seeded(&[7, 3, 10]);
        let clamped = paginate(&desc, &registry, today(), None, 5, 10).unwrap();
        let last = paginate(&desc, &registry, today(), None, 2, 10).unwrap();

        assert_eq!(clamped.page, 2);
        assert_eq!(names(&clamped), names(&last));
        assert_eq!(clamped.next_page, NO_NEXT_PAGE);
    }

    #[test]
    fn test_zero_rows_single_empty_page() {
        let (desc, registry) = seeded(&[0, 0, 0]);
        let result = paginate(&desc, &registry, today(), None, 1, 10).unwrap();

        assert!(result.rows.is_empty());
        assert_eq!(result.total_count, 0);
        assert_eq!(result.page, 1);
        assert_eq!(result.next_page, NO_NEXT_PAGE);
    }

    #[test]
    fn test_zero_page_and_size_clamp_to_one() {
        let (desc, registry) = seeded(&[3]);
        let result = paginate(&desc, &registry, today(), None, 0, 0).unwrap();

        assert_eq!(result.page, 1);
        assert_eq!(names(&result), vec!["s0r0"]);
        assert_eq!(result.next_page, 2);
    }

    #[test]
    fn test_empty_leading_shard_skipped() {
        let (desc, registry) = seeded(&[0, 5]);
        let result = paginate(&desc, &registry, today(), None, 1, 10).unwrap();

        let expected: Vec<String> = (0..5).map(|i| format!("s1r{}", i)).collect();
        assert_eq!(names(&result), expected);
    }

    #[test]
    fn test_mid_shard_start_offset() {
        let (desc, registry) = seeded(&[5, 5]);
        let result = paginate(&desc, &registry, today(), None, 2, 3).unwrap();

        // Global rows 3..6: the tail of shard 0 plus the head of shard 1.
        assert_eq!(names(&result), vec!["s0r3", "s0r4", "s1r0"]);
        assert_eq!(result.next_page, 3);
    }

    #[test]
    fn test_filter_applies_to_counts_and_rows() {
        let desc = EntityDescriptor::bucketed("user")
            .with_bucket_count(2)
            .with_schema(FieldSchema::new().field(FieldDef::int("age")));
        let registry = ShardRegistry::new(Arc::new(MemTableStore::new()));
        for (shard, ages) in [(0u32, vec![10i64, 20, 30]), (1, vec![40, 50])] {
            let handle = registry.get_or_create(&desc, &shard.to_string()).unwrap();
            for age in ages {
                let mut values = HashMap::new();
                values.insert("age".to_string(), Value::from(age));
                handle.insert_row(values).unwrap();
            }
        }
        let filter = Filter::cmp("age", CompareOp::GreaterEqual, 30i64);

        let first = paginate(&desc, &registry, today(), Some(&filter), 1, 2).unwrap();
        assert_eq!(first.total_count, 3);
        assert_eq!(first.rows.len(), 2);
        assert_eq!(first.rows[0].get("age"), Some(&Value::Int64(30)));
        assert_eq!(first.rows[1].get("age"), Some(&Value::Int64(40)));

        let second = paginate(&desc, &registry, today(), Some(&filter), 2, 2).unwrap();
        assert_eq!(second.rows.len(), 1);
        assert_eq!(second.rows[0].get("age"), Some(&Value::Int64(50)));
        assert_eq!(second.next_page, NO_NEXT_PAGE);
    }

    #[test]
    fn test_paginate_materializes_every_shard() {
        let (desc, registry) = seeded(&[1, 1, 1]);
        assert_eq!(registry.handle_count(), 3);

        let fresh = ShardRegistry::new(Arc::new(MemTableStore::new()));
        paginate(&desc, &fresh, today(), None, 1, 10).unwrap();
        assert_eq!(fresh.handle_count(), 3);
    }

    #[test]
    fn test_empty_shard_set_serves_empty_page() {
        let desc = EntityDescriptor::date("log")
            .with_date_start(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap())
            .with_granularity(DateGranularity::Month)
            .with_schema(FieldSchema::new().field(FieldDef::string("msg")));
        let registry = ShardRegistry::new(Arc::new(MemTableStore::new()));

        let result = paginate(&desc, &registry, today(), None, 1, 10).unwrap();
        assert!(result.rows.is_empty());
        assert_eq!(result.total_count, 0);
        assert_eq!(result.next_page, NO_NEXT_PAGE);
        assert_eq!(registry.handle_count(), 0);
    }

    #[test]
    fn test_month_end_day_shard_counted_once() {
        let desc = EntityDescriptor::date("log")
            .with_date_start(NaiveDate::from_ymd_opt(2021, 2, 27).unwrap())
            .with_granularity(DateGranularity::Day)
            .with_schema(FieldSchema::new().field(FieldDef::string("msg")));
        let registry = ShardRegistry::new(Arc::new(MemTableStore::new()));
        let handle = registry.get_or_create(&desc, "20210228").unwrap();
        let mut values = HashMap::new();
        values.insert("msg".to_string(), Value::from("rollover"));
        handle.insert_row(values).unwrap();

        let result = paginate(
            &desc,
            &registry,
            NaiveDate::from_ymd_opt(2021, 3, 1).unwrap(),
            None,
            1,
            10,
        )
        .unwrap();
        assert_eq!(result.total_count, 1);
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.next_page, NO_NEXT_PAGE);
        // 20210227, 20210228, 20210301
        assert_eq!(registry.handle_count(), 3);
    }

    #[test]
    fn test_walking_next_page_visits_every_row_once() {
        let (desc, registry) = seeded(&[4, 2, 5]);
        let mut seen = Vec::new();
        let mut page: u64 = 1;
        loop {
            let result = paginate(&desc, &registry, today(), None, page, 3).unwrap();
            seen.extend(names(&result));
            if result.next_page == NO_NEXT_PAGE {
                break;
            }
            page = result.next_page as u64;
        }

        let expected: Vec<String> = [(0u32, 4u64), (1, 2), (2, 5)]
            .iter()
            .flat_map(|&(shard, size)| (0..size).map(move |i| format!("s{}r{}", shard, i)))
            .collect();
        assert_eq!(seen, expected);
    }
}
