//! Shard Set Enumerator
//!
//! Derives the full ordered set of shard ids an entity spans right now.
//! Bucketed entities enumerate `0..bucket_count`; date entities walk the
//! calendar from their start date up to and including today's period.
//! The output order is the global pagination order, so it must be stable
//! for a given descriptor and date.

use chrono::{Datelike, NaiveDate};

use crate::entity::{DateGranularity, EntityDescriptor, ShardStrategy};

/// Enumerate every shard id the entity currently spans, in pagination order.
///
/// Bucketed entities yield `"0"` through `"bucket_count - 1"`. Date entities
/// yield one period string per step from the start date through today; a
/// start date in the future yields an empty set.
///
/// Every period appears exactly once. Day granularity lands on the last
/// day of each month and jumps straight to day 1 of the next, so ids cross
/// month boundaries as consecutive entries with no gaps and no repeats.
pub fn shard_ids(desc: &EntityDescriptor, today: NaiveDate) -> Vec<String> {
    match desc.strategy() {
        ShardStrategy::Bucketed { bucket_count } => {
            (0..*bucket_count).map(|i| i.to_string()).collect()
        }
        ShardStrategy::Date { start, granularity } => date_shard_ids(*start, *granularity, today),
    }
}

fn date_shard_ids(start: NaiveDate, granularity: DateGranularity, today: NaiveDate) -> Vec<String> {
    let end = (today.year(), today.month(), today.day());
    let mut cur = (start.year(), start.month(), start.day());
    let mut ids = Vec::new();
    while cur <= end {
        ids.push(granularity.period_string_ymd(cur.0, cur.1, cur.2));
        cur = match granularity {
            // Land on January 1st so the current year is always included,
            // whatever the start date's month and day were.
            DateGranularity::Year => (cur.0 + 1, 1, 1),
            DateGranularity::Month => next_month_start(cur.0, cur.1),
            DateGranularity::Day => {
                if cur.2 == days_in_month(cur.0, cur.1) {
                    next_month_start(cur.0, cur.1)
                } else {
                    (cur.0, cur.1, cur.2 + 1)
                }
            }
        };
    }
    ids
}

fn next_month_start(year: i32, month: u32) -> (i32, u32, u32) {
    if month == 12 {
        (year + 1, 1, 1)
    } else {
        (year, month + 1, 1)
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}
