//! Shard Key Resolver
//!
//! Pure routing function: given an entity descriptor, an optional sharding
//! input and today's date, produce the shard identifier that owns the input.
//! Bucketed entities take the input modulo the bucket count; date entities
//! accept a period string (or an integer coercible to one) and fall back to
//! the current period when the input lies outside the enumerated range.

use std::hash::{BuildHasher, Hash, Hasher};

use ahash::RandomState;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::enumerator;
use crate::entity::{EntityDescriptor, ShardStrategy};

// Fixed seeds: a key must route to the same shard across processes and
// restarts, so the digest cannot depend on per-process hasher state.
const DIGEST_SEEDS_LO: (u64, u64, u64, u64) = (
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
);
const DIGEST_SEEDS_HI: (u64, u64, u64, u64) = (
    0x4528_21e6_38d0_1377,
    0xbe54_66cf_34e9_0c6c,
    0xc0ac_29b7_c97c_50dd,
    0x3f84_d5b5_b547_0917,
);

/// A sharding input supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShardKey {
    /// Pre-hashed numeric key, wide enough for a 128-bit digest
    Uint(u128),
    /// Raw string key: a period string for date entities, or a decimal
    /// integer string for bucketed ones
    Str(String),
}

impl ShardKey {
    /// Derive a stable 128-bit digest from a natural key.
    ///
    /// This is the routing input to use for free-form keys (user names,
    /// request ids) on bucketed entities: the digest spreads load across
    /// buckets while staying identical across processes.
    pub fn digest(natural_key: &str) -> Self {
        let lo = seeded_hash(DIGEST_SEEDS_LO, natural_key);
        let hi = seeded_hash(DIGEST_SEEDS_HI, natural_key);
        ShardKey::Uint(((hi as u128) << 64) | lo as u128)
    }

    /// Numeric view for bucketed routing. Decimal strings are parsed;
    /// any other string is digested first.
    fn bucket_value(&self) -> u128 {
        match self {
            ShardKey::Uint(v) => *v,
            ShardKey::Str(s) => match s.parse::<u128>() {
                Ok(v) => v,
                Err(_) => {
                    let hi = seeded_hash(DIGEST_SEEDS_HI, s);
                    let lo = seeded_hash(DIGEST_SEEDS_LO, s);
                    ((hi as u128) << 64) | lo as u128
                }
            },
        }
    }

    /// Period-string view for date routing
    fn period_value(&self) -> String {
        match self {
            ShardKey::Uint(v) => v.to_string(),
            ShardKey::Str(s) => s.clone(),
        }
    }
}

fn seeded_hash(seeds: (u64, u64, u64, u64), key: &str) -> u64 {
    let state = RandomState::with_seeds(seeds.0, seeds.1, seeds.2, seeds.3);
    let mut hasher = state.build_hasher();
    key.hash(&mut hasher);
    hasher.finish()
}

impl From<u64> for ShardKey {
    fn from(v: u64) -> Self {
        ShardKey::Uint(v as u128)
    }
}

impl From<u128> for ShardKey {
    fn from(v: u128) -> Self {
        ShardKey::Uint(v)
    }
}

impl From<&str> for ShardKey {
    fn from(v: &str) -> Self {
        ShardKey::Str(v.to_string())
    }
}

impl From<String> for ShardKey {
    fn from(v: String) -> Self {
        ShardKey::Str(v)
    }
}

/// Outcome of resolving a sharding input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The shard that owns the input
    pub shard_id: String,
    /// True when a date input was outside the enumerated range and routing
    /// fell back to the current period. Strict callers branch on this.
    pub fallback_used: bool,
}

/// Map a sharding input to the shard identifier that owns it.
///
/// With no input, the default shard is returned: `"0"` for bucketed
/// entities, the current period for date entities. Date inputs that are not
/// members of the entity's current enumeration route to the default shard
/// with `fallback_used` set instead of failing; out-of-range and malformed
/// inputs are tolerated by design.
///
/// The descriptor comes validated out of the catalog, so `bucket_count`
/// is always positive here.
pub fn resolve(desc: &EntityDescriptor, key: Option<&ShardKey>, today: NaiveDate) -> Resolution {
    match desc.strategy() {
        ShardStrategy::Bucketed { bucket_count } => {
            let shard_id = match key {
                None => "0".to_string(),
                Some(k) => (k.bucket_value() % *bucket_count as u128).to_string(),
            };
            Resolution {
                shard_id,
                fallback_used: false,
            }
        }
        ShardStrategy::Date { granularity, .. } => {
            let current = granularity.period_string(today);
            match key {
                None => Resolution {
                    shard_id: current,
                    fallback_used: false,
                },
                Some(k) => {
                    let wanted = k.period_value();
                    if enumerator::shard_ids(desc, today).iter().any(|id| *id == wanted) {
                        Resolution {
                            shard_id: wanted,
                            fallback_used: false,
                        }
                    } else {
                        log::warn!(
                            "date input '{}' for entity '{}' is outside the enumerated range, routing to current period '{}'",
                            wanted,
                            desc.name(),
                            current
                        );
                        Resolution {
                            shard_id: current,
                            fallback_used: true,
                        }
                    }
                }
            }
        }
    }
}
