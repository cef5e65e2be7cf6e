//! Shard Routing Core
//!
//! Maps records of a logical entity onto physically separate shard tables
//! and reassembles cross-shard listings into single pages.
//!
//! Architecture:
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    ShardRouter                           │
//! │  - Entity registration and lookup                        │
//! │  - resolve / shard / shard_ids / paginate surface        │
//! ├──────────────────────────────────────────────────────────┤
//! │  Paginator                                               │
//! │  - Per-shard counts → page window → per-shard slices     │
//! ├──────────────────────────────────────────────────────────┤
//! │  ShardRegistry                                           │
//! │  - (entity, shard id) → handle cache                     │
//! │  - Create-exactly-once materialization                   │
//! ├──────────────────────────────────────────────────────────┤
//! │  Resolver / Enumerator                                   │
//! │  - Bucketed modulo and date-period routing               │
//! │  - Ordered shard id sequences from an injectable clock   │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod clock;
pub mod resolver;
pub mod enumerator;
pub mod registry;
pub mod paginate;
pub mod router;

pub use clock::{Clock, FixedClock, SystemClock};
pub use resolver::{resolve, Resolution, ShardKey};
pub use enumerator::shard_ids;
pub use registry::{ShardHandle, ShardRegistry};
pub use paginate::{paginate, PageResult, NO_NEXT_PAGE};
pub use router::ShardRouter;
