//! ShardBase routing demo
//!
//! Usage:
//!   shardbase-demo --dir ./shardbase-data --rows 25 --page-size 10
//!
//! Registers a bucketed `user` entity and a monthly `log` entity, routes
//! rows into their shards, then pages through each entity as one table.

use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Months, Utc};

use shardbase::data::{FieldDef, FieldSchema, Value};
use shardbase::entity::{DateGranularity, EntityDescriptor};
use shardbase::query::{CompareOp, Filter};
use shardbase::sharding::{ShardKey, ShardRouter, NO_NEXT_PAGE};
use shardbase::storage::FileTableStore;

#[derive(Parser, Debug)]
#[command(name = "shardbase-demo")]
#[command(about = "Cross-shard routing and pagination demo")]
#[command(version)]
struct Args {
    /// Directory for shard table files
    #[arg(short, long, default_value = "./shardbase-data")]
    dir: PathBuf,

    /// Number of demo user rows to insert
    #[arg(short, long, default_value_t = 25)]
    rows: u32,

    /// Page size for the listing passes
    #[arg(short, long, default_value_t = 10)]
    page_size: u64,
}

fn run(args: Args) -> shardbase::Result<()> {
    let store = Arc::new(FileTableStore::new(&args.dir)?);
    let router = ShardRouter::new(store);

    router.register(
        EntityDescriptor::bucketed("user").with_schema(
            FieldSchema::new()
                .field(FieldDef::string("user_name"))
                .field(FieldDef::string("name"))
                .field(FieldDef::int("age").with_default(18i64))
                .field(FieldDef::bool("active").with_default(true))
                .field(FieldDef::timestamp("created_at").auto_now()),
        ),
    )?;

    let today = Utc::now().date_naive();
    let log_start = today.checked_sub_months(Months::new(2)).unwrap_or(today);
    router.register(
        EntityDescriptor::date("log")
            .with_date_start(log_start)
            .with_granularity(DateGranularity::Month)
            .with_schema(
                FieldSchema::new()
                    .field(FieldDef::string("content"))
                    .field(FieldDef::int("level").with_default(0i64))
                    .field(FieldDef::timestamp("time").auto_now()),
            ),
    )?;

    // Users route by a digest of their login name.
    for i in 0..args.rows {
        let user_name = format!("user{:03}", i);
        let key = ShardKey::digest(&user_name);
        let shard = router.shard("user", Some(&key))?;
        let mut values = HashMap::new();
        values.insert("user_name".to_string(), Value::from(user_name));
        values.insert("name".to_string(), Value::from(format!("User {}", i)));
        values.insert("age".to_string(), Value::from(18 + (i % 30) as i64));
        shard.insert_row(values)?;
    }

    println!("user shard distribution:");
    for shard_id in router.shard_ids("user")? {
        let handle = router.shard_by_id("user", &shard_id)?;
        println!("  {}: {} rows", handle.physical_table(), handle.count(None)?);
    }

    // Logs route by period; seed every period the entity currently spans.
    for period in router.shard_ids("log")? {
        let shard = router.shard_by_id("log", &period)?;
        for i in 0..3 {
            let mut values = HashMap::new();
            values.insert(
                "content".to_string(),
                Value::from(format!("{} event #{}", period, i)),
            );
            values.insert("level".to_string(), Value::from(i as i64 % 3));
            shard.insert_row(values)?;
        }
    }

    println!("\nall users, page by page:");
    print_pages(&router, "user", None, args.page_size)?;

    let adults = Filter::cmp("age", CompareOp::GreaterEqual, 30i64);
    println!("\nusers with age >= 30:");
    print_pages(&router, "user", Some(&adults), args.page_size)?;

    println!("\nall logs, page by page:");
    print_pages(&router, "log", None, args.page_size)?;

    Ok(())
}

fn print_pages(
    router: &ShardRouter,
    entity: &str,
    filter: Option<&Filter>,
    page_size: u64,
) -> shardbase::Result<()> {
    let mut page: u64 = 1;
    loop {
        let result = router.paginate(entity, filter, page, page_size)?;
        println!(
            "  page {} ({} rows, {} total):",
            result.page,
            result.rows.len(),
            result.total_count
        );
        for row in &result.rows {
            println!("    {}", row.to_json());
        }
        if result.next_page == NO_NEXT_PAGE {
            break;
        }
        page = result.next_page as u64;
    }
    Ok(())
}

fn main() {
    env_logger::init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Demo error: {}", e);
        std::process::exit(1);
    }
}
