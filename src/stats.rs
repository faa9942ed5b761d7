//! Store statistics.
//!
//! Reports whether the store file exists and how many records it holds.
//! Never creates the store; a fresh environment reports `false` / `0`.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::error::CatalogResult;
use crate::models::Stats;
use crate::schema::CatalogSchema;
use crate::sqlite_store::SqliteStore;
use crate::store::CatalogStore;

pub async fn catalog_stats(config: &Config) -> CatalogResult<Stats> {
    if !db::store_exists(config) {
        return Ok(Stats {
            database_exists: false,
            total_records: 0,
        });
    }

    let store = SqliteStore::open(config, CatalogSchema::danalog()).await?;
    let total = match store.is_populated().await {
        Ok(true) => store.count().await,
        Ok(false) => Ok(0),
        Err(e) => Err(e),
    };
    store.close().await;

    Ok(Stats {
        database_exists: true,
        total_records: total?,
    })
}

/// Run the stats command: query the store and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let stats = catalog_stats(config).await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Danalog Catalog: Store Stats");
    println!("============================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Exists:      {}", if stats.database_exists { "yes" } else { "no" });
    println!("  Size:        {}", format_bytes(db_size));
    println!("  Records:     {}", stats.total_records);
    println!();
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
