//! Export the whole catalog as JSON.
//!
//! Produces an array of records (full column set, `id` and `createdAt`
//! included) ordered by id. Read-only: the catalog is never modified here.

use anyhow::Result;
use std::path::Path;

use crate::config::Config;
use crate::db;
use crate::error::CatalogResult;
use crate::models::CatalogRecord;
use crate::schema::CatalogSchema;
use crate::sqlite_store::SqliteStore;
use crate::store::CatalogStore;

/// All records in the configured store; empty if it was never created.
pub async fn export_records(config: &Config) -> CatalogResult<Vec<CatalogRecord>> {
    if !db::store_exists(config) {
        return Ok(Vec::new());
    }

    let store = SqliteStore::open(config, CatalogSchema::danalog()).await?;
    let records = match store.is_populated().await {
        Ok(true) => store.all_records().await,
        Ok(false) => Ok(Vec::new()),
        Err(e) => Err(e),
    };
    store.close().await;
    records
}

/// Export records as JSON.
///
/// If `output` is `Some`, writes to that file path. Otherwise writes
/// to stdout for piping.
pub async fn run_export(config: &Config, output: Option<&Path>) -> Result<()> {
    let records = export_records(config).await?;
    let json = serde_json::to_string_pretty(&records)?;

    match output {
        Some(path) => {
            std::fs::write(path, &json)?;
            eprintln!("Exported {} records to {}", records.len(), path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
