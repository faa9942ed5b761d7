//! Idempotent catalog ingestion.
//!
//! Coordinates the upload flow: spreadsheet → header mapping → per-row
//! dedup-check-then-insert → counts. Each insert commits on its own, so a
//! failed batch leaves earlier rows in place and can be re-uploaded; the
//! business-key check skips what already landed.
//!
//! The store is the only source of truth for "already present": a key
//! repeated inside one upload is inserted once and skipped afterwards
//! because every check re-queries the store.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{CatalogError, CatalogResult};
use crate::models::{format_number, CatalogRow, CellValue, IngestReport};
use crate::schema::{CatalogSchema, Column, ColumnKind, BUSINESS_KEY};
use crate::sheet::{self, Sheet};
use crate::sqlite_store::SqliteStore;
use crate::store::CatalogStore;

/// Map each spreadsheet header onto a catalog column.
///
/// Blank headers (whose columns are guaranteed empty by the parser) and
/// surrogate id columns map to `None` and are dropped. Unknown or repeated
/// columns are rejected before anything is written.
pub fn map_headers(
    schema: &CatalogSchema,
    headers: &[String],
) -> CatalogResult<Vec<Option<&'static Column>>> {
    let mut mapping: Vec<Option<&'static Column>> = Vec::with_capacity(headers.len());
    for header in headers {
        if header.trim().is_empty() || schema.is_surrogate(header) {
            mapping.push(None);
            continue;
        }
        let column = schema
            .resolve(header)
            .ok_or_else(|| CatalogError::Parse(format!("unknown column: {}", header.trim())))?;
        if mapping.iter().flatten().any(|c| c.sql == column.sql) {
            return Err(CatalogError::Parse(format!(
                "column {} appears more than once",
                header.trim()
            )));
        }
        mapping.push(Some(column));
    }
    Ok(mapping)
}

/// Coerce a cell into the representation its column stores.
///
/// Business keys are trimmed so the stored value is the one the
/// existence check looks up.
pub fn normalize(column: &Column, value: CellValue) -> CellValue {
    if column.sql == BUSINESS_KEY {
        return match value.as_text() {
            Some(key) => CellValue::text(key.trim()),
            None => CellValue::Null,
        };
    }
    match (column.kind, value) {
        (_, CellValue::Null) => CellValue::Null,
        (ColumnKind::Text, CellValue::Number(n)) => CellValue::Text(format_number(n)),
        (ColumnKind::Date, CellValue::Number(n)) => {
            CellValue::Text(sheet::serial_to_datetime(n).unwrap_or_else(|| format_number(n)))
        }
        (ColumnKind::Real, CellValue::Text(s)) => match s.trim().parse::<f64>() {
            Ok(n) => CellValue::Number(n),
            Err(_) => CellValue::text(s),
        },
        (_, CellValue::Text(s)) => CellValue::text(s),
        (_, v) => v,
    }
}

/// Build the insertable row for one data row. Every mapped column is
/// present; empty cells become explicit nulls.
pub fn to_catalog_row(mapping: &[Option<&'static Column>], cells: &[CellValue]) -> CatalogRow {
    let cells = mapping
        .iter()
        .zip(cells.iter())
        .filter_map(|(column, value)| column.map(|c| (c, normalize(c, value.clone()))))
        .collect();
    CatalogRow { cells }
}

/// Ingest a parsed sheet into `store`.
pub async fn ingest_sheet(
    store: &dyn CatalogStore,
    schema: &CatalogSchema,
    sheet: &Sheet,
) -> CatalogResult<IngestReport> {
    let mapping = map_headers(schema, &sheet.headers)?;
    store.ensure_schema().await?;

    let mut added = 0u64;
    let mut skipped = 0u64;

    for (index, cells) in sheet.rows.iter().enumerate() {
        let row = to_catalog_row(&mapping, cells);
        if row.is_blank() {
            debug!(row = index + 1, "no catalog values in row, ignoring");
            continue;
        }

        if let Some(key) = row.business_key() {
            if store.exists(&key).await? {
                debug!(row = index + 1, key = %key, "business key present, skipping");
                skipped += 1;
                continue;
            }
        }

        match store.insert(&row).await {
            Ok(_) => added += 1,
            Err(CatalogError::ConstraintViolation(msg)) => {
                warn!(row = index + 1, error = %msg, "business key inserted concurrently, skipping");
                skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    let total = store.count().await?;
    info!(added, skipped, total, rows = sheet.rows.len(), "catalog ingestion finished");

    Ok(IngestReport {
        added,
        skipped,
        total,
    })
}

/// Parse an uploaded workbook and ingest it into the configured store.
pub async fn ingest_upload(config: &Config, bytes: &[u8]) -> CatalogResult<IngestReport> {
    let schema = CatalogSchema::danalog();
    let sheet = sheet::parse_xlsx(bytes)?;
    let store = SqliteStore::open(config, schema).await?;
    let result = ingest_sheet(&store, &schema, &sheet).await;
    store.close().await;
    result
}

/// CLI entry point: `catalog import <FILE>`.
pub async fn run_import(config: &Config, path: &Path) -> Result<()> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let report = ingest_upload(config, &bytes).await?;

    println!("import {}", path.display());
    println!("  added: {}", report.added);
    println!("  skipped: {}", report.skipped);
    println!("  total: {}", report.total);
    println!("ok");
    Ok(())
}
