//! Substring search over one catalog column.
//!
//! Used by both the `catalog search` CLI command and `GET /search`.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::error::{CatalogError, CatalogResult};
use crate::models::SearchHit;
use crate::schema::CatalogSchema;
use crate::sqlite_store::SqliteStore;
use crate::store::CatalogStore;

/// Validate the request and run it against `store`.
///
/// Checks, in order: both parameters present, store populated, column
/// known to the schema. No result limit is applied.
pub async fn search_store(
    store: &dyn CatalogStore,
    schema: &CatalogSchema,
    column: Option<&str>,
    text: Option<&str>,
) -> CatalogResult<Vec<SearchHit>> {
    let (column, text) = require_params(column, text)?;

    if !store.is_populated().await? {
        return Err(CatalogError::StoreEmpty);
    }

    let column = schema
        .resolve(column)
        .ok_or_else(|| CatalogError::InvalidColumn(column.to_string()))?;

    let records = store.search(column, text).await?;
    Ok(records.iter().map(SearchHit::from).collect())
}

fn require_params<'a>(
    column: Option<&'a str>,
    text: Option<&'a str>,
) -> CatalogResult<(&'a str, &'a str)> {
    match (column, text) {
        (Some(c), Some(t)) if !c.trim().is_empty() && !t.is_empty() => Ok((c, t)),
        _ => Err(CatalogError::MissingParameters),
    }
}

/// Search the configured store. A store file that was never created is
/// reported as empty without creating it.
pub async fn search_catalog(
    config: &Config,
    column: Option<&str>,
    text: Option<&str>,
) -> CatalogResult<Vec<SearchHit>> {
    let (column, text) = require_params(column, text)?;
    if !db::store_exists(config) {
        return Err(CatalogError::StoreEmpty);
    }

    let schema = CatalogSchema::danalog();
    let store = SqliteStore::open(config, schema).await?;
    let result = search_store(&store, &schema, Some(column), Some(text)).await;
    store.close().await;
    result
}

/// CLI entry point: `catalog search <COLUMN> <TEXT>`.
pub async fn run_search(config: &Config, column: &str, text: &str) -> Result<()> {
    let hits = search_catalog(config, Some(column), Some(text)).await?;

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for hit in &hits {
        let show = |v: &crate::models::CellValue| v.as_text().unwrap_or_default();
        println!(
            "{:>6}  {:<14} {:<40} {:>8}  {}",
            hit.id,
            show(&hit.business_key),
            show(&hit.title),
            show(&hit.price),
            show(&hit.author)
        );
    }
    println!("{} result{}", hits.len(), if hits.len() == 1 { "" } else { "s" });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CatalogRow, CellValue};
    use crate::store::memory::InMemoryStore;

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::default();
        let schema = CatalogSchema::danalog();
        store.ensure_schema().await.unwrap();
        for (key, title) in [("A1", "Foo"), ("A2", "Bar")] {
            store
                .insert(&CatalogRow {
                    cells: vec![
                        (schema.business_key(), CellValue::text(key)),
                        (schema.column("title").unwrap(), CellValue::text(title)),
                    ],
                })
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn missing_parameters() {
        let store = seeded().await;
        let schema = CatalogSchema::danalog();
        for (c, t) in [(None, Some("x")), (Some("title"), None), (Some(""), Some("x")), (Some("title"), Some(""))] {
            let err = search_store(&store, &schema, c, t).await.unwrap_err();
            assert!(matches!(err, CatalogError::MissingParameters));
        }
    }

    #[tokio::test]
    async fn empty_store_is_rejected() {
        let store = InMemoryStore::default();
        let schema = CatalogSchema::danalog();
        let err = search_store(&store, &schema, Some("title"), Some("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::StoreEmpty));
    }

    #[tokio::test]
    async fn unknown_column_is_invalid() {
        let store = seeded().await;
        let schema = CatalogSchema::danalog();
        let err = search_store(&store, &schema, Some("ID; DROP TABLE x"), Some("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidColumn(_)));
    }

    #[tokio::test]
    async fn finds_by_header_or_alias() {
        let store = seeded().await;
        let schema = CatalogSchema::danalog();
        let hits = search_store(&store, &schema, Some("שם"), Some("oo")).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, CellValue::text("Foo"));

        let none = search_store(&store, &schema, Some("title"), Some("zzz")).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn never_created_store_reports_empty() {
        let tmp = tempfile::TempDir::new().unwrap();
        let cfg = Config::with_db_path(tmp.path().join("absent.db"));
        let err = search_catalog(&cfg, Some("title"), Some("x")).await.unwrap_err();
        assert!(matches!(err, CatalogError::StoreEmpty));
        assert!(!cfg.db.path.exists());
    }
}
