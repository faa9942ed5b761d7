//! Storage abstraction for the catalog.
//!
//! The [`CatalogStore`] trait is the contract ingestion and search need
//! from persistence. [`SqliteStore`](crate::sqlite_store::SqliteStore) is
//! the production backend; [`memory::InMemoryStore`] backs unit tests.
//!
//! Every mutating operation is durable on return; there is no transaction
//! spanning several calls.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;

use crate::error::CatalogResult;
use crate::models::{CatalogRecord, CatalogRow};
use crate::schema::Column;

/// Escape `LIKE` wildcards so `text` matches literally, and wrap it in
/// `%..%` for a substring match. Pair with `ESCAPE '\'`.
pub fn like_pattern(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('%');
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('%');
    out
}

/// Abstract catalog storage backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`ensure_schema`](CatalogStore::ensure_schema) | Create the table and key index if absent |
/// | [`exists`](CatalogStore::exists) | Business-key point lookup |
/// | [`insert`](CatalogStore::insert) | Append one record, returning its new id |
/// | [`count`](CatalogStore::count) | Total record count |
/// | [`is_populated`](CatalogStore::is_populated) | Table exists and holds records |
/// | [`search`](CatalogStore::search) | Substring match on one column |
/// | [`all_records`](CatalogStore::all_records) | Every record, full column set |
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn ensure_schema(&self) -> CatalogResult<()>;

    async fn exists(&self, business_key: &str) -> CatalogResult<bool>;

    /// Insert using exactly the row's columns; the rest default to null.
    ///
    /// Fails with [`ConstraintViolation`](crate::error::CatalogError::ConstraintViolation)
    /// if the business key is already taken.
    async fn insert(&self, row: &CatalogRow) -> CatalogResult<i64>;

    async fn count(&self) -> CatalogResult<i64>;

    /// `true` iff the catalog table exists and `count() > 0`.
    async fn is_populated(&self) -> CatalogResult<bool>;

    /// Records whose `column` contains `text` (ASCII case-insensitive),
    /// projected to the display columns, ordered by id.
    async fn search(&self, column: &'static Column, text: &str) -> CatalogResult<Vec<CatalogRecord>>;

    async fn all_records(&self) -> CatalogResult<Vec<CatalogRecord>>;
}
