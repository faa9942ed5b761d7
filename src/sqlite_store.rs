//! SQLite-backed [`CatalogStore`] implementation.
//!
//! Statements are assembled only from the static schema's SQL identifiers;
//! every client-provided value travels as a bound parameter.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool, TypeInfo, ValueRef};

use crate::config::Config;
use crate::db;
use crate::error::{CatalogError, CatalogResult};
use crate::migrate;
use crate::models::{CatalogRecord, CatalogRow, CellValue};
use crate::schema::{CatalogSchema, Column};
use crate::store::{like_pattern, CatalogStore};

/// SQLite implementation of the [`CatalogStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
    schema: CatalogSchema,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, schema: CatalogSchema) -> Self {
        Self { pool, schema }
    }

    /// Connect to the store named by `config`, creating the file if needed.
    pub async fn open(config: &Config, schema: CatalogSchema) -> CatalogResult<Self> {
        let pool = db::connect(config)
            .await
            .map_err(|e| CatalogError::Store(e.to_string()))?;
        Ok(Self::new(pool, schema))
    }

    pub async fn close(self) {
        self.pool.close().await;
    }

    fn select_list<'a>(&self, columns: impl Iterator<Item = &'a Column>) -> String {
        let mut list = vec!["id"];
        list.extend(columns.map(|c| c.sql));
        list.join(", ")
    }
}

/// Decode column `idx` by its runtime storage class.
fn decode_cell(row: &SqliteRow, idx: usize) -> Result<CellValue, sqlx::Error> {
    let raw = row.try_get_raw(idx)?;
    if raw.is_null() {
        return Ok(CellValue::Null);
    }
    let storage = raw.type_info().name().to_string();
    let value = match storage.as_str() {
        "INTEGER" => CellValue::Number(row.try_get::<i64, _>(idx)? as f64),
        "REAL" => CellValue::Number(row.try_get::<f64, _>(idx)?),
        "BLOB" => CellValue::Text(String::from_utf8_lossy(&row.try_get::<Vec<u8>, _>(idx)?).into_owned()),
        _ => CellValue::Text(row.try_get::<String, _>(idx)?),
    };
    Ok(value)
}

fn decode_record(
    row: &SqliteRow,
    columns: &[&'static Column],
    with_created_at: bool,
) -> Result<CatalogRecord, sqlx::Error> {
    let id: i64 = row.try_get(0)?;
    let mut fields = Vec::with_capacity(columns.len());
    for (i, column) in columns.iter().enumerate() {
        fields.push((*column, decode_cell(row, i + 1)?));
    }
    let created_at = if with_created_at {
        decode_cell(row, columns.len() + 1)?.as_text()
    } else {
        None
    };
    Ok(CatalogRecord {
        id,
        created_at,
        fields,
    })
}

#[async_trait]
impl CatalogStore for SqliteStore {
    async fn ensure_schema(&self) -> CatalogResult<()> {
        migrate::ensure_schema(&self.pool, &self.schema).await
    }

    async fn exists(&self, business_key: &str) -> CatalogResult<bool> {
        let sql = format!(
            "SELECT 1 FROM {} WHERE {} = ? LIMIT 1",
            self.schema.table(),
            self.schema.business_key().sql
        );
        let found: Option<i64> = sqlx::query_scalar(&sql)
            .bind(business_key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn insert(&self, row: &CatalogRow) -> CatalogResult<i64> {
        let sql = if row.cells.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", self.schema.table())
        } else {
            let names: Vec<&str> = row.cells.iter().map(|(c, _)| c.sql).collect();
            let placeholders = vec!["?"; names.len()].join(", ");
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.schema.table(),
                names.join(", "),
                placeholders
            )
        };

        let mut query = sqlx::query(&sql);
        for (_, value) in &row.cells {
            query = match value {
                CellValue::Null => query.bind(None::<String>),
                CellValue::Text(s) => query.bind(s.clone()),
                CellValue::Number(n) => query.bind(*n),
            };
        }
        let result = query.execute(&self.pool).await?;
        Ok(result.last_insert_rowid())
    }

    async fn count(&self) -> CatalogResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.schema.table());
        let n: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(n)
    }

    async fn is_populated(&self) -> CatalogResult<bool> {
        let tables: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name = ?",
        )
        .bind(self.schema.table())
        .fetch_one(&self.pool)
        .await?;

        if tables == 0 {
            return Ok(false);
        }
        Ok(self.count().await? > 0)
    }

    async fn search(&self, column: &'static Column, text: &str) -> CatalogResult<Vec<CatalogRecord>> {
        let columns: Vec<&'static Column> = self.schema.display_columns().collect();
        let sql = format!(
            "SELECT {} FROM {} WHERE {} LIKE ? ESCAPE '\\' ORDER BY id",
            self.select_list(columns.iter().copied()),
            self.schema.table(),
            column.sql
        );

        let rows = sqlx::query(&sql)
            .bind(like_pattern(text))
            .fetch_all(&self.pool)
            .await?;

        let records = rows
            .iter()
            .map(|row| decode_record(row, &columns, false))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    async fn all_records(&self) -> CatalogResult<Vec<CatalogRecord>> {
        let columns: Vec<&'static Column> = self.schema.columns().iter().collect();
        let sql = format!(
            "SELECT {}, created_at FROM {} ORDER BY id",
            self.select_list(columns.iter().copied()),
            self.schema.table()
        );

        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let records = rows
            .iter()
            .map(|row| decode_record(row, &columns, true))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}
