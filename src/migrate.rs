use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;
use crate::error::CatalogError;
use crate::schema::{CatalogSchema, ColumnKind};

/// `CREATE TABLE` statement for the catalog table.
pub fn create_table_sql(schema: &CatalogSchema) -> String {
    let mut columns = vec!["id INTEGER PRIMARY KEY AUTOINCREMENT".to_string()];
    for column in schema.columns() {
        let ty = match column.kind {
            ColumnKind::Real => "REAL",
            ColumnKind::Text | ColumnKind::Date => "TEXT",
        };
        if column.sql == schema.business_key().sql {
            columns.push(format!("{} {} UNIQUE", column.sql, ty));
        } else {
            columns.push(format!("{} {}", column.sql, ty));
        }
    }
    columns.push("created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP".to_string());

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        schema.table(),
        columns.join(",\n    ")
    )
}

/// Create the catalog table and its key index. Idempotent.
pub async fn ensure_schema(pool: &SqlitePool, schema: &CatalogSchema) -> Result<(), CatalogError> {
    sqlx::query(&create_table_sql(schema)).execute(pool).await?;

    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS idx_danalog_code ON {}({})",
        schema.table(),
        schema.business_key().sql
    ))
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    ensure_schema(&pool, &CatalogSchema::danalog()).await?;
    pool.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_table_has_key_constraint_and_timestamp() {
        let sql = create_table_sql(&CatalogSchema::danalog());
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS danalog_catalog"));
        assert!(sql.contains("id INTEGER PRIMARY KEY AUTOINCREMENT"));
        assert!(sql.contains("business_key TEXT UNIQUE"));
        assert!(sql.contains("price REAL"));
        assert!(sql.contains("open_date TEXT"));
        assert!(sql.contains("created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP"));
    }
}
