//! In-memory [`CatalogStore`] implementation for testing.
//!
//! Records live in a `Vec` behind `std::sync::RwLock`. The business-key
//! uniqueness constraint is enforced on insert the same way the SQLite
//! `UNIQUE` index is.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{CatalogError, CatalogResult};
use crate::models::{CatalogRecord, CatalogRow, CellValue};
use crate::schema::{CatalogSchema, Column};

use super::CatalogStore;

/// In-memory catalog store.
pub struct InMemoryStore {
    schema: CatalogSchema,
    state: RwLock<State>,
}

#[derive(Default)]
struct State {
    created: bool,
    next_id: i64,
    records: Vec<CatalogRecord>,
}

impl InMemoryStore {
    pub fn new(schema: CatalogSchema) -> Self {
        Self {
            schema,
            state: RwLock::new(State {
                next_id: 1,
                ..State::default()
            }),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(CatalogSchema::danalog())
    }
}

fn key_of(record: &CatalogRecord) -> Option<String> {
    record.get(crate::schema::BUSINESS_KEY).as_text()
}

fn contains_ignore_ascii_case(haystack: &str, needle: &str) -> bool {
    haystack
        .to_ascii_lowercase()
        .contains(&needle.to_ascii_lowercase())
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn ensure_schema(&self) -> CatalogResult<()> {
        self.write().created = true;
        Ok(())
    }

    async fn exists(&self, business_key: &str) -> CatalogResult<bool> {
        Ok(self
            .read()
            .records
            .iter()
            .any(|r| key_of(r).as_deref() == Some(business_key)))
    }

    async fn insert(&self, row: &CatalogRow) -> CatalogResult<i64> {
        let mut state = self.write();
        if !state.created {
            return Err(CatalogError::Store(format!(
                "no such table: {}",
                self.schema.table()
            )));
        }
        if let Some(key) = row.business_key() {
            if state.records.iter().any(|r| key_of(r).as_deref() == Some(key.as_str())) {
                return Err(CatalogError::ConstraintViolation(format!(
                    "UNIQUE constraint failed: {}.{}",
                    self.schema.table(),
                    crate::schema::BUSINESS_KEY
                )));
            }
        }

        let id = state.next_id;
        state.next_id += 1;
        let fields = self
            .schema
            .columns()
            .iter()
            .map(|c| (c, row.get(c.sql).cloned().unwrap_or(CellValue::Null)))
            .collect();
        state.records.push(CatalogRecord {
            id,
            created_at: Some(chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()),
            fields,
        });
        Ok(id)
    }

    async fn count(&self) -> CatalogResult<i64> {
        Ok(self.read().records.len() as i64)
    }

    async fn is_populated(&self) -> CatalogResult<bool> {
        let state = self.read();
        Ok(state.created && !state.records.is_empty())
    }

    async fn search(&self, column: &'static Column, text: &str) -> CatalogResult<Vec<CatalogRecord>> {
        let state = self.read();
        let hits = state
            .records
            .iter()
            .filter(|r| {
                r.get(column.sql)
                    .as_text()
                    .map(|v| contains_ignore_ascii_case(&v, text))
                    .unwrap_or(false)
            })
            .map(|r| CatalogRecord {
                id: r.id,
                created_at: None,
                fields: self
                    .schema
                    .display_columns()
                    .map(|c| (c, r.get(c.sql).clone()))
                    .collect(),
            })
            .collect();
        Ok(hits)
    }

    async fn all_records(&self) -> CatalogResult<Vec<CatalogRecord>> {
        Ok(self.read().records.clone())
    }
}
