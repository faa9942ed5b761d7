//! Core data types that flow between the spreadsheet parser, the store,
//! and the HTTP/CLI surfaces.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::schema::Column;

/// A single cell value, as read from a spreadsheet or the store.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Text(String),
    Number(f64),
}

impl CellValue {
    /// Build a text cell, treating blank text as [`CellValue::Null`].
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.trim().is_empty() {
            CellValue::Null
        } else {
            CellValue::Text(s)
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Textual form used for text columns and key comparison. Integral
    /// numbers drop the fractional part (`12345`, not `12345.0`).
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Number(n) => Some(format_number(*n)),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Null => serializer.serialize_none(),
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Number(n) => serializer.serialize_f64(*n),
        }
    }
}

pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// One uploaded row, mapped onto catalog columns and ready for insertion.
#[derive(Debug, Clone, Default)]
pub struct CatalogRow {
    pub cells: Vec<(&'static Column, CellValue)>,
}

impl CatalogRow {
    pub fn get(&self, sql: &str) -> Option<&CellValue> {
        self.cells
            .iter()
            .find(|(c, _)| c.sql == sql)
            .map(|(_, v)| v)
    }

    /// No mapped column holds a value.
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, v)| v.is_null())
    }

    /// The business key in textual form, or `None` when missing or blank.
    pub fn business_key(&self) -> Option<String> {
        self.get(crate::schema::BUSINESS_KEY)
            .and_then(CellValue::as_text)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

static NULL: CellValue = CellValue::Null;

/// A stored catalog record.
#[derive(Debug, Clone)]
pub struct CatalogRecord {
    pub id: i64,
    pub created_at: Option<String>,
    pub fields: Vec<(&'static Column, CellValue)>,
}

impl CatalogRecord {
    pub fn get(&self, sql: &str) -> &CellValue {
        self.fields
            .iter()
            .find(|(c, _)| c.sql == sql)
            .map(|(_, v)| v)
            .unwrap_or(&NULL)
    }
}

/// Records serialize as a flat object keyed by column alias.
impl Serialize for CatalogRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let extra = if self.created_at.is_some() { 2 } else { 1 };
        let mut map = serializer.serialize_map(Some(self.fields.len() + extra))?;
        map.serialize_entry("id", &self.id)?;
        for (column, value) in &self.fields {
            map.serialize_entry(column.alias, value)?;
        }
        if let Some(ts) = &self.created_at {
            map.serialize_entry("createdAt", ts)?;
        }
        map.end()
    }
}

/// A search result row, projected to the display columns.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub id: i64,
    pub business_key: CellValue,
    pub title: CellValue,
    pub class_desc: CellValue,
    pub price: CellValue,
    pub author: CellValue,
    pub subject: CellValue,
    pub barcode: CellValue,
    pub open_date: CellValue,
    pub update_date: CellValue,
    pub first_approval_date: CellValue,
}

impl From<&CatalogRecord> for SearchHit {
    fn from(r: &CatalogRecord) -> Self {
        Self {
            id: r.id,
            business_key: r.get(crate::schema::BUSINESS_KEY).clone(),
            title: r.get("title").clone(),
            class_desc: r.get("class_desc").clone(),
            price: r.get("price").clone(),
            author: r.get("author").clone(),
            subject: r.get("subject").clone(),
            barcode: r.get("barcode").clone(),
            open_date: r.get("open_date").clone(),
            update_date: r.get("update_date").clone(),
            first_approval_date: r.get("first_approval_date").clone(),
        }
    }
}

/// Counts reported by an ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub added: u64,
    pub skipped: u64,
    /// Records in the store after the run.
    pub total: i64,
}

/// Store statistics for `GET /stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub database_exists: bool,
    pub total_records: i64,
}
