//! The fixed Danalog catalog schema.
//!
//! Every catalog column has three names: the ASCII identifier used in SQL,
//! the header printed in the Danalog spreadsheet export, and a camelCase
//! alias used by the JSON API. [`CatalogSchema::resolve`] is the single
//! allow-list through which spreadsheet headers and search columns reach a
//! query; client input is never interpolated into SQL text.

/// Storage kind of a catalog column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Real,
    /// Stored as text; spreadsheet serial numbers are converted on ingest.
    Date,
}

/// One column of the catalog table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// SQL identifier (ASCII, safe to embed in statements).
    pub sql: &'static str,
    /// Header as it appears in the spreadsheet export.
    pub header: &'static str,
    /// JSON field name.
    pub alias: &'static str,
    pub kind: ColumnKind,
}

impl Column {
    const fn new(sql: &'static str, header: &'static str, alias: &'static str, kind: ColumnKind) -> Self {
        Self {
            sql,
            header,
            alias,
            kind,
        }
    }
}

pub const TABLE: &str = "danalog_catalog";

/// SQL name of the business-key column.
pub const BUSINESS_KEY: &str = "business_key";

const KEY_COLUMN: Column = Column::new(BUSINESS_KEY, "דאנאקוד", "businessKey", ColumnKind::Text);

/// Extra names accepted for the business-key column.
const BUSINESS_KEY_ALIASES: &[&str] = &["code"];

/// Catalog columns in table order. The surrogate `id` and `created_at` are
/// store-managed and not listed here.
pub const COLUMNS: &[Column] = &[
    Column::new("item_serial", "ש.לפריט", "itemSerial", ColumnKind::Text),
    KEY_COLUMN,
    Column::new("title", "שם", "title", ColumnKind::Text),
    Column::new("class_code", "ק.מחלקה", "classCode", ColumnKind::Text),
    Column::new("class_desc", "ת.מחלקה", "classDesc", ColumnKind::Text),
    Column::new("price", "מחיר", "price", ColumnKind::Real),
    Column::new("special_price", "מ.מיוחד", "specialPrice", ColumnKind::Real),
    Column::new("special_price_1", "מ.מיוחד1", "specialPrice1", ColumnKind::Real),
    Column::new("study", "לימוד", "study", ColumnKind::Text),
    Column::new("approved", "מאושר", "approved", ColumnKind::Text),
    Column::new("manufacturer_code", "ק.יצרן", "manufacturerCode", ColumnKind::Text),
    Column::new("manufacturer", "יצרן", "manufacturer", ColumnKind::Text),
    Column::new("author_code", "ק.מחבר", "authorCode", ColumnKind::Text),
    Column::new("author", "מחבר", "author", ColumnKind::Text),
    Column::new("subject_code", "ק.נושא", "subjectCode", ColumnKind::Text),
    Column::new("subject", "נושא", "subject", ColumnKind::Text),
    Column::new("out_of_stock", "אזל", "outOfStock", ColumnKind::Text),
    Column::new("barcode", "ברקוד", "barcode", ColumnKind::Text),
    Column::new("barcode_alt", "ברקוד-נ", "barcodeAlt", ColumnKind::Text),
    Column::new("pami_r", "פמי.ר", "pamiR", ColumnKind::Text),
    Column::new("pami_m", "פמי.מ", "pamiM", ColumnKind::Text),
    Column::new("open_date", "ת.פתיחה", "openDate", ColumnKind::Date),
    Column::new("update_date", "ת.עדכון", "updateDate", ColumnKind::Date),
    Column::new(
        "first_approval_date",
        "ת.מה.ראשונה",
        "firstApprovalDate",
        ColumnKind::Date,
    ),
];

/// Columns returned by search, in display order (after `id`).
pub const DISPLAY_COLUMNS: &[&str] = &[
    BUSINESS_KEY,
    "title",
    "class_desc",
    "price",
    "author",
    "subject",
    "barcode",
    "open_date",
    "update_date",
    "first_approval_date",
];

/// Handle to the catalog schema, passed to every operation that builds SQL.
#[derive(Debug, Clone, Copy)]
pub struct CatalogSchema {
    table: &'static str,
    columns: &'static [Column],
}

impl Default for CatalogSchema {
    fn default() -> Self {
        Self::danalog()
    }
}

impl CatalogSchema {
    pub fn danalog() -> Self {
        Self {
            table: TABLE,
            columns: COLUMNS,
        }
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn columns(&self) -> &'static [Column] {
        self.columns
    }

    pub fn business_key(&self) -> &'static Column {
        &KEY_COLUMN
    }

    /// Look up a column by its SQL identifier.
    pub fn column(&self, sql: &str) -> Option<&'static Column> {
        self.columns.iter().find(|c| c.sql == sql)
    }

    /// Resolve a spreadsheet header or API column name against the
    /// allow-list. Accepts the SQL identifier, the original header, or the
    /// camelCase alias; surrounding whitespace is ignored.
    pub fn resolve(&self, name: &str) -> Option<&'static Column> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        if BUSINESS_KEY_ALIASES.contains(&name) {
            return self.column(BUSINESS_KEY);
        }
        self.columns
            .iter()
            .find(|c| c.sql == name || c.header == name || c.alias == name)
    }

    /// Whether a header names the surrogate identifier, which uploads may
    /// carry (e.g. re-imported exports) but never supply.
    pub fn is_surrogate(&self, name: &str) -> bool {
        matches!(name.trim(), "ID" | "id" | "Id" | "createdAt" | "created_at")
    }

    pub fn display_columns(&self) -> impl Iterator<Item = &'static Column> + '_ {
        DISPLAY_COLUMNS.iter().filter_map(move |sql| self.column(sql))
    }
}
