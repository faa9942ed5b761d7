//! Error kinds surfaced by ingestion, search, and the store.
//!
//! Client-facing variants carry the localized message shown by the catalog
//! front-end; the HTTP layer maps each variant to a status code.

use thiserror::Error;

/// Errors produced by catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The upload request carried no file, or a file with an empty name.
    #[error("לא נבחר קובץ")]
    NoFileProvided,

    /// The uploaded content is not a well-formed spreadsheet, or its
    /// header row names a column the catalog does not know.
    #[error("failed to parse spreadsheet: {0}")]
    Parse(String),

    /// A business-key uniqueness collision at insert time.
    #[error("duplicate business key: {0}")]
    ConstraintViolation(String),

    /// Search was called without both a column and a text.
    #[error("חסרים פרמטרים לחיפוש")]
    MissingParameters,

    /// Search was called before any record was ingested.
    #[error("מסד הנתונים ריק. אנא העלה קטלוג תחילה")]
    StoreEmpty,

    /// Search named a column outside the catalog schema.
    #[error("unknown column: {0}")]
    InvalidColumn(String),

    /// Any other storage failure.
    #[error("store error: {0}")]
    Store(String),
}

impl CatalogError {
    /// Whether the error stems from the request rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CatalogError::NoFileProvided
                | CatalogError::MissingParameters
                | CatalogError::StoreEmpty
                | CatalogError::InvalidColumn(_)
        )
    }
}

impl From<sqlx::Error> for CatalogError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return CatalogError::ConstraintViolation(db_err.message().to_string());
            }
        }
        CatalogError::Store(err.to_string())
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;
