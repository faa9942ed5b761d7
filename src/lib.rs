//! # Danalog Catalog
//!
//! Imports a tabular product catalog (Danalog `.xlsx` exports) into a
//! SQLite store and exposes lookup over it.
//!
//! Ingestion is idempotent: rows whose product code (the business key) is
//! already stored are skipped, new rows get a store-assigned id, and the
//! caller gets added/skipped/total counts back. Re-uploading a file that
//! failed half-way is safe.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────────┐
//! │  .xlsx   │──▶│    sheet     │──▶│    ingest    │
//! │  upload  │   │ header+rows  │   │ check+insert │
//! └──────────┘   └──────────────┘   └──────┬───────┘
//!                                          ▼
//!                ┌──────────┐       ┌──────────────┐
//!                │  search  │◀─────▶│ CatalogStore │
//!                │  stats   │       │   (SQLite)   │
//!                └────┬─────┘       └──────────────┘
//!                     ▼
//!              ┌─────────────┐
//!              │ CLI / HTTP  │
//!              └─────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Catalog error kinds |
//! | [`schema`] | Fixed column list and name allow-list |
//! | [`models`] | Cell values, rows, records, reports |
//! | [`sheet`] | `.xlsx` parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |
//! | [`store`] | Storage trait and in-memory backend |
//! | [`sqlite_store`] | SQLite backend |
//! | [`ingest`] | Dedup-by-key ingestion |
//! | [`search`] | Column substring search |
//! | [`stats`] | Store statistics |
//! | [`export`] | JSON export |
//! | [`server`] | HTTP server |

pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod schema;
pub mod search;
pub mod server;
pub mod sheet;
pub mod sqlite_store;
pub mod stats;
pub mod store;
