//! SQLite-backed append-only scan log.

mod open;
mod models;
mod insert;
mod query;
mod schema;
#[cfg(feature = "parquet")]
mod arrow_schemas;
#[cfg(feature = "parquet")]
mod export_parquet;

pub use open::Db;
pub use models::{format_stamp, parse_stamp};

use shield_core::{NewScan, Result, ScanFilter, ScanLog, ScanRecord};

impl ScanLog for Db {
    fn append(&self, scan: NewScan) -> Result<ScanRecord> { self.insert_scan(scan) }
    fn fetch_recent(&self, limit: usize) -> Result<Vec<ScanRecord>> { self.recent(limit) }
    fn fetch_all(&self) -> Result<Vec<ScanRecord>> { self.all() }
    fn fetch_filtered(&self, filter: &ScanFilter) -> Result<Vec<ScanRecord>> { self.filtered(filter) }
}
