use crate::{NewScan, Result, ScanKind, ScanRecord};
use std::sync::Arc;

/// Optional filters for history queries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanFilter {
    pub kind: Option<ScanKind>,
    /// Case-insensitive substring of the result label.
    pub result_contains: Option<String>,
    pub limit: Option<usize>,
}

/// Append-only scan log. Implementations assign id and timestamp on append and
/// return records most recent first.
pub trait ScanLog: Send + Sync {
    fn append(&self, scan: NewScan) -> Result<ScanRecord>;
    fn fetch_recent(&self, limit: usize) -> Result<Vec<ScanRecord>>;
    fn fetch_all(&self) -> Result<Vec<ScanRecord>>;
    fn fetch_filtered(&self, filter: &ScanFilter) -> Result<Vec<ScanRecord>>;
}

impl<T: ScanLog + ?Sized> ScanLog for Arc<T> {
    fn append(&self, scan: NewScan) -> Result<ScanRecord> { (**self).append(scan) }
    fn fetch_recent(&self, limit: usize) -> Result<Vec<ScanRecord>> { (**self).fetch_recent(limit) }
    fn fetch_all(&self) -> Result<Vec<ScanRecord>> { (**self).fetch_all() }
    fn fetch_filtered(&self, filter: &ScanFilter) -> Result<Vec<ScanRecord>> { (**self).fetch_filtered(filter) }
}
