//! Core types shared by the scan pipeline: scan kinds, feature vectors,
//! verdicts, log records, the error taxonomy and the analytics projection.

pub mod analytics;
mod error;
mod explain;
mod features;
mod kind;
mod log;
mod record;

pub use analytics::{summarize, SummaryStats};
pub use error::{Result, ScanError};
pub use explain::{Contribution, Explanation};
pub use features::{FeatureValue, FeatureVector};
pub use kind::ScanKind;
pub use log::{ScanFilter, ScanLog};
pub use record::{NewScan, ScanRecord, Verdict};

pub const fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
