use rusqlite::Row;
use shield_core::ScanRecord;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

/// Fixed-width UTC layout, so lexical order matches time order.
const STAMP: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z");

pub fn format_stamp(at: OffsetDateTime) -> Result<String, time::error::Format> {
    at.to_offset(time::UtcOffset::UTC).format(STAMP)
}

pub fn parse_stamp(s: &str) -> Option<OffsetDateTime> {
    PrimitiveDateTime::parse(s, STAMP).ok().map(PrimitiveDateTime::assume_utc)
}

pub(crate) const SELECT_COLUMNS: &str = "SELECT id, type, input, result, confidence, timestamp FROM scans";

/// Raw row; columns are nullable for rows written by other tools.
pub(crate) struct ScanRow {
    id: i64,
    kind: Option<String>,
    input: Option<String>,
    result: Option<String>,
    confidence: Option<f64>,
    timestamp: Option<String>,
}

impl ScanRow {
    pub(crate) fn from_row(r: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(ScanRow {
            id: r.get(0)?,
            kind: r.get(1)?,
            input: r.get(2)?,
            result: r.get(3)?,
            confidence: r.get(4)?,
            timestamp: r.get(5)?,
        })
    }

    /// Rows with a type outside `ScanKind` keep their stored string.
    pub(crate) fn into_record(self) -> ScanRecord {
        let kind = self.kind.unwrap_or_default();
        if kind.parse::<shield_core::ScanKind>().is_err() {
            tracing::debug!(id = self.id, kind = %kind, "scan row with legacy type");
        }
        ScanRecord {
            id: self.id,
            kind,
            input: self.input.unwrap_or_default(),
            result: self.result.unwrap_or_default(),
            confidence: self.confidence.unwrap_or(0.0),
            timestamp: self.timestamp.unwrap_or_default(),
        }
    }
}
