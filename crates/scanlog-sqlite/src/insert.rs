use crate::models::format_stamp;
use crate::Db;
use rusqlite::params;
use shield_core::{NewScan, Result, ScanRecord};
use time::OffsetDateTime;

impl Db {
    /// Append one scan. Id and timestamp are assigned here; the row is
    /// committed before this returns.
    pub fn insert_scan(&self, scan: NewScan) -> Result<ScanRecord> {
        let confidence = if scan.confidence.is_finite() { scan.confidence.clamp(0.0, 1.0) } else { 0.0 };
        let record = self.with_inner(|inner| -> anyhow::Result<ScanRecord> {
            let now = OffsetDateTime::now_utc();
            let at = match inner.last_stamp {
                Some(last) if last > now => last,
                _ => now,
            };
            let timestamp = format_stamp(at)?;
            let tx = inner.conn.transaction()?;
            tx.execute(
                "INSERT INTO scans (type, input, result, confidence, timestamp) VALUES (?,?,?,?,?)",
                params![scan.kind.as_str(), scan.input, scan.result, confidence, timestamp],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;
            inner.last_stamp = Some(at);
            Ok(ScanRecord { id, kind: scan.kind.as_str().to_string(), input: scan.input, result: scan.result, confidence, timestamp })
        })?;
        tracing::debug!(id = record.id, kind = %record.kind, result = %record.result, "scan logged");
        Ok(record)
    }
}
