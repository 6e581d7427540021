use anyhow::Result;
use shield_core::ScanRecord;
use std::io::Write;
use std::path::Path;

pub const CSV_HEADER: [&str; 6] = ["id", "type", "input", "result", "confidence", "timestamp"];

/// Write records as CSV in the order given. Returns the row count.
pub fn write_csv<W: Write>(records: &[ScanRecord], out: W) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(CSV_HEADER)?;
    for r in records {
        wtr.write_record([
            r.id.to_string(),
            r.kind.clone(),
            r.input.clone(),
            r.result.clone(),
            r.confidence.to_string(),
            r.timestamp.clone(),
        ])?;
    }
    wtr.flush()?;
    Ok(records.len())
}

pub fn export_csv(records: &[ScanRecord], path: &Path) -> Result<usize> {
    write_csv(records, std::fs::File::create(path)?)
}
