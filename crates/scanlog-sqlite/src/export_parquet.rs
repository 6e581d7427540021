use anyhow::Result;
use arrow::array::{ArrayRef, Float64Builder, Int64Builder, StringBuilder};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_writer::ArrowWriter;
use parquet::file::properties::WriterProperties;
use shield_core::ScanRecord;
use std::path::Path;
use std::sync::Arc;

use crate::arrow_schemas;
use crate::Db;

const CHUNK: usize = 10_000;

impl Db {
    /// Write the whole scan log to a zstd-compressed parquet file. Returns the row count.
    pub fn export_parquet(&self, out: &Path) -> Result<usize> {
        let records = self.all()?;
        write_parquet(&records, out)?;
        Ok(records.len())
    }
}

fn write_parquet(records: &[ScanRecord], out: &Path) -> Result<()> {
    let schema = Arc::new(arrow_schemas::scans_schema());
    let props = WriterProperties::builder()
        .set_compression(parquet::basic::Compression::ZSTD(Default::default()))
        .build();
    let file = std::fs::File::create(out)?;
    let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;
    for chunk in records.chunks(CHUNK) {
        let mut batch = ScanBatch::default();
        for r in chunk {
            batch.push(r);
        }
        let rb = RecordBatch::try_new(schema.clone(), batch.finish())?;
        writer.write(&rb)?;
    }
    writer.close()?;
    Ok(())
}

#[derive(Default)]
struct ScanBatch {
    id: Int64Builder,
    kind: StringBuilder,
    input: StringBuilder,
    result: StringBuilder,
    confidence: Float64Builder,
    timestamp: StringBuilder,
}

impl ScanBatch {
    fn push(&mut self, r: &ScanRecord) {
        self.id.append_value(r.id);
        self.kind.append_value(&r.kind);
        self.input.append_value(&r.input);
        self.result.append_value(&r.result);
        self.confidence.append_value(r.confidence);
        self.timestamp.append_value(&r.timestamp);
    }

    fn finish(mut self) -> Vec<ArrayRef> {
        vec![
            Arc::new(self.id.finish()),
            Arc::new(self.kind.finish()),
            Arc::new(self.input.finish()),
            Arc::new(self.result.finish()),
            Arc::new(self.confidence.finish()),
            Arc::new(self.timestamp.finish()),
        ]
    }
}
