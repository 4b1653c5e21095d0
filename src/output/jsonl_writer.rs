//! JSONL writer - one report row per line

use std::io::{BufWriter, Write};

use super::{ReportRow, ReportWriterBackend};
use crate::error::Result;

pub struct JsonlReportWriter<W: Write> {
    writer: BufWriter<W>,
    rows_written: usize,
}

impl<W: Write> JsonlReportWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: BufWriter::new(inner),
            rows_written: 0,
        }
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }
}

impl<W: Write> ReportWriterBackend for JsonlReportWriter<W> {
    fn write_row(&mut self, row: &ReportRow) -> Result<()> {
        let json = serde_json::to_string(row)?;
        writeln!(self.writer, "{}", json)?;
        self.rows_written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "JSONL"
    }
}

impl<W: Write> Drop for JsonlReportWriter<W> {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}
