//! Unified writer interface for report rows
//!
//! Routes writes to the table, CSV or JSONL backend based on configuration.

use std::fs::File;
use std::io::Stdout;
use std::path::Path;

use super::{CsvReportWriter, JsonlReportWriter, ReportRow, ReportWriterBackend, TableReportWriter};
use crate::error::{ReportError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Csv,
    Jsonl,
}

/// Writer that routes to one of the report backends
pub enum ReportWriter {
    Table(TableReportWriter<Stdout>),
    Csv(CsvReportWriter<File>),
    Jsonl(JsonlReportWriter<File>),
}

impl ReportWriter {
    /// Console table on stdout
    pub fn stdout(with_moving_average: bool) -> Self {
        ReportWriter::Table(TableReportWriter::new(std::io::stdout(), with_moving_average))
    }

    /// File-backed writer for `format`; the file is created or truncated.
    /// The table only goes to stdout.
    pub fn create(format: OutputFormat, path: &Path, with_moving_average: bool) -> Result<Self> {
        let open = || {
            File::create(path).map_err(|e| {
                ReportError::Io(std::io::Error::new(
                    e.kind(),
                    format!("cannot create {}: {}", path.display(), e),
                ))
            })
        };

        let writer = match format {
            OutputFormat::Table => {
                return Err(ReportError::invalid(format!(
                    "Table output is written to stdout, not to {}",
                    path.display()
                )))
            }
            OutputFormat::Csv => ReportWriter::Csv(CsvReportWriter::new(open()?, with_moving_average)?),
            OutputFormat::Jsonl => ReportWriter::Jsonl(JsonlReportWriter::new(open()?)),
        };

        log::info!("📝 Writing {} report to: {}", writer.backend_type(), path.display());
        Ok(writer)
    }

    fn backend(&mut self) -> &mut dyn ReportWriterBackend {
        match self {
            ReportWriter::Table(w) => w,
            ReportWriter::Csv(w) => w,
            ReportWriter::Jsonl(w) => w,
        }
    }

    pub fn write_row(&mut self, row: &ReportRow) -> Result<()> {
        self.backend().write_row(row)
    }

    pub fn write_all(&mut self, rows: &[ReportRow]) -> Result<()> {
        self.backend().write_all(rows)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.backend().flush()
    }

    /// Get backend type for logging
    pub fn backend_type(&self) -> &'static str {
        match self {
            ReportWriter::Table(w) => w.backend_type(),
            ReportWriter::Csv(w) => w.backend_type(),
            ReportWriter::Jsonl(w) => w.backend_type(),
        }
    }
}
