//! CSV writer with a header line
//!
//! Every field is numeric or an ISO timestamp, so no quoting is needed.

use std::io::{BufWriter, Write};

use super::{ReportRow, ReportWriterBackend, BASE_COLUMNS, MA_COLUMNS};
use crate::error::Result;

pub struct CsvReportWriter<W: Write> {
    writer: BufWriter<W>,
    with_moving_average: bool,
}

impl<W: Write> CsvReportWriter<W> {
    /// Create the writer and emit the header
    pub fn new(inner: W, with_moving_average: bool) -> Result<Self> {
        let mut writer = BufWriter::new(inner);

        let mut header: Vec<&str> = BASE_COLUMNS.to_vec();
        if with_moving_average {
            header.extend_from_slice(&MA_COLUMNS);
        }
        writeln!(writer, "{}", header.join(","))?;

        Ok(Self {
            writer,
            with_moving_average,
        })
    }
}

impl<W: Write> ReportWriterBackend for CsvReportWriter<W> {
    fn write_row(&mut self, row: &ReportRow) -> Result<()> {
        let mut fields = vec![
            row.interval_start.clone(),
            row.interval_end.clone(),
            row.duration_secs.to_string(),
            row.deployment_frequency.to_string(),
            row.change_failure_rate.to_string(),
            row.mttr_secs.to_string(),
            row.lead_time_secs.to_string(),
            row.deployment_count.to_string(),
            row.total_events.to_string(),
        ];

        if self.with_moving_average {
            match row.moving_average {
                Some(ma) => fields.extend(ma.values().iter().map(f64::to_string)),
                None => fields.extend(std::iter::repeat(String::new()).take(MA_COLUMNS.len())),
            }
        }

        writeln!(self.writer, "{}", fields.join(","))?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "CSV"
    }
}

impl<W: Write> Drop for CsvReportWriter<W> {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}
