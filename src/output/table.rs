//! Console table, `|` separated, numbers to two decimals

use std::io::Write;

use super::{ReportRow, ReportWriterBackend};
use crate::error::Result;

const HEADERS: [&str; 8] = [
    "Interval Start",
    "Interval End",
    "Deployment Frequency",
    "Change Failure Rate",
    "MTTR",
    "Mean Lead Time",
    "Deployment Count",
    "Total Events",
];

const MA_HEADERS: [&str; 6] = [
    "MA deployment_frequency",
    "MA change_failure_rate",
    "MA mttr",
    "MA mean_lead_time",
    "MA deployment_count",
    "MA total_events",
];

pub struct TableReportWriter<W: Write> {
    out: W,
    with_moving_average: bool,
    header_written: bool,
}

impl<W: Write> TableReportWriter<W> {
    pub fn new(out: W, with_moving_average: bool) -> Self {
        Self {
            out,
            with_moving_average,
            header_written: false,
        }
    }

    fn write_header(&mut self) -> Result<()> {
        let mut headers: Vec<&str> = HEADERS.to_vec();
        if self.with_moving_average {
            headers.extend_from_slice(&MA_HEADERS);
        }
        writeln!(self.out, "{}", headers.join(" | "))?;
        self.header_written = true;
        Ok(())
    }
}

pub fn format_row(row: &ReportRow, with_moving_average: bool) -> String {
    let mut cells = vec![
        row.interval_start.clone(),
        row.interval_end.clone(),
        format!("{:.2}", row.deployment_frequency),
        format!("{:.2}", row.change_failure_rate),
        format!("{:.2}", row.mttr_secs),
        format!("{:.2}", row.lead_time_secs),
        format!("{:.2}", row.deployment_count as f64),
        format!("{:.2}", row.total_events as f64),
    ];

    if with_moving_average {
        if let Some(ma) = row.moving_average {
            cells.extend(ma.values().iter().map(|v| format!("{:.2}", v)));
        }
    }

    cells.join(" | ")
}

impl<W: Write> ReportWriterBackend for TableReportWriter<W> {
    fn write_row(&mut self, row: &ReportRow) -> Result<()> {
        if !self.header_written {
            self.write_header()?;
        }
        writeln!(self.out, "{}", format_row(row, self.with_moving_average))?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if !self.header_written {
            self.write_header()?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "Table"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::fixtures;

    #[test]
    fn test_format_row_two_decimals() {
        let line = format_row(&fixtures::row(false), false);
        assert_eq!(
            line,
            "2025-07-12T00:00:00Z | 2025-07-13T00:00:00Z | 3.00 | 0.25 | 90.00 | 1.50 | 3.00 | 4.00"
        );
    }

    #[test]
    fn test_header_written_once_even_without_rows() {
        let mut buf = Vec::new();
        {
            let mut table = TableReportWriter::new(&mut buf, true);
            table.write_all(&[]).unwrap();
        }

        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("Interval Start | Interval End"));
        assert!(text.contains("MA total_events"));
    }
}
