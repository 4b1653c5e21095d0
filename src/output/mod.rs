//! Report output
//!
//! Every report window becomes one flat [`ReportRow`]; backends render rows
//! as a console table, CSV or JSONL.

pub mod csv_writer;
pub mod jsonl_writer;
pub mod table;
pub mod writer;

use serde::Serialize;

use crate::error::Result;
use crate::metrics::MetricSnapshot;
use crate::moving_average::{duration_secs, MetricAverages};
use crate::pipeline::Report;

pub use csv_writer::CsvReportWriter;
pub use jsonl_writer::JsonlReportWriter;
pub use table::TableReportWriter;
pub use writer::{OutputFormat, ReportWriter};

/// ISO-8601 in UTC with an explicit `Z`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub interval_start: String,
    pub interval_end: String,
    pub duration_secs: i64,
    pub deployment_frequency: f64,
    pub change_failure_rate: f64,
    pub mttr_secs: f64,
    pub lead_time_secs: f64,
    pub deployment_count: usize,
    pub total_events: usize,
    #[serde(flatten)]
    pub moving_average: Option<MovingAverageFields>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MovingAverageFields {
    pub ma_deployment_frequency: f64,
    pub ma_change_failure_rate: f64,
    pub ma_mttr_secs: f64,
    pub ma_lead_time_secs: f64,
    pub ma_deployment_count: f64,
    pub ma_total_events: f64,
}

impl From<&MetricAverages> for MovingAverageFields {
    fn from(a: &MetricAverages) -> Self {
        Self {
            ma_deployment_frequency: a.deployment_frequency,
            ma_change_failure_rate: a.change_failure_rate,
            ma_mttr_secs: a.mean_time_to_recover_secs,
            ma_lead_time_secs: a.lead_time_for_changes_secs,
            ma_deployment_count: a.deployment_count,
            ma_total_events: a.total_events,
        }
    }
}

impl MovingAverageFields {
    pub fn values(&self) -> [f64; 6] {
        [
            self.ma_deployment_frequency,
            self.ma_change_failure_rate,
            self.ma_mttr_secs,
            self.ma_lead_time_secs,
            self.ma_deployment_count,
            self.ma_total_events,
        ]
    }
}

pub const BASE_COLUMNS: [&str; 9] = [
    "interval_start",
    "interval_end",
    "duration_secs",
    "deployment_frequency",
    "change_failure_rate",
    "mttr_secs",
    "lead_time_secs",
    "deployment_count",
    "total_events",
];

pub const MA_COLUMNS: [&str; 6] = [
    "ma_deployment_frequency",
    "ma_change_failure_rate",
    "ma_mttr_secs",
    "ma_lead_time_secs",
    "ma_deployment_count",
    "ma_total_events",
];

impl ReportRow {
    pub fn new(snapshot: &MetricSnapshot, averages: Option<&MetricAverages>) -> Self {
        Self {
            interval_start: snapshot.start.format(TIMESTAMP_FORMAT).to_string(),
            interval_end: snapshot.end.format(TIMESTAMP_FORMAT).to_string(),
            duration_secs: snapshot.duration.num_seconds(),
            deployment_frequency: snapshot.deployment_frequency,
            change_failure_rate: snapshot.change_failure_rate,
            mttr_secs: duration_secs(snapshot.mean_time_to_recover),
            lead_time_secs: duration_secs(snapshot.lead_time_for_changes),
            deployment_count: snapshot.deployment_count,
            total_events: snapshot.total_events,
            moving_average: averages.map(MovingAverageFields::from),
        }
    }

    /// Rows for a whole report; moving-average fields only when smoothing
    /// is enabled
    pub fn from_report(report: &Report) -> Vec<Self> {
        report
            .snapshots
            .iter()
            .zip(report.averages.iter())
            .map(|(s, a)| Self::new(s, report.is_smoothed().then_some(a)))
            .collect()
    }
}

/// Backend for writing report rows
pub trait ReportWriterBackend {
    fn write_row(&mut self, row: &ReportRow) -> Result<()>;

    fn flush(&mut self) -> Result<()>;

    /// Backend type for logging
    fn backend_type(&self) -> &'static str;

    fn write_all(&mut self, rows: &[ReportRow]) -> Result<()> {
        for row in rows {
            self.write_row(row)?;
        }
        self.flush()
    }
}
