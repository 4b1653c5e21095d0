//! Report pipeline
//!
//! ```text
//! EventSource → LeadTimeResolver → OutcomeClassifier
//!     ↓
//! IntervalWindower (explicit cursor, carried failures)
//!     ↓
//! aggregate (per window) → moving_average → Report
//! ```
//!
//! Classification and windowing are sequential folds owned by the driver;
//! everything after windowing works on independent batches.

use chrono::{DateTime, Utc};

use crate::classifier::OutcomeClassifier;
use crate::config::{ReportConfig, ReportRange};
use crate::error::Result;
use crate::metrics::{aggregate, MetricSnapshot};
use crate::model::ChangeEvent;
use crate::moving_average::{moving_average, MetricAverages};
use crate::source::{EventSource, LeadTimeResolver};
use crate::window::IntervalWindower;

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub range: ReportRange,
    pub snapshots: Vec<MetricSnapshot>,
    pub averages: Vec<MetricAverages>,
    pub moving_average_window: usize,
    /// Events returned by the source, including history before `since`
    pub events_collected: usize,
    pub lead_times_unresolved: usize,
}

impl Report {
    pub fn is_smoothed(&self) -> bool {
        self.moving_average_window > 1
    }
}

pub struct ReportPipeline<'a> {
    source: &'a dyn EventSource,
    resolver: &'a dyn LeadTimeResolver,
    config: ReportConfig,
}

impl<'a> ReportPipeline<'a> {
    pub fn new(source: &'a dyn EventSource, resolver: &'a dyn LeadTimeResolver, config: ReportConfig) -> Self {
        Self {
            source,
            resolver,
            config,
        }
    }

    pub fn run(&self, now: DateTime<Utc>) -> Result<Report> {
        let range = self.config.resolve_range(self.source, now)?;
        log::info!(
            "📊 Computing DORA metrics {} → {} (source: {})",
            range.since,
            range.until,
            self.source.name()
        );

        let events = self.source.collect_events(range.since, range.until)?;
        let events_collected = events.len();
        let (events, lead_times_unresolved) = resolve_lead_times(events, self.resolver);
        log::info!(
            "Collected {} change events ({} without a lead time)",
            events_collected,
            lead_times_unresolved
        );

        let mut classifier = OutcomeClassifier::new();
        let classified = events.into_iter().map(|e| classifier.classify_event(e));
        let windower = IntervalWindower::new(classified, range.since, range.until, range.interval)?;

        let mut snapshots = Vec::with_capacity(windower.remaining_windows());
        for batch in windower {
            log::info!(
                "Collecting metrics for interval {} to {} ({} events)",
                batch.start().format("%Y-%m-%dT%H:%M:%S"),
                batch.end().format("%Y-%m-%dT%H:%M:%S"),
                batch.len()
            );
            snapshots.push(aggregate(&batch)?);
        }

        let averages = moving_average(&snapshots, self.config.moving_average);
        log::info!("✅ Computed {} window(s)", snapshots.len());

        Ok(Report {
            range,
            snapshots,
            averages,
            moving_average_window: self.config.moving_average,
            events_collected,
            lead_times_unresolved,
        })
    }
}

/// Ask the resolver for every lead time the source did not attach.
///
/// Returns the events and how many remain without a lead time. Negative
/// durations (clock skew, rebased branches) count as unresolvable.
pub fn resolve_lead_times(
    events: Vec<ChangeEvent>,
    resolver: &dyn LeadTimeResolver,
) -> (Vec<ChangeEvent>, usize) {
    let mut unresolved = 0;
    let events = events
        .into_iter()
        .map(|mut event| {
            if event.lead_time.is_none() {
                event.lead_time = resolver.resolve(&event.identifier);
            }
            if let Some(lead) = event.lead_time {
                if lead < chrono::Duration::zero() {
                    log::debug!("Discarding negative lead time for {}", event.identifier);
                    event.lead_time = None;
                }
            }
            if event.lead_time.is_none() {
                log::debug!("Lead time not computable for {}", event.identifier);
                unresolved += 1;
            }
            event
        })
        .collect();

    (events, unresolved)
}
