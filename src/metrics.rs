//! DORA metric aggregation for a single window

use chrono::{DateTime, Duration, Utc};
use serde::{Serialize, Serializer};

use crate::error::{ReportError, Result};
use crate::model::{ClassifiedEvent, ResolvedOutcome};
use crate::window::WindowBatch;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Durations serialize as fractional seconds under a `_secs` key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSnapshot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(rename = "duration_secs", serialize_with = "as_secs")]
    pub duration: Duration,
    /// Deployments per day
    pub deployment_frequency: f64,
    pub change_failure_rate: f64,
    #[serde(rename = "mean_time_to_recover_secs", serialize_with = "as_secs")]
    pub mean_time_to_recover: Duration,
    #[serde(rename = "lead_time_for_changes_secs", serialize_with = "as_secs")]
    pub lead_time_for_changes: Duration,
    pub deployment_count: usize,
    pub total_events: usize,
}

fn as_secs<S>(d: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64(d.num_milliseconds() as f64 / 1000.0)
}

/// Events resolved as Success or Recovery
pub fn deployment_count(events: &[ClassifiedEvent]) -> usize {
    events.iter().filter(|e| e.outcome.is_deployment()).count()
}

/// Share of failed events; 0.0 for an empty window
pub fn change_failure_rate(events: &[ClassifiedEvent]) -> f64 {
    if events.is_empty() {
        return 0.0;
    }

    let failures = events
        .iter()
        .filter(|e| e.outcome == ResolvedOutcome::Failure)
        .count();
    failures as f64 / events.len() as f64
}

/// Deployments per day over the window's full duration.
///
/// Always a true rate, even when the window holds fewer than two
/// deployments.
pub fn deployment_frequency(deployments: usize, duration: Duration) -> Result<f64> {
    if duration <= Duration::zero() {
        return Err(ReportError::invalid("Duration cannot be zero."));
    }

    let days = duration.num_milliseconds() as f64 / MILLIS_PER_DAY;
    Ok(deployments as f64 / days)
}

/// Mean time from the oldest pending failure to the deployment that
/// resolved it. A failure still open at the end of `events` adds no sample.
pub fn mean_time_to_recover(
    events: &[ClassifiedEvent],
    carried_failure_start: Option<DateTime<Utc>>,
) -> Duration {
    let mut pending = carried_failure_start;
    let mut samples = Vec::new();

    for event in events {
        match event.outcome {
            ResolvedOutcome::Failure => {
                if pending.is_none() {
                    pending = Some(event.timestamp());
                }
            }
            ResolvedOutcome::Success | ResolvedOutcome::Recovery => {
                if let Some(failed_at) = pending.take() {
                    samples.push(event.timestamp() - failed_at);
                }
            }
        }
    }

    mean_duration(&samples)
}

/// Mean lead time of successful changes; unresolvable lead times are
/// skipped rather than counted as zero
pub fn lead_time_for_changes(events: &[ClassifiedEvent]) -> Duration {
    let samples: Vec<Duration> = events
        .iter()
        .filter(|e| e.event.outcome.is_present())
        .filter_map(|e| e.event.lead_time)
        .collect();

    mean_duration(&samples)
}

/// Arithmetic mean at millisecond precision; zero for no samples
pub fn mean_duration(samples: &[Duration]) -> Duration {
    if samples.is_empty() {
        return Duration::zero();
    }

    let total: i64 = samples.iter().map(|d| d.num_milliseconds()).sum();
    Duration::milliseconds(total / samples.len() as i64)
}

/// Compute every metric for one window batch
pub fn aggregate(batch: &WindowBatch) -> Result<MetricSnapshot> {
    let deployments = deployment_count(&batch.events);
    let duration = batch.duration();

    Ok(MetricSnapshot {
        start: batch.start(),
        end: batch.end(),
        duration,
        deployment_frequency: deployment_frequency(deployments, duration)?,
        change_failure_rate: change_failure_rate(&batch.events),
        mean_time_to_recover: mean_time_to_recover(&batch.events, batch.carried_failure_start),
        lead_time_for_changes: lead_time_for_changes(&batch.events),
        deployment_count: deployments,
        total_events: batch.events.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChangeEvent, Signal};
    use crate::window::TimeWindow;
    use chrono::TimeZone;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, 1, 12, 0, 0).unwrap()
    }

    fn event_at(secs: i64, outcome: ResolvedOutcome) -> ClassifiedEvent {
        let signal = if outcome.is_deployment() { Signal::Success } else { Signal::Failure };
        ClassifiedEvent {
            event: ChangeEvent::new(format!("e{}", secs), base() + Duration::seconds(secs), signal),
            outcome,
        }
    }

    fn batch(events: Vec<ClassifiedEvent>, duration: Duration) -> WindowBatch {
        WindowBatch {
            window: TimeWindow::new(base(), base() + duration),
            events,
            carried_failure_start: None,
        }
    }

    use ResolvedOutcome::{Failure, Recovery, Success};

    #[test]
    fn test_change_failure_rate() {
        assert_eq!(change_failure_rate(&[]), 0.0);
        assert_eq!(change_failure_rate(&[event_at(0, Failure), event_at(1, Failure)]), 1.0);
        assert_eq!(change_failure_rate(&[event_at(0, Failure), event_at(1, Recovery)]), 0.5);

        let mixed = vec![
            event_at(0, Failure),
            event_at(1, Recovery),
            event_at(2, Failure),
            event_at(3, Recovery),
            event_at(4, Failure),
            event_at(5, Recovery),
            event_at(6, Success),
        ];
        assert!((change_failure_rate(&mixed) - 3.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_deployment_frequency_is_per_day() {
        assert_eq!(deployment_frequency(7, Duration::days(7)).unwrap(), 1.0);
        assert_eq!(deployment_frequency(3, Duration::hours(12)).unwrap(), 6.0);
        assert_eq!(deployment_frequency(0, Duration::days(1)).unwrap(), 0.0);
        // a single deployment is still a rate, not a raw count
        assert_eq!(deployment_frequency(1, Duration::days(2)).unwrap(), 0.5);
    }

    #[test]
    fn test_deployment_frequency_zero_duration() {
        let err = deployment_frequency(0, Duration::zero()).unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(err.to_string(), "Duration cannot be zero.");
    }

    #[test]
    fn test_mttr_single_recovery_and_trailing_failure() {
        let events = vec![event_at(100, Failure), event_at(200, Recovery)];
        assert_eq!(mean_time_to_recover(&events, None), Duration::seconds(100));

        let events = vec![event_at(100, Failure), event_at(200, Recovery), event_at(250, Failure)];
        assert_eq!(mean_time_to_recover(&events, None), Duration::seconds(100));
    }

    #[test]
    fn test_mttr_uses_oldest_pending_failure() {
        let events = vec![
            event_at(0, Failure),
            event_at(1800, Failure),
            event_at(3600, Recovery),
            event_at(4200, Failure),
            event_at(4800, Recovery),
        ];
        // (3600 + 600) / 2
        assert_eq!(mean_time_to_recover(&events, None), Duration::seconds(2100));
    }

    #[test]
    fn test_mttr_carried_failure() {
        let carried = Some(base() - Duration::minutes(30));
        let events = vec![event_at(0, Recovery), event_at(60, Success)];
        assert_eq!(mean_time_to_recover(&events, carried), Duration::minutes(30));
    }

    #[test]
    fn test_mttr_without_samples_is_zero() {
        assert_eq!(mean_time_to_recover(&[], None), Duration::zero());
        let events = vec![event_at(0, Success), event_at(60, Success)];
        assert_eq!(mean_time_to_recover(&events, None), Duration::zero());
        let events = vec![event_at(0, Failure), event_at(60, Failure)];
        assert_eq!(mean_time_to_recover(&events, None), Duration::zero());
    }

    #[test]
    fn test_lead_time_skips_unresolvable() {
        let mut a = event_at(0, Recovery);
        a.event.lead_time = Some(Duration::seconds(100));
        let b = event_at(10, Success);
        let mut c = event_at(20, Success);
        c.event.lead_time = Some(Duration::seconds(50));

        assert_eq!(lead_time_for_changes(&[a, b, c]), Duration::seconds(75));
    }

    #[test]
    fn test_lead_time_ignores_failed_changes() {
        let mut failed = event_at(0, Failure);
        failed.event.lead_time = Some(Duration::seconds(1000));
        let mut ok = event_at(10, Success);
        ok.event.lead_time = Some(Duration::seconds(40));

        assert_eq!(lead_time_for_changes(&[failed.clone(), ok]), Duration::seconds(40));
        assert_eq!(lead_time_for_changes(&[failed]), Duration::zero());
    }

    #[test]
    fn test_aggregate_window() {
        let events = vec![
            event_at(0, Failure),
            event_at(600, Recovery),
            event_at(1200, Success),
            event_at(1800, Failure),
        ];

        let snapshot = aggregate(&batch(events, Duration::days(2))).unwrap();

        assert_eq!(snapshot.deployment_count, 2);
        assert_eq!(snapshot.total_events, 4);
        assert_eq!(snapshot.change_failure_rate, 0.5);
        assert_eq!(snapshot.deployment_frequency, 1.0);
        assert_eq!(snapshot.mean_time_to_recover, Duration::minutes(10));
        assert_eq!(snapshot.lead_time_for_changes, Duration::zero());
        assert_eq!(snapshot.duration, Duration::days(2));
    }

    #[test]
    fn test_aggregate_empty_window() {
        let snapshot = aggregate(&batch(Vec::new(), Duration::days(1))).unwrap();

        assert_eq!(snapshot.total_events, 0);
        assert_eq!(snapshot.change_failure_rate, 0.0);
        assert_eq!(snapshot.deployment_frequency, 0.0);
    }

    #[test]
    fn test_aggregate_zero_duration_window_rejected() {
        let err = aggregate(&batch(Vec::new(), Duration::zero())).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_snapshot_serializes_durations_as_seconds() {
        let events = vec![event_at(0, Failure), event_at(90, Recovery)];
        let snapshot = aggregate(&batch(events, Duration::days(1))).unwrap();

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["start"], "2023-01-01T12:00:00Z");
        assert_eq!(json["duration_secs"], 86_400.0);
        assert_eq!(json["mean_time_to_recover_secs"], 90.0);
        assert_eq!(json["lead_time_for_changes_secs"], 0.0);
        assert_eq!(json["deployment_count"], 1);
    }
}
