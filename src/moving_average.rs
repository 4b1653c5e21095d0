//! Trailing simple moving average across consecutive window snapshots

use crate::metrics::MetricSnapshot;

/// Per-metric averages; durations are expressed in seconds
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricAverages {
    pub deployment_frequency: f64,
    pub change_failure_rate: f64,
    pub mean_time_to_recover_secs: f64,
    pub lead_time_for_changes_secs: f64,
    pub deployment_count: f64,
    pub total_events: f64,
}

impl MetricAverages {
    pub fn from_snapshot(s: &MetricSnapshot) -> Self {
        Self {
            deployment_frequency: s.deployment_frequency,
            change_failure_rate: s.change_failure_rate,
            mean_time_to_recover_secs: duration_secs(s.mean_time_to_recover),
            lead_time_for_changes_secs: duration_secs(s.lead_time_for_changes),
            deployment_count: s.deployment_count as f64,
            total_events: s.total_events as f64,
        }
    }

    fn mean_of(values: &[MetricAverages]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let n = values.len() as f64;
        let mut sum = Self::default();
        for v in values {
            sum.deployment_frequency += v.deployment_frequency;
            sum.change_failure_rate += v.change_failure_rate;
            sum.mean_time_to_recover_secs += v.mean_time_to_recover_secs;
            sum.lead_time_for_changes_secs += v.lead_time_for_changes_secs;
            sum.deployment_count += v.deployment_count;
            sum.total_events += v.total_events;
        }

        Self {
            deployment_frequency: sum.deployment_frequency / n,
            change_failure_rate: sum.change_failure_rate / n,
            mean_time_to_recover_secs: sum.mean_time_to_recover_secs / n,
            lead_time_for_changes_secs: sum.lead_time_for_changes_secs / n,
            deployment_count: sum.deployment_count / n,
            total_events: sum.total_events / n,
        }
    }
}

pub(crate) fn duration_secs(d: chrono::Duration) -> f64 {
    d.num_milliseconds() as f64 / 1000.0
}

/// Average each metric over the trailing `window_count` snapshots.
///
/// Positions near the start average over however many snapshots exist.
/// `window_count <= 1` returns the unsmoothed values.
pub fn moving_average(snapshots: &[MetricSnapshot], window_count: usize) -> Vec<MetricAverages> {
    let values: Vec<MetricAverages> = snapshots.iter().map(MetricAverages::from_snapshot).collect();
    if window_count <= 1 {
        return values;
    }

    (0..values.len())
        .map(|i| {
            let from = (i + 1).saturating_sub(window_count);
            MetricAverages::mean_of(&values[from..=i])
        })
        .collect()
}
