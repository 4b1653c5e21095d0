//! Event sources
//!
//! Every source implements [`EventSource`]: it yields change events in
//! non-decreasing timestamp order for a report range. Sources may return
//! events older than `since`; the windower treats them as history.
//!
//! ```text
//! GitMergeSource   git log --merges + git tag --points-at
//! JsonlSource      one ChangeEvent per line
//! SyntheticSource  seeded pseudo-random events
//! Vec<ChangeEvent> in-memory fixtures
//! ```
//!
//! Lead times that a source cannot attach up front are filled in by a
//! [`LeadTimeResolver`].

pub mod git;
pub mod jsonl;
pub mod retry;
pub mod synthetic;

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use crate::error::Result;
use crate::model::ChangeEvent;

pub use git::{GitLeadTimeResolver, GitMergeSource};
pub use jsonl::JsonlSource;
pub use retry::{ExponentialBackoff, MaxRetriesExceeded};
pub use synthetic::SyntheticSource;

pub trait EventSource {
    /// Short name for logging
    fn name(&self) -> &'static str;

    /// Events up to and including `until`, oldest first
    fn collect_events(&self, since: DateTime<Utc>, until: DateTime<Utc>) -> Result<Vec<ChangeEvent>>;

    /// Earliest instant the source has data for, used as the default `since`
    fn first_event_time(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(None)
    }
}

impl EventSource for Vec<ChangeEvent> {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn collect_events(&self, _since: DateTime<Utc>, until: DateTime<Utc>) -> Result<Vec<ChangeEvent>> {
        Ok(self.iter().filter(|e| e.timestamp <= until).cloned().collect())
    }

    fn first_event_time(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.iter().map(|e| e.timestamp).min())
    }
}

/// Restore timestamp order when a source yields events out of order; the
/// sort is stable so equal timestamps keep their listed order
pub(crate) fn ensure_chronological(events: &mut [ChangeEvent], origin: &str) {
    if events.windows(2).any(|w| w[0].timestamp > w[1].timestamp) {
        log::warn!("Events from {} are not in timestamp order, sorting", origin);
        events.sort_by_key(|e| e.timestamp);
    }
}

/// Looks up the lead time of a change by its identifier.
///
/// `None` means the lead time cannot be computed; such events are left out
/// of the lead-time mean.
pub trait LeadTimeResolver {
    fn resolve(&self, identifier: &str) -> Option<Duration>;
}

/// Resolver for sources whose events already carry every known lead time
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLeadTimes;

impl LeadTimeResolver for NoLeadTimes {
    fn resolve(&self, _identifier: &str) -> Option<Duration> {
        None
    }
}

impl LeadTimeResolver for HashMap<String, Duration> {
    fn resolve(&self, identifier: &str) -> Option<Duration> {
        self.get(identifier).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Signal;
    use chrono::TimeZone;

    #[test]
    fn test_memory_source_respects_until() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let events = vec![
            ChangeEvent::new("a", t0, Signal::Success),
            ChangeEvent::new("b", t0 + Duration::days(2), Signal::Failure),
        ];

        let collected = events.collect_events(t0, t0 + Duration::days(1)).unwrap();

        assert_eq!(collected.len(), 1);
        assert_eq!(events.first_event_time().unwrap(), Some(t0));
    }

    #[test]
    fn test_out_of_order_events_sorted_stably() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let mut events = vec![
            ChangeEvent::new("late", t0 + Duration::hours(2), Signal::Success),
            ChangeEvent::new("first", t0, Signal::Failure),
            ChangeEvent::new("second", t0, Signal::Success),
        ];

        ensure_chronological(&mut events, "test");

        let ids: Vec<&str> = events.iter().map(|e| e.identifier.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "late"]);
    }

    #[test]
    fn test_map_resolver() {
        let mut map = HashMap::new();
        map.insert("abc".to_string(), Duration::seconds(90));

        assert_eq!(map.resolve("abc"), Some(Duration::seconds(90)));
        assert_eq!(map.resolve("zzz"), None);
        assert_eq!(NoLeadTimes.resolve("abc"), None);
    }
}
