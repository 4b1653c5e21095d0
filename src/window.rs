//! Fixed-size time windows over a classified event stream

use chrono::{DateTime, Duration, Utc};
use std::iter::Peekable;

use crate::error::{ReportError, Result};
use crate::model::{ClassifiedEvent, ResolvedOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowBatch {
    pub window: TimeWindow,
    pub events: Vec<ClassifiedEvent>,
    /// Oldest failure still unresolved when this window opened
    pub carried_failure_start: Option<DateTime<Utc>>,
}

impl WindowBatch {
    pub fn start(&self) -> DateTime<Utc> {
        self.window.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.window.end
    }

    pub fn duration(&self) -> Duration {
        self.window.duration()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Split `[since, until]` into consecutive windows of `size`.
///
/// Interior windows are exactly `size` long; the last one is clipped to
/// `until` and may be shorter. `since == until` yields one empty window.
pub fn window_boundaries(
    since: DateTime<Utc>,
    until: DateTime<Utc>,
    size: Duration,
) -> Result<Vec<TimeWindow>> {
    if size <= Duration::zero() {
        return Err(ReportError::invalid(format!(
            "Interval size must be positive, got {}s",
            size.num_seconds()
        )));
    }
    if since > until {
        return Err(ReportError::invalid(format!(
            "since ({}) must not be after until ({})",
            since.format("%Y-%m-%dT%H:%M:%S"),
            until.format("%Y-%m-%dT%H:%M:%S")
        )));
    }

    let mut windows = Vec::new();
    let mut start = since;
    loop {
        match start.checked_add_signed(size) {
            Some(end) if end < until => {
                windows.push(TimeWindow::new(start, end));
                start = end;
            }
            _ => {
                windows.push(TimeWindow::new(start, until));
                break;
            }
        }
    }

    Ok(windows)
}

/// Tracks the oldest failure not yet followed by a deployment
#[derive(Debug, Clone, Copy, Default)]
pub struct FailureTracker {
    pending: Option<DateTime<Utc>>,
}

impl FailureTracker {
    pub fn pending(&self) -> Option<DateTime<Utc>> {
        self.pending
    }

    pub fn observe(&mut self, event: &ClassifiedEvent) {
        match event.outcome {
            ResolvedOutcome::Success | ResolvedOutcome::Recovery => self.pending = None,
            ResolvedOutcome::Failure => {
                if self.pending.is_none() {
                    self.pending = Some(event.timestamp());
                }
            }
        }
    }
}

/// Cursor that walks an ordered event stream once, handing out one
/// `WindowBatch` per window.
///
/// The head event is peeked; if it falls after the current window's end it
/// stays in the stream for the next window. Events before `since` are
/// history: they feed the failure tracker but belong to no window. Events
/// after the last window are never consumed.
pub struct IntervalWindower<I>
where
    I: Iterator<Item = ClassifiedEvent>,
{
    events: Peekable<I>,
    windows: std::vec::IntoIter<TimeWindow>,
    since: DateTime<Utc>,
    failures: FailureTracker,
}

impl<I> IntervalWindower<I>
where
    I: Iterator<Item = ClassifiedEvent>,
{
    pub fn new<T>(events: T, since: DateTime<Utc>, until: DateTime<Utc>, size: Duration) -> Result<Self>
    where
        T: IntoIterator<IntoIter = I>,
    {
        let windows = window_boundaries(since, until, size)?;
        log::debug!(
            "Windowing {} → {} into {} window(s) of {}s",
            since,
            until,
            windows.len(),
            size.num_seconds()
        );

        Ok(Self {
            events: events.into_iter().peekable(),
            windows: windows.into_iter(),
            since,
            failures: FailureTracker::default(),
        })
    }

    pub fn remaining_windows(&self) -> usize {
        self.windows.len()
    }
}

impl<I> Iterator for IntervalWindower<I>
where
    I: Iterator<Item = ClassifiedEvent>,
{
    type Item = WindowBatch;

    fn next(&mut self) -> Option<WindowBatch> {
        let window = self.windows.next()?;

        let since = self.since;
        while let Some(history) = self.events.next_if(|e| e.timestamp() < since) {
            self.failures.observe(&history);
        }

        let carried_failure_start = self.failures.pending();
        let mut events = Vec::new();
        while let Some(event) = self.events.next_if(|e| e.timestamp() <= window.end) {
            self.failures.observe(&event);
            events.push(event);
        }

        Some(WindowBatch {
            window,
            events,
            carried_failure_start,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.windows.size_hint()
    }
}

/// Assign an ordered, classified event stream to windows over `[since, until]`
pub fn window<T>(
    events: T,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
    size: Duration,
) -> Result<Vec<WindowBatch>>
where
    T: IntoIterator<Item = ClassifiedEvent>,
{
    Ok(IntervalWindower::new(events, since, until, size)?.collect())
}
