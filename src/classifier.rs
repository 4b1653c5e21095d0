//! Outcome classification: folds per-event signals into success/failed/recovery

use glob::Pattern;

use crate::error::{ReportError, Result};
use crate::model::{ChangeEvent, ClassifiedEvent, ResolvedOutcome, Signal};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClassifierState {
    #[default]
    Unknown,
    Failed,
    Success,
    Recovery,
}

impl ClassifierState {
    /// Value carried into the next call: Recovery counts as Success
    pub fn folded(self) -> Self {
        match self {
            ClassifierState::Recovery => ClassifierState::Success,
            other => other,
        }
    }

    pub fn as_outcome(self) -> ResolvedOutcome {
        match self {
            ClassifierState::Success => ResolvedOutcome::Success,
            ClassifierState::Recovery => ResolvedOutcome::Recovery,
            ClassifierState::Failed | ClassifierState::Unknown => ResolvedOutcome::Failure,
        }
    }
}

/// Resolve one event given the previous folded state.
///
/// An `Unknown` previous state is treated as `Failed`, so the first
/// successful event of a stream is always a recovery.
pub fn classify(signal_present: bool, previous: ClassifierState) -> ClassifierState {
    if !signal_present {
        return ClassifierState::Failed;
    }

    match previous {
        ClassifierState::Success | ClassifierState::Recovery => ClassifierState::Success,
        ClassifierState::Failed | ClassifierState::Unknown => ClassifierState::Recovery,
    }
}

/// Stateful fold over a chronologically ordered event stream
#[derive(Debug, Clone, Default)]
pub struct OutcomeClassifier {
    previous: ClassifierState,
}

impl OutcomeClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn previous(&self) -> ClassifierState {
        self.previous
    }

    pub fn next_state(&mut self, signal_present: bool) -> ClassifierState {
        let state = classify(signal_present, self.previous);
        self.previous = state.folded();
        state
    }

    /// Classify the next event; must be called in ascending timestamp order
    pub fn classify_event(&mut self, event: ChangeEvent) -> ClassifiedEvent {
        let state = self.next_state(event.outcome.is_present());
        ClassifiedEvent {
            event,
            outcome: state.as_outcome(),
        }
    }

    pub fn classify_all<I>(&mut self, events: I) -> Vec<ClassifiedEvent>
    where
        I: IntoIterator<Item = ChangeEvent>,
    {
        events.into_iter().map(|e| self.classify_event(e)).collect()
    }
}

/// Glob pattern deciding whether an event's tags carry a deployment signal
#[derive(Debug, Clone)]
pub struct TagMatcher {
    pattern: Pattern,
}

impl TagMatcher {
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = Pattern::new(pattern).map_err(|e| {
            ReportError::invalid(format!("Invalid tag pattern '{}': {}", pattern, e))
        })?;
        Ok(Self { pattern })
    }

    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn matches(&self, tag: &str) -> bool {
        self.pattern.matches(tag)
    }

    /// Tags that match the pattern, in their original order
    pub fn filter<'a>(&self, tags: &'a [String]) -> Vec<&'a String> {
        tags.iter().filter(|t| self.matches(t)).collect()
    }

    pub fn signal_for(&self, tags: &[String]) -> Signal {
        if tags.iter().any(|t| self.matches(t)) {
            Signal::Success
        } else {
            Signal::Failure
        }
    }

    /// Derive the signal from the event's tags when the source left it
    /// `Unknown`; an explicit outcome is kept
    pub fn resolve(&self, event: &mut ChangeEvent) {
        if event.outcome == Signal::Unknown {
            event.outcome = self.signal_for(&event.tags);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_transition_rule() {
        assert_eq!(classify(true, ClassifierState::Failed), ClassifierState::Recovery);
        assert_eq!(classify(true, ClassifierState::Unknown), ClassifierState::Recovery);
        assert_eq!(classify(true, ClassifierState::Success), ClassifierState::Success);
        assert_eq!(classify(false, ClassifierState::Success), ClassifierState::Failed);
        assert_eq!(classify(false, ClassifierState::Failed), ClassifierState::Failed);
        assert_eq!(classify(false, ClassifierState::Unknown), ClassifierState::Failed);
    }

    #[test]
    fn test_tag_sequence_from_failed() {
        let mut previous = ClassifierState::Failed;
        let states: Vec<_> = [false, true, true]
            .iter()
            .map(|&present| {
                let state = classify(present, previous);
                previous = state.folded();
                state
            })
            .collect();

        assert_eq!(
            states,
            vec![ClassifierState::Failed, ClassifierState::Recovery, ClassifierState::Success]
        );
    }

    #[test]
    fn test_recovery_folds_to_success() {
        let mut classifier = OutcomeClassifier::new();

        assert_eq!(classifier.next_state(true), ClassifierState::Recovery);
        assert_eq!(classifier.previous(), ClassifierState::Success);
        // Carrying Recovery forward would label this a second recovery
        assert_eq!(classifier.next_state(true), ClassifierState::Success);
    }

    #[test]
    fn test_unknown_signal_counts_as_absent() {
        let base = Utc.with_ymd_and_hms(2023, 1, 1, 12, 0, 0).unwrap();
        let events = vec![
            ChangeEvent::new("1", base, Signal::Unknown),
            ChangeEvent::new("2", base + Duration::minutes(10), Signal::Success),
            ChangeEvent::new("3", base + Duration::minutes(20), Signal::Success),
        ];

        let outcomes: Vec<_> = OutcomeClassifier::new()
            .classify_all(events)
            .into_iter()
            .map(|c| c.outcome)
            .collect();

        assert_eq!(
            outcomes,
            vec![ResolvedOutcome::Failure, ResolvedOutcome::Recovery, ResolvedOutcome::Success]
        );
    }

    #[test]
    fn test_tag_matcher_glob() {
        let matcher = TagMatcher::new("build-*").unwrap();

        assert_eq!(matcher.signal_for(&["build-123".to_string()]), Signal::Success);
        assert_eq!(matcher.signal_for(&["release-123".to_string()]), Signal::Failure);
        assert_eq!(matcher.signal_for(&[]), Signal::Failure);

        let tags = vec!["v1.0".to_string(), "build-7".to_string()];
        assert_eq!(matcher.filter(&tags), vec![&tags[1]]);
    }

    #[test]
    fn test_resolve_only_fills_unknown_outcome() {
        let matcher = TagMatcher::new("build-*").unwrap();
        let at = Utc.with_ymd_and_hms(2025, 7, 12, 9, 0, 0).unwrap();

        let mut tagged = ChangeEvent::new("a", at, Signal::Unknown).with_tags(vec!["build-1".to_string()]);
        let mut untagged = ChangeEvent::new("b", at, Signal::Unknown);
        let mut explicit = ChangeEvent::new("c", at, Signal::Failure).with_tags(vec!["build-2".to_string()]);
        matcher.resolve(&mut tagged);
        matcher.resolve(&mut untagged);
        matcher.resolve(&mut explicit);

        assert_eq!(tagged.outcome, Signal::Success);
        assert_eq!(untagged.outcome, Signal::Failure);
        assert_eq!(explicit.outcome, Signal::Failure);
    }

    #[test]
    fn test_invalid_tag_pattern() {
        let err = TagMatcher::new("build-[").unwrap_err();
        assert!(err.is_invalid_argument());
    }
}
