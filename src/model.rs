//! Change events as produced by an event source, and their classified form

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Raw per-event deployment signal, before history is folded in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    #[serde(rename = "SUCCESS")]
    Success,
    #[serde(rename = "FAILURE")]
    Failure,
    /// No signal yet (e.g. the build tag has not been pushed)
    #[default]
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl Signal {
    pub fn is_present(&self) -> bool {
        matches!(self, Signal::Success)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub identifier: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub outcome: Signal,
    #[serde(default, with = "opt_duration_secs")]
    pub lead_time: Option<Duration>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl ChangeEvent {
    pub fn new(identifier: impl Into<String>, timestamp: DateTime<Utc>, outcome: Signal) -> Self {
        Self {
            identifier: identifier.into(),
            timestamp,
            outcome,
            lead_time: None,
            tags: Vec::new(),
        }
    }

    pub fn with_lead_time(mut self, lead_time: Duration) -> Self {
        self.lead_time = Some(lead_time);
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Parse a ChangeEvent from a JSONL line
    pub fn from_jsonl(line: &str) -> Result<Self> {
        let event: ChangeEvent = serde_json::from_str(line)?;
        Ok(event)
    }
}

/// Classifier verdict for a single event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolvedOutcome {
    Success,
    Failure,
    /// First success after one or more failures
    Recovery,
}

impl ResolvedOutcome {
    pub fn is_deployment(&self) -> bool {
        matches!(self, ResolvedOutcome::Success | ResolvedOutcome::Recovery)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResolvedOutcome::Success => "success",
            ResolvedOutcome::Failure => "failed",
            ResolvedOutcome::Recovery => "recovery",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedEvent {
    pub event: ChangeEvent,
    pub outcome: ResolvedOutcome,
}

impl ClassifiedEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.event.timestamp
    }
}

/// Lead times travel as whole seconds in JSONL
mod opt_duration_secs {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(d) => serializer.serialize_some(&d.num_seconds()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<i64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::seconds))
    }
}
