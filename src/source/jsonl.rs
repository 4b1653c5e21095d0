//! Change events from a JSONL file, one `ChangeEvent` per line

use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use super::{ensure_chronological, EventSource};
use crate::classifier::TagMatcher;
use crate::error::{ReportError, Result};
use crate::model::ChangeEvent;

pub struct JsonlSource {
    path: PathBuf,
    /// Signal for events written without an outcome
    tags: Option<TagMatcher>,
}

impl JsonlSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tags: None,
        }
    }

    pub fn with_tags(mut self, tags: Option<TagMatcher>) -> Self {
        self.tags = tags;
        self
    }

    /// Every parseable event in the file, oldest first
    pub fn read_all(&self) -> Result<Vec<ChangeEvent>> {
        let file = File::open(&self.path).map_err(|e| {
            ReportError::upstream(format!("cannot open {}: {}", self.path.display(), e))
        })?;
        log::info!("📖 Reading change events from: {}", self.path.display());

        let mut events = Vec::new();
        for (lineno, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match ChangeEvent::from_jsonl(line.trim()) {
                Ok(event) => events.push(event),
                Err(e) => log::warn!("Skipping malformed event on line {}: {}", lineno + 1, e),
            }
        }

        if let Some(ref matcher) = self.tags {
            events.iter_mut().for_each(|e| matcher.resolve(e));
        }

        ensure_chronological(&mut events, &self.path.display().to_string());

        Ok(events)
    }
}

impl EventSource for JsonlSource {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    fn collect_events(&self, _since: DateTime<Utc>, until: DateTime<Utc>) -> Result<Vec<ChangeEvent>> {
        let mut events = self.read_all()?;
        events.retain(|e| e.timestamp <= until);
        Ok(events)
    }

    fn first_event_time(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.read_all()?.first().map(|e| e.timestamp))
    }
}
