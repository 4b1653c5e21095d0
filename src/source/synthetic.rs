//! Seeded pseudo-random change events, for demos and load checks

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::EventSource;
use crate::error::Result;
use crate::model::{ChangeEvent, Signal};

#[derive(Debug, Clone)]
pub struct SyntheticSource {
    seed: u64,
    /// Probability that a generated change carries a deployment signal
    success_ratio: f64,
    max_gap_minutes: i64,
    max_lead_time_secs: i64,
}

impl SyntheticSource {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            success_ratio: 0.5,
            max_gap_minutes: 10,
            max_lead_time_secs: 3600,
        }
    }

    pub fn with_success_ratio(mut self, ratio: f64) -> Self {
        self.success_ratio = ratio.clamp(0.0, 1.0);
        self
    }
}

impl EventSource for SyntheticSource {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    /// Events every 1 to 10 minutes after `since`, never past `until`
    fn collect_events(&self, since: DateTime<Utc>, until: DateTime<Utc>) -> Result<Vec<ChangeEvent>> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut events = Vec::new();
        let mut current = since;

        loop {
            current += Duration::minutes(rng.gen_range(1..=self.max_gap_minutes));
            if current > until {
                break;
            }

            let digest: [u8; 20] = rng.gen();
            let signal = if rng.gen_bool(self.success_ratio) {
                Signal::Success
            } else {
                Signal::Failure
            };
            let lead_time = Duration::seconds(rng.gen_range(0..=self.max_lead_time_secs));

            events.push(ChangeEvent::new(hex::encode(digest), current, signal).with_lead_time(lead_time));
        }

        log::debug!("Generated {} synthetic events (seed {})", events.len(), self.seed);
        Ok(events)
    }
}
