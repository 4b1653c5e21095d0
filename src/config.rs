//! Report configuration as plain, validated values

use chrono::{DateTime, Duration, Utc};

use crate::error::{ReportError, Result};
use crate::interval::{format_interval, parse_datetime, parse_interval};
use crate::source::EventSource;

pub const DEFAULT_MOVING_AVERAGE: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct ReportConfig {
    /// Start of the report range; defaults to the source's first event
    pub since: Option<DateTime<Utc>>,
    /// End of the report range; defaults to now
    pub until: Option<DateTime<Utc>>,
    /// Window size; defaults to one window spanning the whole range
    pub interval: Option<Duration>,
    /// Trailing windows averaged per metric; `<= 1` disables smoothing
    pub moving_average: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            since: None,
            until: None,
            interval: None,
            moving_average: DEFAULT_MOVING_AVERAGE,
        }
    }
}

/// Concrete range and window size for one run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportRange {
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
    pub interval: Duration,
}

impl ReportConfig {
    /// Build a config from the textual forms accepted on the command line
    pub fn parse(
        since: Option<&str>,
        until: Option<&str>,
        interval: Option<&str>,
        moving_average: usize,
    ) -> Result<Self> {
        let config = Self {
            since: since.map(parse_datetime).transpose()?,
            until: until.map(parse_datetime).transpose()?,
            interval: interval.map(parse_interval).transpose()?,
            moving_average,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(interval) = self.interval {
            if interval <= Duration::zero() {
                return Err(ReportError::invalid(format!(
                    "Interval size must be positive, got {}",
                    format_interval(interval)
                )));
            }
        }
        if let (Some(since), Some(until)) = (self.since, self.until) {
            if since > until {
                return Err(ReportError::invalid(format!(
                    "--since ({}) must not be after --until ({})",
                    since, until
                )));
            }
        }
        Ok(())
    }

    /// Fill in defaults and check the range before any window is built
    pub fn resolve_range(&self, source: &dyn EventSource, now: DateTime<Utc>) -> Result<ReportRange> {
        self.validate()?;

        let until = self.until.unwrap_or(now);
        let since = match self.since {
            Some(since) => since,
            None => match source.first_event_time()? {
                Some(first) => {
                    log::info!("No --since provided, using first {} event: {}", source.name(), first);
                    first
                }
                None => {
                    log::warn!(
                        "No --since provided and could not determine first event, defaulting to start of Unix epoch (1970-01-01 00:00:00)."
                    );
                    DateTime::UNIX_EPOCH
                }
            },
        };

        if since > until {
            return Err(ReportError::invalid(format!(
                "since ({}) must not be after until ({})",
                since, until
            )));
        }
        if since == until {
            return Err(ReportError::invalid(format!(
                "Report range is empty: since and until are both {}",
                since
            )));
        }

        let interval = match self.interval {
            Some(interval) => interval,
            None => {
                let whole = until - since;
                log::info!("Defaulting interval to {} based on --since and --until", format_interval(whole));
                whole
            }
        };

        Ok(ReportRange {
            since,
            until,
            interval,
        })
    }
}
