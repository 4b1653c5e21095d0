use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_delay_ms: u64,
    max_delay_ms: u64,
    max_retries: u32,
    current_attempt: u32,
}

#[derive(Debug)]
pub struct MaxRetriesExceeded;

impl std::fmt::Display for MaxRetriesExceeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Maximum retry attempts exceeded")
    }
}

impl std::error::Error for MaxRetriesExceeded {}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(200, 2_000, 2)
    }
}

impl ExponentialBackoff {
    pub fn new(initial_ms: u64, max_ms: u64, retries: u32) -> Self {
        Self {
            initial_delay_ms: initial_ms,
            max_delay_ms: max_ms,
            max_retries: retries,
            current_attempt: 0,
        }
    }

    /// No retries at all; the first failure is final
    pub fn none() -> Self {
        Self::new(0, 0, 0)
    }

    pub fn attempts(&self) -> u32 {
        self.current_attempt
    }

    /// Delay before the next attempt, or `None` once retries are used up
    pub fn next_delay(&self) -> Option<Duration> {
        if self.current_attempt >= self.max_retries {
            return None;
        }

        let factor = 2_u64.saturating_pow(self.current_attempt);
        let delay = std::cmp::min(self.initial_delay_ms.saturating_mul(factor), self.max_delay_ms);
        Some(Duration::from_millis(delay))
    }

    pub fn sleep(&mut self) -> Result<(), MaxRetriesExceeded> {
        let delay = self.next_delay().ok_or(MaxRetriesExceeded)?;

        log::warn!(
            "⏳ Retry attempt {} of {} in {}ms",
            self.current_attempt + 1,
            self.max_retries,
            delay.as_millis()
        );

        std::thread::sleep(delay);
        self.current_attempt += 1;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.current_attempt = 0;
    }

    /// Run `op` until it succeeds or retries are exhausted; the last error
    /// is returned
    pub fn retry<T, E, F>(&mut self, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        E: std::fmt::Display,
    {
        loop {
            match op() {
                Ok(value) => {
                    self.reset();
                    return Ok(value);
                }
                Err(e) => {
                    log::debug!("Attempt {} failed: {}", self.current_attempt + 1, e);
                    if self.sleep().is_err() {
                        self.reset();
                        return Err(e);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_double_and_cap() {
        let mut backoff = ExponentialBackoff::new(0, 0, 3);
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(0)));

        let capped = ExponentialBackoff::new(100, 250, 5);
        assert_eq!(capped.next_delay(), Some(Duration::from_millis(100)));

        for _ in 0..3 {
            backoff.sleep().unwrap();
        }
        assert!(backoff.sleep().is_err());
        assert_eq!(backoff.attempts(), 3);
    }

    #[test]
    fn test_retry_eventually_succeeds() {
        let mut backoff = ExponentialBackoff::new(0, 0, 3);
        let mut calls = 0;

        let result: Result<u32, String> = backoff.retry(|| {
            calls += 1;
            if calls < 3 {
                Err(format!("flaky {}", calls))
            } else {
                Ok(calls)
            }
        });

        assert_eq!(result, Ok(3));
        assert_eq!(backoff.attempts(), 0);
    }

    #[test]
    fn test_retry_returns_last_error() {
        let mut backoff = ExponentialBackoff::none();
        let result: Result<(), String> = backoff.retry(|| Err("down".to_string()));
        assert_eq!(result, Err("down".to_string()));
    }
}
