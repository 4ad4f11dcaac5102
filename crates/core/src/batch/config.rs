use std::time::Duration;

/// Provider item limit for one batch get call.
pub const DEFAULT_MAX_GET_ITEMS: usize = 100;
/// Provider item limit for one batch write call.
pub const DEFAULT_MAX_WRITE_ITEMS: usize = 25;

/// Chunk sizes, concurrency and retry ceiling for batch dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    pub max_get_items: usize,
    pub max_write_items: usize,
    /// Chunks in flight at once.
    pub concurrency: usize,
    /// Resubmissions of unprocessed items before giving up.
    pub max_retries: usize,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_get_items: DEFAULT_MAX_GET_ITEMS,
            max_write_items: DEFAULT_MAX_WRITE_ITEMS,
            concurrency: 10,
            max_retries: 5,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl BatchConfig {
    /// Exponential backoff for the given retry attempt (0-based), capped at
    /// `max_delay`.
    pub fn retry_delay(&self, attempt: usize) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(31) as u32);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}
