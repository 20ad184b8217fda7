//! Backoff policies for the retry loop.

use std::time::Duration;

/// Default delay between attempts.
pub const DEFAULT_BACKOFF_DELAY: Duration = Duration::from_millis(100);

/// Decides how long to wait before the next attempt.
///
/// `attempt` is the number of attempts already made, starting at 1 for the
/// wait after the first attempt.
pub trait Backoff: Send + Sync {
    /// Delay before attempt `attempt + 1`.
    fn delay(&self, attempt: usize) -> Duration;
}

impl<F> Backoff for F
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    fn delay(&self, attempt: usize) -> Duration {
        self(attempt)
    }
}

/// Fixed delay between attempts. The default policy.
#[derive(Debug, Clone, Copy)]
pub struct ConstantBackoff {
    delay: Duration,
}

impl ConstantBackoff {
    /// Creates a constant backoff with the given delay.
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for ConstantBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_BACKOFF_DELAY)
    }
}

impl Backoff for ConstantBackoff {
    fn delay(&self, _attempt: usize) -> Duration {
        self.delay
    }
}

/// Exponential backoff: `base * 2^(attempt - 1)`, capped at `max`.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    base: Duration,
    max: Duration,
}

impl ExponentialBackoff {
    /// Creates an exponential backoff starting at `base`, capped at `max`.
    #[must_use]
    pub const fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_BACKOFF_DELAY, Duration::from_secs(10))
    }
}

impl Backoff for ExponentialBackoff {
    fn delay(&self, attempt: usize) -> Duration {
        // The shift saturates well before the cap matters.
        let exponent = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX).min(16);
        let delay = self.base.saturating_mul(2_u32.saturating_pow(exponent));
        delay.min(self.max)
    }
}
