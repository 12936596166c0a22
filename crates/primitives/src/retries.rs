use std::{
    iter::{Chain, Once, once},
    time::Duration,
};

use tokio_retry::strategy::ExponentialBackoff;

/// The default number of attempts for a rate-limited request, including the first one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// The default backoff unit. The n-th wait (0-indexed) lasts `2^n` units.
pub const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_secs(1);

/// A retry strategy trait.
pub trait Strategy: Iterator<Item = Duration> + Clone + Send + Sync + 'static {}

/// Implement the Strategy trait for any type that is an iterator of Durations (i.e. all backoffs
/// exported by `tokio_retry`)
impl<T> Strategy for T where T: Iterator<Item = Duration> + Clone + Send + Sync + 'static {}

/// Backoff schedule used for rate-limited responses: `unit, 2*unit, 4*unit, ...`.
///
/// [`ExponentialBackoff`] starts at `base * factor`, so the first `2^0` step is
/// prepended explicitly.
pub type RateLimitBackoff = Chain<Once<Duration>, ExponentialBackoff>;

/// Build the [`RateLimitBackoff`] schedule for the given `unit`.
pub fn rate_limit_backoff(unit: Duration) -> RateLimitBackoff {
    let unit_ms = u64::try_from(unit.as_millis()).unwrap_or(u64::MAX);
    once(Duration::from_millis(unit_ms)).chain(ExponentialBackoff::from_millis(2).factor(unit_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_from_one_unit() {
        let delays: Vec<_> = rate_limit_backoff(Duration::from_secs(1)).take(4).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8)
            ]
        );
    }

    #[test]
    fn backoff_respects_custom_unit() {
        let delays: Vec<_> = rate_limit_backoff(Duration::from_millis(5)).take(3).collect();
        assert_eq!(
            delays,
            vec![Duration::from_millis(5), Duration::from_millis(10), Duration::from_millis(20)]
        );
    }

    #[test]
    fn default_schedule_is_non_decreasing() {
        let delays: Vec<_> = rate_limit_backoff(DEFAULT_BACKOFF_UNIT)
            .take(DEFAULT_MAX_ATTEMPTS as usize)
            .collect();
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
    }
}
