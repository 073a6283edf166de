//! Expiry computation and wall-clock access.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// Lifetime used when neither a fixed ttl nor a max-age is known.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(86_400);

/// Source of the current Unix time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Seconds since the Unix epoch, with sub-second precision.
    fn now(&self) -> f64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        chrono::Utc::now().timestamp_millis() as f64 / 1000.0
    }
}

/// Clock that only moves when told to. Millisecond resolution.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(now_secs: f64) -> Self {
        Self {
            millis: AtomicI64::new((now_secs * 1000.0).round() as i64),
        }
    }

    pub fn set(&self, now_secs: f64) {
        self.millis
            .store((now_secs * 1000.0).round() as i64, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.millis
            .fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.millis.load(Ordering::SeqCst) as f64 / 1000.0
    }
}

/// Absolute expiry timestamp in whole seconds, rounded up.
///
/// A non-zero `ttl` wins over `max_age`; with neither, the session lives for
/// [`DEFAULT_SESSION_TTL`].
pub fn compute_expiry(ttl: Option<Duration>, max_age: Option<Duration>, now: f64) -> i64 {
    let lifetime = ttl
        .filter(|ttl| !ttl.is_zero())
        .or(max_age)
        .unwrap_or(DEFAULT_SESSION_TTL);

    (lifetime.as_secs_f64() + now).ceil() as i64
}

/// Current time truncated to whole seconds, as compared against `expire`.
pub fn epoch_seconds(now: f64) -> i64 {
    now.floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: f64 = 1_700_000_000.25;

    #[test]
    fn test_max_age_in_millis() {
        let expire = compute_expiry(None, Some(Duration::from_millis(30_000)), NOW);
        assert_eq!(expire, (30.0 + NOW).ceil() as i64);
        assert_eq!(expire, 1_700_000_031);
    }

    #[test]
    fn test_default_lifetime() {
        let expire = compute_expiry(None, None, NOW);
        assert_eq!(expire, (86_400.0 + NOW).ceil() as i64);
    }

    #[test]
    fn test_fixed_ttl_overrides_max_age() {
        let ttl = Some(Duration::from_secs(10));

        assert_eq!(compute_expiry(ttl, None, NOW), 1_700_000_011);
        assert_eq!(
            compute_expiry(ttl, Some(Duration::from_millis(30_000)), NOW),
            1_700_000_011
        );
    }

    #[test]
    fn test_zero_ttl_is_ignored() {
        let expire = compute_expiry(Some(Duration::ZERO), Some(Duration::from_secs(5)), NOW);
        assert_eq!(expire, 1_700_000_006);
    }

    #[test]
    fn test_whole_second_now_is_not_rounded_past() {
        assert_eq!(compute_expiry(None, Some(Duration::ZERO), 100.0), 100);
        assert_eq!(epoch_seconds(100.999), 100);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(50.5);
        assert_eq!(clock.now(), 50.5);

        clock.advance(Duration::from_millis(1500));
        assert_eq!(clock.now(), 52.0);

        clock.set(10.0);
        assert_eq!(clock.now(), 10.0);
    }

    #[test]
    fn test_system_clock_is_recent() {
        // 2023-11-14, well before any test run
        assert!(SystemClock.now() > 1_700_000_000.0);
    }
}
