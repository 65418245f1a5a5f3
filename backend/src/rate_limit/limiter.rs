use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::RateLimitConfig;
use crate::utils::clock::Clock;

/// Sliding-window rate limiter keyed by client identifier (usually the IP).
///
/// A key may have at most `max_requests` accepted requests inside the
/// trailing interval `(now - window, now]`. Rejected requests are not
/// recorded. One mutex guards the whole map; every operation is short and
/// CPU-only.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<RateLimiterInner>,
}

struct RateLimiterInner {
    /// Accepted request timestamps per client key, oldest first
    windows: Mutex<HashMap<String, VecDeque<DateTime<Utc>>>>,
    max_requests: usize,
    window: Duration,
    sweep_interval: std::time::Duration,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a new rate limiter
    ///
    /// # Arguments
    /// * `config` - Ceiling, window length and sweep interval
    /// * `clock` - Time source for window pruning
    pub fn new(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(RateLimiterInner {
                windows: Mutex::new(HashMap::new()),
                max_requests: config.max_requests,
                window: Duration::from_std(config.window()).unwrap_or(Duration::MAX),
                sweep_interval: config.sweep_interval(),
                clock,
            }),
        }
    }

    /// Check if a request from this key is allowed, recording it if so.
    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, self.inner.clock.now())
    }

    pub fn allow_at(&self, key: &str, now: DateTime<Utc>) -> bool {
        let cutoff = self.cutoff(now);
        let mut windows = self.lock();

        let timestamps = windows.entry(key.to_string()).or_default();
        if let Some(cutoff) = cutoff {
            prune(timestamps, cutoff);
        }

        if timestamps.len() >= self.inner.max_requests {
            return false;
        }

        timestamps.push_back(now);
        true
    }

    /// Remove stale timestamps everywhere and drop keys left empty.
    /// Returns the number of keys evicted.
    pub fn sweep(&self) -> usize {
        self.sweep_at(self.inner.clock.now())
    }

    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let Some(cutoff) = self.cutoff(now) else {
            return 0;
        };
        let mut windows = self.lock();

        let before = windows.len();
        windows.retain(|_, timestamps| {
            prune(timestamps, cutoff);
            !timestamps.is_empty()
        });
        before - windows.len()
    }

    /// Number of client keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.lock().len()
    }

    /// How long a rejected client should wait before retrying.
    pub fn retry_after(&self) -> std::time::Duration {
        self.inner
            .window
            .to_std()
            .unwrap_or(std::time::Duration::ZERO)
    }

    pub fn max_requests(&self) -> usize {
        self.inner.max_requests
    }

    /// Runs [`RateLimiter::sweep`] every `sweep_interval` until the runtime stops.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        let limiter = self.clone();
        let period = self.inner.sweep_interval;

        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let evicted = limiter.sweep();
                if evicted > 0 {
                    debug!(
                        "Rate limiter sweep evicted {} idle clients, {} remain",
                        evicted,
                        limiter.tracked_keys()
                    );
                }
            }
        })
    }

    /// Start of the window ending at `now`. `None` when it predates the
    /// representable range, in which case nothing is old enough to prune.
    fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        now.checked_sub_signed(self.inner.window)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, VecDeque<DateTime<Utc>>>> {
        self.inner
            .windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

// The window is (now - window, now]: a timestamp exactly at the cutoff is out.
fn prune(timestamps: &mut VecDeque<DateTime<Utc>>, cutoff: DateTime<Utc>) {
    while timestamps.front().is_some_and(|t| *t <= cutoff) {
        timestamps.pop_front();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::clock::ManualClock;
    use chrono::TimeZone;

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
    }

    fn limiter(max_requests: usize, window_seconds: u64) -> RateLimiter {
        RateLimiter::new(
            &RateLimitConfig {
                max_requests,
                window_seconds,
                sweep_interval_seconds: 60,
            },
            Arc::new(ManualClock::new(at(0))),
        )
    }

    #[test]
    fn test_limit_three_per_ten_seconds() {
        let limiter = limiter(3, 10);

        assert!(limiter.allow_at("10.0.0.1", at(0)));
        assert!(limiter.allow_at("10.0.0.1", at(1)));
        assert!(limiter.allow_at("10.0.0.1", at(2)));
        assert!(!limiter.allow_at("10.0.0.1", at(3)));
        assert!(limiter.allow_at("10.0.0.1", at(11)));
    }

    #[test]
    fn test_rejections_are_not_recorded() {
        let limiter = limiter(2, 10);

        assert!(limiter.allow_at("k", at(0)));
        assert!(limiter.allow_at("k", at(5)));
        for t in 6..10 {
            assert!(!limiter.allow_at("k", at(t)));
        }
        // Only t=0 ages out; the rejected attempts never occupied a slot.
        assert!(limiter.allow_at("k", at(10)));
        assert!(!limiter.allow_at("k", at(11)));
    }

    #[test]
    fn test_window_boundary_is_exclusive() {
        let limiter = limiter(1, 10);

        assert!(limiter.allow_at("k", at(0)));
        assert!(!limiter.allow_at("k", at(9)));
        // t=0 == now - window, so it is outside the window.
        assert!(limiter.allow_at("k", at(10)));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = limiter(2, 60);

        assert!(limiter.allow_at("a", at(0)));
        assert!(limiter.allow_at("a", at(0)));
        assert!(!limiter.allow_at("a", at(1)));

        assert!(limiter.allow_at("b", at(1)));
        assert!(limiter.allow_at("b", at(1)));
        assert!(!limiter.allow_at("b", at(1)));
    }

    #[test]
    fn test_accepts_exactly_limit_in_any_window() {
        let limiter = limiter(5, 10);
        let mut accepted = Vec::new();
        for t in 0..40 {
            if limiter.allow_at("k", at(t)) {
                accepted.push(t);
            }
        }
        for start in 0..40 {
            let in_window = accepted
                .iter()
                .filter(|t| **t > start - 10 && **t <= start)
                .count();
            assert!(in_window <= 5, "window ending at {} had {}", start, in_window);
        }
        assert_eq!(
            accepted,
            vec![0, 1, 2, 3, 4, 10, 11, 12, 13, 14, 20, 21, 22, 23, 24, 30, 31, 32, 33, 34]
        );
    }

    #[test]
    fn test_empty_key_is_ordinary() {
        let limiter = limiter(1, 10);
        assert!(limiter.allow_at("", at(0)));
        assert!(!limiter.allow_at("", at(1)));
    }

    #[test]
    fn test_sweep_evicts_idle_keys_only() {
        let limiter = limiter(3, 10);
        limiter.allow_at("idle", at(0));
        limiter.allow_at("busy", at(8));
        assert_eq!(limiter.tracked_keys(), 2);

        assert_eq!(limiter.sweep_at(at(10)), 1);
        assert_eq!(limiter.tracked_keys(), 1);

        // Sweeping does not change what the busy key may still do.
        assert!(limiter.allow_at("busy", at(11)));
        assert!(limiter.allow_at("busy", at(12)));
        assert!(!limiter.allow_at("busy", at(13)));
    }

    #[test]
    fn test_allow_uses_clock() {
        let clock = Arc::new(ManualClock::new(at(0)));
        let limiter = RateLimiter::new(
            &RateLimitConfig {
                max_requests: 1,
                window_seconds: 60,
                sweep_interval_seconds: 60,
            },
            clock.clone(),
        );

        assert!(limiter.allow("k"));
        assert!(!limiter.allow("k"));
        clock.advance(Duration::seconds(61));
        assert_eq!(limiter.sweep(), 1);
        assert!(limiter.allow("k"));
        assert_eq!(limiter.retry_after(), std::time::Duration::from_secs(60));
    }

    #[test]
    fn test_concurrent_callers_never_exceed_limit() {
        let limiter = limiter(50, 60);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || {
                    (0..20).filter(|_| limiter.allow_at("shared", at(0))).count()
                })
            })
            .collect();

        let accepted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(accepted, 50);
    }

    #[test]
    fn test_oversized_window_does_not_panic() {
        let limiter = RateLimiter::new(
            &RateLimitConfig {
                max_requests: 2,
                window_seconds: 10_000_000_000_000,
                sweep_interval_seconds: 60,
            },
            Arc::new(ManualClock::new(at(0))),
        );

        assert!(limiter.allow("k"));
        assert!(limiter.allow_at("k", at(1)));
        assert!(!limiter.allow_at("k", at(2)));
        assert_eq!(limiter.sweep(), 0);
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_task_runs() {
        let clock = Arc::new(ManualClock::new(at(0)));
        let limiter = RateLimiter::new(
            &RateLimitConfig {
                max_requests: 1,
                window_seconds: 10,
                sweep_interval_seconds: 30,
            },
            clock.clone(),
        );
        limiter.allow("k");
        clock.advance(Duration::seconds(20));

        let handle = limiter.spawn_sweeper();
        tokio::time::sleep(std::time::Duration::from_secs(31)).await;
        assert_eq!(limiter.tracked_keys(), 0);
        handle.abort();
    }
}
