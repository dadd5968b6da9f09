use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::{debug, info};

use crate::metrics::TRACKED_CLIENTS;

// Source of "now" for the limiter, swapped for a manual clock in tests
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

// Quota entry - tracks requests per client within a fixed window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientQuota {
    pub count: u32,
    pub reset_time: Instant,
}

// Returned when a client has used up its window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaExceeded {
    pub limit: u32,
    pub retry_after: Duration,
}

struct Inner {
    entries: DashMap<String, ClientQuota>,
    limit: u32,
    window: Duration,
    clock: Arc<dyn Clock>,
}

// Fixed window limiter keyed by client identity.
// Not sliding: a burst across a window boundary can pass up to 2x the limit.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Inner>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self::with_clock(limit, window, Arc::new(SystemClock))
    }

    pub fn with_clock(limit: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: DashMap::new(),
                limit,
                window,
                clock,
            }),
        }
    }

    /// Consumes one unit of the client's quota.
    ///
    /// Returns the requests left in the current window, or `QuotaExceeded`
    /// without touching the entry. The entry guard holds the shard lock, so
    /// check-and-increment is atomic per client.
    pub fn check(&self, client: &str) -> Result<u32, QuotaExceeded> {
        let now = self.inner.clock.now();
        let window = self.inner.window;

        let mut entry = self
            .inner
            .entries
            .entry(client.to_string())
            .or_insert_with(|| ClientQuota {
                count: 0,
                reset_time: now + window,
            });

        // window over? start a new one
        if now > entry.reset_time {
            entry.count = 0;
            entry.reset_time = now + window;
        }

        if entry.count >= self.inner.limit {
            return Err(QuotaExceeded {
                limit: self.inner.limit,
                retry_after: entry.reset_time.saturating_duration_since(now),
            });
        }

        entry.count += 1;
        let remaining = self.inner.limit - entry.count;
        drop(entry);

        TRACKED_CLIENTS.set(self.inner.entries.len() as f64);
        Ok(remaining)
    }

    #[cfg(test)]
    pub fn get(&self, client: &str) -> Option<ClientQuota> {
        self.inner.entries.get(client).map(|e| *e)
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    /// Drops entries whose window has already ended. Such an entry would be
    /// reset on its next access, so removing it never changes a decision.
    pub fn evict_expired(&self) -> usize {
        let now = self.inner.clock.now();
        let before = self.inner.entries.len();
        self.inner.entries.retain(|_, quota| now <= quota.reset_time);
        let after = self.inner.entries.len();
        TRACKED_CLIENTS.set(after as f64);
        before.saturating_sub(after)
    }
}

// Background sweep of stale quota entries
pub async fn sweeper(limiter: RateLimiter, every: Duration) {
    let mut interval = interval(every);
    info!(interval = ?every, "quota sweeper started");

    loop {
        interval.tick().await;
        let evicted = limiter.evict_expired();
        if evicted > 0 {
            debug!(evicted, remaining = limiter.len(), "evicted expired quota entries");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    pub(crate) struct ManualClock(Mutex<Instant>);

    impl ManualClock {
        pub(crate) fn new() -> Arc<Self> {
            Arc::new(Self(Mutex::new(Instant::now())))
        }

        pub(crate) fn advance(&self, by: Duration) {
            *self.0.lock().unwrap() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.0.lock().unwrap()
        }
    }

    const HOUR: Duration = Duration::from_secs(3600);

    fn limiter(limit: u32) -> (RateLimiter, Arc<ManualClock>) {
        let clock = ManualClock::new();
        (RateLimiter::with_clock(limit, HOUR, clock.clone()), clock)
    }

    #[test]
    fn allows_up_to_limit_then_rejects() {
        let (limiter, _) = limiter(20);
        for n in 1..=20 {
            assert_eq!(limiter.check("10.0.0.1"), Ok(20 - n));
        }
        assert!(limiter.check("10.0.0.1").is_err());
        assert!(limiter.check("10.0.0.1").is_err());
    }

    #[test]
    fn rejection_leaves_entry_untouched() {
        let (limiter, clock) = limiter(2);
        limiter.check("a").unwrap();
        limiter.check("a").unwrap();
        let before = limiter.get("a").unwrap();

        clock.advance(Duration::from_secs(10));
        let err = limiter.check("a").unwrap_err();

        assert_eq!(limiter.get("a").unwrap(), before);
        assert_eq!(err.retry_after, HOUR - Duration::from_secs(10));
        assert_eq!(err.limit, 2);
    }

    #[test]
    fn window_resets_after_reset_time() {
        let (limiter, clock) = limiter(3);
        for _ in 0..3 {
            limiter.check("a").unwrap();
        }
        assert!(limiter.check("a").is_err());

        clock.advance(HOUR + Duration::from_millis(1));
        assert_eq!(limiter.check("a"), Ok(2));
        assert_eq!(limiter.get("a").unwrap().count, 1);
    }

    #[test]
    fn reset_only_strictly_after_reset_time() {
        let (limiter, clock) = limiter(1);
        limiter.check("a").unwrap();

        clock.advance(HOUR);
        assert!(limiter.check("a").is_err());

        clock.advance(Duration::from_millis(1));
        assert_eq!(limiter.check("a"), Ok(0));
    }

    #[test]
    fn clients_are_independent() {
        let (limiter, _) = limiter(1);
        assert_eq!(limiter.check("a"), Ok(0));
        assert_eq!(limiter.check("b"), Ok(0));
        assert!(limiter.check("a").is_err());
        assert_eq!(limiter.len(), 2);
    }

    #[test]
    fn boundary_burst_can_reach_twice_the_limit() {
        let (limiter, clock) = limiter(5);
        limiter.check("a").unwrap();
        clock.advance(HOUR - Duration::from_secs(1));

        // four more right before the boundary, ten right after
        let mut allowed = 1;
        for _ in 0..4 {
            allowed += limiter.check("a").is_ok() as u32;
        }
        clock.advance(Duration::from_secs(2));
        for _ in 0..10 {
            allowed += limiter.check("a").is_ok() as u32;
        }
        assert_eq!(allowed, 10);
    }

    #[test]
    fn evicts_only_expired_entries() {
        let (limiter, clock) = limiter(5);
        limiter.check("old").unwrap();
        clock.advance(Duration::from_secs(1800));
        limiter.check("fresh").unwrap();

        clock.advance(Duration::from_secs(1801));
        assert_eq!(limiter.evict_expired(), 1);
        assert!(limiter.get("old").is_none());
        assert!(limiter.get("fresh").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_drops_expired_entries() {
        let (limiter, clock) = limiter(5);
        limiter.check("gone").unwrap();
        clock.advance(HOUR + Duration::from_secs(1));
        limiter.check("kept").unwrap();

        let task = tokio::spawn(sweeper(limiter.clone(), Duration::from_secs(60)));
        tokio::time::sleep(Duration::from_secs(61)).await;

        assert!(limiter.get("gone").is_none());
        assert!(limiter.get("kept").is_some());
        task.abort();
    }

    #[test]
    fn concurrent_requests_never_exceed_limit() {
        let (limiter, _) = limiter(20);
        let allowed = std::sync::atomic::AtomicU32::new(0);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..25 {
                        if limiter.check("same").is_ok() {
                            allowed.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                        }
                    }
                });
            }
        });

        assert_eq!(allowed.into_inner(), 20);
        assert_eq!(limiter.get("same").unwrap().count, 20);
    }
}
