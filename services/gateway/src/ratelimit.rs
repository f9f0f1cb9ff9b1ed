//! Per-client token-bucket rate limiter (spec §4.2).
//!
//! Grounded in the teacher's own registry pattern
//! (`AppState::broadcast_registry`, `active_receiver_sessions`): lazy
//! get-or-insert under a write lock, read-mostly access under a read
//! lock. A background sweeper evicts idle entries every 5 minutes.
//!
//! Each bucket is its own `Mutex` so that the common case — a client
//! that already has an entry — only ever takes the registry's read lock;
//! the write lock is reserved for inserting a brand-new identity and for
//! the sweeper's eviction pass, matching spec §5's "read-often,
//! write-rarely" access pattern.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

const EVICT_AFTER: Duration = Duration::from_secs(3600);
const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// One client's token bucket. `rate` and `burst` are fixed at creation
/// time; `tokens` and `last_refill`/`last_seen` mutate on every call.
struct Bucket {
    rate: f64,
    burst: f64,
    tokens: f64,
    last_refill: Instant,
    last_seen: Instant,
}

impl Bucket {
    fn new(rate: f64, burst: u32) -> Self {
        let now = Instant::now();
        Self {
            rate,
            burst: f64::from(burst),
            tokens: f64::from(burst),
            last_refill: now,
            last_seen: now,
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.burst);
        self.last_refill = now;
    }

    fn try_consume(&mut self, cost: f64) -> bool {
        let now = Instant::now();
        self.refill(now);
        self.last_seen = now;
        if self.tokens >= cost {
            self.tokens -= cost;
            true
        } else {
            false
        }
    }
}

/// Registry of per-identity buckets, all sharing one `(rate, burst)`
/// configuration for a route family (spec §3 "RateLimitEntry").
#[derive(Clone)]
pub struct RateLimiter {
    rate: f64,
    burst: u32,
    buckets: Arc<RwLock<HashMap<String, Mutex<Bucket>>>>,
}

impl RateLimiter {
    pub fn new(rate: f64, burst: u32) -> Self {
        Self {
            rate,
            burst,
            buckets: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// `allow(id) = get(id).try_consume(1)`.
    pub async fn allow(&self, identity: &str) -> bool {
        {
            let buckets = self.buckets.read().await;
            if let Some(bucket) = buckets.get(identity) {
                return bucket.lock().expect("bucket mutex poisoned").try_consume(1.0);
            }
        }
        let mut buckets = self.buckets.write().await;
        let bucket = buckets
            .entry(identity.to_owned())
            .or_insert_with(|| Mutex::new(Bucket::new(self.rate, self.burst)));
        bucket.get_mut().expect("bucket mutex poisoned").try_consume(1.0)
    }

    /// Current state for the rate-limit response headers (§4.2).
    pub async fn snapshot(&self, identity: &str) -> (u32, u32) {
        {
            let buckets = self.buckets.read().await;
            if let Some(bucket) = buckets.get(identity) {
                let mut bucket = bucket.lock().expect("bucket mutex poisoned");
                bucket.refill(Instant::now());
                return (self.burst, bucket.tokens.floor().max(0.0) as u32);
            }
        }
        let mut buckets = self.buckets.write().await;
        let bucket = buckets
            .entry(identity.to_owned())
            .or_insert_with(|| Mutex::new(Bucket::new(self.rate, self.burst)))
            .get_mut()
            .expect("bucket mutex poisoned");
        bucket.refill(Instant::now());
        (self.burst, bucket.tokens.floor().max(0.0) as u32)
    }

    async fn sweep(&self) {
        let now = Instant::now();
        let mut buckets = self.buckets.write().await;
        buckets.retain(|_, bucket| {
            now.duration_since(bucket.get_mut().expect("bucket mutex poisoned").last_seen) <= EVICT_AFTER
        });
    }

    /// Spawns the background eviction sweeper; returns its join handle so
    /// callers can abort it on shutdown.
    pub fn spawn_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                limiter.sweep().await;
            }
        })
    }
}

/// Extracts the client identity per spec §4.2: first non-empty of
/// `X-Forwarded-For` (first comma-separated value, trimmed), `X-Real-IP`,
/// else the remote address with any port stripped; empty yields "unknown".
pub fn client_identity(
    forwarded_for: Option<&str>,
    real_ip: Option<&str>,
    remote_addr: Option<&str>,
) -> String {
    if let Some(first) = forwarded_for.and_then(|v| v.split(',').next()) {
        let trimmed = first.trim();
        if !trimmed.is_empty() {
            return trimmed.to_owned();
        }
    }
    if let Some(ip) = real_ip {
        let trimmed = ip.trim();
        if !trimmed.is_empty() {
            return trimmed.to_owned();
        }
    }
    if let Some(addr) = remote_addr {
        let host = strip_port(addr);
        if !host.is_empty() {
            return host.to_owned();
        }
    }
    "unknown".to_owned()
}

fn strip_port(addr: &str) -> &str {
    if addr.starts_with('[') {
        // IPv6 with brackets, e.g. "[::1]:8080".
        addr.rsplit_once("]:").map_or(addr, |(host, _port)| &host[1..])
    } else {
        match addr.rsplit_once(':') {
            Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
            _ => addr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{advance, pause};

    #[tokio::test]
    async fn three_calls_back_to_back_then_recovers_after_backoff() {
        pause();
        let limiter = RateLimiter::new(2.0, 2);
        assert!(limiter.allow("1.1.1.1").await);
        assert!(limiter.allow("1.1.1.1").await);
        assert!(!limiter.allow("1.1.1.1").await);

        advance(Duration::from_millis(550)).await;
        assert!(limiter.allow("1.1.1.1").await);
    }

    #[tokio::test]
    async fn distinct_identities_are_independent() {
        let limiter = RateLimiter::new(1.0, 1);
        assert!(limiter.allow("a").await);
        assert!(!limiter.allow("a").await);
        assert!(limiter.allow("b").await);
    }

    #[tokio::test]
    async fn sweep_evicts_only_idle_entries() {
        let limiter = RateLimiter::new(10.0, 10);
        limiter.allow("stale").await;
        {
            let mut buckets = limiter.buckets.write().await;
            let bucket = buckets.get_mut("stale").unwrap().get_mut().unwrap();
            bucket.last_seen = Instant::now() - Duration::from_secs(3700);
        }
        limiter.allow("fresh").await;

        limiter.sweep().await;

        let buckets = limiter.buckets.read().await;
        assert!(!buckets.contains_key("stale"));
        assert!(buckets.contains_key("fresh"));
    }

    #[test]
    fn identity_extraction_order() {
        assert_eq!(
            client_identity(Some(" 10.0.0.1 , 10.0.0.2"), Some("10.0.0.3"), Some("10.0.0.4:9000")),
            "10.0.0.1"
        );
        assert_eq!(client_identity(None, Some("10.0.0.3"), Some("10.0.0.4:9000")), "10.0.0.3");
        assert_eq!(client_identity(None, None, Some("10.0.0.4:9000")), "10.0.0.4");
        assert_eq!(client_identity(None, None, Some("[::1]:9000")), "::1");
        assert_eq!(client_identity(None, None, None), "unknown");
        assert_eq!(client_identity(Some(""), Some(""), Some("")), "unknown");
    }
}
