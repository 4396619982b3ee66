// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::time::Instant;

use tokio::sync::Mutex;

use crate::config::RateLimitConfig;

/// Buckets beyond this count trigger a sweep of refilled buckets. When
/// the sweep frees nothing, the least recently seen tenth is evicted.
const MAX_TRACKED_KEYS: usize = 10_000;

#[derive(Debug, Clone)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

pub(crate) struct RateLimiter {
    buckets: Mutex<HashMap<String, Bucket>>,
    max_keys: usize,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::with_max_keys(MAX_TRACKED_KEYS)
    }
}

impl RateLimiter {
    fn with_max_keys(max_keys: usize) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            max_keys: max_keys.max(1),
        }
    }

    pub(crate) async fn allow(&self, key: &str, cfg: &RateLimitConfig) -> bool {
        self.allow_at(key, cfg, Instant::now()).await
    }

    async fn allow_at(&self, key: &str, cfg: &RateLimitConfig, now: Instant) -> bool {
        let mut lock = self.buckets.lock().await;
        if lock.len() >= self.max_keys && !lock.contains_key(key) {
            lock.retain(|_, b| {
                let elapsed = now.duration_since(b.last_refill).as_secs_f64();
                b.tokens + elapsed * cfg.refill_per_sec < cfg.capacity
            });
            if lock.len() >= self.max_keys {
                evict_oldest(&mut lock, self.max_keys);
            }
        }
        let bucket = lock.entry(key.to_string()).or_insert_with(|| Bucket {
            tokens: cfg.capacity,
            last_refill: now,
        });
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.last_refill = now;
        bucket.tokens = (bucket.tokens + (elapsed * cfg.refill_per_sec)).min(cfg.capacity);
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

fn evict_oldest(buckets: &mut HashMap<String, Bucket>, max_keys: usize) {
    let keep = max_keys - (max_keys / 10).max(1);
    let mut by_age: Vec<(Instant, String)> = buckets
        .iter()
        .map(|(key, b)| (b.last_refill, key.clone()))
        .collect();
    by_age.sort_unstable();
    let excess = by_age.len().saturating_sub(keep);
    for (_, key) in by_age.into_iter().take(excess) {
        buckets.remove(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn bucket_drains_then_refills() {
        let limiter = RateLimiter::default();
        let cfg = RateLimitConfig {
            capacity: 2.0,
            refill_per_sec: 1.0,
        };
        let t0 = Instant::now();
        assert!(limiter.allow_at("10.0.0.1", &cfg, t0).await);
        assert!(limiter.allow_at("10.0.0.1", &cfg, t0).await);
        assert!(!limiter.allow_at("10.0.0.1", &cfg, t0).await);
        assert!(limiter.allow_at("10.0.0.2", &cfg, t0).await);
        let later = t0 + Duration::from_millis(1_100);
        assert!(limiter.allow_at("10.0.0.1", &cfg, later).await);
    }

    #[tokio::test]
    async fn drained_buckets_are_evicted_oldest_first_at_the_cap() {
        let limiter = RateLimiter::with_max_keys(10);
        let cfg = RateLimitConfig {
            capacity: 1.0,
            refill_per_sec: 0.001,
        };
        let t0 = Instant::now();
        for i in 0..10u64 {
            let at = t0 + Duration::from_millis(i);
            assert!(limiter.allow_at(&format!("10.0.1.{i}"), &cfg, at).await);
        }
        // every bucket is drained, so the refill sweep frees nothing
        let late = t0 + Duration::from_millis(50);
        assert!(limiter.allow_at("10.0.2.1", &cfg, late).await);
        {
            let buckets = limiter.buckets.lock().await;
            assert_eq!(buckets.len(), 10);
            assert!(!buckets.contains_key("10.0.1.0"));
            assert!(buckets.contains_key("10.0.1.9"));
            assert!(buckets.contains_key("10.0.2.1"));
        }

        for i in 0..100u64 {
            let at = late + Duration::from_millis(i);
            limiter.allow_at(&format!("10.0.3.{i}"), &cfg, at).await;
        }
        assert!(limiter.buckets.lock().await.len() <= 10);
        // an evicted key starts over with a full bucket
        assert!(limiter.allow_at("10.0.1.0", &cfg, late).await);
    }
}
