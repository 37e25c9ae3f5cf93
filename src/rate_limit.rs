//! Per-(route, actor, resource) request counting.
//!
//! This is a volumetric control, not a secrecy control: a 429 with limiter
//! headers is allowed to be observable because it reveals nothing about who
//! belongs to a project. The limiter sits behind a trait so tests can
//! substitute a deterministic implementation, and it fails open: an
//! unavailable limiter must not itself become a denial of service.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;

/// Outcome of a limiter check, with metadata for response headers.
#[derive(Debug, Clone, Copy)]
pub struct RateDecision {
    pub allowed: bool,
    pub remaining: i64,
    pub reset_at: i64,
}

pub trait RateLimiter: Send + Sync {
    /// Record one request against (route, actor, resource) and decide
    /// whether it is admitted under `limit` requests per `window_secs`.
    fn check(
        &self,
        route: &str,
        actor_id: &str,
        resource_id: &str,
        limit: i64,
        window_secs: i64,
    ) -> RateDecision;
}

struct Bucket {
    window_start: i64,
    count: i64,
}

/// Fixed-window counter keyed by (route, actor, resource), held in memory
/// with expiry. Counters are ephemeral and do not survive restart.
pub struct FixedWindowLimiter {
    buckets: Mutex<HashMap<(String, String, String), Bucket>>,
}

/// Prune the bucket map once it grows past this many live keys.
const PRUNE_THRESHOLD: usize = 4096;

impl FixedWindowLimiter {
    pub fn new() -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Deterministic variant used by `check` and directly by tests.
    pub fn check_at(
        &self,
        now: i64,
        route: &str,
        actor_id: &str,
        resource_id: &str,
        limit: i64,
        window_secs: i64,
    ) -> RateDecision {
        // A poisoned lock means another thread panicked mid-update; the
        // counters are still structurally valid, so recover and continue
        // rather than turning the limiter into an outage.
        let mut buckets = match self.buckets.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("rate limiter lock poisoned, continuing fail-open");
                poisoned.into_inner()
            }
        };

        if buckets.len() > PRUNE_THRESHOLD {
            buckets.retain(|_, bucket| now < bucket.window_start + window_secs);
        }

        let key = (
            route.to_string(),
            actor_id.to_string(),
            resource_id.to_string(),
        );

        let bucket = buckets.entry(key).or_insert(Bucket {
            window_start: now,
            count: 0,
        });

        if now >= bucket.window_start + window_secs {
            bucket.window_start = now;
            bucket.count = 0;
        }

        bucket.count += 1;
        let reset_at = bucket.window_start + window_secs;

        RateDecision {
            allowed: bucket.count <= limit,
            remaining: (limit - bucket.count).max(0),
            reset_at,
        }
    }
}

impl Default for FixedWindowLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn check(
        &self,
        route: &str,
        actor_id: &str,
        resource_id: &str,
        limit: i64,
        window_secs: i64,
    ) -> RateDecision {
        self.check_at(
            Utc::now().timestamp(),
            route,
            actor_id,
            resource_id,
            limit,
            window_secs,
        )
    }
}
