//! Login attempt throttling
//!
//! Failed attempts are logged per scope (for example `admin-login`) as epoch
//! millisecond timestamps in the key-value store. Lockout is derived from the
//! log on every check, never stored on its own:
//!
//! - only attempts inside the rolling window count towards the threshold;
//! - once `threshold` attempts fall within one window, the scope is locked
//!   for `lockout` starting at the attempt that completed the run;
//! - while locked, the attempts that caused the lock are retained even after
//!   they leave the window, and further failures are logged without
//!   extending it;
//! - when the lock expires those attempts are cleared.

use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};

use crate::cache::KeyValueStore;
use crate::error::CacheError;

type Result<T> = std::result::Result<T, CacheError>;

/// Store key prefix for per-scope attempt logs
const KEY_PREFIX: &str = "login_attempts:";

/// Window, threshold and lockout length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottlePolicy {
    pub window: Duration,
    pub threshold: usize,
    pub lockout: Duration,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            threshold: 5,
            lockout: Duration::from_secs(15 * 60),
        }
    }
}

/// Result of a throttle check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleStatus {
    pub blocked: bool,
    pub remaining: Duration,
    /// Attempts currently counted against the scope
    pub attempts: usize,
}

impl ThrottleStatus {
    pub fn remaining_ms(&self) -> u128 {
        self.remaining.as_millis()
    }
}

/// Rate-limits repeated failures per scope
pub struct AttemptThrottle<S> {
    store: S,
    policy: ThrottlePolicy,
}

impl<S: KeyValueStore> AttemptThrottle<S> {
    pub fn new(store: S) -> Self {
        Self::with_policy(store, ThrottlePolicy::default())
    }

    pub fn with_policy(store: S, policy: ThrottlePolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &ThrottlePolicy {
        &self.policy
    }

    /// Report whether `scope` is currently locked out
    pub fn check(&self, scope: &str) -> ThrottleStatus {
        self.check_at(scope, Utc::now())
    }

    pub fn check_at(&self, scope: &str, now: DateTime<Utc>) -> ThrottleStatus {
        let attempts = self.load(scope);
        let (retained, status) = self.evaluate(&attempts, now.timestamp_millis());
        if retained != attempts {
            debug!(
                "Pruned {} stale attempts for {}",
                attempts.len() - retained.len(),
                scope
            );
            if let Err(e) = self.save(scope, &retained) {
                warn!("Failed to persist attempts for {}: {}", scope, e);
            }
        }
        status
    }

    /// Log a failed attempt and return the resulting status
    pub fn record_failure(&self, scope: &str) -> Result<ThrottleStatus> {
        self.record_failure_at(scope, Utc::now())
    }

    pub fn record_failure_at(&self, scope: &str, now: DateTime<Utc>) -> Result<ThrottleStatus> {
        let now_ms = now.timestamp_millis();
        let mut attempts = self.load_for_write(scope)?;
        attempts.push(now_ms);
        attempts.sort_unstable();

        let (retained, status) = self.evaluate(&attempts, now_ms);
        self.save(scope, &retained)?;

        if status.blocked {
            warn!(
                "Scope {} locked for {}s after {} failed attempts",
                scope,
                status.remaining.as_secs(),
                status.attempts
            );
        }
        Ok(status)
    }

    /// Forget every attempt for `scope`, e.g. after a successful login
    pub fn clear_scope(&self, scope: &str) -> Result<()> {
        self.store.remove(&storage_key(scope))
    }

    /// Split `attempts` into what must be kept and the derived status.
    ///
    /// The log is walked oldest first. The first run of `threshold` attempts
    /// that fits in one window anchors a lock; attempts logged while that
    /// lock holds are kept but never move its end. A served lock drops its
    /// run together with anything logged during it.
    fn evaluate(&self, attempts: &[i64], now_ms: i64) -> (Vec<i64>, ThrottleStatus) {
        let window_ms = self.policy.window.as_millis() as i64;
        let lockout_ms = self.policy.lockout.as_millis() as i64;
        let threshold = self.policy.threshold.max(1);

        let mut first_live = 0;
        let mut i = 0;
        while i + threshold <= attempts.len() {
            let run = &attempts[i..i + threshold];
            if run[threshold - 1] - run[0] >= window_ms {
                i += 1;
                continue;
            }
            let lockout_end = run[threshold - 1] + lockout_ms;
            if now_ms < lockout_end {
                let retained = attempts[i..].to_vec();
                let status = ThrottleStatus {
                    blocked: true,
                    remaining: Duration::from_millis((lockout_end - now_ms) as u64),
                    attempts: retained.len(),
                };
                return (retained, status);
            }
            // Lock served: forget it and whatever was logged during it
            first_live = i + attempts[i..].partition_point(|&t| t < lockout_end);
            i = first_live;
        }

        let retained: Vec<i64> = attempts[first_live..]
            .iter()
            .copied()
            .filter(|&t| now_ms - t < window_ms)
            .collect();
        let status = ThrottleStatus {
            blocked: false,
            remaining: Duration::ZERO,
            attempts: retained.len(),
        };
        (retained, status)
    }

    /// Read the attempt log; empty on any failure
    fn load(&self, scope: &str) -> Vec<i64> {
        self.load_for_write(scope).unwrap_or_else(|e| {
            warn!("Failed to read attempts for {}: {}", scope, e);
            Vec::new()
        })
    }

    /// Read the attempt log before rewriting it. Unreadable content counts as
    /// empty; a store error is returned so the log is never overwritten.
    fn load_for_write(&self, scope: &str) -> Result<Vec<i64>> {
        let key = storage_key(scope);
        let Some(raw) = self.store.get(&key)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Vec<i64>>(&raw) {
            Ok(mut attempts) => {
                attempts.sort_unstable();
                Ok(attempts)
            }
            Err(e) => {
                warn!("Discarding unreadable {}: {}", key, e);
                Ok(Vec::new())
            }
        }
    }

    fn save(&self, scope: &str, attempts: &[i64]) -> Result<()> {
        let key = storage_key(scope);
        if attempts.is_empty() {
            return self.store.remove(&key);
        }
        let json =
            serde_json::to_string(attempts).map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.store.set(&key, &json)
    }
}

fn storage_key(scope: &str) -> String {
    format!("{}{}", KEY_PREFIX, scope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::cache::store::FlakyStore;
    use chrono::Duration as ChronoDuration;
    use std::sync::Arc;

    const SCOPE: &str = "admin-login";

    fn throttle() -> (AttemptThrottle<Arc<MemoryStore>>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (AttemptThrottle::new(store.clone()), store)
    }

    #[test]
    fn test_fresh_scope_not_blocked() {
        let (throttle, _) = throttle();
        let status = throttle.check(SCOPE);
        assert!(!status.blocked);
        assert_eq!(status.remaining, Duration::ZERO);
        assert_eq!(status.attempts, 0);
    }

    #[test]
    fn test_below_threshold_not_blocked() {
        let (throttle, _) = throttle();
        let t0 = Utc::now();
        for i in 0..4 {
            let status = throttle
                .record_failure_at(SCOPE, t0 + ChronoDuration::seconds(i))
                .unwrap();
            assert!(!status.blocked);
        }
        assert_eq!(throttle.check_at(SCOPE, t0 + ChronoDuration::seconds(5)).attempts, 4);
    }

    #[test]
    fn test_five_failures_lock_for_fifteen_minutes() {
        let (throttle, _) = throttle();
        let t0 = Utc::now();
        let mut last = t0;
        for i in 0..5 {
            last = t0 + ChronoDuration::seconds(i * 10);
            throttle.record_failure_at(SCOPE, last).unwrap();
        }

        let status = throttle.check_at(SCOPE, last);
        assert!(status.blocked);
        assert_eq!(status.remaining_ms(), 900_000);

        let later = throttle.check_at(SCOPE, last + ChronoDuration::minutes(5));
        assert!(later.blocked);
        assert_eq!(later.remaining_ms(), 600_000);
    }

    #[test]
    fn test_fifth_failure_reports_block_immediately() {
        let (throttle, _) = throttle();
        let t0 = Utc::now();
        for i in 0..4 {
            throttle
                .record_failure_at(SCOPE, t0 + ChronoDuration::seconds(i))
                .unwrap();
        }
        let status = throttle
            .record_failure_at(SCOPE, t0 + ChronoDuration::seconds(4))
            .unwrap();
        assert!(status.blocked);
        assert_eq!(status.remaining, Duration::from_secs(15 * 60));
    }

    #[test]
    fn test_lock_survives_window_expiry() {
        let (throttle, _) = throttle();
        let t0 = Utc::now();
        for i in 0..5 {
            throttle
                .record_failure_at(SCOPE, t0 + ChronoDuration::seconds(i))
                .unwrap();
        }
        // Far outside the 60s window, still inside the lockout
        assert!(throttle.check_at(SCOPE, t0 + ChronoDuration::minutes(10)).blocked);
    }

    #[test]
    fn test_lock_expires_and_log_is_cleared() {
        let (throttle, store) = throttle();
        let t0 = Utc::now();
        for i in 0..5 {
            throttle
                .record_failure_at(SCOPE, t0 + ChronoDuration::seconds(i))
                .unwrap();
        }

        let status = throttle.check_at(SCOPE, t0 + ChronoDuration::minutes(16));
        assert!(!status.blocked);
        assert_eq!(status.attempts, 0);
        assert!(store.get(&storage_key(SCOPE)).unwrap().is_none());
    }

    #[test]
    fn test_failure_during_lockout_keeps_lock() {
        let (throttle, _) = throttle();
        let t0 = Utc::now();
        for i in 0..5 {
            throttle
                .record_failure_at(SCOPE, t0 + ChronoDuration::seconds(i))
                .unwrap();
        }

        let during = t0 + ChronoDuration::seconds(120);
        let status = throttle.record_failure_at(SCOPE, during).unwrap();
        assert!(status.blocked);
        assert_eq!(status.remaining, Duration::from_secs(784));
        assert_eq!(status.attempts, 6);

        let status = throttle.check_at(SCOPE, during);
        assert!(status.blocked);
        assert_eq!(status.remaining, Duration::from_secs(784));

        // The extra failure does not extend the lock
        let status = throttle.check_at(SCOPE, t0 + ChronoDuration::seconds(905));
        assert!(!status.blocked);
        assert_eq!(status.attempts, 0);
    }

    #[test]
    fn test_repeated_failures_during_lockout_keep_lock() {
        let (throttle, _) = throttle();
        let t0 = Utc::now();
        for i in 0..5 {
            throttle
                .record_failure_at(SCOPE, t0 + ChronoDuration::seconds(i))
                .unwrap();
        }
        for minute in 2..10 {
            let status = throttle
                .record_failure_at(SCOPE, t0 + ChronoDuration::minutes(minute))
                .unwrap();
            assert!(status.blocked, "unlocked at minute {}", minute);
        }
        assert!(throttle.check_at(SCOPE, t0 + ChronoDuration::minutes(14)).blocked);
    }

    #[test]
    fn test_relock_after_served_lock() {
        let (throttle, _) = throttle();
        let t0 = Utc::now();
        for i in 0..5 {
            throttle
                .record_failure_at(SCOPE, t0 + ChronoDuration::seconds(i))
                .unwrap();
        }

        let after = t0 + ChronoDuration::minutes(20);
        for i in 0..4 {
            let status = throttle
                .record_failure_at(SCOPE, after + ChronoDuration::seconds(i))
                .unwrap();
            assert!(!status.blocked);
            assert_eq!(status.attempts, i as usize + 1);
        }
        let status = throttle
            .record_failure_at(SCOPE, after + ChronoDuration::seconds(4))
            .unwrap();
        assert!(status.blocked);
        assert_eq!(status.remaining, Duration::from_secs(15 * 60));
    }

    #[test]
    fn test_spread_out_failures_never_lock() {
        let (throttle, _) = throttle();
        let t0 = Utc::now();
        for i in 0..10 {
            let status = throttle
                .record_failure_at(SCOPE, t0 + ChronoDuration::seconds(i * 20))
                .unwrap();
            assert!(!status.blocked, "locked at attempt {}", i);
        }
    }

    #[test]
    fn test_check_prunes_attempts_outside_window() {
        let (throttle, store) = throttle();
        let t0 = Utc::now();
        throttle.record_failure_at(SCOPE, t0).unwrap();
        throttle
            .record_failure_at(SCOPE, t0 + ChronoDuration::seconds(50))
            .unwrap();

        let status = throttle.check_at(SCOPE, t0 + ChronoDuration::seconds(70));
        assert_eq!(status.attempts, 1);

        let raw = store.get(&storage_key(SCOPE)).unwrap().unwrap();
        let kept: Vec<i64> = serde_json::from_str(&raw).unwrap();
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_clear_scope_unblocks_immediately() {
        let (throttle, _) = throttle();
        let t0 = Utc::now();
        for i in 0..5 {
            throttle
                .record_failure_at(SCOPE, t0 + ChronoDuration::seconds(i))
                .unwrap();
        }
        assert!(throttle.check_at(SCOPE, t0 + ChronoDuration::seconds(5)).blocked);

        throttle.clear_scope(SCOPE).unwrap();

        assert!(!throttle.check_at(SCOPE, t0 + ChronoDuration::seconds(5)).blocked);
    }

    #[test]
    fn test_scopes_are_independent() {
        let (throttle, _) = throttle();
        let t0 = Utc::now();
        for i in 0..5 {
            throttle
                .record_failure_at(SCOPE, t0 + ChronoDuration::seconds(i))
                .unwrap();
        }
        assert!(!throttle.check_at("member-login", t0).blocked);
    }

    #[test]
    fn test_corrupt_log_treated_as_empty() {
        let (throttle, store) = throttle();
        store.set(&storage_key(SCOPE), "[1, 2, oops").unwrap();

        let status = throttle.check(SCOPE);
        assert!(!status.blocked);

        let status = throttle.record_failure(SCOPE).unwrap();
        assert_eq!(status.attempts, 1);
    }

    #[test]
    fn test_store_read_error_keeps_log() {
        let store = Arc::new(FlakyStore::default());
        let throttle = AttemptThrottle::new(store.clone());
        let t0 = Utc::now();
        for i in 0..5 {
            throttle
                .record_failure_at(SCOPE, t0 + ChronoDuration::seconds(i))
                .unwrap();
        }

        store.set_fail_reads(true);
        let later = t0 + ChronoDuration::seconds(30);
        assert!(throttle.record_failure_at(SCOPE, later).is_err());

        store.set_fail_reads(false);
        assert!(throttle.check_at(SCOPE, later).blocked);
    }

    #[test]
    fn test_custom_policy() {
        let store = Arc::new(MemoryStore::new());
        let throttle = AttemptThrottle::with_policy(
            store,
            ThrottlePolicy {
                window: Duration::from_secs(10),
                threshold: 2,
                lockout: Duration::from_secs(30),
            },
        );
        let t0 = Utc::now();
        throttle.record_failure_at(SCOPE, t0).unwrap();
        let status = throttle
            .record_failure_at(SCOPE, t0 + ChronoDuration::seconds(5))
            .unwrap();

        assert!(status.blocked);
        assert_eq!(status.remaining, Duration::from_secs(30));
    }
}
