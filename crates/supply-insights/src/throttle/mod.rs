//! Failed-login throttling.
//!
//! Each (identifier, source IP) pair owns a counter record moving through
//! three states: clear (no record), accumulating (count below the limit),
//! and locked (count reached the limit, expiry timestamp set). The counter
//! store is injected so tests and deployments pick their own backing; the
//! store contract requires the read-modify-write for one key to be atomic,
//! otherwise two concurrent failures under-count.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::ThrottleConfig;

/// Counters are isolated per identifier AND per source IP.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttemptKey {
    pub identifier: String,
    pub ip: String,
}

impl AttemptKey {
    pub fn new(identifier: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            ip: ip.into(),
        }
    }
}

/// Per-key counter record. `touched_at` drives the TTL: a record untouched
/// for the lockout duration is treated as absent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoginAttemptState {
    pub count: u32,
    pub locked_until: Option<DateTime<Utc>>,
    pub touched_at: DateTime<Utc>,
}

/// Outcome surfaced to the login flow before any credential check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    Clear,
    Accumulating { count: u32 },
    Locked { retry_after_secs: i64 },
}

impl ThrottleDecision {
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Locked { .. })
    }
}

/// Counter store failure. The in-memory store never raises one, but an
/// external store (cache service) can.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("attempt store unavailable: {0}")]
    Unavailable(String),
}

/// Keyed counter storage with per-key atomic updates and a TTL.
///
/// `update` runs the closure under whatever exclusion the store provides for
/// the key; the closure receives the live record (already filtered through
/// the TTL) and returns the replacement, or `None` to delete.
pub trait AttemptStore: Send + Sync {
    fn update(
        &self,
        key: &AttemptKey,
        now: DateTime<Utc>,
        apply: &mut dyn FnMut(Option<LoginAttemptState>) -> Option<LoginAttemptState>,
    ) -> Result<Option<LoginAttemptState>, StoreError>;

    fn fetch(
        &self,
        key: &AttemptKey,
        now: DateTime<Utc>,
    ) -> Result<Option<LoginAttemptState>, StoreError>;

    fn clear(&self, key: &AttemptKey) -> Result<(), StoreError>;
}

/// Mutex-over-map store with lazy TTL expiry. The single mutex gives the
/// atomic per-key update the trait demands.
#[derive(Clone)]
pub struct InMemoryAttemptStore {
    ttl: ChronoDuration,
    records: Arc<Mutex<HashMap<AttemptKey, LoginAttemptState>>>,
}

impl InMemoryAttemptStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: ChronoDuration::from_std(ttl).unwrap_or(ChronoDuration::MAX),
            records: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn live(&self, state: LoginAttemptState, now: DateTime<Utc>) -> Option<LoginAttemptState> {
        if now.signed_duration_since(state.touched_at) > self.ttl {
            None
        } else {
            Some(state)
        }
    }
}

impl AttemptStore for InMemoryAttemptStore {
    fn update(
        &self,
        key: &AttemptKey,
        now: DateTime<Utc>,
        apply: &mut dyn FnMut(Option<LoginAttemptState>) -> Option<LoginAttemptState>,
    ) -> Result<Option<LoginAttemptState>, StoreError> {
        let mut guard = self.records.lock().expect("attempt store mutex poisoned");
        let current = guard.get(key).copied().and_then(|state| self.live(state, now));
        let next = apply(current);
        match next {
            Some(state) => {
                guard.insert(key.clone(), state);
            }
            None => {
                guard.remove(key);
            }
        }
        Ok(next)
    }

    fn fetch(
        &self,
        key: &AttemptKey,
        now: DateTime<Utc>,
    ) -> Result<Option<LoginAttemptState>, StoreError> {
        let mut guard = self.records.lock().expect("attempt store mutex poisoned");
        let live = guard.get(key).copied().and_then(|state| self.live(state, now));
        if live.is_none() {
            guard.remove(key);
        }
        Ok(live)
    }

    fn clear(&self, key: &AttemptKey) -> Result<(), StoreError> {
        let mut guard = self.records.lock().expect("attempt store mutex poisoned");
        guard.remove(key);
        Ok(())
    }
}

/// The throttle state machine over an injected store.
pub struct LoginThrottle<S> {
    store: Arc<S>,
    config: ThrottleConfig,
}

impl<S: AttemptStore> LoginThrottle<S> {
    pub fn new(store: Arc<S>, config: ThrottleConfig) -> Self {
        Self { store, config }
    }

    /// Pre-check before any credential validation.
    pub fn check(
        &self,
        key: &AttemptKey,
        now: DateTime<Utc>,
    ) -> Result<ThrottleDecision, StoreError> {
        let state = self.store.fetch(key, now)?;
        Ok(self.decision(state, now))
    }

    /// Record one failed attempt and return the resulting state. Reaching
    /// the attempt budget sets `locked_until = now + lockout`.
    pub fn record_failure(
        &self,
        key: &AttemptKey,
        now: DateTime<Utc>,
    ) -> Result<ThrottleDecision, StoreError> {
        let max_attempts = self.config.max_attempts;
        let lockout = ChronoDuration::from_std(self.config.lockout).unwrap_or(ChronoDuration::MAX);

        let next = self.store.update(key, now, &mut |current| {
            let mut state = current.unwrap_or(LoginAttemptState {
                count: 0,
                locked_until: None,
                touched_at: now,
            });

            // An attempt during an active lockout does not extend it.
            if let Some(locked_until) = state.locked_until {
                if now < locked_until {
                    state.touched_at = now;
                    return Some(state);
                }
                // Expired lock: start a fresh accumulation run.
                state = LoginAttemptState {
                    count: 0,
                    locked_until: None,
                    touched_at: now,
                };
            }

            state.count += 1;
            state.touched_at = now;
            if state.count >= max_attempts {
                state.locked_until = Some(now + lockout);
            }
            Some(state)
        })?;

        Ok(self.decision(next, now))
    }

    /// A successful authentication clears the record from any state.
    pub fn record_success(&self, key: &AttemptKey) -> Result<(), StoreError> {
        self.store.clear(key)
    }

    fn decision(&self, state: Option<LoginAttemptState>, now: DateTime<Utc>) -> ThrottleDecision {
        match state {
            None => ThrottleDecision::Clear,
            Some(state) => {
                if let Some(locked_until) = state.locked_until {
                    if now < locked_until {
                        let remaining = locked_until.signed_duration_since(now).num_seconds().max(1);
                        return ThrottleDecision::Locked {
                            retry_after_secs: remaining,
                        };
                    }
                }
                if state.count == 0 {
                    ThrottleDecision::Clear
                } else {
                    ThrottleDecision::Accumulating { count: state.count }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn throttle() -> LoginThrottle<InMemoryAttemptStore> {
        let config = ThrottleConfig::default();
        LoginThrottle::new(Arc::new(InMemoryAttemptStore::new(config.lockout)), config)
    }

    fn key() -> AttemptKey {
        AttemptKey::new("chipo@example.com", "203.0.113.9")
    }

    #[test]
    fn failures_accumulate_until_locked() {
        let throttle = throttle();
        let now = Utc::now();

        for attempt in 1..5 {
            let decision = throttle.record_failure(&key(), now).expect("store ok");
            assert_eq!(decision, ThrottleDecision::Accumulating { count: attempt });
        }

        let decision = throttle.record_failure(&key(), now).expect("store ok");
        assert!(decision.is_locked());
    }

    #[test]
    fn sixth_attempt_reports_remaining_lockout() {
        let throttle = throttle();
        let now = Utc::now();
        for _ in 0..5 {
            throttle.record_failure(&key(), now).expect("store ok");
        }

        let later = now + ChronoDuration::seconds(30);
        match throttle.check(&key(), later).expect("store ok") {
            ThrottleDecision::Locked { retry_after_secs } => {
                assert!(retry_after_secs > 0);
                assert!(retry_after_secs <= 270);
            }
            other => panic!("expected locked, got {other:?}"),
        }
    }

    #[test]
    fn success_resets_from_any_state() {
        let throttle = throttle();
        let now = Utc::now();
        for _ in 0..5 {
            throttle.record_failure(&key(), now).expect("store ok");
        }

        throttle.record_success(&key()).expect("store ok");
        assert_eq!(
            throttle.check(&key(), now).expect("store ok"),
            ThrottleDecision::Clear
        );
        assert_eq!(
            throttle.record_failure(&key(), now).expect("store ok"),
            ThrottleDecision::Accumulating { count: 1 }
        );
    }

    #[test]
    fn keys_are_isolated() {
        let throttle = throttle();
        let now = Utc::now();
        for _ in 0..5 {
            throttle.record_failure(&key(), now).expect("store ok");
        }

        let other_ip = AttemptKey::new("chipo@example.com", "198.51.100.4");
        let other_user = AttemptKey::new("tariro@example.com", "203.0.113.9");
        assert_eq!(
            throttle.check(&other_ip, now).expect("store ok"),
            ThrottleDecision::Clear
        );
        assert_eq!(
            throttle.check(&other_user, now).expect("store ok"),
            ThrottleDecision::Clear
        );
    }

    #[test]
    fn record_expires_after_ttl_of_inactivity() {
        let throttle = throttle();
        let now = Utc::now();
        for _ in 0..5 {
            throttle.record_failure(&key(), now).expect("store ok");
        }

        let after_ttl = now + ChronoDuration::seconds(301);
        assert_eq!(
            throttle.check(&key(), after_ttl).expect("store ok"),
            ThrottleDecision::Clear
        );
    }

    #[test]
    fn lockout_expiry_restarts_accumulation() {
        let config = ThrottleConfig {
            max_attempts: 2,
            lockout: Duration::from_secs(60),
        };
        let throttle = LoginThrottle::new(
            Arc::new(InMemoryAttemptStore::new(config.lockout)),
            config,
        );
        let now = Utc::now();

        throttle.record_failure(&key(), now).expect("store ok");
        let locked = throttle.record_failure(&key(), now).expect("store ok");
        assert!(locked.is_locked());

        let after_lock = now + ChronoDuration::seconds(61);
        assert_eq!(
            throttle.check(&key(), after_lock).expect("store ok"),
            ThrottleDecision::Clear
        );
    }
}
