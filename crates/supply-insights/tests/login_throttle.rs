//! Login throttle exercised through the injected-store seam.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use supply_insights::config::ThrottleConfig;
use supply_insights::throttle::{
    AttemptKey, AttemptStore, InMemoryAttemptStore, LoginAttemptState, LoginThrottle, StoreError,
    ThrottleDecision,
};

/// Store that refuses every call, standing in for an unreachable cache.
struct UnavailableStore;

impl AttemptStore for UnavailableStore {
    fn update(
        &self,
        _key: &AttemptKey,
        _now: DateTime<Utc>,
        _apply: &mut dyn FnMut(Option<LoginAttemptState>) -> Option<LoginAttemptState>,
    ) -> Result<Option<LoginAttemptState>, StoreError> {
        Err(StoreError::Unavailable("cache offline".to_string()))
    }

    fn fetch(
        &self,
        _key: &AttemptKey,
        _now: DateTime<Utc>,
    ) -> Result<Option<LoginAttemptState>, StoreError> {
        Err(StoreError::Unavailable("cache offline".to_string()))
    }

    fn clear(&self, _key: &AttemptKey) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("cache offline".to_string()))
    }
}

#[test]
fn store_errors_propagate_to_the_caller() {
    let throttle = LoginThrottle::new(Arc::new(UnavailableStore), ThrottleConfig::default());
    let key = AttemptKey::new("chipo@example.com", "203.0.113.9");
    let now = Utc::now();

    assert!(throttle.check(&key, now).is_err());
    assert!(throttle.record_failure(&key, now).is_err());
    assert!(throttle.record_success(&key).is_err());
}

#[test]
fn concurrent_failures_are_all_counted() {
    let config = ThrottleConfig {
        max_attempts: 1000,
        ..ThrottleConfig::default()
    };
    let throttle = Arc::new(LoginThrottle::new(
        Arc::new(InMemoryAttemptStore::new(config.lockout)),
        config,
    ));
    let key = AttemptKey::new("chipo@example.com", "203.0.113.9");
    let now = Utc::now();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let throttle = throttle.clone();
            let key = key.clone();
            std::thread::spawn(move || {
                for _ in 0..50 {
                    throttle.record_failure(&key, now).expect("store ok");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker finished");
    }

    assert_eq!(
        throttle.check(&key, now).expect("store ok"),
        ThrottleDecision::Accumulating { count: 400 }
    );
}
