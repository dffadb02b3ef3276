//! Sliding-window lockout for repeated failed logins.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use domains::{DomainError, LoginThrottle, Result};
use tracing::warn;

/// Recorded failures between two sweeps of expired keys.
const SWEEP_EVERY: usize = 256;

/// Keeps failure timestamps per key in memory. State is lost on restart,
/// which only ever shortens a lockout. Keys whose failures have all aged
/// out of the window are dropped.
pub struct InMemoryLoginThrottle {
    failures: DashMap<String, Vec<Instant>>,
    max_attempts: usize,
    window: Duration,
    recorded: AtomicUsize,
}

impl InMemoryLoginThrottle {
    pub fn new(max_attempts: usize, window: Duration) -> Self {
        Self {
            failures: DashMap::new(),
            max_attempts: max_attempts.max(1),
            window,
            recorded: AtomicUsize::new(0),
        }
    }

    fn sweep(&self, now: Instant) {
        self.failures.retain(|_, history| {
            history.retain(|&at| now.duration_since(at) < self.window);
            !history.is_empty()
        });
    }
}

impl LoginThrottle for InMemoryLoginThrottle {
    fn check(&self, key: &str) -> Result<()> {
        let now = Instant::now();
        let Some(mut history) = self.failures.get_mut(key) else {
            return Ok(());
        };
        history.retain(|&at| now.duration_since(at) < self.window);
        if history.is_empty() {
            drop(history);
            self.failures.remove_if(key, |_, history| history.is_empty());
            return Ok(());
        }

        if history.len() >= self.max_attempts {
            warn!(key, attempts = history.len(), "login locked out");
            return Err(DomainError::RateLimitExceeded(format!(
                "too many failed logins, retry in {}s",
                self.window.as_secs()
            )));
        }
        Ok(())
    }

    fn record_failure(&self, key: &str) {
        let now = Instant::now();
        if self.recorded.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            self.sweep(now);
        }
        let mut history = self.failures.entry(key.to_string()).or_default();
        history.retain(|&at| now.duration_since(at) < self.window);
        history.push(now);
    }

    fn clear(&self, key: &str) {
        self.failures.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn locks_after_max_failures() {
        let throttle = InMemoryLoginThrottle::new(2, Duration::from_secs(60));
        assert!(throttle.check("alice").is_ok());

        throttle.record_failure("alice");
        assert!(throttle.check("alice").is_ok());
        throttle.record_failure("alice");

        let err = throttle.check("alice").unwrap_err();
        assert!(matches!(err, DomainError::RateLimitExceeded(_)));
        assert!(throttle.check("bob").is_ok());
    }

    #[test]
    fn clear_resets_and_window_expires() {
        let throttle = InMemoryLoginThrottle::new(1, Duration::from_millis(50));
        throttle.record_failure("alice");
        assert!(throttle.check("alice").is_err());

        throttle.clear("alice");
        assert!(throttle.check("alice").is_ok());

        throttle.record_failure("alice");
        thread::sleep(Duration::from_millis(80));
        assert!(throttle.check("alice").is_ok());
    }

    #[test]
    fn expired_keys_are_dropped_on_check() {
        let throttle = InMemoryLoginThrottle::new(3, Duration::from_millis(30));
        for i in 0..50 {
            throttle.record_failure(&format!("user{i}"));
        }
        assert_eq!(throttle.failures.len(), 50);

        thread::sleep(Duration::from_millis(60));
        for i in 0..50 {
            assert!(throttle.check(&format!("user{i}")).is_ok());
        }
        assert!(throttle.failures.is_empty());
    }

    #[test]
    fn keys_never_checked_again_are_swept() {
        let throttle = InMemoryLoginThrottle::new(3, Duration::from_millis(30));
        for i in 0..SWEEP_EVERY - 1 {
            throttle.record_failure(&format!("spray{i}"));
        }
        thread::sleep(Duration::from_millis(60));

        throttle.record_failure("fresh");
        assert_eq!(throttle.failures.len(), 1);
        assert!(throttle.failures.contains_key("fresh"));
    }
}
