//! Time source abstraction.
//!
//! Production code reads `Utc::now()` through [`Clock`] so tests can freeze
//! or advance time without sleeping; the scheduler loop also goes through
//! here for its interval/daily wakeups.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};

#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    async fn sleep_until(&self, when: DateTime<Utc>) {
        let delta = when - self.now();
        if let Ok(std_dur) = delta.to_std() {
            tokio::time::sleep(std_dur).await;
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A fixed or manually-advanced clock for deterministic tests.
#[derive(Clone)]
pub struct FrozenClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl FrozenClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut guard = self.now.lock().expect("clock mutex poisoned");
        *guard = *guard + delta;
    }

    pub fn set(&self, when: DateTime<Utc>) {
        *self.now.lock().expect("clock mutex poisoned") = when;
    }
}

#[async_trait]
impl Clock for FrozenClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock mutex poisoned")
    }

    async fn sleep_until(&self, when: DateTime<Utc>) {
        self.set(when);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frozen_clock_advances_by_delta() {
        let start = Utc::now();
        let clock = FrozenClock::new(start);
        clock.advance(chrono::Duration::hours(1));
        assert_eq!(clock.now(), start + chrono::Duration::hours(1));
    }
}
