// tests/harness/virtual_clock.rs
//
// Controllable clock for the Date header of rendered messages.

use chrono::{DateTime, Duration, Utc};
use spam_stress::Clock;
use std::sync::{Arc, RwLock};

/// A clock that can be controlled for testing.
/// Thread-safe via Arc<RwLock<...>>.
#[derive(Clone)]
pub struct VirtualClock {
    inner: Arc<RwLock<DateTime<Utc>>>,
}

impl VirtualClock {
    /// Create a virtual clock set to a fixed, well-known instant.
    pub fn new() -> Self {
        Self::at(
            DateTime::parse_from_rfc3339("2024-01-15T10:00:00+00:00")
                .unwrap()
                .with_timezone(&Utc),
        )
    }

    /// Create a virtual clock set to a specific time.
    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(time)),
        }
    }

    /// Advance time by the given duration.
    pub fn advance(&self, duration: Duration) {
        let mut guard = self.inner.write().unwrap();
        *guard += duration;
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.inner.read().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_is_fixed_until_advanced() {
        let clock = VirtualClock::new();
        let first = clock.now();
        assert_eq!(clock.now(), first);

        clock.advance(Duration::minutes(5));
        assert_eq!(clock.now(), first + Duration::minutes(5));
    }

    #[test]
    fn test_clones_share_time() {
        let clock = VirtualClock::new();
        let other = clock.clone();
        clock.advance(Duration::seconds(1));
        assert_eq!(clock.now(), other.now());
    }
}
