//! Time source abstraction so token lifetimes and login timestamps are testable.

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Test doubles.
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Clock pinned to an instant; can be moved forward by tests.
    #[derive(Debug)]
    pub struct FixedClock {
        instant: Mutex<DateTime<Utc>>,
    }

    impl FixedClock {
        pub fn new(instant: DateTime<Utc>) -> Self {
            Self {
                instant: Mutex::new(instant),
            }
        }

        pub fn set(&self, instant: DateTime<Utc>) {
            if let Ok(mut guard) = self.instant.lock() {
                *guard = instant;
            }
        }

        pub fn advance(&self, by: chrono::Duration) {
            if let Ok(mut guard) = self.instant.lock() {
                *guard += by;
            }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            match self.instant.lock() {
                Ok(guard) => *guard,
                Err(poisoned) => *poisoned.into_inner(),
            }
        }
    }
}
