//! Time and randomness as injected collaborators rather than ambient globals,
//! so tests can control both deterministically.

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub trait RandomSource: Send + Sync {
    fn new_id(&self) -> Uuid;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRandom;

impl RandomSource for SystemRandom {
    fn new_id(&self) -> Uuid {
        Uuid::new_v4()
    }
}

#[cfg(test)]
pub mod test_doubles {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Mutex;

    /// A clock that starts at a fixed instant and only advances when told to.
    pub struct FixedClock {
        millis: AtomicI64,
    }

    impl FixedClock {
        pub fn at(start: DateTime<Utc>) -> Self {
            FixedClock {
                millis: AtomicI64::new(start.timestamp_millis()),
            }
        }

        pub fn advance(&self, duration: chrono::Duration) {
            self.millis.fetch_add(duration.num_milliseconds(), Ordering::SeqCst);
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap()
        }
    }

    /// A random source that yields ids from a fixed, repeating sequence.
    pub struct SequentialIds {
        ids: Mutex<Vec<Uuid>>,
        next: AtomicI64,
    }

    impl SequentialIds {
        pub fn new(ids: Vec<Uuid>) -> Self {
            SequentialIds {
                ids: Mutex::new(ids),
                next: AtomicI64::new(0),
            }
        }
    }

    impl RandomSource for SequentialIds {
        fn new_id(&self) -> Uuid {
            let ids = self.ids.lock().unwrap();
            let idx = self.next.fetch_add(1, Ordering::SeqCst) as usize % ids.len().max(1);
            ids.get(idx).copied().unwrap_or_else(Uuid::nil)
        }
    }
}
