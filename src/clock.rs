//! Time source used for dispatch windows and settle waits.

use std::time::{Duration, SystemTime};

pub trait Clock {
    fn now(&self) -> SystemTime;

    /// Block for the given duration.
    fn sleep(&self, duration: Duration);
}

/// Wall clock with real, blocking sleeps.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[cfg(any(test, feature = "sim"))]
pub use manual::ManualClock;

#[cfg(any(test, feature = "sim"))]
mod manual {
    use std::{
        cell::RefCell,
        rc::Rc,
        time::{Duration, SystemTime},
    };

    use super::Clock;

    /// A clock that never blocks. Sleeping advances the time and is recorded.
    ///
    /// Clones share the same time line, so a test can keep one and hand the other to a controller.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        inner: Rc<RefCell<Inner>>,
    }

    #[derive(Debug)]
    struct Inner {
        now: SystemTime,
        sleeps: Vec<Duration>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self::starting_at(SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000))
        }

        pub fn starting_at(now: SystemTime) -> Self {
            Self {
                inner: Rc::new(RefCell::new(Inner {
                    now,
                    sleeps: Vec::new(),
                })),
            }
        }

        /// Move time forward without recording a sleep.
        pub fn advance(&self, by: Duration) {
            self.inner.borrow_mut().now += by;
        }

        /// Every sleep requested so far, in order.
        pub fn sleeps(&self) -> Vec<Duration> {
            self.inner.borrow().sleeps.clone()
        }
    }

    impl Default for ManualClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> SystemTime {
            self.inner.borrow().now
        }

        fn sleep(&self, duration: Duration) {
            let mut inner = self.inner.borrow_mut();
            inner.now += duration;
            inner.sleeps.push(duration);
        }
    }
}
