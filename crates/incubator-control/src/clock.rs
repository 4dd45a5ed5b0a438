use std::time::Instant;

/// An injected monotonic clock.
///
/// The oxygen and CO₂ loops need to reason about "time since last
/// actuation", which must be controllable in tests without sleeping for
/// real cooldown periods (60 s, 15 s). Depending on a trait instead of
/// calling `Instant::now()` directly keeps that testable without reaching
/// for a global mockable-time crate.
pub trait Clock: Send {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Clock;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    pub struct FakeClock {
        now: Mutex<Instant>,
    }

    impl FakeClock {
        pub fn new() -> Self {
            Self {
                now: Mutex::new(Instant::now()),
            }
        }

        pub fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> Instant {
            *self.now.lock().unwrap()
        }
    }

    impl Clock for std::sync::Arc<FakeClock> {
        fn now(&self) -> Instant {
            self.as_ref().now()
        }
    }
}
