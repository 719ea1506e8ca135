use std::thread;
use std::time::{Duration, Instant};

/// Time source for the simulator's timed instrument phases (boot, port
/// cleaning, the measurement countdown).
///
/// Sessions schedule completions against `now()`; `sleep()` is how scripted
/// runs let wall time pass (simulated clocks advance without blocking).
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);
}

/// Real-time clock backed by `std::time::Instant`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

/// Millisecond timeline started when a session boots, used to stamp
/// measurement results. `Instant` is opaque; results carry a number.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    epoch: Instant,
}

impl Stopwatch {
    pub fn start(clock: &impl Clock) -> Self {
        Self { epoch: clock.now() }
    }

    /// Milliseconds elapsed on the given clock, saturating at 0 on underflow.
    pub fn elapsed_ms(&self, clock: &impl Clock) -> u64 {
        clock.now().saturating_duration_since(self.epoch).as_millis() as u64
    }
}

/// Manually advanced clock for driving instrument phases in tests.
///
/// Lives outside `cfg(test)` so downstream crates can use it in their own
/// integration tests.
pub mod test_clock {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Clock whose current instant only moves when told to.
    ///
    /// Clones share the same instant, so a copy handed to a session stays in
    /// step with the one the test advances. `sleep` advances instead of
    /// blocking.
    #[derive(Debug, Clone)]
    pub struct TestClock {
        now: Arc<Mutex<Instant>>,
    }

    impl Default for TestClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestClock {
        pub fn new() -> Self {
            Self {
                now: Arc::new(Mutex::new(Instant::now())),
            }
        }

        /// Move time forward by `d`.
        pub fn advance(&self, d: Duration) {
            if let Ok(mut now) = self.now.lock() {
                *now += d;
            }
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            self.now.lock().map(|g| *g).unwrap_or_else(|_| Instant::now())
        }

        fn sleep(&self, d: Duration) {
            self.advance(d);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_clock::TestClock;
    use super::*;

    #[test]
    fn stopwatch_tracks_the_clock_it_was_started_on() {
        let clock = TestClock::new();
        let watch = Stopwatch::start(&clock);
        assert_eq!(watch.elapsed_ms(&clock), 0);

        clock.advance(Duration::from_millis(2500));
        assert_eq!(watch.elapsed_ms(&clock), 2500);
    }

    #[test]
    fn test_clock_clones_share_time() {
        let clock = TestClock::new();
        let other = clock.clone();
        let before = other.now();

        clock.sleep(Duration::from_secs(3));
        assert_eq!(other.now() - before, Duration::from_secs(3));
    }
}
