//! Environment abstraction for deterministic testing.
//!
//! Decouples synchronization logic from the system clock. Production uses
//! real time; simulation uses a virtual clock that tests advance explicitly,
//! which is what makes debounce timing reproducible.

use std::time::Duration;

/// Abstract environment providing time and async sleeping.
///
/// # Invariants
///
/// - `now()` never goes backwards
pub trait Environment: Clone + Send + Sync + 'static {
    /// The instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`; simulation
    /// environments hand out instants from a virtual clock.
    type Instant: Copy + Ord + Send + Sync + std::fmt::Debug + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// Only driver code awaits this; the state machines never sleep.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;
}

/// Manually driven environment for unit tests.
pub mod test_utils {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicU64, Ordering},
        },
        time::{Duration, Instant},
    };

    use super::Environment;

    /// Clock that only moves when told to.
    ///
    /// Clones share the same clock. `sleep` advances the clock instead of
    /// waiting.
    #[derive(Debug, Clone)]
    pub struct MockEnv {
        base: Instant,
        elapsed_nanos: Arc<AtomicU64>,
    }

    impl Default for MockEnv {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockEnv {
        /// Create a clock at elapsed zero.
        pub fn new() -> Self {
            Self { base: Instant::now(), elapsed_nanos: Arc::new(AtomicU64::new(0)) }
        }

        /// Move the clock forward.
        pub fn advance(&self, duration: Duration) {
            let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
            self.elapsed_nanos.fetch_add(nanos, Ordering::SeqCst);
        }

        /// Time since the clock was created.
        pub fn elapsed(&self) -> Duration {
            Duration::from_nanos(self.elapsed_nanos.load(Ordering::SeqCst))
        }
    }

    impl Environment for MockEnv {
        type Instant = Instant;

        fn now(&self) -> Instant {
            self.base + self.elapsed()
        }

        fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
            self.advance(duration);
            std::future::ready(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn clones_share_the_clock() {
            let env = MockEnv::new();
            let other = env.clone();
            let t0 = env.now();

            other.advance(Duration::from_millis(1500));

            assert_eq!(env.now() - t0, Duration::from_millis(1500));
        }
    }
}
