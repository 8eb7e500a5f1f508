//! Time source abstraction for testability.
//!
//! Sessions read the wall clock (for the info view) and measure connection
//! durations through a `TimeSource`, so tests can drive both without
//! waiting on real time.

use chrono::{DateTime, Local, TimeDelta, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Abstraction over time-related operations.
pub trait TimeSource: Send + Sync + std::fmt::Debug {
    /// Get the current instant for measuring elapsed time.
    fn now(&self) -> Instant;

    /// Current wall-clock time in the server's local timezone.
    fn wall_clock(&self) -> DateTime<Local>;

    /// Calculate elapsed time since an earlier instant.
    fn elapsed_since(&self, earlier: Instant) -> Duration {
        self.now().saturating_duration_since(earlier)
    }
}

/// Type alias for shared time source.
pub type SharedTimeSource = Arc<dyn TimeSource>;

/// Production implementation using actual system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealTimeSource;

impl RealTimeSource {
    pub fn new() -> Self {
        Self
    }

    /// Create a shared RealTimeSource.
    pub fn shared() -> SharedTimeSource {
        Arc::new(Self)
    }
}

impl TimeSource for RealTimeSource {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall_clock(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// 2023-11-14 22:13:20 UTC
const TEST_EPOCH_SECS: i64 = 1_700_000_000;

/// Test implementation with controllable time.
///
/// - `now()` returns a logical instant based on an internal counter
/// - `wall_clock()` starts at a fixed date and moves with the same counter
/// - Time only moves when `advance()` is called
#[derive(Debug)]
pub struct TestTimeSource {
    /// Logical time in nanoseconds since creation.
    logical_nanos: AtomicU64,
    /// Base instant (real time at creation, used for Instant arithmetic).
    base_instant: Instant,
    /// Wall-clock time at logical zero.
    base_wall: DateTime<Local>,
}

impl Default for TestTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TestTimeSource {
    /// Create a new TestTimeSource with logical time starting at zero.
    pub fn new() -> Self {
        let base_wall = DateTime::<Utc>::from_timestamp(TEST_EPOCH_SECS, 0)
            .unwrap_or_default()
            .with_timezone(&Local);
        Self {
            logical_nanos: AtomicU64::new(0),
            base_instant: Instant::now(),
            base_wall,
        }
    }

    /// Create a shared TestTimeSource.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Advance logical time by the given duration.
    pub fn advance(&self, duration: Duration) {
        self.logical_nanos
            .fetch_add(duration.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Get the logical elapsed time since creation.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.logical_nanos.load(Ordering::SeqCst))
    }
}

impl TimeSource for TestTimeSource {
    fn now(&self) -> Instant {
        self.base_instant + self.elapsed()
    }

    fn wall_clock(&self) -> DateTime<Local> {
        let elapsed = TimeDelta::from_std(self.elapsed()).unwrap_or_else(|_| TimeDelta::zero());
        self.base_wall + elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_real_time_source_advances() {
        let time = RealTimeSource::new();
        let start = time.now();
        std::thread::sleep(Duration::from_millis(5));
        assert!(time.elapsed_since(start) >= Duration::from_millis(5));
    }

    #[test]
    fn test_time_only_moves_on_advance() {
        let time = TestTimeSource::new();
        let start = time.now();
        let wall = time.wall_clock();

        assert_eq!(time.elapsed_since(start), Duration::ZERO);
        assert_eq!(time.wall_clock(), wall);

        time.advance(Duration::from_secs(90));

        assert_eq!(time.elapsed_since(start), Duration::from_secs(90));
        assert_eq!(time.wall_clock() - wall, TimeDelta::seconds(90));
    }

    #[test]
    fn test_shared_time_source_is_object_safe() {
        let test = TestTimeSource::shared();
        let shared: SharedTimeSource = test.clone();

        test.advance(Duration::from_secs(1));
        assert_eq!(test.elapsed(), Duration::from_secs(1));
        assert_eq!(
            shared.wall_clock().timestamp(),
            TEST_EPOCH_SECS + 1
        );
    }
}
