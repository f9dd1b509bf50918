//! Latest-value sources for compass heading, step count and time.
//!
//! The host's compass and pedometer callbacks publish into these from
//! whatever thread they run on; the tracker only ever reads the latest value.
//! Reads and writes are single atomic operations and never block.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::types::AuxiliaryReading;

/// Latest compass heading.
pub trait HeadingProvider: Send + Sync {
    /// Heading in radians, or `None` before the compass has reported.
    fn latest_heading(&self) -> Option<f32>;
}

/// Latest pedometer count.
pub trait StepCountProvider: Send + Sync {
    /// Steps since tracking started, or `None` without a pedometer.
    fn latest_step_count(&self) -> Option<u64>;
}

/// Monotonic millisecond clock.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Heading published by the host. Stored as `f32` bits; NaN means unset.
#[derive(Debug)]
pub struct LatestHeading {
    bits: AtomicU32,
}

impl LatestHeading {
    pub fn new() -> Self {
        Self {
            bits: AtomicU32::new(f32::NAN.to_bits()),
        }
    }

    /// Publish a new heading. Non-finite values clear it.
    pub fn publish(&self, heading_rad: f32) {
        let value = if heading_rad.is_finite() { heading_rad } else { f32::NAN };
        self.bits.store(value.to_bits(), Ordering::Release);
    }

    pub fn clear(&self) {
        self.bits.store(f32::NAN.to_bits(), Ordering::Release);
    }
}

impl Default for LatestHeading {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadingProvider for LatestHeading {
    fn latest_heading(&self) -> Option<f32> {
        let value = f32::from_bits(self.bits.load(Ordering::Acquire));
        if value.is_nan() {
            None
        } else {
            Some(value)
        }
    }
}

/// Step count published by the host. `u64::MAX` means unset.
#[derive(Debug)]
pub struct LatestStepCount {
    count: AtomicU64,
}

impl LatestStepCount {
    const UNSET: u64 = u64::MAX;

    pub fn new() -> Self {
        Self {
            count: AtomicU64::new(Self::UNSET),
        }
    }

    /// Publish a new count. Counts never go backwards; a lower value than
    /// the one stored is ignored.
    pub fn publish(&self, steps: u64) {
        let steps = steps.min(Self::UNSET - 1);
        let _ = self
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                if current == Self::UNSET || steps > current {
                    Some(steps)
                } else {
                    None
                }
            });
    }

    pub fn clear(&self) {
        self.count.store(Self::UNSET, Ordering::Release);
    }
}

impl Default for LatestStepCount {
    fn default() -> Self {
        Self::new()
    }
}

impl StepCountProvider for LatestStepCount {
    fn latest_step_count(&self) -> Option<u64> {
        match self.count.load(Ordering::Acquire) {
            Self::UNSET => None,
            steps => Some(steps),
        }
    }
}

/// Milliseconds since the clock was created.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Clock advanced by hand, for replay and tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: AtomicU64::new(start_ms),
        }
    }

    pub fn set(&self, now_ms: u64) {
        self.now.store(now_ms, Ordering::Release);
    }

    pub fn advance(&self, delta_ms: u64) {
        self.now.fetch_add(delta_ms, Ordering::AcqRel);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::Acquire)
    }
}

/// The three auxiliary inputs a tracker reads on every ingest.
#[derive(Clone)]
pub struct SensorFeeds {
    pub heading: Arc<dyn HeadingProvider>,
    pub steps: Arc<dyn StepCountProvider>,
    pub clock: Arc<dyn Clock>,
}

impl SensorFeeds {
    pub fn new(
        heading: Arc<dyn HeadingProvider>,
        steps: Arc<dyn StepCountProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            heading,
            steps,
            clock,
        }
    }

    /// Fresh unset heading and step publishers on a monotonic clock.
    pub fn standalone() -> (Self, Arc<LatestHeading>, Arc<LatestStepCount>) {
        let heading = Arc::new(LatestHeading::new());
        let steps = Arc::new(LatestStepCount::new());
        let feeds = Self::new(heading.clone(), steps.clone(), Arc::new(MonotonicClock::new()));
        (feeds, heading, steps)
    }

    /// Snapshot all three inputs.
    pub fn read(&self) -> AuxiliaryReading {
        AuxiliaryReading::new(
            self.heading.latest_heading(),
            self.steps.latest_step_count(),
            self.clock.now_ms(),
        )
    }
}

impl std::fmt::Debug for SensorFeeds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorFeeds").field("reading", &self.read()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_unset_until_published() {
        let heading = LatestHeading::new();
        assert_eq!(heading.latest_heading(), None);

        heading.publish(1.25);
        assert_eq!(heading.latest_heading(), Some(1.25));

        heading.publish(f32::INFINITY);
        assert_eq!(heading.latest_heading(), None);
    }

    #[test]
    fn test_steps_never_decrease() {
        let steps = LatestStepCount::new();
        assert_eq!(steps.latest_step_count(), None);

        steps.publish(5);
        steps.publish(3);
        assert_eq!(steps.latest_step_count(), Some(5));

        steps.publish(0);
        assert_eq!(steps.latest_step_count(), Some(5));

        steps.clear();
        steps.publish(0);
        assert_eq!(steps.latest_step_count(), Some(0));
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(100);
        clock.advance(50);
        assert_eq!(clock.now_ms(), 150);
        clock.set(10);
        assert_eq!(clock.now_ms(), 10);
    }

    #[test]
    fn test_feeds_read() {
        let heading = Arc::new(LatestHeading::new());
        let steps = Arc::new(LatestStepCount::new());
        let clock = Arc::new(ManualClock::new(2_000));
        let feeds = SensorFeeds::new(heading.clone(), steps.clone(), clock.clone());

        let empty = feeds.read();
        assert_eq!(empty.heading_rad, None);
        assert_eq!(empty.step_count, None);
        assert_eq!(empty.timestamp_ms, 2_000);

        heading.publish(0.5);
        steps.publish(7);
        clock.advance(100);
        let reading = feeds.read();
        assert_eq!(reading.heading_rad, Some(0.5));
        assert_eq!(reading.step_count, Some(7));
        assert_eq!(reading.timestamp_ms, 2_100);
    }

    #[test]
    fn test_publish_from_other_thread() {
        let heading = Arc::new(LatestHeading::new());
        let publisher = heading.clone();
        std::thread::spawn(move || publisher.publish(-0.75))
            .join()
            .unwrap();
        assert_eq!(heading.latest_heading(), Some(-0.75));
    }
}
