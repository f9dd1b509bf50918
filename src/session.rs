//! Thread-safe tracker handles and the per-peer registry.
//!
//! Ranging callbacks and the display clock usually fire on different threads.
//! Both touch the same tracker: ingest writes the target, tick reads it and
//! writes the displayed bearing. [`SharedTracker`] serialises them behind a
//! single mutex, and a reset holds that mutex for the whole clear so it can
//! never interleave with a half-finished ingest or tick.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::ConfigError;
use crate::providers::SensorFeeds;
use crate::tracker::{PeerTracker, TrackerConfig, TrackerSnapshot};
use crate::types::{RangingUpdate, TickUpdate, TrackerUpdate};

/// Identity of a ranging peer, e.g. its encoded discovery token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A tracker shared between the ranging callback and the display clock.
///
/// Cloning is cheap and every clone refers to the same tracker.
#[derive(Clone)]
pub struct SharedTracker {
    inner: Arc<Mutex<PeerTracker>>,
    feeds: SensorFeeds,
}

impl SharedTracker {
    pub fn new(tracker: PeerTracker, feeds: SensorFeeds) -> Self {
        Self {
            inner: Arc::new(Mutex::new(tracker)),
            feeds,
        }
    }

    /// Feed a ranging update, reading heading, steps and time from the feeds.
    pub fn ingest(&self, update: &RangingUpdate) -> TrackerUpdate {
        let mut tracker = self.lock();
        let aux = self.feeds.read();
        tracker.ingest(update, &aux)
    }

    /// Feed a camera-assisted horizontal angle.
    pub fn ingest_horizontal_angle(&self, angle_rad: f32, distance_m: Option<f32>) -> TrackerUpdate {
        let mut tracker = self.lock();
        let aux = self.feeds.read();
        tracker.ingest_horizontal_angle(angle_rad, distance_m, &aux)
    }

    /// Advance one display frame.
    pub fn tick(&self) -> TickUpdate {
        self.lock().tick()
    }

    /// Clear all tracking state in one step.
    pub fn reset(&self) {
        self.lock().reset();
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        self.lock().snapshot()
    }

    /// Run `f` with exclusive access to the tracker.
    pub fn with_tracker<R>(&self, f: impl FnOnce(&mut PeerTracker) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn feeds(&self) -> &SensorFeeds {
        &self.feeds
    }

    fn lock(&self) -> MutexGuard<'_, PeerTracker> {
        // Every tracker field is valid after any partial update.
        self.inner.lock().unwrap_or_else(|poisoned| {
            log::warn!("tracker lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

impl fmt::Debug for SharedTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedTracker")
            .field("feeds", &self.feeds)
            .finish_non_exhaustive()
    }
}

/// All trackers for the current session, keyed by peer.
#[derive(Debug)]
pub struct TrackerRegistry {
    config: TrackerConfig,
    feeds: SensorFeeds,
    trackers: HashMap<PeerId, SharedTracker>,
}

impl TrackerRegistry {
    /// Creates an empty registry. The configuration is validated once here
    /// and reused for every tracker.
    pub fn new(config: TrackerConfig, feeds: SensorFeeds) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            feeds,
            trackers: HashMap::new(),
        })
    }

    /// Tracker for `peer`, created on first use. `name` replaces any
    /// previous display name.
    pub fn track(&mut self, peer: PeerId, name: impl Into<String>) -> SharedTracker {
        let name = name.into();
        let config = &self.config;
        let feeds = &self.feeds;
        let shared = self
            .trackers
            .entry(peer.clone())
            .or_insert_with(|| {
                log::info!("tracking new peer {}", peer);
                SharedTracker::new(PeerTracker::new(config.clone()), feeds.clone())
            })
            .clone();
        shared.with_tracker(|tracker| tracker.set_peer_name(name));
        shared
    }

    pub fn get(&self, peer: &PeerId) -> Option<SharedTracker> {
        self.trackers.get(peer).cloned()
    }

    /// Stop tracking `peer`. Outstanding handles stay usable.
    pub fn remove(&mut self, peer: &PeerId) -> Option<SharedTracker> {
        self.trackers.remove(peer)
    }

    /// Reset every tracker, e.g. when the direction view is re-entered.
    pub fn reset_all(&self) {
        for tracker in self.trackers.values() {
            tracker.reset();
        }
    }

    pub fn peers(&self) -> impl Iterator<Item = &PeerId> {
        self.trackers.keys()
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }
}
