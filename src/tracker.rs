//! Per-peer bearing tracker.
//!
//! Wires the estimator, the display animator and the alignment monitor
//! together for one tracked tag. Two independent triggers drive it:
//! - the ranging session calls [`PeerTracker::ingest`] whenever an update
//!   arrives (irregular, 1-20 Hz),
//! - the display clock calls [`PeerTracker::tick`] once per frame (~60 Hz).
//!
//! `PeerTracker` itself is a plain `&mut self` state machine. When both
//! triggers live on different threads, wrap it in
//! [`crate::session::SharedTracker`].

use serde::{Deserialize, Serialize};

use crate::animator::{AlignmentConfig, AlignmentMonitor, AnimatorConfig, BearingAnimator};
use crate::error::ConfigError;
use crate::estimator::{AngleEstimator, EstimatorConfig};
use crate::fusion::{FusionCacheEntry, FusionConfig};
use crate::types::{
    AlignmentEvent, AuxiliaryReading, DirectionHint, Estimate, RangingUpdate, SignalQuality, TickUpdate,
    TrackerUpdate,
};

/// Configuration for a complete tracker.
///
/// Bundles all sub-component configurations into a single package. Every
/// field falls back to its default when omitted from JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Validation, filtering and smoothing of direction samples.
    pub estimator: EstimatorConfig,
    /// Fallback when the ranging signal drops out.
    pub fusion: FusionConfig,
    /// Display-rate damping.
    pub animator: AnimatorConfig,
    /// Alignment event thresholds.
    pub alignment: AlignmentConfig,
}

impl TrackerConfig {
    /// Check every sub-configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.estimator.validate()?;
        self.fusion.validate()?;
        self.animator.validate()?;
        self.alignment.validate()?;
        Ok(())
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: TrackerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Diagnostic view of a tracker's state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackerSnapshot {
    pub peer_name: Option<String>,
    pub target_bearing: f32,
    pub displayed_bearing: f32,
    pub quality: SignalQuality,
    pub has_direction: bool,
    pub consecutive_misses: u32,
    pub history: Vec<f32>,
    pub cache: Option<FusionCacheEntry>,
    pub aligned: bool,
    pub hint: DirectionHint,
    pub distance_m: Option<f32>,
    pub frames: u64,
}

/// Bearing tracker for one peer.
#[derive(Debug, Clone)]
pub struct PeerTracker {
    estimator: AngleEstimator,
    animator: BearingAnimator,
    alignment: AlignmentMonitor,

    peer_name: Option<String>,
    distance_m: Option<f32>,
    last_estimate: Option<Estimate>,
}

impl PeerTracker {
    /// Creates a tracker with the given configuration.
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            estimator: AngleEstimator::new(config.estimator, config.fusion),
            animator: BearingAnimator::new(config.animator),
            alignment: AlignmentMonitor::new(config.alignment),
            peer_name: None,
            distance_m: None,
            last_estimate: None,
        }
    }

    /// Creates a tracker after validating the configuration.
    pub fn try_new(config: TrackerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Label shown for this peer.
    pub fn set_peer_name(&mut self, name: impl Into<String>) {
        self.peer_name = Some(name.into());
    }

    pub fn peer_name(&self) -> Option<&str> {
        self.peer_name.as_deref()
    }

    /// Feed one ranging update.
    pub fn ingest(&mut self, update: &RangingUpdate, aux: &AuxiliaryReading) -> TrackerUpdate {
        let estimate = self.estimator.ingest(update.sample.as_ref(), aux);
        self.publish(estimate, update.clamped_distance())
    }

    /// Feed a camera-assisted horizontal angle instead of a direction vector.
    pub fn ingest_horizontal_angle(
        &mut self,
        angle_rad: f32,
        distance_m: Option<f32>,
        aux: &AuxiliaryReading,
    ) -> TrackerUpdate {
        let estimate = self.estimator.ingest_horizontal_angle(angle_rad, aux);
        let distance = RangingUpdate {
            sample: None,
            distance_m,
        }
        .clamped_distance();
        self.publish(estimate, distance)
    }

    /// Advance the indicator by one display frame.
    pub fn tick(&mut self) -> TickUpdate {
        let displayed_bearing = self.animator.tick();
        let target_bearing = self.animator.target();
        let alignment_event = self.check_alignment(target_bearing, displayed_bearing);

        TickUpdate {
            displayed_bearing,
            target_bearing,
            aligned: self.alignment.is_aligned(),
            alignment_event,
        }
    }

    /// Back to the state of a freshly created tracker. The peer name is kept.
    pub fn reset(&mut self) {
        self.estimator.reset();
        self.animator.reset();
        self.alignment.reset();
        self.distance_m = None;
        self.last_estimate = None;
        log::info!(
            "tracking reset for {}",
            self.peer_name.as_deref().unwrap_or("unnamed peer")
        );
    }

    pub fn target_bearing(&self) -> f32 {
        self.estimator.target_bearing()
    }

    pub fn displayed_bearing(&self) -> f32 {
        self.animator.displayed()
    }

    /// Whether the last update carried a direction.
    pub fn has_direction(&self) -> bool {
        self.last_estimate.map(|e| e.has_direction).unwrap_or(false)
    }

    pub fn is_aligned(&self) -> bool {
        self.alignment.is_aligned()
    }

    pub fn distance_m(&self) -> Option<f32> {
        self.distance_m
    }

    pub fn estimator(&self) -> &AngleEstimator {
        &self.estimator
    }

    pub fn animator(&self) -> &BearingAnimator {
        &self.animator
    }

    /// Current state for diagnostics.
    pub fn snapshot(&self) -> TrackerSnapshot {
        let target_bearing = self.estimator.target_bearing();
        TrackerSnapshot {
            peer_name: self.peer_name.clone(),
            target_bearing,
            displayed_bearing: self.animator.displayed(),
            quality: self
                .last_estimate
                .map(|e| e.quality)
                .unwrap_or(SignalQuality::NoSignal),
            has_direction: self.has_direction(),
            consecutive_misses: self.estimator.consecutive_misses(),
            history: self.estimator.history().iter().collect(),
            cache: self.estimator.fusion_cache().entry().copied(),
            aligned: self.alignment.is_aligned(),
            hint: DirectionHint::from_bearing(target_bearing),
            distance_m: self.distance_m,
            frames: self.animator.frames(),
        }
    }

    fn publish(&mut self, estimate: Estimate, distance_m: Option<f32>) -> TrackerUpdate {
        let target = estimate.target_bearing;
        if estimate.first_fix {
            self.animator.snap_to(target);
        } else {
            self.animator.set_target(target);
        }

        let alignment_event = self.check_alignment(target, self.animator.displayed());

        self.distance_m = distance_m;
        self.last_estimate = Some(estimate);

        TrackerUpdate {
            estimate,
            displayed_bearing: self.animator.displayed(),
            aligned: self.alignment.is_aligned(),
            alignment_event,
            hint: DirectionHint::from_bearing(target),
            distance_m,
        }
    }

    /// Alignment is undefined until the first fix; the zero target of a
    /// fresh tracker is not a bearing.
    fn check_alignment(&mut self, target: f32, displayed: f32) -> Option<AlignmentEvent> {
        if self.estimator.is_first_update() {
            return None;
        }
        let event = self.alignment.update(target, displayed);
        if let Some(event) = &event {
            log::debug!("aligned with gap {:.2} rad", event.gap_rad);
        }
        event
    }
}

impl Default for PeerTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}
