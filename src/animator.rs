//! Display-rate animation of the bearing indicator.
//!
//! Ranging updates arrive irregularly (anywhere from 1 to 20 Hz). The
//! indicator is redrawn on a fixed display clock, typically 60 Hz, and each
//! frame [`BearingAnimator::tick`] moves the displayed bearing a fraction of
//! the way toward the latest target. Large gaps close quickly, small ones
//! slowly so the arrow does not shiver when nearly aligned.
//!
//! [`AlignmentMonitor`] turns "the tag is now ahead" into a single discrete
//! event for haptics.

use serde::{Deserialize, Serialize};

use crate::angle::{normalize_angle, shortest_angular_difference};
use crate::error::{check_factor, check_ordered, check_positive, ConfigError};
use crate::types::AlignmentEvent;

/// Damping schedule for the animator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimatorConfig {
    /// Gaps above this (rad) use `fast_damping`.
    pub large_gap_rad: f32,
    /// Gaps above this (rad) and up to `large_gap_rad` use `medium_damping`.
    pub medium_gap_rad: f32,
    /// Fraction of a large gap closed per frame.
    pub fast_damping: f32,
    /// Fraction of a medium gap closed per frame.
    pub medium_damping: f32,
    /// Fraction of a small gap closed per frame.
    pub slow_damping: f32,
    /// Refresh rate the host should schedule `tick` at (Hz). A hint for the
    /// host's display timer; damping is per frame and ignores it.
    pub frame_rate_hz: f32,
}

impl Default for AnimatorConfig {
    fn default() -> Self {
        Self {
            large_gap_rad: 0.5,
            medium_gap_rad: 0.2,
            fast_damping: 0.30,
            medium_damping: 0.22,
            slow_damping: 0.15,
            frame_rate_hz: 60.0,
        }
    }
}

impl AnimatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("medium_gap_rad", self.medium_gap_rad)?;
        check_ordered(
            "medium_gap_rad",
            self.medium_gap_rad,
            "large_gap_rad",
            self.large_gap_rad,
        )?;
        check_factor("fast_damping", self.fast_damping)?;
        check_factor("medium_damping", self.medium_damping)?;
        check_factor("slow_damping", self.slow_damping)?;
        check_positive("frame_rate_hz", self.frame_rate_hz)?;
        Ok(())
    }

    /// Damping factor for a gap of `abs_gap` radians.
    pub fn damping_for(&self, abs_gap: f32) -> f32 {
        if abs_gap > self.large_gap_rad {
            self.fast_damping
        } else if abs_gap > self.medium_gap_rad {
            self.medium_damping
        } else {
            self.slow_damping
        }
    }

    /// Timer period in milliseconds for a host scheduling `tick` at
    /// `frame_rate_hz`.
    pub fn frame_interval_ms(&self) -> u64 {
        (1000.0 / self.frame_rate_hz).round() as u64
    }
}

/// Chases a moving target bearing, one frame at a time.
#[derive(Debug, Clone)]
pub struct BearingAnimator {
    config: AnimatorConfig,
    displayed: f32,
    target: f32,
    frames: u64,
}

impl BearingAnimator {
    pub fn new(config: AnimatorConfig) -> Self {
        Self {
            config,
            displayed: 0.0,
            target: 0.0,
            frames: 0,
        }
    }

    /// Set the bearing to chase.
    pub fn set_target(&mut self, bearing: f32) {
        self.target = normalize_angle(bearing);
    }

    /// Jump straight to `bearing` with no animation.
    pub fn snap_to(&mut self, bearing: f32) {
        let bearing = normalize_angle(bearing);
        self.target = bearing;
        self.displayed = bearing;
    }

    /// Advance one display frame and return the bearing to draw.
    pub fn tick(&mut self) -> f32 {
        let diff = shortest_angular_difference(self.displayed, self.target);
        let damping = self.config.damping_for(diff.abs());
        self.displayed = normalize_angle(self.displayed + diff * damping);
        self.frames += 1;
        self.displayed
    }

    pub fn displayed(&self) -> f32 {
        self.displayed
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    /// Absolute gap between what is shown and what is chased.
    pub fn gap(&self) -> f32 {
        shortest_angular_difference(self.displayed, self.target).abs()
    }

    /// Frames ticked since creation or reset.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn config(&self) -> &AnimatorConfig {
        &self.config
    }

    pub fn reset(&mut self) {
        self.displayed = 0.0;
        self.target = 0.0;
        self.frames = 0;
    }
}

impl Default for BearingAnimator {
    fn default() -> Self {
        Self::new(AnimatorConfig::default())
    }
}

/// Thresholds for the alignment event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    /// A target closer to ahead than this (rad) counts as aligned.
    pub aligned_threshold_rad: f32,
    /// The event only fires if the displayed bearing lagged the target by
    /// more than this (rad) when alignment was reached.
    pub min_swing_rad: f32,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            aligned_threshold_rad: 0.17,
            min_swing_rad: 0.15,
        }
    }
}

impl AlignmentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("aligned_threshold_rad", self.aligned_threshold_rad)?;
        check_positive("min_swing_rad", self.min_swing_rad)?;
        Ok(())
    }
}

/// Edge detector for "tag is now ahead".
///
/// Fires at most once per entry into alignment. Leaving alignment re-arms it.
#[derive(Debug, Clone)]
pub struct AlignmentMonitor {
    config: AlignmentConfig,
    aligned: bool,
}

impl AlignmentMonitor {
    pub fn new(config: AlignmentConfig) -> Self {
        Self {
            config,
            aligned: false,
        }
    }

    /// Feed the current target and displayed bearing.
    pub fn update(&mut self, target: f32, displayed: f32) -> Option<AlignmentEvent> {
        let now_aligned = target.abs() < self.config.aligned_threshold_rad;
        let gap = shortest_angular_difference(displayed, target).abs();

        let event = if now_aligned && !self.aligned && gap > self.config.min_swing_rad {
            Some(AlignmentEvent {
                target_bearing: target,
                gap_rad: gap,
            })
        } else {
            None
        };

        self.aligned = now_aligned;
        event
    }

    pub fn is_aligned(&self) -> bool {
        self.aligned
    }

    pub fn reset(&mut self) {
        self.aligned = false;
    }
}

impl Default for AlignmentMonitor {
    fn default() -> Self {
        Self::new(AlignmentConfig::default())
    }
}
