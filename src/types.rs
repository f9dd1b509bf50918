//! Core data types for the bearing pipeline.
//!
//! Raw ranging input (`RangingUpdate`, `AuxiliaryReading`) flows in, and the
//! per-update and per-frame results (`TrackerUpdate`, `TickUpdate`) flow out.
//!
//! Angles are `f32` radians in (-π, π] unless a name says otherwise.
//! 0 is straight ahead, +π/2 is to the right, -π/2 to the left, π behind.

use std::fmt;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::angle::rad_to_deg;

/// A single direction reading from the UWB ranging peer.
///
/// The vector is in the peer's local frame: x = right, y = up, z = backward.
/// Its length is not a unit length; it is the ranging stack's confidence in
/// the direction and is what quality classification looks at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionSample {
    /// Raw direction vector.
    pub direction: Vector3<f32>,
}

impl DirectionSample {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            direction: Vector3::new(x, y, z),
        }
    }

    /// Length of the raw direction vector.
    pub fn magnitude(&self) -> f32 {
        self.direction.norm()
    }
}

/// One update from the ranging session for a single peer.
///
/// Direction and distance arrive independently; either may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RangingUpdate {
    /// Direction this cycle, if the ranging stack produced one.
    pub sample: Option<DirectionSample>,
    /// Distance to the peer in metres.
    pub distance_m: Option<f32>,
}

impl RangingUpdate {
    /// An update with a direction and no distance.
    pub fn direction(x: f32, y: f32, z: f32) -> Self {
        Self {
            sample: Some(DirectionSample::new(x, y, z)),
            distance_m: None,
        }
    }

    /// An update with neither direction nor distance.
    pub fn missing() -> Self {
        Self::default()
    }

    /// Attach a distance reading.
    pub fn with_distance(mut self, distance_m: f32) -> Self {
        self.distance_m = Some(distance_m);
        self
    }

    /// Distance clamped to be non-negative; non-finite readings are dropped.
    pub fn clamped_distance(&self) -> Option<f32> {
        self.distance_m
            .filter(|d| d.is_finite())
            .map(|d| d.max(0.0))
    }
}

/// How far a sample can be trusted, judged from its vector magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalQuality {
    /// Absent, or too weak to carry a direction.
    NoSignal,
    /// Usable but noisy; smoothed conservatively.
    Low,
    /// Strong reading; smoothed aggressively.
    High,
}

impl SignalQuality {
    /// Classify a vector magnitude.
    ///
    /// Both thresholds are strict: a magnitude exactly at `min_signal` is
    /// `NoSignal`, exactly at `high_quality` is `Low`. Non-finite magnitudes
    /// are `NoSignal`.
    pub fn classify(magnitude: f32, min_signal: f32, high_quality: f32) -> Self {
        if !magnitude.is_finite() || magnitude <= min_signal {
            SignalQuality::NoSignal
        } else if magnitude > high_quality {
            SignalQuality::High
        } else {
            SignalQuality::Low
        }
    }

    /// Whether this reading carries a usable direction.
    pub fn is_usable(&self) -> bool {
        !matches!(self, SignalQuality::NoSignal)
    }
}

/// Heading, step count and time read from the device at ingest time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AuxiliaryReading {
    /// Latest compass heading in radians, if the compass has produced one.
    pub heading_rad: Option<f32>,
    /// Steps since tracking started, if a pedometer is available.
    pub step_count: Option<u64>,
    /// Monotonic timestamp in milliseconds.
    pub timestamp_ms: u64,
}

impl AuxiliaryReading {
    /// Creates a reading.
    pub fn new(heading_rad: Option<f32>, step_count: Option<u64>, timestamp_ms: u64) -> Self {
        Self {
            heading_rad,
            step_count,
            timestamp_ms,
        }
    }

    /// A reading with only a timestamp; no compass and no pedometer.
    pub fn at(timestamp_ms: u64) -> Self {
        Self::new(None, None, timestamp_ms)
    }

    /// Step count with a missing pedometer treated as zero.
    pub fn steps(&self) -> u64 {
        self.step_count.unwrap_or(0)
    }
}

/// Where a published target bearing came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BearingSource {
    /// A validated UWB direction vector.
    Direction,
    /// A camera-assisted horizontal angle.
    HorizontalAngle,
    /// No update; the previous target is held.
    Held,
    /// Cache estimate blended in lightly after a short dropout.
    LightFusion,
    /// Cache estimate blended in fully after a sustained dropout.
    FullFusion,
}

impl BearingSource {
    /// True for the two fusion tiers.
    pub fn is_fusion(&self) -> bool {
        matches!(self, BearingSource::LightFusion | BearingSource::FullFusion)
    }
}

/// Coarse eight-way description of a bearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionHint {
    Ahead,
    AheadRight,
    Right,
    BehindRight,
    Behind,
    BehindLeft,
    Left,
    AheadLeft,
}

impl DirectionHint {
    const SECTORS: [DirectionHint; 8] = [
        DirectionHint::Ahead,
        DirectionHint::AheadRight,
        DirectionHint::Right,
        DirectionHint::BehindRight,
        DirectionHint::Behind,
        DirectionHint::BehindLeft,
        DirectionHint::Left,
        DirectionHint::AheadLeft,
    ];

    /// Classify a bearing into one of eight 45° sectors centred on ahead,
    /// ahead-right, right and so on.
    pub fn from_bearing(bearing_rad: f32) -> Self {
        let mut degrees = rad_to_deg(bearing_rad);
        if !degrees.is_finite() {
            return DirectionHint::Ahead;
        }
        degrees = degrees.rem_euclid(360.0);
        let index = ((degrees + 22.5) / 45.0).floor() as usize % 8;
        Self::SECTORS[index]
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            DirectionHint::Ahead => "ahead",
            DirectionHint::AheadRight => "ahead right",
            DirectionHint::Right => "right",
            DirectionHint::BehindRight => "behind right",
            DirectionHint::Behind => "behind",
            DirectionHint::BehindLeft => "behind left",
            DirectionHint::Left => "left",
            DirectionHint::AheadLeft => "ahead left",
        }
    }
}

impl fmt::Display for DirectionHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of one estimator update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Estimate {
    /// Filtered target bearing in radians.
    pub target_bearing: f32,
    /// Quality of the input that produced this update.
    pub quality: SignalQuality,
    /// Whether the primary signal delivered a direction this update.
    pub has_direction: bool,
    /// Which path produced `target_bearing`.
    pub source: BearingSource,
    /// True only for the first accepted reading after creation or reset.
    pub first_fix: bool,
    /// Elevation of the raw vector in radians (diagnostic only).
    pub elevation: Option<f32>,
    /// Consecutive updates without a usable direction, including this one.
    pub consecutive_misses: u32,
}

/// Fired once when the target swings into alignment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AlignmentEvent {
    /// Target bearing at the moment of alignment.
    pub target_bearing: f32,
    /// Gap between displayed and target bearing at that moment.
    pub gap_rad: f32,
}

/// Everything the presentation layer needs after an ingest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrackerUpdate {
    /// Estimator output for this update.
    pub estimate: Estimate,
    /// Bearing currently shown by the animator.
    pub displayed_bearing: f32,
    /// Whether the target is within the alignment threshold.
    pub aligned: bool,
    /// Set when this update moved the target into alignment.
    pub alignment_event: Option<AlignmentEvent>,
    /// Coarse description of the target bearing.
    pub hint: DirectionHint,
    /// Distance reported with this update in metres, never negative.
    pub distance_m: Option<f32>,
}

/// Output of one display frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TickUpdate {
    /// Bearing to draw this frame.
    pub displayed_bearing: f32,
    /// Bearing being chased.
    pub target_bearing: f32,
    /// Whether the target is within the alignment threshold.
    pub aligned: bool,
    /// Set when this frame moved the indicator into alignment.
    pub alignment_event: Option<AlignmentEvent>,
}
