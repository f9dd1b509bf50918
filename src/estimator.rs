//! Bearing estimation from UWB direction vectors.
//!
//! Turns a possibly-absent 3D direction per ranging update into a stable
//! target bearing:
//! - Validation against a minimum vector magnitude
//! - Azimuth extraction (elevation is diagnostic only)
//! - Quality classification from magnitude
//! - Dead-zone snap near straight ahead
//! - Wrap-safe moving average over a short history
//! - Exponential smoothing with a quality-dependent factor
//!
//! When no usable direction arrives, the fusion cache takes over (see
//! [`crate::fusion`]).

use serde::{Deserialize, Serialize};

use crate::angle::{blend_toward, deg_to_rad, normalize_angle, rad_to_deg};
use crate::error::{check_factor, check_ordered, check_positive, ConfigError};
use crate::fusion::{FusionCache, FusionConfig};
use crate::history::AngleHistory;
use crate::types::{AuxiliaryReading, BearingSource, DirectionSample, Estimate, SignalQuality};

/// Configuration for bearing estimation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Vector magnitude a sample must exceed to carry a direction.
    pub min_signal_magnitude: f32,
    /// Vector magnitude above which a sample counts as high quality.
    pub high_quality_magnitude: f32,
    /// Bearings closer to ahead than this snap to exactly 0 (rad).
    pub dead_zone_rad: f32,
    /// Number of raw bearings kept for the moving average.
    pub history_capacity: usize,
    /// Smoothing factor for high-quality samples.
    pub high_quality_factor: f32,
    /// Smoothing factor for low-quality samples.
    pub low_quality_factor: f32,
    /// Smoothing factor for camera-assisted horizontal angles.
    pub horizontal_angle_factor: f32,
    /// Only refresh the fusion cache from high-quality samples.
    pub cache_high_quality_only: bool,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            min_signal_magnitude: 0.15,
            high_quality_magnitude: 0.6,
            dead_zone_rad: deg_to_rad(5.0),
            history_capacity: 5,
            high_quality_factor: 0.60,
            low_quality_factor: 0.35,
            horizontal_angle_factor: 0.50,
            cache_high_quality_only: false,
        }
    }
}

impl EstimatorConfig {
    /// Check every tunable is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("min_signal_magnitude", self.min_signal_magnitude)?;
        check_ordered(
            "min_signal_magnitude",
            self.min_signal_magnitude,
            "high_quality_magnitude",
            self.high_quality_magnitude,
        )?;
        if !(self.dead_zone_rad >= 0.0 && self.dead_zone_rad < std::f32::consts::PI) {
            return Err(ConfigError::NotPositive {
                name: "dead_zone_rad",
                value: self.dead_zone_rad,
            });
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::EmptyHistory);
        }
        check_factor("high_quality_factor", self.high_quality_factor)?;
        check_factor("low_quality_factor", self.low_quality_factor)?;
        check_factor("horizontal_angle_factor", self.horizontal_angle_factor)?;
        Ok(())
    }

    fn factor_for(&self, quality: SignalQuality) -> f32 {
        match quality {
            SignalQuality::High => self.high_quality_factor,
            _ => self.low_quality_factor,
        }
    }
}

/// Azimuth and elevation of a direction vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionAngles {
    /// Horizontal angle, 0 = ahead, positive to the right (rad).
    pub azimuth: f32,
    /// Angle above the horizontal plane (rad).
    pub elevation: f32,
}

impl DirectionAngles {
    /// Decompose a sample's vector. The caller must have checked that the
    /// magnitude is non-zero.
    pub fn from_sample(sample: &DirectionSample) -> Self {
        let unit = sample.direction.normalize();
        let horizontal = (unit.x * unit.x + unit.z * unit.z).sqrt();

        // Straight up or down has no azimuth; call it ahead.
        let azimuth = if horizontal > f32::EPSILON {
            unit.x.atan2(-unit.z)
        } else {
            0.0
        };
        let elevation = unit.y.atan2(horizontal);

        Self { azimuth, elevation }
    }
}

/// Stateful bearing estimator for one tracked peer.
#[derive(Debug, Clone)]
pub struct AngleEstimator {
    config: EstimatorConfig,
    history: AngleHistory,
    fusion: FusionCache,

    target_bearing: f32,
    is_first_update: bool,
    consecutive_misses: u32,
    last_quality: SignalQuality,
}

impl AngleEstimator {
    /// Create an estimator with explicit configuration.
    pub fn new(config: EstimatorConfig, fusion_config: FusionConfig) -> Self {
        Self {
            history: AngleHistory::new(config.history_capacity),
            fusion: FusionCache::new(fusion_config),
            config,
            target_bearing: 0.0,
            is_first_update: true,
            consecutive_misses: 0,
            last_quality: SignalQuality::NoSignal,
        }
    }

    /// Create with default configuration.
    pub fn default_estimator() -> Self {
        Self::new(EstimatorConfig::default(), FusionConfig::default())
    }

    /// Process one ranging update.
    ///
    /// `sample` is `None` when the ranging stack produced no direction this
    /// cycle. That is an ordinary input and goes through the fusion fallback.
    pub fn ingest(&mut self, sample: Option<&DirectionSample>, aux: &AuxiliaryReading) -> Estimate {
        let Some(sample) = sample else {
            return self.miss(aux);
        };

        let magnitude = sample.magnitude();
        let quality = SignalQuality::classify(
            magnitude,
            self.config.min_signal_magnitude,
            self.config.high_quality_magnitude,
        );
        if !quality.is_usable() {
            log::debug!("signal too weak: magnitude {:.3}", magnitude);
            return self.miss(aux);
        }

        let angles = DirectionAngles::from_sample(sample);
        log::debug!(
            "{:?} azimuth {:+.1}° elevation {:+.1}° magnitude {:.2}",
            quality,
            rad_to_deg(angles.azimuth),
            rad_to_deg(angles.elevation),
            magnitude
        );

        let first_fix = self.accept(angles.azimuth, self.config.factor_for(quality));
        self.refresh_cache(quality, aux);
        self.last_quality = quality;

        Estimate {
            target_bearing: self.target_bearing,
            quality,
            has_direction: true,
            source: BearingSource::Direction,
            first_fix,
            elevation: Some(angles.elevation),
            consecutive_misses: 0,
        }
    }

    /// Process a camera-assisted horizontal angle in place of a direction
    /// vector.
    ///
    /// These carry no magnitude, so they are smoothed with a fixed factor
    /// and reported as low quality.
    pub fn ingest_horizontal_angle(&mut self, angle_rad: f32, aux: &AuxiliaryReading) -> Estimate {
        if !angle_rad.is_finite() {
            return self.miss(aux);
        }
        log::debug!("horizontal angle {:+.1}°", rad_to_deg(angle_rad));

        let first_fix = self.accept(angle_rad, self.config.horizontal_angle_factor);
        self.refresh_cache(SignalQuality::Low, aux);
        self.last_quality = SignalQuality::Low;

        Estimate {
            target_bearing: self.target_bearing,
            quality: SignalQuality::Low,
            has_direction: true,
            source: BearingSource::HorizontalAngle,
            first_fix,
            elevation: None,
            consecutive_misses: 0,
        }
    }

    /// Current target bearing.
    pub fn target_bearing(&self) -> f32 {
        self.target_bearing
    }

    /// True until the first reading after creation or reset is accepted.
    pub fn is_first_update(&self) -> bool {
        self.is_first_update
    }

    /// Updates in a row without a usable direction.
    pub fn consecutive_misses(&self) -> u32 {
        self.consecutive_misses
    }

    /// Quality of the last accepted reading.
    pub fn last_quality(&self) -> SignalQuality {
        self.last_quality
    }

    pub fn history(&self) -> &AngleHistory {
        &self.history
    }

    pub fn fusion_cache(&self) -> &FusionCache {
        &self.fusion
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Back to the initial state: empty history, zero target, cleared cache.
    pub fn reset(&mut self) {
        self.history.clear();
        self.fusion.clear();
        self.target_bearing = 0.0;
        self.is_first_update = true;
        self.consecutive_misses = 0;
        self.last_quality = SignalQuality::NoSignal;
    }

    // =========================================================================
    // PRIVATE METHODS
    // =========================================================================

    /// Dead zone, history, averaging and smoothing. Returns whether this was
    /// the first fix.
    fn accept(&mut self, raw_angle: f32, factor: f32) -> bool {
        let mut raw = normalize_angle(raw_angle);
        if raw.abs() < self.config.dead_zone_rad {
            raw = 0.0;
        }

        self.history.push(raw);
        self.consecutive_misses = 0;

        if self.is_first_update {
            self.target_bearing = raw;
            self.is_first_update = false;
            return true;
        }

        let smoothed = if self.history.len() < 2 {
            raw
        } else {
            self.history.circular_mean().unwrap_or(raw)
        };

        self.target_bearing = blend_toward(self.target_bearing, smoothed, factor);
        false
    }

    fn refresh_cache(&mut self, quality: SignalQuality, aux: &AuxiliaryReading) {
        let Some(heading) = aux.heading_rad.filter(|h| h.is_finite()) else {
            return;
        };
        if self.config.cache_high_quality_only && quality != SignalQuality::High {
            return;
        }
        self.fusion
            .store(self.target_bearing, heading, aux.timestamp_ms, aux.steps());
    }

    fn miss(&mut self, aux: &AuxiliaryReading) -> Estimate {
        self.consecutive_misses = self.consecutive_misses.saturating_add(1);

        let (target, source) =
            self.fusion
                .fallback(self.target_bearing, self.consecutive_misses, aux);
        self.target_bearing = target;

        log::debug!(
            "no direction ({} in a row): {:?} at {:+.1}°",
            self.consecutive_misses,
            source,
            rad_to_deg(target)
        );

        Estimate {
            target_bearing: target,
            quality: SignalQuality::NoSignal,
            has_direction: false,
            source,
            first_fix: false,
            elevation: None,
            consecutive_misses: self.consecutive_misses,
        }
    }
}

impl Default for AngleEstimator {
    fn default() -> Self {
        Self::default_estimator()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rstest::rstest;

    /// Unit direction at `azimuth` on the horizontal plane, scaled to `magnitude`.
    fn sample_at(azimuth: f32, magnitude: f32) -> DirectionSample {
        DirectionSample::new(azimuth.sin() * magnitude, 0.0, -azimuth.cos() * magnitude)
    }

    fn aux(timestamp_ms: u64) -> AuxiliaryReading {
        AuxiliaryReading::new(Some(0.0), Some(0), timestamp_ms)
    }

    #[test]
    fn test_estimator_creation() {
        let estimator = AngleEstimator::default_estimator();
        assert_eq!(estimator.target_bearing(), 0.0);
        assert!(estimator.is_first_update());
        assert!(estimator.history().is_empty());
    }

    #[test]
    fn test_azimuth_convention() {
        let ahead = DirectionAngles::from_sample(&DirectionSample::new(0.0, 0.0, -1.0));
        assert_abs_diff_eq!(ahead.azimuth, 0.0);

        let right = DirectionAngles::from_sample(&DirectionSample::new(1.0, 0.0, 0.0));
        assert_abs_diff_eq!(right.azimuth, std::f32::consts::FRAC_PI_2, epsilon = 1e-6);

        let left = DirectionAngles::from_sample(&DirectionSample::new(-1.0, 0.0, 0.0));
        assert_abs_diff_eq!(left.azimuth, -std::f32::consts::FRAC_PI_2, epsilon = 1e-6);

        let behind = DirectionAngles::from_sample(&DirectionSample::new(0.0, 0.0, 1.0));
        assert_abs_diff_eq!(behind.azimuth.abs(), std::f32::consts::PI, epsilon = 1e-6);

        let up = DirectionAngles::from_sample(&DirectionSample::new(0.0, 1.0, 0.0));
        assert_eq!(up.azimuth, 0.0);
    }

    #[test]
    fn test_first_sample_sets_target_exactly() {
        let mut estimator = AngleEstimator::default_estimator();
        let sample = sample_at(0.8, 0.3);
        let expected = DirectionAngles::from_sample(&sample).azimuth;

        let estimate = estimator.ingest(Some(&sample), &aux(0));

        assert!(estimate.first_fix);
        assert!(estimate.has_direction);
        assert_eq!(estimate.target_bearing, expected);
        assert!(!estimator.is_first_update());
    }

    #[rstest]
    #[case(3.0, 0.0)]
    #[case(-4.9, 0.0)]
    #[case(7.0, 7.0)]
    #[case(-7.0, -7.0)]
    fn test_dead_zone(#[case] raw_deg: f32, #[case] expected_deg: f32) {
        let mut estimator = AngleEstimator::default_estimator();
        let estimate = estimator.ingest(Some(&sample_at(deg_to_rad(raw_deg), 1.0)), &aux(0));
        assert_abs_diff_eq!(rad_to_deg(estimate.target_bearing), expected_deg, epsilon = 1e-3);
        if expected_deg == 0.0 {
            assert_eq!(estimate.target_bearing, 0.0);
        }
    }

    #[test]
    fn test_magnitude_at_threshold_is_rejected() {
        let mut estimator = AngleEstimator::default_estimator();
        let estimate = estimator.ingest(Some(&DirectionSample::new(0.0, 0.0, -0.15)), &aux(0));
        assert!(!estimate.has_direction);
        assert_eq!(estimate.quality, SignalQuality::NoSignal);
        assert!(estimator.is_first_update());
    }

    #[test]
    fn test_zero_vector_is_a_miss() {
        let mut estimator = AngleEstimator::default_estimator();
        let estimate = estimator.ingest(Some(&DirectionSample::new(0.0, 0.0, 0.0)), &aux(0));
        assert!(!estimate.has_direction);
        assert_eq!(estimate.consecutive_misses, 1);
    }

    #[test]
    fn test_quality_reported() {
        let mut estimator = AngleEstimator::default_estimator();
        let high = estimator.ingest(Some(&sample_at(0.3, 0.9)), &aux(0));
        assert_eq!(high.quality, SignalQuality::High);
        let low = estimator.ingest(Some(&sample_at(0.3, 0.4)), &aux(100));
        assert_eq!(low.quality, SignalQuality::Low);
    }

    #[test]
    fn test_elevation_does_not_change_bearing() {
        let mut flat = AngleEstimator::default_estimator();
        let mut tilted = AngleEstimator::default_estimator();

        let flat_estimate = flat.ingest(Some(&DirectionSample::new(0.5, 0.0, -0.5)), &aux(0));
        let tilted_estimate = tilted.ingest(Some(&DirectionSample::new(0.5, 0.6, -0.5)), &aux(0));

        assert_abs_diff_eq!(flat_estimate.target_bearing, tilted_estimate.target_bearing, epsilon = 1e-6);
        assert!(tilted_estimate.elevation.unwrap() > 0.5);
    }

    #[test]
    fn test_quality_gated_responsiveness() {
        fn calls_to_converge(magnitude: f32) -> usize {
            let mut estimator = AngleEstimator::default_estimator();
            estimator.ingest(Some(&sample_at(0.0, magnitude)), &aux(0));
            for i in 1..200 {
                let estimate = estimator.ingest(Some(&sample_at(1.0, magnitude)), &aux(i * 50));
                if (estimate.target_bearing - 1.0).abs() < 0.02 {
                    return i as usize;
                }
            }
            usize::MAX
        }

        let high = calls_to_converge(0.9);
        let low = calls_to_converge(0.5);
        assert!(high < low, "high quality took {} calls, low took {}", high, low);
    }

    #[test]
    fn test_averaging_across_seam() {
        let mut estimator = AngleEstimator::default_estimator();
        for (i, deg) in [179.0, -179.0, 178.0, -178.0, 179.0].iter().enumerate() {
            let estimate = estimator.ingest(Some(&sample_at(deg_to_rad(*deg), 0.9)), &aux(i as u64 * 50));
            assert!(
                estimate.target_bearing.abs() > deg_to_rad(170.0),
                "target {} collapsed toward ahead",
                rad_to_deg(estimate.target_bearing)
            );
        }
    }

    #[test]
    fn test_cache_refreshed_with_heading() {
        let mut estimator = AngleEstimator::default_estimator();
        estimator.ingest(Some(&sample_at(0.5, 0.9)), &AuxiliaryReading::new(Some(1.2), Some(4), 300));

        let entry = estimator.fusion_cache().entry().copied().unwrap();
        assert_abs_diff_eq!(entry.bearing, 0.5, epsilon = 1e-5);
        assert_eq!(entry.heading_at_cache, 1.2);
        assert_eq!(entry.timestamp_ms, 300);
        assert_eq!(entry.steps_at_cache, 4);
    }

    #[test]
    fn test_cache_skipped_without_heading() {
        let mut estimator = AngleEstimator::default_estimator();
        estimator.ingest(Some(&sample_at(0.5, 0.9)), &AuxiliaryReading::at(0));
        assert!(estimator.fusion_cache().entry().is_none());
    }

    #[test]
    fn test_cache_high_quality_only() {
        let config = EstimatorConfig {
            cache_high_quality_only: true,
            ..EstimatorConfig::default()
        };
        let mut estimator = AngleEstimator::new(config, FusionConfig::default());
        estimator.ingest(Some(&sample_at(0.5, 0.4)), &aux(0));
        assert!(estimator.fusion_cache().entry().is_none());
        estimator.ingest(Some(&sample_at(0.5, 0.9)), &aux(50));
        assert!(estimator.fusion_cache().entry().is_some());
    }

    #[test]
    fn test_misses_hold_then_fuse() {
        let mut estimator = AngleEstimator::default_estimator();
        estimator.ingest(Some(&sample_at(0.5, 0.9)), &aux(0));

        // Phone turns 0.3 rad right while the signal is gone.
        let turned = AuxiliaryReading::new(Some(0.3), Some(0), 100);
        let first = estimator.ingest(None, &turned);
        assert_eq!(first.source, BearingSource::Held);
        assert_abs_diff_eq!(first.target_bearing, 0.5, epsilon = 1e-6);

        estimator.ingest(None, &turned);
        let third = estimator.ingest(None, &turned);
        assert_eq!(third.source, BearingSource::LightFusion);
        assert!(third.target_bearing < 0.5);

        let mut last = third;
        for _ in 0..20 {
            last = estimator.ingest(None, &turned);
        }
        assert_eq!(last.source, BearingSource::FullFusion);
        assert_abs_diff_eq!(last.target_bearing, 0.2, epsilon = 1e-3);
    }

    #[test]
    fn test_direction_resets_miss_counter() {
        let mut estimator = AngleEstimator::default_estimator();
        estimator.ingest(None, &aux(0));
        estimator.ingest(None, &aux(50));
        assert_eq!(estimator.consecutive_misses(), 2);

        estimator.ingest(Some(&sample_at(0.2, 0.9)), &aux(100));
        assert_eq!(estimator.consecutive_misses(), 0);
    }

    #[test]
    fn test_horizontal_angle_tier() {
        let mut estimator = AngleEstimator::default_estimator();
        let first = estimator.ingest_horizontal_angle(0.4, &aux(0));
        assert!(first.first_fix);
        assert_eq!(first.source, BearingSource::HorizontalAngle);
        assert_eq!(first.quality, SignalQuality::Low);
        assert_abs_diff_eq!(first.target_bearing, 0.4);

        // Mean of {0.4, 0.8} is 0.6; half of the 0.2 gap.
        let second = estimator.ingest_horizontal_angle(0.8, &aux(50));
        assert_abs_diff_eq!(second.target_bearing, 0.5, epsilon = 1e-5);

        let invalid = estimator.ingest_horizontal_angle(f32::NAN, &aux(100));
        assert!(!invalid.has_direction);
    }

    #[test]
    fn test_reset() {
        let mut estimator = AngleEstimator::default_estimator();
        for i in 0..4 {
            estimator.ingest(Some(&sample_at(1.0, 0.9)), &aux(i * 50));
        }
        estimator.ingest(None, &aux(500));

        estimator.reset();

        assert_eq!(estimator.target_bearing(), 0.0);
        assert!(estimator.is_first_update());
        assert!(estimator.history().is_empty());
        assert!(estimator.fusion_cache().entry().is_none());
        assert_eq!(estimator.consecutive_misses(), 0);

        let estimate = estimator.ingest(Some(&sample_at(-0.7, 0.9)), &aux(600));
        assert!(estimate.first_fix);
        assert_abs_diff_eq!(estimate.target_bearing, -0.7, epsilon = 1e-5);
    }

    #[test]
    fn test_config_validation() {
        assert!(EstimatorConfig::default().validate().is_ok());

        let inverted = EstimatorConfig {
            min_signal_magnitude: 0.7,
            ..EstimatorConfig::default()
        };
        assert!(matches!(inverted.validate(), Err(ConfigError::Inverted { .. })));

        let empty = EstimatorConfig {
            history_capacity: 0,
            ..EstimatorConfig::default()
        };
        assert!(matches!(empty.validate(), Err(ConfigError::EmptyHistory)));

        let bad_factor = EstimatorConfig {
            low_quality_factor: 1.2,
            ..EstimatorConfig::default()
        };
        assert!(bad_factor.validate().is_err());
    }
}
