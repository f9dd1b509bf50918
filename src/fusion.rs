//! Heading-corrected fallback for a lost ranging signal.
//!
//! While the UWB peer delivers directions, the estimator keeps a snapshot of
//! the last good bearing together with the compass heading, time and step
//! count at that moment. When the signal drops out, the tag is assumed to be
//! fixed in the world: turning the phone by Δheading moves the tag's bearing
//! relative to the phone by -Δheading.
//!
//! The snapshot is only trusted for a short time and a few steps. After that
//! the user has probably moved enough that the estimate would point the wrong
//! way, and the cache is dropped.
//!
//! Dropouts are graded by how many updates in a row were missed:
//! - a flicker of one or two updates holds the last target,
//! - a short dropout blends the estimate in lightly,
//! - a sustained dropout blends it in fully.

use serde::{Deserialize, Serialize};

use crate::angle::{blend_toward, normalize_angle};
use crate::error::{check_factor, ConfigError};
use crate::types::{AuxiliaryReading, BearingSource};

/// Configuration for the fusion fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Oldest cache entry still trusted (ms). Inclusive.
    pub max_age_ms: u64,
    /// Most steps walked since caching that still keeps the entry. Inclusive.
    pub max_steps: u64,
    /// Consecutive misses that only hold the last target.
    pub hold_misses: u32,
    /// Consecutive misses from which full fusion applies.
    pub full_fusion_misses: u32,
    /// Blend factor while lightly fusing.
    pub light_factor: f32,
    /// Blend factor while fully fusing. Compass updates are dense, so this
    /// can be high without visible jumps.
    pub full_factor: f32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            max_age_ms: 5_000,
            max_steps: 3,
            hold_misses: 2,
            full_fusion_misses: 10,
            light_factor: 0.25,
            full_factor: 0.70,
        }
    }
}

impl FusionConfig {
    /// Check every tunable is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_factor("light_factor", self.light_factor)?;
        check_factor("full_factor", self.full_factor)?;
        if self.max_age_ms == 0 {
            return Err(ConfigError::NotPositive {
                name: "max_age_ms",
                value: 0.0,
            });
        }
        if self.hold_misses >= self.full_fusion_misses {
            return Err(ConfigError::FallbackTiers {
                hold_misses: self.hold_misses,
                full_fusion_misses: self.full_fusion_misses,
            });
        }
        Ok(())
    }

    /// Tier for a run of `misses` consecutive updates without a direction.
    pub fn tier_for(&self, misses: u32) -> FallbackTier {
        if misses <= self.hold_misses {
            FallbackTier::Hold
        } else if misses < self.full_fusion_misses {
            FallbackTier::Light
        } else {
            FallbackTier::Full
        }
    }
}

/// How hard the fallback leans on the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FallbackTier {
    /// Keep the last target untouched.
    Hold,
    /// Blend in with the light factor.
    Light,
    /// Blend in with the full factor.
    Full,
}

/// Snapshot taken from the last accepted reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionCacheEntry {
    /// Target bearing when cached (rad).
    pub bearing: f32,
    /// Compass heading when cached (rad).
    pub heading_at_cache: f32,
    /// When cached (ms).
    pub timestamp_ms: u64,
    /// Step count when cached.
    pub steps_at_cache: u64,
}

impl FusionCacheEntry {
    /// Bearing corrected for the phone's rotation since caching.
    pub fn adjusted_bearing(&self, current_heading: f32) -> f32 {
        let heading_change = current_heading - self.heading_at_cache;
        normalize_angle(self.bearing - heading_change)
    }

    /// Age at `now_ms`, zero if the clock went backwards.
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.timestamp_ms)
    }

    /// Steps walked since caching.
    pub fn steps_since(&self, steps: u64) -> u64 {
        steps.saturating_sub(self.steps_at_cache)
    }
}

/// The single-entry cache plus its expiry rules.
#[derive(Debug, Clone)]
pub struct FusionCache {
    config: FusionConfig,
    entry: Option<FusionCacheEntry>,
}

impl FusionCache {
    pub fn new(config: FusionConfig) -> Self {
        Self {
            config,
            entry: None,
        }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Overwrite the entry.
    pub fn store(&mut self, bearing: f32, heading_rad: f32, timestamp_ms: u64, steps: u64) {
        self.entry = Some(FusionCacheEntry {
            bearing,
            heading_at_cache: heading_rad,
            timestamp_ms,
            steps_at_cache: steps,
        });
    }

    /// Current entry, whether or not it is still valid.
    pub fn entry(&self) -> Option<&FusionCacheEntry> {
        self.entry.as_ref()
    }

    /// Whether an entry exists and passes the age and step limits.
    pub fn is_valid(&self, now_ms: u64, steps: u64) -> bool {
        match &self.entry {
            Some(entry) => {
                entry.age_ms(now_ms) <= self.config.max_age_ms
                    && entry.steps_since(steps) <= self.config.max_steps
            }
            None => false,
        }
    }

    /// Like [`FusionCache::is_valid`], but drops an expired entry.
    pub fn validate(&mut self, now_ms: u64, steps: u64) -> Option<FusionCacheEntry> {
        if self.is_valid(now_ms, steps) {
            return self.entry;
        }
        if let Some(entry) = self.entry.take() {
            log::debug!(
                "fusion cache expired: age {} ms, {} steps since caching",
                entry.age_ms(now_ms),
                entry.steps_since(steps)
            );
        }
        None
    }

    /// Heading-corrected bearing, if the entry is still valid.
    pub fn estimate(&mut self, aux: &AuxiliaryReading) -> Option<f32> {
        let heading = aux.heading_rad.filter(|h| h.is_finite())?;
        let entry = self.validate(aux.timestamp_ms, aux.steps())?;
        Some(entry.adjusted_bearing(heading))
    }

    /// Apply the graduated fallback to `target` after `misses` consecutive
    /// updates without a direction.
    ///
    /// Returns the new target and where it came from. Without a heading or a
    /// valid entry the target is held.
    pub fn fallback(
        &mut self,
        target: f32,
        misses: u32,
        aux: &AuxiliaryReading,
    ) -> (f32, BearingSource) {
        let (factor, source) = match self.config.tier_for(misses) {
            FallbackTier::Hold => return (target, BearingSource::Held),
            FallbackTier::Light => (self.config.light_factor, BearingSource::LightFusion),
            FallbackTier::Full => (self.config.full_factor, BearingSource::FullFusion),
        };

        match self.estimate(aux) {
            Some(estimate) => (blend_toward(target, estimate, factor), source),
            None => (target, BearingSource::Held),
        }
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }
}
