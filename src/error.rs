//! Error types.
//!
//! The bearing pipeline itself never fails: absent samples, weak signal,
//! missing compass or pedometer are all ordinary inputs. Errors only arise
//! when a configuration is rejected.

use thiserror::Error;

/// A rejected configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be in (0, 1], got {value}")]
    FactorOutOfRange { name: &'static str, value: f32 },

    #[error("{name} must be positive, got {value}")]
    NotPositive { name: &'static str, value: f32 },

    #[error("{lower} ({lower_value}) must be below {upper} ({upper_value})")]
    Inverted {
        lower: &'static str,
        lower_value: f32,
        upper: &'static str,
        upper_value: f32,
    },

    #[error("history capacity must be at least 1")]
    EmptyHistory,

    #[error("fallback tiers out of order: hold up to {hold_misses} misses, full fusion from {full_fusion_misses}")]
    FallbackTiers {
        hold_misses: u32,
        full_fusion_misses: u32,
    },

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Checks that a blend or damping factor lies in (0, 1].
pub(crate) fn check_factor(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::FactorOutOfRange { name, value })
    }
}

/// Checks that a threshold is strictly positive and finite.
pub(crate) fn check_positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { name, value })
    }
}

/// Checks that `lower < upper`.
pub(crate) fn check_ordered(
    lower: &'static str,
    lower_value: f32,
    upper: &'static str,
    upper_value: f32,
) -> Result<(), ConfigError> {
    if lower_value < upper_value {
        Ok(())
    } else {
        Err(ConfigError::Inverted {
            lower,
            lower_value,
            upper,
            upper_value,
        })
    }
}
