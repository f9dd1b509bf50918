//! Tag Bearing Library
//!
//! Turns noisy, intermittent UWB direction readings into a stable bearing
//! toward a tracked tag, and animates an on-screen indicator toward it.
//!
//! # Design Philosophy
//!
//! - **No UI dependency**: the estimator is a plain state machine. The host
//!   owns the ranging session, the compass and the display clock.
//! - **Dropouts are normal**: a missing or weak reading is an ordinary input
//!   that goes through a graduated compass-compensated fallback, never an
//!   error.
//! - **Wrap-safe**: every angle lives in (−π, π] and all arithmetic on angles
//!   takes the short way around the circle.
//! - **Tunable**: every threshold and factor lives in a `*Config` struct with
//!   tuned defaults, loadable from JSON.
//!
//! # Example
//!
//! ```
//! use tag_bearing::{AuxiliaryReading, PeerTracker, RangingUpdate};
//!
//! let mut tracker = PeerTracker::default();
//!
//! // Tag ahead and to the right, compass reads north.
//! let update = tracker.ingest(
//!     &RangingUpdate::direction(0.5, 0.0, -0.5).with_distance(2.0),
//!     &AuxiliaryReading::new(Some(0.0), Some(0), 1_000),
//! );
//! assert!(update.estimate.has_direction);
//!
//! // Once per display frame.
//! let frame = tracker.tick();
//! println!("draw arrow at {:.2} rad", frame.displayed_bearing);
//! ```

pub mod angle;
pub mod animator;
pub mod error;
pub mod estimator;
pub mod ffi;
pub mod fusion;
pub mod history;
pub mod providers;
pub mod session;
pub mod tracker;
pub mod types;


// Re-export commonly used types
pub use animator::{AlignmentConfig, AlignmentMonitor, AnimatorConfig, BearingAnimator};
pub use error::ConfigError;
pub use estimator::{AngleEstimator, EstimatorConfig};
pub use fusion::{FallbackTier, FusionCache, FusionConfig};
pub use providers::{
    Clock, HeadingProvider, LatestHeading, LatestStepCount, ManualClock, MonotonicClock,
    SensorFeeds, StepCountProvider,
};
pub use session::{PeerId, SharedTracker, TrackerRegistry};
pub use tracker::{PeerTracker, TrackerConfig, TrackerSnapshot};
pub use types::{
    AlignmentEvent, AuxiliaryReading, BearingSource, DirectionHint, DirectionSample, Estimate,
    RangingUpdate, SignalQuality, TickUpdate, TrackerUpdate,
};
