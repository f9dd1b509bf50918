//! C FFI bindings for the mobile host.
//!
//! The iOS and Android shells own the ranging session, the compass and the
//! display clock. They push each ranging update into the tracker, call
//! `bearing_tracker_tick` once per display frame, and draw the returned
//! displayed bearing.
//!
//! Memory Safety:
//! - Strings returned by `bearing_tracker_snapshot_json()` must be freed with
//!   `bearing_free_string()`
//! - The tracker instance must be freed with `bearing_tracker_destroy()`
//! - NULL checks are performed on all inputs
//!
//! Thread Safety:
//! - A handle is NOT thread-safe. Drive it from one thread or behind a mutex.
//!   Rust hosts should use [`crate::session::SharedTracker`] instead.
//!
//! Optional inputs use sentinels: a NaN distance or heading means "unknown",
//! a negative step count means "no pedometer".

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::tracker::{PeerTracker, TrackerConfig};
use crate::types::{AuxiliaryReading, RangingUpdate, SignalQuality, TrackerUpdate};

// ============================================================================
// OPAQUE HANDLE TYPES
// ============================================================================

/// Opaque handle to a bearing tracker.
pub struct BearingTracker {
    tracker: PeerTracker,
}

/// Result status codes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BearingStatus {
    /// Operation succeeded.
    Ok = 0,
    /// Null pointer provided.
    NullPointer = 1,
    /// Invalid parameter value.
    InvalidParameter = 2,
}

/// Tunables exposed to C. Zero or negative values keep the default.
#[repr(C)]
#[derive(Debug, Clone)]
pub struct BearingTrackerConfig {
    /// Vector magnitude a sample must exceed to be used.
    pub min_signal_magnitude: f32,
    /// Vector magnitude above which a sample is high quality.
    pub high_quality_magnitude: f32,
    /// Bearings within this angle (rad) of straight ahead snap to 0.
    /// Zero keeps the default; pass a NaN to disable the dead zone.
    pub dead_zone_rad: f32,
    /// Maximum age of the fusion cache in milliseconds.
    pub max_cache_age_ms: u64,
    /// Maximum steps walked since the fusion cache was stored.
    pub max_cache_steps: u64,
    /// Suggested display refresh rate in Hz. The host schedules ticks; the
    /// tracker does not use it.
    pub frame_rate_hz: f32,
}

/// Result of one ingest call.
#[repr(C)]
#[derive(Debug, Clone, Default)]
pub struct BearingUpdateOutput {
    /// Smoothed target bearing in radians (0 = ahead, positive = right).
    pub target_bearing: f32,
    /// Bearing to draw this frame.
    pub displayed_bearing: f32,
    /// Signal quality (0=NoSignal, 1=Low, 2=High).
    pub quality: i32,
    /// The update carried a usable direction (0 or 1).
    pub has_direction: i32,
    /// Source (0=Direction, 1=HorizontalAngle, 2=Held, 3=LightFusion, 4=FullFusion).
    pub source: i32,
    /// Consecutive updates without a usable direction.
    pub consecutive_misses: u32,
    /// The tag is currently ahead (0 or 1).
    pub aligned: i32,
    /// Alignment was reached on this update; fire haptics (0 or 1).
    pub alignment_event: i32,
    /// Eight-way hint (0=Ahead, clockwise to 7=AheadLeft).
    pub hint: i32,
    /// Distance in meters, or -1 if unknown.
    pub distance_m: f32,
}

/// Result of one display tick.
#[repr(C)]
#[derive(Debug, Clone, Default)]
pub struct BearingTickOutput {
    /// Bearing to draw this frame.
    pub displayed_bearing: f32,
    /// Bearing the display is chasing.
    pub target_bearing: f32,
    /// The tag is currently ahead (0 or 1).
    pub aligned: i32,
    /// Alignment was reached on this frame; fire haptics (0 or 1).
    pub alignment_event: i32,
}

// ============================================================================
// TRACKER LIFECYCLE
// ============================================================================

/// Default tunables, for callers that only want to change a few.
#[no_mangle]
pub extern "C" fn bearing_config_default() -> BearingTrackerConfig {
    let defaults = TrackerConfig::default();
    BearingTrackerConfig {
        min_signal_magnitude: defaults.estimator.min_signal_magnitude,
        high_quality_magnitude: defaults.estimator.high_quality_magnitude,
        dead_zone_rad: defaults.estimator.dead_zone_rad,
        max_cache_age_ms: defaults.fusion.max_age_ms,
        max_cache_steps: defaults.fusion.max_steps,
        frame_rate_hz: defaults.animator.frame_rate_hz,
    }
}

/// Create a new bearing tracker.
///
/// # Safety
/// - `config` must be NULL or a valid pointer to BearingTrackerConfig.
/// - The returned pointer must be freed with `bearing_tracker_destroy()`.
///
/// # Returns
/// - Pointer to BearingTracker on success. A NULL `config` uses defaults.
/// - NULL if the resulting configuration is invalid.
#[no_mangle]
pub unsafe extern "C" fn bearing_tracker_create(
    config: *const BearingTrackerConfig,
) -> *mut BearingTracker {
    let mut tracker_config = TrackerConfig::default();

    if !config.is_null() {
        let config = &*config;
        if config.min_signal_magnitude > 0.0 {
            tracker_config.estimator.min_signal_magnitude = config.min_signal_magnitude;
        }
        if config.high_quality_magnitude > 0.0 {
            tracker_config.estimator.high_quality_magnitude = config.high_quality_magnitude;
        }
        if config.dead_zone_rad.is_nan() {
            tracker_config.estimator.dead_zone_rad = 0.0;
        } else if config.dead_zone_rad > 0.0 {
            tracker_config.estimator.dead_zone_rad = config.dead_zone_rad;
        }
        if config.max_cache_age_ms > 0 {
            tracker_config.fusion.max_age_ms = config.max_cache_age_ms;
        }
        if config.max_cache_steps > 0 {
            tracker_config.fusion.max_steps = config.max_cache_steps;
        }
        if config.frame_rate_hz > 0.0 {
            tracker_config.animator.frame_rate_hz = config.frame_rate_hz;
        }
    }

    into_handle(tracker_config)
}

/// Create a new bearing tracker from a JSON configuration.
///
/// Omitted fields keep their defaults, so `"{}"` is a valid configuration.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - The returned pointer must be freed with `bearing_tracker_destroy()`.
///
/// # Returns
/// - Pointer to BearingTracker on success.
/// - NULL if `json` is NULL, not UTF-8, malformed or out of range.
#[no_mangle]
pub unsafe extern "C" fn bearing_tracker_create_from_json(
    json: *const c_char,
) -> *mut BearingTracker {
    if json.is_null() {
        return ptr::null_mut();
    }

    let json = match CStr::from_ptr(json).to_str() {
        Ok(s) => s,
        Err(_) => {
            log::warn!("tracker config is not valid UTF-8");
            return ptr::null_mut();
        }
    };

    match TrackerConfig::from_json(json) {
        Ok(config) => into_handle(config),
        Err(err) => {
            log::warn!("rejected tracker config: {}", err);
            ptr::null_mut()
        }
    }
}

/// Destroy a bearing tracker.
///
/// # Safety
/// - `tracker` must be a valid pointer from `bearing_tracker_create*()`.
/// - Must not be called more than once for the same pointer.
#[no_mangle]
pub unsafe extern "C" fn bearing_tracker_destroy(tracker: *mut BearingTracker) {
    if !tracker.is_null() {
        drop(Box::from_raw(tracker));
    }
}

/// Clear all tracking state, e.g. when the direction screen reappears.
///
/// # Safety
/// - `tracker` must be a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn bearing_tracker_reset(tracker: *mut BearingTracker) -> BearingStatus {
    if tracker.is_null() {
        return BearingStatus::NullPointer;
    }

    let tracker = &mut *tracker;
    tracker.tracker.reset();

    BearingStatus::Ok
}

/// Set the peer's display name, reported in snapshots and logs.
///
/// # Safety
/// - `tracker` must be a valid pointer.
/// - `name` must be a valid null-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn bearing_tracker_set_peer_name(
    tracker: *mut BearingTracker,
    name: *const c_char,
) -> BearingStatus {
    if tracker.is_null() || name.is_null() {
        return BearingStatus::NullPointer;
    }

    let name = match CStr::from_ptr(name).to_str() {
        Ok(s) => s,
        Err(_) => return BearingStatus::InvalidParameter,
    };

    let tracker = &mut *tracker;
    tracker.tracker.set_peer_name(name);

    BearingStatus::Ok
}

// ============================================================================
// UPDATES
// ============================================================================

/// Feed one ranging update.
///
/// # Safety
/// - `tracker` must be a valid pointer.
/// - `output` must be a valid pointer to receive results.
///
/// # Parameters
/// - `timestamp_ms`: Monotonic timestamp in milliseconds.
/// - `has_direction`: Nonzero if `x/y/z` hold a direction vector.
/// - `x/y/z`: Direction vector in the device frame (-z = ahead, +x = right).
/// - `distance_m`: Distance in meters, NaN if unknown.
/// - `heading_rad`: Compass heading in radians, NaN if unknown.
/// - `step_count`: Pedometer count, negative if unavailable.
#[no_mangle]
pub unsafe extern "C" fn bearing_tracker_ingest(
    tracker: *mut BearingTracker,
    timestamp_ms: u64,
    has_direction: i32,
    x: f32, y: f32, z: f32,
    distance_m: f32,
    heading_rad: f32,
    step_count: i64,
    output: *mut BearingUpdateOutput,
) -> BearingStatus {
    if tracker.is_null() || output.is_null() {
        return BearingStatus::NullPointer;
    }

    let tracker = &mut *tracker;
    let output = &mut *output;

    let mut update = if has_direction != 0 {
        RangingUpdate::direction(x, y, z)
    } else {
        RangingUpdate::missing()
    };
    if !distance_m.is_nan() {
        update = update.with_distance(distance_m);
    }

    let aux = aux_reading(timestamp_ms, heading_rad, step_count);
    let result = tracker.tracker.ingest(&update, &aux);
    fill_update_output(output, &result);

    BearingStatus::Ok
}

/// Feed a camera-assisted horizontal angle instead of a direction vector.
///
/// # Safety
/// - `tracker` must be a valid pointer.
/// - `output` must be a valid pointer to receive results.
///
/// # Returns
/// - `InvalidParameter` if `angle_rad` is not finite; the tracker is untouched.
#[no_mangle]
pub unsafe extern "C" fn bearing_tracker_ingest_horizontal_angle(
    tracker: *mut BearingTracker,
    timestamp_ms: u64,
    angle_rad: f32,
    distance_m: f32,
    heading_rad: f32,
    step_count: i64,
    output: *mut BearingUpdateOutput,
) -> BearingStatus {
    if tracker.is_null() || output.is_null() {
        return BearingStatus::NullPointer;
    }
    if !angle_rad.is_finite() {
        return BearingStatus::InvalidParameter;
    }

    let tracker = &mut *tracker;
    let output = &mut *output;

    let distance = if distance_m.is_nan() { None } else { Some(distance_m) };
    let aux = aux_reading(timestamp_ms, heading_rad, step_count);
    let result = tracker.tracker.ingest_horizontal_angle(angle_rad, distance, &aux);
    fill_update_output(output, &result);

    BearingStatus::Ok
}

/// Advance the indicator by one display frame.
///
/// # Safety
/// - `tracker` must be a valid pointer.
/// - `output` must be a valid pointer to receive results.
#[no_mangle]
pub unsafe extern "C" fn bearing_tracker_tick(
    tracker: *mut BearingTracker,
    output: *mut BearingTickOutput,
) -> BearingStatus {
    if tracker.is_null() || output.is_null() {
        return BearingStatus::NullPointer;
    }

    let tracker = &mut *tracker;
    let output = &mut *output;

    let tick = tracker.tracker.tick();
    output.displayed_bearing = tick.displayed_bearing;
    output.target_bearing = tick.target_bearing;
    output.aligned = tick.aligned as i32;
    output.alignment_event = tick.alignment_event.is_some() as i32;

    BearingStatus::Ok
}

// ============================================================================
// JSON OUTPUT
// ============================================================================

/// Get the tracker state as JSON, for debugging overlays.
///
/// # Safety
/// - `tracker` must be a valid pointer.
///
/// # Returns
/// - JSON string (MUST be freed with `bearing_free_string()`).
/// - NULL on error.
#[no_mangle]
pub unsafe extern "C" fn bearing_tracker_snapshot_json(
    tracker: *const BearingTracker,
) -> *mut c_char {
    if tracker.is_null() {
        return ptr::null_mut();
    }

    let tracker = &*tracker;
    let json = match serde_json::to_string(&tracker.tracker.snapshot()) {
        Ok(json) => json,
        Err(err) => {
            log::warn!("snapshot serialization failed: {}", err);
            return ptr::null_mut();
        }
    };

    match CString::new(json) {
        Ok(cstring) => cstring.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Free a string returned by `bearing_tracker_snapshot_json()`.
///
/// # Safety
/// - `ptr` must be a string returned by this library.
/// - Must not be called more than once for the same pointer.
#[no_mangle]
pub unsafe extern "C" fn bearing_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// VERSION INFO
// ============================================================================

/// Get the library version string.
///
/// # Returns
/// - Static string, do NOT free.
#[no_mangle]
pub extern "C" fn bearing_version() -> *const c_char {
    static VERSION: &[u8] = concat!("tag-bearing/", env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

// ============================================================================
// HELPERS
// ============================================================================

fn into_handle(config: TrackerConfig) -> *mut BearingTracker {
    match PeerTracker::try_new(config) {
        Ok(tracker) => Box::into_raw(Box::new(BearingTracker { tracker })),
        Err(err) => {
            log::warn!("rejected tracker config: {}", err);
            ptr::null_mut()
        }
    }
}

fn aux_reading(timestamp_ms: u64, heading_rad: f32, step_count: i64) -> AuxiliaryReading {
    let heading = if heading_rad.is_finite() { Some(heading_rad) } else { None };
    let steps = u64::try_from(step_count).ok();
    AuxiliaryReading::new(heading, steps, timestamp_ms)
}

fn fill_update_output(output: &mut BearingUpdateOutput, update: &TrackerUpdate) {
    let estimate = &update.estimate;
    output.target_bearing = estimate.target_bearing;
    output.displayed_bearing = update.displayed_bearing;
    output.quality = match estimate.quality {
        SignalQuality::NoSignal => 0,
        SignalQuality::Low => 1,
        SignalQuality::High => 2,
    };
    output.has_direction = estimate.has_direction as i32;
    output.source = estimate.source as i32;
    output.consecutive_misses = estimate.consecutive_misses;
    output.aligned = update.aligned as i32;
    output.alignment_event = update.alignment_event.is_some() as i32;
    output.hint = update.hint as i32;
    output.distance_m = update.distance_m.unwrap_or(-1.0);
}

// ============================================================================
// TESTS
// ============================================================================
