/// Scripted walk example: approach a tag, turn to face it, feel the haptic tick
use tag_bearing::{AuxiliaryReading, PeerTracker, RangingUpdate, TrackerConfig, TrackerUpdate};

fn main() {
    println!("=== Tag Bearing: Scripted Walk Example ===\n");

    let config = TrackerConfig::default();
    println!("Tracker configured with:");
    println!("  - Dead zone: {:.1}°", config.estimator.dead_zone_rad.to_degrees());
    println!("  - History: {} readings", config.estimator.history_capacity);
    println!("  - Display: {} Hz\n", config.animator.frame_rate_hz);

    let frames_per_update = (config.animator.frame_rate_hz / 15.0).round() as usize;
    let mut tracker = PeerTracker::new(config);
    tracker.set_peer_name("Keys");

    // (timestamp ms, tag azimuth in degrees, distance in meters)
    // Tag starts 70° to the right; the user walks toward it, then turns.
    let mut script = Vec::new();
    for i in 0..20u64 {
        script.push((i * 67, 70.0 - i as f32 * 0.5, 6.0 - i as f32 * 0.1));
    }
    for i in 0..15u64 {
        script.push((1_340 + i * 67, 5.0 - i as f32 * 0.3, 4.0 - i as f32 * 0.05));
    }

    println!("Processing {} ranging updates...\n", script.len());

    let mut haptics = 0;
    for (timestamp, azimuth_deg, distance) in script {
        let azimuth = azimuth_deg.to_radians();
        let update = RangingUpdate::direction(azimuth.sin() * 0.9, 0.0, -azimuth.cos() * 0.9)
            .with_distance(distance);
        let aux = AuxiliaryReading::new(Some(0.0), Some(timestamp / 500), timestamp);

        let result = tracker.ingest(&update, &aux);
        print_update(timestamp, &result);
        if result.alignment_event.is_some() {
            haptics += 1;
            println!("    >>> haptic: tag is ahead");
        }

        for _ in 0..frames_per_update {
            if let Some(event) = tracker.tick().alignment_event {
                haptics += 1;
                println!("    >>> haptic: tag is ahead (arrow swung {:.0}°)", event.gap_rad.to_degrees());
            }
        }
    }

    println!("\n=== Summary ===");
    println!("Final bearing: {:+.1}°", tracker.target_bearing().to_degrees());
    println!("Arrow shows:   {:+.1}°", tracker.displayed_bearing().to_degrees());
    println!("Haptic ticks:  {}", haptics);
    match serde_json::to_string_pretty(&tracker.snapshot()) {
        Ok(json) => println!("\nSnapshot:\n{}", json),
        Err(err) => println!("\nSnapshot unavailable: {}", err),
    }
}

fn print_update(timestamp: u64, update: &TrackerUpdate) {
    println!(
        "[{:>5} ms] target {:+6.1}°  arrow {:+6.1}°  {:?}  {}  {}",
        timestamp,
        update.estimate.target_bearing.to_degrees(),
        update.displayed_bearing.to_degrees(),
        update.estimate.quality,
        update.hint,
        update
            .distance_m
            .map(|d| format!("{:.1} m", d))
            .unwrap_or_else(|| "-".to_string()),
    );
}
