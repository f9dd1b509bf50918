/// Signal dropout example: the tag goes behind a wall while the user turns
use tag_bearing::{
    BearingSource, LatestHeading, LatestStepCount, ManualClock, PeerTracker, RangingUpdate,
    SensorFeeds, SharedTracker,
};
use std::sync::Arc;

fn main() {
    println!("=== Tag Bearing: Signal Dropout Example ===\n");

    // Host-side sensor publishers. In an app these are fed by the compass and
    // pedometer callbacks.
    let heading = Arc::new(LatestHeading::new());
    let steps = Arc::new(LatestStepCount::new());
    let clock = Arc::new(ManualClock::new(0));
    let feeds = SensorFeeds::new(heading.clone(), steps.clone(), clock.clone());
    let tracker = SharedTracker::new(PeerTracker::default(), feeds);

    heading.publish(0.0);
    steps.publish(0);

    // Phase 1: clear line of sight, tag 30° to the right.
    let azimuth = 30f32.to_radians();
    for _ in 0..5 {
        tracker.ingest(&RangingUpdate::direction(azimuth.sin() * 0.8, 0.0, -azimuth.cos() * 0.8));
        clock.advance(100);
    }
    println!("Locked on: {:+.1}°\n", tracker.snapshot().target_bearing.to_degrees());

    // Phase 2: signal lost. The user turns 20° right, then starts walking.
    println!("Signal lost; user turns 20° right, then walks...");
    for miss in 1..=14u64 {
        heading.publish((miss.min(5) as f32 * 4.0).to_radians());
        if miss > 10 {
            steps.publish(miss - 10);
        }

        let update = tracker.ingest(&RangingUpdate::missing());
        clock.advance(100);

        let estimate = update.estimate;
        println!(
            "  miss {:>2}: {:<12} target {:+6.1}°  {}",
            miss,
            source_label(estimate.source),
            estimate.target_bearing.to_degrees(),
            update.hint,
        );
    }

    println!("\n=== Summary ===");
    let snapshot = tracker.snapshot();
    println!("Consecutive misses: {}", snapshot.consecutive_misses);
    println!(
        "Fusion cache: {}",
        if snapshot.cache.is_some() { "valid" } else { "expired" }
    );
    println!("Expected once turned: {:+.1}°", 30f32 - 20.0);
}

fn source_label(source: BearingSource) -> &'static str {
    match source {
        BearingSource::Direction => "direction",
        BearingSource::HorizontalAngle => "camera",
        BearingSource::Held => "held",
        BearingSource::LightFusion => "light fusion",
        BearingSource::FullFusion => "full fusion",
    }
}
