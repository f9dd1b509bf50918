//! Angle arithmetic on the circle.
//!
//! Every bearing in this crate lives in (-π, π]. Naive subtraction or
//! averaging of raw values breaks at the ±π seam (179° and -179° are 2° apart,
//! not 358°), so all comparisons go through [`shortest_angular_difference`]
//! and all averages through [`circular_mean`].

use std::f32::consts::PI;

const TWO_PI: f32 = 2.0 * PI;

/// Normalize angle to the (-π, π] range.
///
/// `-π` maps to `π` so that "behind" has a single representation.
pub fn normalize_angle(angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    if angle > -PI && angle <= PI {
        return angle;
    }
    let a = angle.rem_euclid(TWO_PI);
    if a > PI {
        a - TWO_PI
    } else {
        a
    }
}

/// Signed shortest rotation that takes `from` onto `to`, in (-π, π].
///
/// Positive means turning right (clockwise seen from above).
pub fn shortest_angular_difference(from: f32, to: f32) -> f32 {
    normalize_angle(to - from)
}

/// Average of angles that is correct across the ±π seam.
///
/// The first entry is the reference; each entry contributes its shortest
/// difference from the reference, and the mean difference is added back.
/// Returns `None` for an empty input.
pub fn circular_mean<I>(angles: I) -> Option<f32>
where
    I: IntoIterator<Item = f32>,
{
    let mut iter = angles.into_iter();
    let reference = iter.next()?;

    let mut sum = 0.0f32;
    let mut count = 1usize;
    for angle in iter {
        sum += shortest_angular_difference(reference, angle);
        count += 1;
    }

    Some(normalize_angle(reference + sum / count as f32))
}

/// Move `current` toward `target` along the short way by `factor` of the gap.
pub fn blend_toward(current: f32, target: f32, factor: f32) -> f32 {
    let diff = shortest_angular_difference(current, target);
    normalize_angle(current + diff * factor)
}

/// Convert radians to degrees.
pub fn rad_to_deg(rad: f32) -> f32 {
    rad * 180.0 / PI
}

/// Convert degrees to radians.
pub fn deg_to_rad(deg: f32) -> f32 {
    deg * PI / 180.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rstest::rstest;

    #[test]
    fn test_normalize_keeps_range() {
        assert_abs_diff_eq!(normalize_angle(0.0), 0.0);
        assert_abs_diff_eq!(normalize_angle(PI), PI);
        assert_abs_diff_eq!(normalize_angle(-PI), PI);
        assert_abs_diff_eq!(normalize_angle(2.5 * PI), 0.5 * PI, epsilon = 1e-5);
        assert_abs_diff_eq!(normalize_angle(-0.5 * PI - TWO_PI), -0.5 * PI, epsilon = 1e-5);
    }

    #[test]
    fn test_normalize_non_finite() {
        assert_eq!(normalize_angle(f32::NAN), 0.0);
        assert_eq!(normalize_angle(f32::INFINITY), 0.0);
    }

    #[test]
    fn test_normalize_huge_values() {
        for angle in [1e9, -1e9, f32::MAX, f32::MIN, 1e-40] {
            let a = normalize_angle(angle);
            assert!(a > -PI && a <= PI, "{} normalized to {}", angle, a);
        }
    }

    #[test]
    fn test_shortest_difference_across_seam() {
        let diff = shortest_angular_difference(deg_to_rad(179.0), deg_to_rad(-179.0));
        assert_abs_diff_eq!(rad_to_deg(diff), 2.0, epsilon = 1e-3);

        let back = shortest_angular_difference(deg_to_rad(-179.0), deg_to_rad(179.0));
        assert_abs_diff_eq!(rad_to_deg(back), -2.0, epsilon = 1e-3);
    }

    #[rstest]
    #[case(0.0, 0.0)]
    #[case(170.0, -170.0)]
    #[case(-90.0, 90.0)]
    #[case(45.0, -135.0)]
    #[case(180.0, 0.0)]
    #[case(-10.0, 350.0)]
    fn test_shortest_difference_bounded(#[case] from_deg: f32, #[case] to_deg: f32) {
        let diff = shortest_angular_difference(deg_to_rad(from_deg), deg_to_rad(to_deg));
        assert!(diff > -PI && diff <= PI, "diff {} out of range", diff);
        assert!(diff.abs() <= PI);
    }

    #[test]
    fn test_circular_mean_across_seam() {
        let angles = [179.0, -179.0, 178.0].map(deg_to_rad);
        let mean = circular_mean(angles).unwrap();
        // (0 + 2 - 1) / 3 added to 179
        assert_abs_diff_eq!(rad_to_deg(mean), 179.333, epsilon = 1e-2);
    }

    #[test]
    fn test_circular_mean_simple() {
        let mean = circular_mean([0.1, 0.2, 0.3]).unwrap();
        assert_abs_diff_eq!(mean, 0.2, epsilon = 1e-6);
        assert!(circular_mean(std::iter::empty::<f32>()).is_none());
    }

    #[test]
    fn test_blend_toward_short_way() {
        let start = deg_to_rad(170.0);
        let target = deg_to_rad(-170.0);
        let blended = blend_toward(start, target, 0.25);
        assert_abs_diff_eq!(rad_to_deg(blended), 175.0, epsilon = 1e-3);
    }

    #[test]
    fn test_rad_deg_conversion() {
        assert_abs_diff_eq!(rad_to_deg(PI), 180.0, epsilon = 1e-4);
        assert_abs_diff_eq!(deg_to_rad(180.0), PI, epsilon = 1e-6);
    }
}
