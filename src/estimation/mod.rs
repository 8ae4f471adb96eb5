use std::time::Duration;

pub mod band;

pub use band::{LOW_THRESHOLD_CM, MEDIUM_THRESHOLD_CM, ProximityBand, classify};

/// Speed of sound in air, centimeters per second.
pub const SPEED_OF_SOUND_CM_PER_S: f64 = 34_300.0;

/// Convert a round-trip echo duration into a one-way distance in centimeters.
pub fn distance_cm(pulse: Duration) -> f64 {
    (pulse.as_secs_f64() * SPEED_OF_SOUND_CM_PER_S) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(left: f64, right: f64) -> bool {
        (left - right).abs() < 1e-9
    }

    #[test]
    fn distance_is_half_round_trip() {
        assert!(approx_eq(distance_cm(Duration::from_secs(1)), 17_150.0));
        assert!(approx_eq(
            distance_cm(Duration::from_micros(200)),
            0.0002 * 17_150.0
        ));
    }

    #[test]
    fn zero_pulse_is_zero_distance() {
        assert_eq!(distance_cm(Duration::ZERO), 0.0);
    }

    #[test]
    fn distance_is_monotonic_in_pulse() {
        let mut previous = distance_cm(Duration::ZERO);
        for micros in (0..40_000).step_by(37) {
            let current = distance_cm(Duration::from_micros(micros));
            assert!(current >= previous, "{current} < {previous} at {micros}us");
            previous = current;
        }
    }

    #[test]
    fn known_pulses_map_to_expected_bands() {
        let near = distance_cm(Duration::from_micros(200));
        assert!((near - 3.43).abs() < 1e-6);
        assert_eq!(classify(near), ProximityBand::Near);

        let far = distance_cm(Duration::from_millis(2));
        assert!((far - 34.3).abs() < 1e-6);
        assert_eq!(classify(far), ProximityBand::Far);

        // Shortest whole-nanosecond echo that reaches the 10cm boundary.
        let boundary = distance_cm(Duration::from_nanos(583_091));
        assert!((boundary - 10.0).abs() < 0.01);
        assert_eq!(classify(boundary), ProximityBand::Mid);
    }
}
