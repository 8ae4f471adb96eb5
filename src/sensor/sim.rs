use crate::error::AppError;
use crate::estimation::SPEED_OF_SOUND_CM_PER_S;
use crate::sensor::Rangefinder;
use std::time::Duration;

const SWEEP_MIN_CM: f64 = 2.0;
const SWEEP_MAX_CM: f64 = 60.0;
const SWEEP_STEP_CM: f64 = 3.5;

/// Stand-in sensor for machines without GPIO. Walks an object back and
/// forth between 2cm and 60cm so every band gets exercised.
#[derive(Debug, Clone)]
pub struct SimRangefinder {
    distance_cm: f64,
    step_cm: f64,
}

impl SimRangefinder {
    pub fn new() -> Self {
        Self {
            distance_cm: SWEEP_MIN_CM,
            step_cm: SWEEP_STEP_CM,
        }
    }

    fn advance(&mut self) {
        let next = self.distance_cm + self.step_cm;
        if !(SWEEP_MIN_CM..=SWEEP_MAX_CM).contains(&next) {
            self.step_cm = -self.step_cm;
        }
        self.distance_cm = (self.distance_cm + self.step_cm).clamp(SWEEP_MIN_CM, SWEEP_MAX_CM);
    }
}

impl Default for SimRangefinder {
    fn default() -> Self {
        Self::new()
    }
}

impl Rangefinder for SimRangefinder {
    fn measure(&mut self) -> Result<Duration, AppError> {
        let round_trip_secs = 2.0 * self.distance_cm / SPEED_OF_SOUND_CM_PER_S;
        self.advance();
        Ok(Duration::from_secs_f64(round_trip_secs))
    }
}
