use serde::Serialize;
use std::fmt;

/// Readings strictly below this are `Near`.
pub const LOW_THRESHOLD_CM: f64 = 10.0;
/// Readings strictly below this (and at or above `LOW_THRESHOLD_CM`) are `Mid`.
pub const MEDIUM_THRESHOLD_CM: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProximityBand {
    Near,
    Mid,
    Far,
}

impl ProximityBand {
    pub const ALL: [ProximityBand; 3] = [Self::Near, Self::Mid, Self::Far];
}

impl fmt::Display for ProximityBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProximityBand::Near => write!(f, "near"),
            ProximityBand::Mid => write!(f, "mid"),
            ProximityBand::Far => write!(f, "far"),
        }
    }
}

/// Map a distance to its band. Total over `f64`: NaN falls through to `Far`.
pub fn classify(distance_cm: f64) -> ProximityBand {
    if distance_cm < LOW_THRESHOLD_CM {
        ProximityBand::Near
    } else if distance_cm < MEDIUM_THRESHOLD_CM {
        ProximityBand::Mid
    } else {
        ProximityBand::Far
    }
}
