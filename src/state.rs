use crate::estimation::ProximityBand;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

/// Latest-reading slot shared between the control loop and HTTP handlers.
pub type SharedState = Arc<RwLock<AppState>>;

/// Distance reported before the first successful measurement.
pub const SENTINEL_DISTANCE_CM: f64 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub distance_cm: f64,
    pub band: Option<ProximityBand>,
    pub timestamp: Option<SystemTime>,
}

impl Reading {
    pub fn sentinel() -> Self {
        Self {
            distance_cm: SENTINEL_DISTANCE_CM,
            band: None,
            timestamp: None,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.timestamp.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlStatus {
    Starting,
    Running,
    Faulted { reason: String },
    Stopped,
}

#[derive(Debug)]
pub struct AppState {
    reading: Reading,
    status: ControlStatus,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            reading: Reading::sentinel(),
            status: ControlStatus::Starting,
        }
    }

    pub fn shared() -> SharedState {
        Arc::new(RwLock::new(Self::new()))
    }

    pub fn reading(&self) -> Reading {
        self.reading
    }

    /// Overwrite the slot. Readers only ever see whole readings.
    pub fn set_reading(&mut self, reading: Reading) {
        self.reading = reading;
    }

    pub fn status(&self) -> &ControlStatus {
        &self.status
    }

    pub fn set_status(&mut self, status: ControlStatus) {
        self.status = status;
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
