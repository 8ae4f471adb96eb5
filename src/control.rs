use crate::bus::OutputLine;
use crate::bus::indicators::IndicatorBank;
use crate::error::AppError;
use crate::estimation::{classify, distance_cm};
use crate::logger::DistanceLog;
use crate::sensor::Rangefinder;
use crate::state::{ControlStatus, Reading, SharedState};
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant, SystemTime};
use tracing::{error, info, warn};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);
const STOP_POLL_STEP: Duration = Duration::from_millis(100);

/// Sole owner of the sensor and indicator lines, and sole writer of the
/// shared reading.
pub struct ControlLoop<R, L, W>
where
    R: Rangefinder,
    L: OutputLine,
    W: Write,
{
    rangefinder: R,
    indicators: IndicatorBank<L>,
    log: DistanceLog<W>,
    state: SharedState,
    interval: Duration,
}

impl<R, L, W> ControlLoop<R, L, W>
where
    R: Rangefinder,
    L: OutputLine,
    W: Write,
{
    pub fn new(
        rangefinder: R,
        indicators: IndicatorBank<L>,
        log: DistanceLog<W>,
        state: SharedState,
        interval: Duration,
    ) -> Self {
        Self {
            rangefinder,
            indicators,
            log,
            state,
            interval,
        }
    }

    pub fn log(&self) -> &DistanceLog<W> {
        &self.log
    }

    /// One measure, log, indicate, publish pass.
    ///
    /// A sensor timeout skips the rest of the cycle and leaves the shared
    /// reading untouched. An indicator fault is reported but the reading is
    /// still published.
    pub fn run_cycle(&mut self) -> Result<Reading, AppError> {
        let pulse = match self.rangefinder.measure() {
            Ok(pulse) => pulse,
            Err(err) => {
                let faulted = ControlStatus::Faulted {
                    reason: err.to_string(),
                };
                if let Err(status_err) = self.set_status(faulted) {
                    error!(error = %status_err, "Could not record sensor fault");
                }
                return Err(err);
            }
        };
        let distance = distance_cm(pulse);
        info!("Distance: {distance:.2} cm");

        self.log.record(distance);

        let band = classify(distance);
        let status = match self.indicators.show(band) {
            Ok(()) => ControlStatus::Running,
            Err(err) => {
                error!(error = %err, %band, "Indicator fault, check wiring");
                ControlStatus::Faulted {
                    reason: err.to_string(),
                }
            }
        };

        let reading = Reading {
            distance_cm: distance,
            band: Some(band),
            timestamp: Some(SystemTime::now()),
        };
        {
            let mut guard = self.state.write().map_err(|_| AppError::StateLock)?;
            guard.set_reading(reading);
            guard.set_status(status);
        }
        Ok(reading)
    }

    /// Cycle until `stop` is set, then switch every indicator off.
    pub fn run(&mut self, stop: &AtomicBool) {
        info!(
            interval_ms = self.interval.as_millis(),
            "Control loop running"
        );
        while !stop.load(Ordering::Relaxed) {
            let cycle_start = Instant::now();
            match self.run_cycle() {
                Ok(_) => {}
                Err(err @ AppError::SensorTimeout { .. }) => {
                    warn!(error = %err, "Skipping cycle");
                }
                Err(err) => {
                    error!(error = %err, "Control cycle failed");
                }
            }
            sleep_with_stop(self.interval, stop, cycle_start);
        }
        self.shutdown();
    }

    /// Release the outputs. Safe to call more than once.
    pub fn shutdown(&mut self) {
        info!("Control loop stopping");
        match self.indicators.all_off() {
            Ok(()) => info!("GPIO cleanup complete"),
            Err(err) => error!(error = %err, "Failed to switch indicators off"),
        }
        if let Err(err) = self.set_status(ControlStatus::Stopped) {
            warn!(error = %err, "Could not record stopped status");
        }
    }

    fn set_status(&self, status: ControlStatus) -> Result<(), AppError> {
        let mut guard = self.state.write().map_err(|_| AppError::StateLock)?;
        guard.set_status(status);
        Ok(())
    }
}

/// Run the loop on a dedicated thread so echo polling never blocks async tasks.
pub fn spawn_control_thread<R, L, W>(
    mut control: ControlLoop<R, L, W>,
    stop: Arc<AtomicBool>,
) -> std::thread::JoinHandle<()>
where
    R: Rangefinder + Send + 'static,
    L: OutputLine + Send + 'static,
    W: Write + Send + 'static,
{
    std::thread::spawn(move || control.run(&stop))
}

fn sleep_with_stop(duration: Duration, stop: &AtomicBool, start: Instant) {
    loop {
        if stop.load(Ordering::Relaxed) {
            return;
        }
        let elapsed = start.elapsed();
        if elapsed >= duration {
            return;
        }
        std::thread::sleep(STOP_POLL_STEP.min(duration - elapsed));
    }
}
