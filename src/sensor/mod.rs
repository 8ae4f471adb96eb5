use crate::bus::{InputLine, OutputLine};
use crate::error::{AppError, EchoEdge};
use std::time::{Duration, Instant};
use tracing::error;

pub mod mock;
pub mod sim;

/// HC-SR04 needs at least 10us of trigger high to start a burst.
pub const TRIGGER_PULSE_WIDTH: Duration = Duration::from_micros(10);
pub const DEFAULT_ECHO_TIMEOUT: Duration = Duration::from_millis(100);

/// Something that can take one echo-pulse measurement per call.
pub trait Rangefinder {
    /// Trigger the sensor once and time the resulting echo pulse.
    fn measure(&mut self) -> Result<Duration, AppError>;
}

impl Rangefinder for Box<dyn Rangefinder + Send> {
    fn measure(&mut self) -> Result<Duration, AppError> {
        (**self).measure()
    }
}

/// Drive `trigger` high for `width`, then low.
pub fn send_trigger_pulse<T>(trigger: &mut T, width: Duration) -> Result<(), AppError>
where
    T: OutputLine + ?Sized,
{
    trigger.set_high()?;
    // Thread sleep overshoots by tens of microseconds; spin instead.
    let start = Instant::now();
    while start.elapsed() < width {
        std::hint::spin_loop();
    }
    trigger.set_low()
}

/// Busy-poll `echo` for one high pulse and return its width.
///
/// Each edge gets its own `timeout` budget, so a sensor that never answers,
/// or one stuck high, yields `SensorTimeout` instead of blocking forever.
pub fn measure_echo<E>(echo: &mut E, timeout: Duration) -> Result<Duration, AppError>
where
    E: InputLine + ?Sized,
{
    let wait_start = Instant::now();
    let mut pulse_start = wait_start;
    while !echo.is_high() {
        pulse_start = Instant::now();
        if pulse_start.duration_since(wait_start) > timeout {
            return Err(AppError::SensorTimeout {
                edge: EchoEdge::Rising,
                timeout,
            });
        }
    }

    let mut pulse_end = Instant::now();
    while echo.is_high() {
        pulse_end = Instant::now();
        if pulse_end.duration_since(pulse_start) > timeout {
            return Err(AppError::SensorTimeout {
                edge: EchoEdge::Falling,
                timeout,
            });
        }
    }

    Ok(pulse_end.saturating_duration_since(pulse_start))
}

/// Trigger/echo ultrasonic rangefinder over two GPIO lines.
pub struct HcSr04<T: OutputLine, E: InputLine> {
    trigger: T,
    echo: E,
    echo_timeout: Duration,
}

impl<T: OutputLine, E: InputLine> HcSr04<T, E> {
    pub fn new(mut trigger: T, echo: E, echo_timeout: Duration) -> Result<Self, AppError> {
        trigger.set_low()?;
        Ok(Self {
            trigger,
            echo,
            echo_timeout,
        })
    }
}

impl<T: OutputLine, E: InputLine> Rangefinder for HcSr04<T, E> {
    fn measure(&mut self) -> Result<Duration, AppError> {
        send_trigger_pulse(&mut self.trigger, TRIGGER_PULSE_WIDTH)?;
        measure_echo(&mut self.echo, self.echo_timeout)
    }
}

impl<T: OutputLine, E: InputLine> Drop for HcSr04<T, E> {
    fn drop(&mut self) {
        if let Err(err) = self.trigger.set_low() {
            error!(error = %err, "Failed to release trigger line");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::sim::{Journal, SimLine};
    use crate::sensor::mock::{ScriptedEcho, TimedEcho};

    #[test]
    fn trigger_pulse_goes_high_then_low() -> Result<(), AppError> {
        let journal = Journal::default();
        let mut trigger = SimLine::with_journal("trigger", std::sync::Arc::clone(&journal));

        let start = Instant::now();
        send_trigger_pulse(&mut trigger, TRIGGER_PULSE_WIDTH)?;

        assert!(start.elapsed() >= TRIGGER_PULSE_WIDTH);
        assert!(!trigger.is_high());
        let entries = journal.lock().expect("journal lock").clone();
        assert_eq!(entries, vec![("trigger", true), ("trigger", false)]);
        Ok(())
    }

    #[test]
    fn echo_width_matches_pulse() -> Result<(), AppError> {
        let mut echo = TimedEcho::new(Duration::from_millis(1), Duration::from_millis(5));

        let width = measure_echo(&mut echo, DEFAULT_ECHO_TIMEOUT)?;

        assert!(width >= Duration::from_millis(4), "measured {width:?}");
        assert!(width < Duration::from_millis(50), "measured {width:?}");
        Ok(())
    }

    #[test]
    fn scripted_levels_produce_a_pulse() -> Result<(), AppError> {
        let mut echo = ScriptedEcho::new([false, false, true, true, true, false]);

        let width = measure_echo(&mut echo, DEFAULT_ECHO_TIMEOUT)?;

        assert!(width < DEFAULT_ECHO_TIMEOUT);
        Ok(())
    }

    #[test]
    fn silent_echo_times_out_on_rising_edge() {
        let mut echo = ScriptedEcho::new([false]);
        let timeout = Duration::from_millis(20);

        let start = Instant::now();
        let err = measure_echo(&mut echo, timeout).unwrap_err();

        assert!(matches!(
            err,
            AppError::SensorTimeout {
                edge: EchoEdge::Rising,
                ..
            }
        ));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn stuck_high_echo_times_out_on_falling_edge() {
        let mut echo = ScriptedEcho::new([false, true]);

        let err = measure_echo(&mut echo, Duration::from_millis(20)).unwrap_err();

        assert!(matches!(
            err,
            AppError::SensorTimeout {
                edge: EchoEdge::Falling,
                ..
            }
        ));
    }

    #[test]
    fn rangefinder_triggers_before_timing() -> Result<(), AppError> {
        let journal = Journal::default();
        let trigger = SimLine::with_journal("trigger", std::sync::Arc::clone(&journal));
        let observer = trigger.clone();
        let echo = TimedEcho::new(Duration::ZERO, Duration::from_millis(2));
        let mut sensor = HcSr04::new(trigger, echo, DEFAULT_ECHO_TIMEOUT)?;

        let width = sensor.measure()?;

        assert!(width >= Duration::from_millis(1));
        assert!(!observer.is_high());
        let entries = journal.lock().expect("journal lock").clone();
        assert_eq!(
            entries,
            vec![("trigger", false), ("trigger", true), ("trigger", false)]
        );
        Ok(())
    }
}
