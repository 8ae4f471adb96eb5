use crate::error::AppError;

pub mod indicators;
pub mod sim;

#[cfg(target_os = "linux")]
pub mod rppal_lines;

/// A single digital output, e.g. the trigger or an indicator LED.
pub trait OutputLine {
    fn set_high(&mut self) -> Result<(), AppError>;
    fn set_low(&mut self) -> Result<(), AppError>;
}

/// A single digital input, e.g. the echo line.
pub trait InputLine {
    fn is_high(&mut self) -> bool;
}

impl OutputLine for Box<dyn OutputLine + Send> {
    fn set_high(&mut self) -> Result<(), AppError> {
        (**self).set_high()
    }
    fn set_low(&mut self) -> Result<(), AppError> {
        (**self).set_low()
    }
}
