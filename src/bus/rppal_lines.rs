use crate::bus::{InputLine, OutputLine};
use crate::error::AppError;
use rppal::gpio::{Gpio, InputPin, OutputPin};

/// Owns the GPIO controller for the lifetime of the acquired pins.
pub struct RppalGpio {
    gpio: Gpio,
}

impl RppalGpio {
    pub fn new() -> Result<Self, AppError> {
        let gpio = Gpio::new().map_err(|err| AppError::Gpio(err.to_string()))?;
        Ok(Self { gpio })
    }

    /// Claim `pin` as an output, driven low before it is handed out.
    pub fn output(&self, pin: u8) -> Result<RppalOutput, AppError> {
        let mut output = self
            .gpio
            .get(pin)
            .map_err(|err| AppError::Gpio(format!("pin {pin}: {err}")))?
            .into_output_low();
        // Restore the pin's original mode when the handle is dropped.
        output.set_reset_on_drop(true);
        Ok(RppalOutput { output })
    }

    pub fn input(&self, pin: u8) -> Result<RppalInput, AppError> {
        let input = self
            .gpio
            .get(pin)
            .map_err(|err| AppError::Gpio(format!("pin {pin}: {err}")))?
            .into_input();
        Ok(RppalInput { input })
    }
}

pub struct RppalOutput {
    output: OutputPin,
}

impl OutputLine for RppalOutput {
    fn set_high(&mut self) -> Result<(), AppError> {
        self.output.set_high();
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), AppError> {
        self.output.set_low();
        Ok(())
    }
}

pub struct RppalInput {
    input: InputPin,
}

impl InputLine for RppalInput {
    fn is_high(&mut self) -> bool {
        self.input.is_high()
    }
}
