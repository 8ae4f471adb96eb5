use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Echo line transition the timer was waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoEdge {
    Rising,
    Falling,
}

impl fmt::Display for EchoEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EchoEdge::Rising => write!(f, "rising"),
            EchoEdge::Falling => write!(f, "falling"),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("sensor timeout: no {edge} echo edge within {timeout:?}")]
    SensorTimeout { edge: EchoEdge, timeout: Duration },
    #[error("log write failed: {0}")]
    LogWrite(#[from] std::io::Error),
    #[error("actuator error: {0}")]
    Actuator(String),
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("state lock poisoned")]
    StateLock,
}
