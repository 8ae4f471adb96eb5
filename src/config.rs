use crate::control::DEFAULT_INTERVAL;
use crate::logger::DEFAULT_LOG_PATH;
use crate::sensor::DEFAULT_ECHO_TIMEOUT;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";
pub const DEFAULT_SERVER_PORT: u16 = 5000;

// BCM numbering.
pub const DEFAULT_TRIGGER_PIN: u8 = 14;
pub const DEFAULT_ECHO_PIN: u8 = 15;
pub const DEFAULT_NEAR_PIN: u8 = 16;
pub const DEFAULT_MID_PIN: u8 = 17;
pub const DEFAULT_FAR_PIN: u8 = 18;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub app: AppSection,
    pub logging: LoggingSection,
    #[serde(default)]
    pub sensor: Option<SensorSection>,
    #[serde(default)]
    pub indicators: Option<IndicatorsSection>,
    #[serde(default)]
    pub control: Option<ControlSection>,
    #[serde(default)]
    pub distance_log: Option<DistanceLogSection>,
    #[serde(default)]
    pub server: Option<ServerSection>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSection {
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSection {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SensorMode {
    #[default]
    Gpio,
    Simulated,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SensorSection {
    #[serde(default)]
    pub mode: SensorMode,
    pub trigger_pin: Option<u8>,
    pub echo_pin: Option<u8>,
    /// Maximum wait for each echo edge, in milliseconds (default: 100)
    pub echo_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndicatorsSection {
    pub near_pin: Option<u8>,
    pub mid_pin: Option<u8>,
    pub far_pin: Option<u8>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ControlSection {
    /// Delay between measurement cycles in milliseconds (default: 1000)
    pub interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DistanceLogSection {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSection {
    /// Port to listen on (default: 5000)
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorPins {
    pub trigger: u8,
    pub echo: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorPins {
    pub near: u8,
    pub mid: u8,
    pub far: u8,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

pub fn load_default() -> Result<Config, ConfigError> {
    load_from_path(DEFAULT_CONFIG_PATH)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "logging.level {:?} is not one of trace, debug, info, warn, error",
                self.logging.level
            )));
        }

        if self.echo_timeout().is_zero() {
            return Err(ConfigError::Invalid(
                "sensor.echo_timeout_ms must be greater than zero".to_string(),
            ));
        }

        let sensor = self.sensor_pins();
        let indicators = self.indicator_pins();
        let mut pins = vec![
            sensor.trigger,
            sensor.echo,
            indicators.near,
            indicators.mid,
            indicators.far,
        ];
        pins.sort_unstable();
        if pins.windows(2).any(|pair| pair[0] == pair[1]) {
            return Err(ConfigError::Invalid(
                "sensor and indicator pins must be distinct".to_string(),
            ));
        }
        Ok(())
    }

    pub fn log_level(&self) -> &str {
        &self.logging.level
    }

    pub fn sensor_mode(&self) -> SensorMode {
        self.sensor.as_ref().map(|s| s.mode).unwrap_or_default()
    }

    pub fn sensor_pins(&self) -> SensorPins {
        let section = self.sensor.as_ref();
        SensorPins {
            trigger: section
                .and_then(|s| s.trigger_pin)
                .unwrap_or(DEFAULT_TRIGGER_PIN),
            echo: section.and_then(|s| s.echo_pin).unwrap_or(DEFAULT_ECHO_PIN),
        }
    }

    /// Returns the per-edge echo timeout (default: 100 ms)
    pub fn echo_timeout(&self) -> Duration {
        self.sensor
            .as_ref()
            .and_then(|s| s.echo_timeout_ms)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_ECHO_TIMEOUT)
    }

    pub fn indicator_pins(&self) -> IndicatorPins {
        let section = self.indicators.as_ref();
        IndicatorPins {
            near: section.and_then(|s| s.near_pin).unwrap_or(DEFAULT_NEAR_PIN),
            mid: section.and_then(|s| s.mid_pin).unwrap_or(DEFAULT_MID_PIN),
            far: section.and_then(|s| s.far_pin).unwrap_or(DEFAULT_FAR_PIN),
        }
    }

    /// Returns the control loop cadence (default: 1 second)
    pub fn interval(&self) -> Duration {
        self.control
            .as_ref()
            .and_then(|c| c.interval_ms)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_INTERVAL)
    }

    pub fn log_path(&self) -> &Path {
        self.distance_log
            .as_ref()
            .and_then(|l| l.path.as_deref())
            .filter(|path| !path.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new(DEFAULT_LOG_PATH))
    }

    /// Returns the server port (default: 5000)
    pub fn server_port(&self) -> u16 {
        self.server
            .as_ref()
            .and_then(|s| s.port)
            .unwrap_or(DEFAULT_SERVER_PORT)
    }
}
