//! Configuration System using Figment
//!
//! Configuration is layered, lowest precedence first:
//! 1. Built-in defaults (`Settings::default()`)
//! 2. A TOML file (`config/default.toml` unless another path is given)
//! 3. Environment variables prefixed with `PVDAQ_`, `__` separating sections
//!
//! # Environment Variable Overrides
//!
//! ```text
//! PVDAQ_INSTRUMENT__PORT=/dev/ttyACM0
//! PVDAQ_INSTRUMENT__SIMULATE=true
//! PVDAQ_SWEEP__COUNT=10
//! ```

use crate::error::{AppResult, DaqError};
use crate::measurement::ADC_REFERENCE_VOLTAGE;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Application settings
    pub application: ApplicationSettings,
    /// Serial link to the Arduino
    pub instrument: InstrumentSettings,
    /// Defaults for the LED current-voltage sweep
    pub sweep: SweepSettings,
    /// Defaults for the solar cell resistance sweep
    pub resistance_sweep: ResistanceSweepSettings,
    /// Export settings
    pub storage: StorageSettings,
    /// Plot appearance
    pub plot: PlotConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSettings {
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Serial port of the Arduino VISA device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentSettings {
    /// Port name (e.g. "/dev/ttyACM0", "COM3")
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Overall timeout of one query in milliseconds
    pub timeout_ms: u64,
    /// Talk to the built-in simulated device instead of a serial port
    pub simulate: bool,
}

/// LED sweep parameters, in volts on the output channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepSettings {
    /// First output voltage
    pub start_volts: f64,
    /// Last output voltage (inclusive)
    pub stop_volts: f64,
    /// Repeat count per level; `count - 1` samples are taken
    pub count: u32,
}

/// Resistance sweep parameters, in raw output codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResistanceSweepSettings {
    /// First output code
    pub start: u16,
    /// Output code to stop before (exclusive)
    pub stop: u16,
}

/// Where exported CSV files go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory for timestamped exports
    pub output_dir: PathBuf,
}

/// Appearance of the current-voltage plot.
///
/// Passed explicitly to the presentation layer instead of living in global
/// plotting state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    /// Window and plot title
    pub title: String,
    /// Horizontal axis label
    pub x_label: String,
    /// Vertical axis label
    pub y_label: String,
    /// White background with black foreground
    pub light_theme: bool,
    /// Radius of the mean markers in points
    pub marker_radius: f32,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl Default for InstrumentSettings {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM0".to_string(),
            baud_rate: 9600,
            timeout_ms: 2000,
            simulate: false,
        }
    }
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            start_volts: 0.0,
            stop_volts: 3.3,
            count: 4,
        }
    }
}

impl Default for ResistanceSweepSettings {
    fn default() -> Self {
        Self {
            start: 0,
            stop: 1023,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("data"),
        }
    }
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            title: "UI curve with uncertainties.".to_string(),
            x_label: "Voltage (V)".to_string(),
            y_label: "Current (A)".to_string(),
            light_theme: true,
            marker_radius: 3.0,
        }
    }
}

impl InstrumentSettings {
    /// Query timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Settings {
    /// Load configuration from the default file location and the environment.
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load and validate configuration from a specific file path.
    ///
    /// A missing file is not an error; defaults and environment still apply.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let settings = Self::load_unvalidated(path)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Merge defaults, file and environment without validating.
    ///
    /// For callers that apply further overrides (command line flags) and call
    /// [`Settings::validate`] afterwards.
    pub fn load_unvalidated<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("PVDAQ_").split("__"))
            .extract()?;
        Ok(settings)
    }

    /// Validate configuration after loading.
    pub fn validate(&self) -> AppResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.as_str()) {
            return Err(DaqError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        if !self.instrument.simulate && self.instrument.port.trim().is_empty() {
            return Err(DaqError::Configuration(
                "instrument.port cannot be empty".to_string(),
            ));
        }
        if self.instrument.baud_rate == 0 {
            return Err(DaqError::Configuration(
                "instrument.baud_rate must be positive".to_string(),
            ));
        }
        if self.instrument.timeout_ms == 0 {
            return Err(DaqError::Configuration(
                "instrument.timeout_ms must be positive".to_string(),
            ));
        }

        check_output_volts("sweep.start_volts", self.sweep.start_volts)?;
        check_output_volts("sweep.stop_volts", self.sweep.stop_volts)?;

        Ok(())
    }
}

/// Reject output voltages the DAC cannot produce, NaN included.
pub fn check_output_volts(name: &str, volts: f64) -> AppResult<f64> {
    if !(0.0..=ADC_REFERENCE_VOLTAGE).contains(&volts) {
        return Err(DaqError::Configuration(format!(
            "{} = {} is outside 0-{} V",
            name, volts, ADC_REFERENCE_VOLTAGE
        )));
    }
    Ok(volts)
}
