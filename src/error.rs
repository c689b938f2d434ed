//! Custom error types for the application.
//!
//! This module defines the primary error type, `DaqError`, for the whole crate.
//! Using the `thiserror` crate, it gives every layer (transport, driver, sweep,
//! export, configuration) one consistent failure vocabulary.
//!
//! ## Error Hierarchy
//!
//! - **`Connection`**: the port could not be opened, timed out, hit EOF, or the
//!   device did not answer identification. Fatal to the experiment.
//! - **`Parse`**: a reply that should have been an integer ADC code was not.
//!   A single malformed reply aborts the sweep; there is no per-sample retry.
//! - **`Range`**: sweep parameters that would aggregate an empty sample set
//!   (repeat count of one or less).
//! - **`Configuration`** / **`Config`**: semantic and loading errors of the
//!   `Settings` file.
//! - **`FeatureNotEnabled`**: functionality compiled out via cargo features.
//!
//! No layer recovers locally. Errors surface to the immediate caller and only
//! the binary / GUI boundary turns them into user-visible messages.

use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, DaqError>;

#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum DaqError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Could not parse reply {reply:?} to '{command}' as an integer")]
    Parse { command: String, reply: String },

    #[error("Range error: {0}")]
    Range(String),

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Configuration validation error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "storage_csv")]
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serial port not connected")]
    SerialPortNotConnected,

    #[error("Feature '{0}' is not enabled. Please build with --features {0}")]
    FeatureNotEnabled(String),

    #[error("Background sweep task failed: {0}")]
    TaskFailed(String),
}

impl DaqError {
    /// True for failures of the link to the device rather than of its data.
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            DaqError::Connection(_) | DaqError::SerialPortNotConnected
        )
    }
}

impl From<figment::Error> for DaqError {
    fn from(err: figment::Error) -> Self {
        DaqError::Config(Box::new(err))
    }
}
