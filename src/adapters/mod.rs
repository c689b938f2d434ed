//! Transport adapters
//!
//! An adapter moves one line-delimited ASCII request to the device and brings
//! one reply line back. Drivers in [`crate::instrument`] only ever talk to an
//! [`Adapter`], so the serial port, the simulated Arduino and the scripted
//! test double are interchangeable.

pub mod mock;
pub mod serial_adapter;
pub mod simulated;

pub use mock::MockAdapter;
pub use serial_adapter::SerialAdapter;
pub use simulated::SimulatedArduino;

use crate::error::AppResult;
use async_trait::async_trait;

/// Line terminator appended to every request.
pub const WRITE_TERMINATION: &str = "\n";

/// Line terminator the device ends every reply with.
pub const READ_TERMINATION: &str = "\r\n";

/// Request/response link to a single device.
///
/// Implementations assume single-threaded, sequential use: one query is fully
/// answered before the next one is written.
#[async_trait]
pub trait Adapter: Send {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Write `command` and return the reply line without its terminator.
    async fn query(&mut self, command: &str) -> AppResult<String>;

    /// Release the underlying connection.
    async fn close(&mut self) -> AppResult<()>;
}

/// Strip the read terminator (and stray whitespace) from a raw reply.
pub(crate) fn strip_reply(raw: &str) -> String {
    raw.trim_end_matches(READ_TERMINATION)
        .trim()
        .to_string()
}
