//! ASCII command set of the Arduino VISA firmware.

use crate::error::{AppResult, DaqError};
use crate::measurement::AdcCode;
use std::fmt;

/// One request line, without terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `*IDN?`
    Identify,
    /// `OUT:CH0 {value}`
    SetOutput(AdcCode),
    /// `OUT:CH0?`
    GetOutput,
    /// `MEAS:CH{n}?`
    Measure(u8),
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Identify => write!(f, "*IDN?"),
            Command::SetOutput(value) => write!(f, "OUT:CH0 {}", value),
            Command::GetOutput => write!(f, "OUT:CH0?"),
            Command::Measure(channel) => write!(f, "MEAS:CH{}?", channel),
        }
    }
}

/// Parse an integer ADC code reply.
pub fn parse_code(command: Command, reply: &str) -> AppResult<AdcCode> {
    reply.trim().parse::<AdcCode>().map_err(|_| DaqError::Parse {
        command: command.to_string(),
        reply: reply.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_text() {
        assert_eq!(Command::Identify.to_string(), "*IDN?");
        assert_eq!(Command::SetOutput(512).to_string(), "OUT:CH0 512");
        assert_eq!(Command::GetOutput.to_string(), "OUT:CH0?");
        assert_eq!(Command::Measure(2).to_string(), "MEAS:CH2?");
    }

    #[test]
    fn test_parse_code() {
        assert_eq!(parse_code(Command::GetOutput, "1023").unwrap(), 1023);
        assert_eq!(parse_code(Command::Measure(1), " 7 ").unwrap(), 7);
    }

    #[test]
    fn test_parse_rejects_non_integers() {
        for reply in ["", "3.3", "ERROR: UNKNOWN COMMAND", "-1"] {
            let err = parse_code(Command::Measure(1), reply).unwrap_err();
            assert!(matches!(err, DaqError::Parse { .. }), "{reply:?}");
        }
    }
}
