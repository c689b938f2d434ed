//! Arduino VISA device driver
//!
//! Drives the Arduino VISA firmware over any [`Adapter`]. The board exposes
//! one 10-bit DAC output (channel 0) and three 10-bit ADC inputs.
//!
//! ## Configuration
//!
//! ```toml
//! [instrument]
//! port = "/dev/ttyACM0"
//! baud_rate = 9600
//! timeout_ms = 2000
//! ```

use super::protocol::{parse_code, Command};
use super::ArduinoInstrument;
use crate::adapters::{Adapter, SerialAdapter};
use crate::config::InstrumentSettings;
use crate::error::{AppResult, DaqError};
use crate::measurement::AdcCode;
use async_trait::async_trait;
use tracing::{debug, info};

/// Arduino running the VISA firmware, reached through adapter `A`.
pub struct ArduinoVisaDevice<A: Adapter> {
    adapter: A,
}

impl ArduinoVisaDevice<SerialAdapter> {
    /// Open the configured serial port and check that the device identifies.
    pub async fn open(settings: &InstrumentSettings) -> AppResult<Self> {
        info!("Connecting to Arduino on '{}'", settings.port);
        let adapter = SerialAdapter::open(settings)?;
        Self::with_adapter(adapter).await
    }
}

impl<A: Adapter> ArduinoVisaDevice<A> {
    /// Wrap an already connected adapter and check that the device identifies.
    ///
    /// Any failure of the identification round trip, or an empty reply, is a
    /// connection error.
    pub async fn with_adapter(adapter: A) -> AppResult<Self> {
        let mut device = Self { adapter };
        let idn = device.query(Command::Identify).await.map_err(|e| {
            DaqError::Connection(format!(
                "'{}' did not answer identification: {}",
                device.adapter.name(),
                e
            ))
        })?;
        if idn.is_empty() {
            return Err(DaqError::Connection(format!(
                "'{}' sent an empty identification",
                device.adapter.name()
            )));
        }
        info!("Connected to '{}' on '{}'", idn, device.adapter.name());
        Ok(device)
    }

    /// Borrow the underlying adapter.
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    async fn query(&mut self, command: Command) -> AppResult<String> {
        let text = command.to_string();
        let reply = self.adapter.query(&text).await?;
        debug!("{} -> {}", text, reply);
        Ok(reply)
    }

    async fn query_code(&mut self, command: Command) -> AppResult<AdcCode> {
        let reply = self.query(command).await?;
        parse_code(command, &reply)
    }
}

#[async_trait]
impl<A: Adapter> ArduinoInstrument for ArduinoVisaDevice<A> {
    async fn get_identification(&mut self) -> AppResult<String> {
        self.query(Command::Identify).await
    }

    async fn set_output_value(&mut self, value: AdcCode) -> AppResult<()> {
        // The reply is read to keep request and response in step, its content is unused.
        self.query(Command::SetOutput(value)).await?;
        Ok(())
    }

    async fn get_output_value(&mut self) -> AppResult<AdcCode> {
        self.query_code(Command::GetOutput).await
    }

    async fn get_input_value(&mut self, channel: u8) -> AppResult<AdcCode> {
        self.query_code(Command::Measure(channel)).await
    }

    async fn close(&mut self) -> AppResult<()> {
        info!("Closing '{}'", self.adapter.name());
        self.adapter.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MockAdapter, SimulatedArduino};

    #[tokio::test]
    async fn test_identification_is_checked_on_connect() {
        let mock = MockAdapter::new(|_| String::new());
        let err = ArduinoVisaDevice::with_adapter(mock).await.err();
        assert!(matches!(err, Some(DaqError::Connection(_))));
    }

    #[tokio::test]
    async fn test_get_identification_returns_raw_reply() {
        let mock = MockAdapter::new(|_| "Arduino VISA firmware v1.0.0".to_string());
        let mut device = ArduinoVisaDevice::with_adapter(mock).await.unwrap();
        assert_eq!(
            device.get_identification().await.unwrap(),
            "Arduino VISA firmware v1.0.0"
        );
    }

    #[tokio::test]
    async fn test_out_of_range_value_is_passed_through() {
        let mock = MockAdapter::new(|_| "ok".to_string());
        let log = mock.command_log();
        let mut device = ArduinoVisaDevice::with_adapter(mock).await.unwrap();

        device.set_output_value(4000).await.unwrap();
        assert_eq!(log.lock().unwrap().last().unwrap(), "OUT:CH0 4000");
    }

    #[tokio::test]
    async fn test_non_integer_reply_is_parse_error() {
        let mock = MockAdapter::new(|cmd| match cmd {
            "*IDN?" => "Arduino".to_string(),
            _ => "12.5".to_string(),
        });
        let mut device = ArduinoVisaDevice::with_adapter(mock).await.unwrap();

        let err = device.get_input_value(1).await.unwrap_err();
        match err {
            DaqError::Parse { command, reply } => {
                assert_eq!(command, "MEAS:CH1?");
                assert_eq!(reply, "12.5");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
        assert!(matches!(
            device.get_output_value().await,
            Err(DaqError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn test_input_voltage_uses_adc_scaling() {
        let mut device = ArduinoVisaDevice::with_adapter(SimulatedArduino::new())
            .await
            .unwrap();
        device.set_output_value(1023).await.unwrap();
        let volts = device.get_input_voltage(1).await.unwrap();
        assert!((volts - 3.3).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_queries_after_close_fail() {
        let mut device = ArduinoVisaDevice::with_adapter(SimulatedArduino::new())
            .await
            .unwrap();
        device.close().await.unwrap();
        let err = device.get_output_value().await.unwrap_err();
        assert!(err.is_connection());
    }
}
