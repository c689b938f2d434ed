//! Instrument drivers.
//!
//! [`ArduinoInstrument`] is the explicit interface the experiments are written
//! against. [`ArduinoVisaDevice`] implements it over any [`Adapter`], which is
//! how the same driver code runs against a serial port, the simulated board or
//! a scripted mock.
//!
//! [`Adapter`]: crate::adapters::Adapter

pub mod arduino;
pub mod protocol;

pub use arduino::ArduinoVisaDevice;
pub use protocol::Command;

use crate::error::AppResult;
use crate::measurement::{code_to_voltage, AdcCode};
use async_trait::async_trait;

/// Operations of the Arduino VISA firmware.
///
/// Every call is one complete request/response round trip. There are no
/// retries and no concurrent-access protection; callers use a device from one
/// task at a time.
#[async_trait]
pub trait ArduinoInstrument: Send {
    /// Raw identification string, not validated.
    async fn get_identification(&mut self) -> AppResult<String>;

    /// Set the DAC output code on channel 0.
    ///
    /// Values above 1023 are passed to the device uninterpreted.
    async fn set_output_value(&mut self, value: AdcCode) -> AppResult<()>;

    /// Output code the device reports for channel 0.
    async fn get_output_value(&mut self) -> AppResult<AdcCode>;

    /// ADC code measured on `channel`.
    async fn get_input_value(&mut self, channel: u8) -> AppResult<AdcCode>;

    /// Release the connection.
    async fn close(&mut self) -> AppResult<()>;

    /// Voltage measured on `channel`.
    async fn get_input_voltage(&mut self, channel: u8) -> AppResult<f64> {
        let code = self.get_input_value(channel).await?;
        Ok(code_to_voltage(code))
    }
}

#[async_trait]
impl<T: ArduinoInstrument + ?Sized> ArduinoInstrument for Box<T> {
    async fn get_identification(&mut self) -> AppResult<String> {
        (**self).get_identification().await
    }

    async fn set_output_value(&mut self, value: AdcCode) -> AppResult<()> {
        (**self).set_output_value(value).await
    }

    async fn get_output_value(&mut self) -> AppResult<AdcCode> {
        (**self).get_output_value().await
    }

    async fn get_input_value(&mut self, channel: u8) -> AppResult<AdcCode> {
        (**self).get_input_value(channel).await
    }

    async fn close(&mut self) -> AppResult<()> {
        (**self).close().await
    }
}
