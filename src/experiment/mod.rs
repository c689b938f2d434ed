//! Sweep procedures
//!
//! [`DiodeExperiment`] owns one instrument for its whole lifetime and runs two
//! procedures on it:
//!
//! - [`DiodeExperiment::scan_and_calculate_uncertainty`]: LED current-voltage
//!   curve with repeated samples, mean and population standard deviation per
//!   output level.
//! - [`DiodeExperiment::variable_resistances`]: solar cell sweep that keeps
//!   only points where the MOSFET resistance exceeds 100 kΩ.
//!
//! # Example
//!
//! ```rust,no_run
//! use pv_daq::adapters::SimulatedArduino;
//! use pv_daq::experiment::DiodeExperiment;
//! use pv_daq::instrument::ArduinoVisaDevice;
//!
//! # async fn run() -> pv_daq::error::AppResult<()> {
//! let device = ArduinoVisaDevice::with_adapter(SimulatedArduino::new()).await?;
//! let mut experiment = DiodeExperiment::new(device);
//! let result = experiment.scan_and_calculate_uncertainty(0, 1023, 4).await?;
//! println!("{} points", result.len());
//! experiment.set_output_to_zero().await?;
//! experiment.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod resistance;
pub mod sweep;
pub mod task;

pub use resistance::{passes_resistance_threshold, ResistancePoint, ResistanceSweep};
pub use sweep::{Sample, SweepPoint, SweepResult};
pub use task::{CancelToken, SweepHandle, SweepMonitor, SweepOutcome, SweepProgress, SweepState};

use crate::error::{AppResult, DaqError};
use crate::instrument::ArduinoInstrument;
use crate::measurement::AdcCode;
use tracing::{debug, info, warn};

/// Measurement channel reading LED + resistor.
const SUPPLY_CHANNEL: u8 = 1;
/// Measurement channel reading the resistor alone.
const SENSE_CHANNEL: u8 = 2;

/// Experiment bound to one instrument.
pub struct DiodeExperiment<D: ArduinoInstrument> {
    device: D,
}

impl<D: ArduinoInstrument> DiodeExperiment<D> {
    /// Take ownership of an open instrument.
    pub fn new(device: D) -> Self {
        Self { device }
    }

    /// Identification string of the instrument.
    pub async fn identification(&mut self) -> AppResult<String> {
        self.device.get_identification().await
    }

    /// LED current-voltage sweep over `start..=stop`.
    ///
    /// At every level `count - 1` repetitions are taken (the repeat loop stops
    /// one short of `count`). Each repetition sets the output, reads it back,
    /// then reads channels 1 and 2.
    ///
    /// - `start > stop` yields an empty result without touching the device.
    /// - `count <= 1` would aggregate zero samples and is a [`DaqError::Range`],
    ///   raised before any device traffic.
    pub async fn scan_and_calculate_uncertainty(
        &mut self,
        start: AdcCode,
        stop: AdcCode,
        count: u32,
    ) -> AppResult<SweepResult> {
        let (result, _) = self
            .run_scan(start, stop, count, &CancelToken::new(), |_| {})
            .await?;
        Ok(result)
    }

    /// Run [`Self::scan_and_calculate_uncertainty`] on a background task.
    pub fn start_scan(self, start: AdcCode, stop: AdcCode, count: u32) -> SweepHandle<D>
    where
        D: 'static,
    {
        SweepHandle::spawn(self, start, stop, count)
    }

    /// Sweep loop shared by the foreground and background variants.
    ///
    /// The flag is true only when the loop returned early on `cancel`.
    pub(crate) async fn run_scan<F>(
        &mut self,
        start: AdcCode,
        stop: AdcCode,
        count: u32,
        cancel: &CancelToken,
        mut on_level: F,
    ) -> AppResult<(SweepResult, bool)>
    where
        F: FnMut(&SweepResult) + Send,
    {
        let mut result = SweepResult::new();
        if start > stop {
            debug!("Empty sweep range {}..={}", start, stop);
            return Ok((result, false));
        }
        if count <= 1 {
            return Err(DaqError::Range(format!(
                "repeat count {} leaves no samples per level (count - 1 are taken)",
                count
            )));
        }

        info!(
            "Starting sweep {}..={} with {} samples per level",
            start,
            stop,
            count - 1
        );

        for level in start..=stop {
            let mut samples = Vec::with_capacity(count as usize - 1);

            for _ in 0..count - 1 {
                if cancel.is_cancelled() {
                    warn!("Sweep cancelled at level {}", level);
                    return Ok((result, true));
                }

                self.device.set_output_value(level).await?;
                let echo = self.device.get_output_value().await?;
                if echo != level {
                    warn!("Output reads back {} after setting {}", echo, level);
                }
                let supply = self.device.get_input_value(SUPPLY_CHANNEL).await?;
                let sense = self.device.get_input_value(SENSE_CHANNEL).await?;

                let sample = Sample::from_codes(supply, sense);
                debug!(
                    "level {}: U = {:.4} V, I = {:.6} A",
                    level, sample.voltage, sample.current
                );
                samples.push(sample);
            }

            result.push(SweepPoint::from_samples(level, samples)?);
            on_level(&result);
        }

        info!("Sweep finished with {} points", result.len());
        Ok((result, false))
    }

    /// Solar cell sweep over `start..stop` (exclusive).
    ///
    /// Reads channels 0, 1 and 2 once per level. Every level contributes its
    /// resistance to [`ResistanceSweep::resistances`]; only levels above
    /// the 100 kΩ threshold appear in [`ResistanceSweep::selected`].
    pub async fn variable_resistances(
        &mut self,
        start: AdcCode,
        stop: AdcCode,
    ) -> AppResult<ResistanceSweep> {
        let mut sweep = ResistanceSweep::default();
        info!("Starting resistance sweep {}..{}", start, stop);

        for level in start..stop {
            self.device.set_output_value(level).await?;
            let ch0 = self.device.get_input_value(0).await?;
            let ch1 = self.device.get_input_value(1).await?;
            let ch2 = self.device.get_input_value(2).await?;

            let point = ResistancePoint::from_codes(level, ch0, ch1, ch2);
            debug!("level {}: R = {:.1} ohm", level, point.resistance);
            sweep.record(point);
        }

        info!(
            "Resistance sweep kept {} of {} points",
            sweep.selected.len(),
            sweep.resistances.len()
        );
        Ok(sweep)
    }

    /// Switch the output off, which turns the LED off.
    pub async fn set_output_to_zero(&mut self) -> AppResult<()> {
        self.device.set_output_value(0).await
    }

    /// Close the instrument.
    pub async fn close(&mut self) -> AppResult<()> {
        self.device.close().await
    }

    /// Give the instrument back.
    pub fn into_device(self) -> D {
        self.device
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MockAdapter, SimulatedArduino};
    use crate::instrument::ArduinoVisaDevice;

    async fn simulated() -> DiodeExperiment<ArduinoVisaDevice<SimulatedArduino>> {
        let device = ArduinoVisaDevice::with_adapter(SimulatedArduino::new())
            .await
            .unwrap();
        DiodeExperiment::new(device)
    }

    #[tokio::test]
    async fn test_identification() {
        let mut experiment = simulated().await;
        assert!(experiment
            .identification()
            .await
            .unwrap()
            .starts_with("Arduino VISA firmware"));
    }

    #[tokio::test]
    async fn test_count_of_one_is_range_error() {
        let mut experiment = simulated().await;
        for count in [0, 1] {
            let err = experiment
                .scan_and_calculate_uncertainty(0, 10, count)
                .await
                .unwrap_err();
            assert!(matches!(err, DaqError::Range(_)));
        }
    }

    #[tokio::test]
    async fn test_noise_free_device_has_zero_spread() {
        let mut experiment = simulated().await;
        let result = experiment
            .scan_and_calculate_uncertainty(900, 905, 5)
            .await
            .unwrap();
        assert_eq!(result.len(), 6);
        assert!(result.voltage_uncertainties().iter().all(|&s| s < 1e-12));
        assert!(result.current_uncertainties().iter().all(|&s| s < 1e-12));
    }

    #[tokio::test]
    async fn test_current_rises_with_level() {
        let mut experiment = simulated().await;
        let result = experiment
            .scan_and_calculate_uncertainty(700, 1023, 2)
            .await
            .unwrap();
        let currents = result.currents();
        assert!(currents.first() < currents.last());
        assert!(currents.windows(2).all(|w| w[1] >= w[0]));
    }

    #[tokio::test]
    async fn test_malformed_reply_aborts_sweep() {
        let mock = MockAdapter::new(|cmd| match cmd {
            "*IDN?" => "Arduino".to_string(),
            "MEAS:CH2?" => "garbage".to_string(),
            _ => "1".to_string(),
        });
        let device = ArduinoVisaDevice::with_adapter(mock).await.unwrap();
        let mut experiment = DiodeExperiment::new(device);

        let err = experiment
            .scan_and_calculate_uncertainty(1, 3, 3)
            .await
            .unwrap_err();
        assert!(matches!(err, DaqError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_set_output_to_zero() {
        let mock = MockAdapter::new(|_| "0".to_string());
        let log = mock.command_log();
        let device = ArduinoVisaDevice::with_adapter(mock).await.unwrap();
        let mut experiment = DiodeExperiment::new(device);

        experiment.set_output_to_zero().await.unwrap();
        assert_eq!(log.lock().unwrap().last().unwrap(), "OUT:CH0 0");
    }

    #[tokio::test]
    async fn test_resistance_sweep_is_exclusive_of_stop() {
        let mut experiment = simulated().await;
        let sweep = experiment.variable_resistances(0, 10).await.unwrap();
        assert_eq!(sweep.resistances.len(), 10);
        let sweep = experiment.variable_resistances(5, 5).await.unwrap();
        assert!(sweep.resistances.is_empty());
    }
}
