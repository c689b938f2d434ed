//! In-process Arduino VISA device for running without hardware.
//!
//! The simulated board drives a red LED in series with the 220 Ω resistor from
//! its DAC on channel 0 and reports:
//!
//! | channel | quantity                          |
//! |---------|-----------------------------------|
//! | CH0     | DAC output (echo of the set code) |
//! | CH1     | voltage over LED + resistor       |
//! | CH2     | voltage over the resistor         |
//!
//! The LED follows the Shockley equation. Readings are quantized to 10-bit
//! codes, optionally with uniform jitter from a seeded generator.

use super::Adapter;
use crate::error::{AppResult, DaqError};
use crate::measurement::{
    code_to_voltage, AdcCode, ADC_MAX_CODE, ADC_REFERENCE_VOLTAGE, LED_SERIES_RESISTANCE_OHM,
};
use async_trait::async_trait;
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::debug;

/// Identification string of the simulated firmware.
pub const SIMULATED_IDN: &str = "Arduino VISA firmware v1.1.0 (simulated)";

const SATURATION_CURRENT_A: f64 = 1e-17;
const IDEALITY_FACTOR: f64 = 2.0;
const THERMAL_VOLTAGE_V: f64 = 0.02585;

/// Simulated Arduino speaking the ASCII command set.
pub struct SimulatedArduino {
    output: AdcCode,
    jitter_codes: i32,
    rng: StdRng,
    open: bool,
}

impl Default for SimulatedArduino {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedArduino {
    /// Noise-free device.
    pub fn new() -> Self {
        Self {
            output: 0,
            jitter_codes: 0,
            rng: StdRng::seed_from_u64(0),
            open: true,
        }
    }

    /// Device whose measurement channels wander by up to `codes` per reading.
    pub fn with_jitter(codes: u16, seed: u64) -> Self {
        Self {
            jitter_codes: i32::from(codes),
            rng: StdRng::seed_from_u64(seed),
            ..Self::new()
        }
    }

    /// Voltage across the resistor for a given supply voltage.
    fn resistor_voltage(supply: f64) -> f64 {
        if supply <= 0.0 {
            return 0.0;
        }
        let n_vt = IDEALITY_FACTOR * THERMAL_VOLTAGE_V;
        let loop_voltage = |vd: f64| {
            vd + LED_SERIES_RESISTANCE_OHM * SATURATION_CURRENT_A * ((vd / n_vt).exp() - 1.0)
        };

        // loop_voltage is monotonic, bracket the diode voltage in [0, supply]
        let (mut lo, mut hi) = (0.0_f64, supply);
        for _ in 0..80 {
            let mid = 0.5 * (lo + hi);
            if loop_voltage(mid) > supply {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        supply - 0.5 * (lo + hi)
    }

    fn quantize(&mut self, volts: f64) -> AdcCode {
        let mut code = (volts / ADC_REFERENCE_VOLTAGE * f64::from(ADC_MAX_CODE)).round() as i32;
        if self.jitter_codes > 0 {
            code += self.rng.gen_range(-self.jitter_codes..=self.jitter_codes);
        }
        code.clamp(0, i32::from(ADC_MAX_CODE)) as AdcCode
    }

    fn measure(&mut self, channel: u8) -> Option<AdcCode> {
        let supply = code_to_voltage(self.output);
        match channel {
            0 => Some(self.output),
            1 => Some(self.quantize(supply)),
            2 => {
                let volts = Self::resistor_voltage(supply);
                Some(self.quantize(volts))
            }
            _ => None,
        }
    }

    fn respond(&mut self, command: &str) -> String {
        let unknown = || format!("ERROR: UNKNOWN COMMAND {}", command);

        if command == "*IDN?" {
            return SIMULATED_IDN.to_string();
        }
        if command == "OUT:CH0?" {
            return self.output.to_string();
        }
        if let Some(value) = command.strip_prefix("OUT:CH0 ") {
            return match value.trim().parse::<u32>() {
                Ok(v) => {
                    self.output = v.min(u32::from(ADC_MAX_CODE)) as AdcCode;
                    self.output.to_string()
                }
                Err(_) => unknown(),
            };
        }
        if let Some(channel) = command
            .strip_prefix("MEAS:CH")
            .and_then(|rest| rest.strip_suffix('?'))
        {
            return match channel.parse::<u8>().ok().and_then(|ch| self.measure(ch)) {
                Some(code) => code.to_string(),
                None => unknown(),
            };
        }
        unknown()
    }
}

#[async_trait]
impl Adapter for SimulatedArduino {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn query(&mut self, command: &str) -> AppResult<String> {
        if !self.open {
            return Err(DaqError::SerialPortNotConnected);
        }
        let reply = self.respond(command);
        debug!("[simulated] {} -> {}", command, reply);
        Ok(reply)
    }

    async fn close(&mut self) -> AppResult<()> {
        self.open = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_identification() {
        let mut sim = SimulatedArduino::new();
        assert_eq!(sim.query("*IDN?").await.unwrap(), SIMULATED_IDN);
    }

    #[tokio::test]
    async fn test_output_is_echoed() {
        let mut sim = SimulatedArduino::new();
        assert_eq!(sim.query("OUT:CH0 700").await.unwrap(), "700");
        assert_eq!(sim.query("OUT:CH0?").await.unwrap(), "700");
        assert_eq!(sim.query("MEAS:CH0?").await.unwrap(), "700");
    }

    #[tokio::test]
    async fn test_led_is_dark_below_threshold() {
        let mut sim = SimulatedArduino::new();
        sim.query("OUT:CH0 300").await.unwrap();
        assert_eq!(sim.query("MEAS:CH2?").await.unwrap(), "0");
    }

    #[tokio::test]
    async fn test_led_conducts_at_full_output() {
        let mut sim = SimulatedArduino::new();
        sim.query("OUT:CH0 1023").await.unwrap();
        let supply: u16 = sim.query("MEAS:CH1?").await.unwrap().parse().unwrap();
        let resistor: u16 = sim.query("MEAS:CH2?").await.unwrap().parse().unwrap();
        assert_eq!(supply, 1023);
        assert!(resistor > 100 && resistor < supply);
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let mut sim = SimulatedArduino::new();
        assert!(sim.query("MEAS:CH9?").await.unwrap().starts_with("ERROR"));
        assert!(sim.query("FOO").await.unwrap().starts_with("ERROR"));
    }

    #[tokio::test]
    async fn test_jitter_stays_in_range() {
        let mut sim = SimulatedArduino::with_jitter(3, 7);
        sim.query("OUT:CH0 0").await.unwrap();
        for _ in 0..50 {
            let code: u16 = sim.query("MEAS:CH1?").await.unwrap().parse().unwrap();
            assert!(code <= 3);
        }
    }
}
