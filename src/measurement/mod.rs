//! Physical quantities derived from raw 10-bit ADC codes.
//!
//! The Arduino reports every channel as an integer code in `0..=1023` against
//! a 3.3 V reference. All conversions to volts and amperes, and the circuit
//! constants used by both experiments, live here so the driver and the sweep
//! procedures can never disagree about the scaling.

pub mod statistics;

pub use statistics::{mean, population_std};

/// Raw ADC or DAC code as sent over the wire.
pub type AdcCode = u16;

/// Reference voltage of the ADC and DAC, in volts.
pub const ADC_REFERENCE_VOLTAGE: f64 = 3.3;

/// Largest code of the 10-bit converters.
pub const ADC_MAX_CODE: AdcCode = 1023;

/// Series resistor in the LED circuit, in ohms.
pub const LED_SERIES_RESISTANCE_OHM: f64 = 220.0;

/// Current sense resistor in the solar cell circuit, in ohms.
pub const CELL_SENSE_RESISTANCE_OHM: f64 = 4.7;

/// Gain of the voltage divider in front of channel 1 in the solar cell circuit.
pub const CELL_DIVIDER_GAIN: f64 = 3.0;

/// Fixed resistance subtracted from the MOSFET channel resistance, in ohms.
pub const CELL_SERIES_RESISTANCE_OHM: f64 = 1004.7;

/// Offset added to the sense voltage so the derived current is never zero.
pub const DIVISION_GUARD_VOLTS: f64 = 0.000001;

/// Points of the resistance sweep are kept only above this resistance, in ohms.
pub const MIN_MOSFET_RESISTANCE_OHM: f64 = 100_000.0;

/// Convert an ADC code to volts.
pub fn code_to_voltage(code: AdcCode) -> f64 {
    f64::from(code) * ADC_REFERENCE_VOLTAGE / f64::from(ADC_MAX_CODE)
}

/// Convert a voltage to a DAC code, saturating at the converter limits.
///
/// Fractional codes are truncated toward zero, so 1.65 V gives 511.
pub fn volts_to_code(volts: f64) -> AdcCode {
    let code = (volts * f64::from(ADC_MAX_CODE) / ADC_REFERENCE_VOLTAGE).trunc();
    code.clamp(0.0, f64::from(ADC_MAX_CODE)) as AdcCode
}

/// Current through a resistor from the voltage across it (Ohm's law).
pub fn current_through(volts: f64, ohms: f64) -> f64 {
    volts / ohms
}
