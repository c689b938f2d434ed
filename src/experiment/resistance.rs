//! Solar cell sweep that selects points by MOSFET channel resistance.

use crate::measurement::{
    code_to_voltage, current_through, AdcCode, CELL_DIVIDER_GAIN, CELL_SENSE_RESISTANCE_OHM,
    CELL_SERIES_RESISTANCE_OHM, DIVISION_GUARD_VOLTS, MIN_MOSFET_RESISTANCE_OHM,
};
use serde::{Deserialize, Serialize};

/// Quantities derived at one output level of the resistance sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResistancePoint {
    /// Output code
    pub level: AdcCode,
    /// Channel 0 voltage (DAC output read back)
    pub output_voltage: f64,
    /// Cell voltage, channel 1 scaled by the divider gain
    pub voltage: f64,
    /// Cell current through the sense resistor
    pub current: f64,
    /// MOSFET channel resistance, in ohms
    pub resistance: f64,
}

impl ResistancePoint {
    /// Derive the point from the three channel readings.
    pub fn from_codes(level: AdcCode, ch0: AdcCode, ch1: AdcCode, ch2: AdcCode) -> Self {
        let voltage = code_to_voltage(ch1) * CELL_DIVIDER_GAIN;
        let sense = code_to_voltage(ch2) + DIVISION_GUARD_VOLTS;
        let current = current_through(sense, CELL_SENSE_RESISTANCE_OHM);
        Self {
            level,
            output_voltage: code_to_voltage(ch0),
            voltage,
            current,
            resistance: voltage / current - CELL_SERIES_RESISTANCE_OHM,
        }
    }

    /// Whether the point belongs in the selected series.
    pub fn is_selected(&self) -> bool {
        passes_resistance_threshold(self.resistance)
    }
}

/// Strictly above the selection threshold. Points at or below it are dropped.
pub fn passes_resistance_threshold(resistance: f64) -> bool {
    resistance > MIN_MOSFET_RESISTANCE_OHM
}

/// Outcome of a resistance sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResistanceSweep {
    /// Resistance at every visited level, selected or not
    pub resistances: Vec<f64>,
    /// Points above the threshold, in sweep order
    pub selected: Vec<ResistancePoint>,
}

impl ResistanceSweep {
    pub(crate) fn record(&mut self, point: ResistancePoint) {
        self.resistances.push(point.resistance);
        if point.is_selected() {
            self.selected.push(point);
        }
    }

    /// Voltages of the selected points.
    pub fn voltages(&self) -> Vec<f64> {
        self.selected.iter().map(|p| p.voltage).collect()
    }

    /// Currents of the selected points.
    pub fn currents(&self) -> Vec<f64> {
        self.selected.iter().map(|p| p.current).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_strict() {
        assert!(!passes_resistance_threshold(100_000.0));
        assert!(passes_resistance_threshold(100_000.000_001));
        assert!(!passes_resistance_threshold(99_999.0));
    }

    #[test]
    fn test_derived_quantities() {
        let point = ResistancePoint::from_codes(10, 10, 100, 0);
        let expected_v = 100.0 * 3.3 / 1023.0 * 3.0;
        let expected_i = 0.000001 / 4.7;
        assert!((point.voltage - expected_v).abs() < 1e-12);
        assert!((point.current - expected_i).abs() < 1e-15);
        assert!((point.resistance - (expected_v / expected_i - 1004.7)).abs() < 1e-3);
        assert!(point.is_selected());
    }

    fn point_with_resistance(level: AdcCode, resistance: f64) -> ResistancePoint {
        ResistancePoint {
            level,
            output_voltage: 0.0,
            voltage: 1.0,
            current: 1e-5,
            resistance,
        }
    }

    #[test]
    fn test_point_at_threshold_is_recorded_but_not_selected() {
        let mut sweep = ResistanceSweep::default();
        sweep.record(point_with_resistance(1, 100_000.5));
        sweep.record(point_with_resistance(2, 100_000.0));
        sweep.record(point_with_resistance(3, 99_000.0));

        assert_eq!(sweep.resistances, vec![100_000.5, 100_000.0, 99_000.0]);
        assert_eq!(sweep.selected.len(), 1);
        assert_eq!(sweep.selected[0].level, 1);
        assert_eq!(sweep.voltages(), vec![1.0]);
        assert_eq!(sweep.currents(), vec![1e-5]);
    }

    #[test]
    fn test_dropped_points_keep_their_resistance() {
        let mut sweep = ResistanceSweep::default();
        sweep.record(ResistancePoint::from_codes(0, 0, 100, 0));
        sweep.record(ResistancePoint::from_codes(1, 1, 100, 500));

        assert_eq!(sweep.resistances.len(), 2);
        assert_eq!(sweep.selected.len(), 1);
        assert_eq!(sweep.selected[0].level, 0);
        assert_eq!(sweep.voltages().len(), sweep.currents().len());
    }
}
