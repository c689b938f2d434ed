//! Sweep points and the aggregated result series.

use crate::error::{AppResult, DaqError};
use crate::measurement::{
    code_to_voltage, current_through, mean, population_std, AdcCode, LED_SERIES_RESISTANCE_OHM,
};
use serde::{Deserialize, Serialize};

/// One repetition at one output level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Voltage over the LED, in volts
    pub voltage: f64,
    /// Current through the LED, in amperes
    pub current: f64,
}

impl Sample {
    /// Derive LED voltage and current from the two measurement channels.
    ///
    /// `supply` is channel 1 (LED + resistor), `sense` is channel 2 (resistor).
    pub fn from_codes(supply: AdcCode, sense: AdcCode) -> Self {
        let v_supply = code_to_voltage(supply);
        let v_sense = code_to_voltage(sense);
        Self {
            voltage: v_supply - v_sense,
            current: current_through(v_sense, LED_SERIES_RESISTANCE_OHM),
        }
    }
}

/// All repetitions at one output level and their statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    /// Output code the samples were taken at
    pub level: AdcCode,
    /// Samples in acquisition order
    pub samples: Vec<Sample>,
    /// Mean voltage
    pub mean_voltage: f64,
    /// Mean current
    pub mean_current: f64,
    /// Population standard deviation of the voltage
    pub std_voltage: f64,
    /// Population standard deviation of the current
    pub std_current: f64,
}

impl SweepPoint {
    /// Aggregate the samples taken at `level`.
    ///
    /// An empty sample list has no mean and is a range error.
    pub fn from_samples(level: AdcCode, samples: Vec<Sample>) -> AppResult<Self> {
        let voltages: Vec<f64> = samples.iter().map(|s| s.voltage).collect();
        let currents: Vec<f64> = samples.iter().map(|s| s.current).collect();

        let undefined = || {
            DaqError::Range(format!(
                "no samples at level {}, mean and deviation are undefined",
                level
            ))
        };

        Ok(Self {
            level,
            mean_voltage: mean(&voltages).ok_or_else(undefined)?,
            mean_current: mean(&currents).ok_or_else(undefined)?,
            std_voltage: population_std(&voltages).ok_or_else(undefined)?,
            std_current: population_std(&currents).ok_or_else(undefined)?,
            samples,
        })
    }
}

/// Ordered sweep points of one sweep, ascending by level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepResult {
    points: Vec<SweepPoint>,
}

impl SweepResult {
    /// Empty result.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, point: SweepPoint) {
        self.points.push(point);
    }

    /// Points in sweep order.
    pub fn points(&self) -> &[SweepPoint] {
        &self.points
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when no level was visited.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Mean voltage per level.
    pub fn voltages(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.mean_voltage).collect()
    }

    /// Mean current per level.
    pub fn currents(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.mean_current).collect()
    }

    /// Voltage uncertainty per level.
    pub fn voltage_uncertainties(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.std_voltage).collect()
    }

    /// Current uncertainty per level.
    pub fn current_uncertainties(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.std_current).collect()
    }

    /// Every raw sample of the sweep, level by level.
    pub fn samples(&self) -> impl Iterator<Item = &Sample> + '_ {
        self.points.iter().flat_map(|p| p.samples.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_from_codes() {
        let sample = Sample::from_codes(1023, 682);
        let v_sense = 682.0 * 3.3 / 1023.0;
        assert!((sample.voltage - (3.3 - v_sense)).abs() < 1e-9);
        assert!((sample.current - v_sense / 220.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_level_is_range_error() {
        let err = SweepPoint::from_samples(5, Vec::new()).unwrap_err();
        assert!(matches!(err, DaqError::Range(_)));
    }

    #[test]
    fn test_point_statistics() {
        let samples = vec![
            Sample { voltage: 1.0, current: 0.001 },
            Sample { voltage: 3.0, current: 0.003 },
        ];
        let point = SweepPoint::from_samples(100, samples).unwrap();
        assert_eq!(point.mean_voltage, 2.0);
        assert_eq!(point.std_voltage, 1.0);
        assert!((point.mean_current - 0.002).abs() < 1e-15);
        assert!((point.std_current - 0.001).abs() < 1e-15);
    }

    #[test]
    fn test_series_have_equal_length() {
        let mut result = SweepResult::new();
        for level in 0..4 {
            let point = SweepPoint::from_samples(
                level,
                vec![Sample { voltage: 0.5, current: 0.0 }],
            )
            .unwrap();
            result.push(point);
        }
        assert_eq!(result.len(), 4);
        assert_eq!(result.voltages().len(), 4);
        assert_eq!(result.currents().len(), 4);
        assert_eq!(result.voltage_uncertainties().len(), 4);
        assert_eq!(result.current_uncertainties().len(), 4);
        assert_eq!(result.samples().count(), 4);
    }
}
