//! CSV export of sweep results with clean feature flag handling.
//!
//! Four columns, one row per sweep point:
//!
//! ```text
//! voltages, currents, uncertainties of U, uncertainties of I
//! 1.72,0.002146...,0.0,1.2e-5
//! ```
//!
//! Voltages are rounded to two decimals, the other columns are written as is.

use crate::error::AppResult;
use crate::experiment::SweepResult;
use std::path::{Path, PathBuf};

/// Header cells as written, including the leading spaces.
pub const CSV_HEADER: [&str; 4] = [
    "voltages",
    " currents",
    " uncertainties of U",
    " uncertainties of I",
];

/// One exported row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportRow {
    /// Mean voltage, rounded to 2 decimals
    pub voltage: f64,
    /// Mean current
    pub current: f64,
    /// Voltage uncertainty
    pub voltage_uncertainty: f64,
    /// Current uncertainty
    pub current_uncertainty: f64,
}

/// Round to two decimals, halves away from zero.
pub fn round_to_centi(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Rows in export form.
pub fn export_rows(result: &SweepResult) -> Vec<ExportRow> {
    result
        .points()
        .iter()
        .map(|p| ExportRow {
            voltage: round_to_centi(p.mean_voltage),
            current: p.mean_current,
            voltage_uncertainty: p.std_voltage,
            current_uncertainty: p.std_current,
        })
        .collect()
}

/// Timestamped file name inside `dir`, e.g. `scan_20240501_142233.csv`.
pub fn default_export_path(dir: &Path) -> PathBuf {
    let file_name = format!("scan_{}.csv", chrono::Local::now().format("%Y%m%d_%H%M%S"));
    dir.join(file_name)
}

// ============================================================================
// CSV Writer
// ============================================================================

#[cfg(feature = "storage_csv")]
mod csv_enabled {
    use super::*;

    /// Write `result` to `path`, creating parent directories as needed.
    pub fn write_csv(path: &Path, result: &SweepResult) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(CSV_HEADER)?;
        for row in export_rows(result) {
            writer.write_record(&[
                row.voltage.to_string(),
                row.current.to_string(),
                row.voltage_uncertainty.to_string(),
                row.current_uncertainty.to_string(),
            ])?;
        }
        writer.flush()?;

        tracing::info!("Wrote {} rows to '{}'", result.len(), path.display());
        Ok(())
    }

    /// Read an exported file back.
    pub fn read_csv(path: &Path) -> AppResult<Vec<ExportRow>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut cells = [0.0_f64; 4];
            for (i, cell) in cells.iter_mut().enumerate() {
                let text = record.get(i).unwrap_or_default();
                *cell = text.parse().map_err(|_| {
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!(
                            "'{}' line {}: column {} is not a number: {:?}",
                            path.display(),
                            record.position().map_or(0, |p| p.line()),
                            i + 1,
                            text
                        ),
                    )
                })?;
            }
            rows.push(ExportRow {
                voltage: cells[0],
                current: cells[1],
                voltage_uncertainty: cells[2],
                current_uncertainty: cells[3],
            });
        }
        Ok(rows)
    }
}

#[cfg(not(feature = "storage_csv"))]
mod csv_disabled {
    use super::*;
    use crate::error::DaqError;

    /// CSV support is compiled out.
    pub fn write_csv(_path: &Path, _result: &SweepResult) -> AppResult<()> {
        Err(DaqError::FeatureNotEnabled("storage_csv".to_string()))
    }

    /// CSV support is compiled out.
    pub fn read_csv(_path: &Path) -> AppResult<Vec<ExportRow>> {
        Err(DaqError::FeatureNotEnabled("storage_csv".to_string()))
    }
}

#[cfg(feature = "storage_csv")]
pub use csv_enabled::{read_csv, write_csv};

#[cfg(not(feature = "storage_csv"))]
pub use csv_disabled::{read_csv, write_csv};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to_centi() {
        assert_eq!(round_to_centi(1.234), 1.23);
        assert_eq!(round_to_centi(1.236), 1.24);
        assert_eq!(round_to_centi(0.0), 0.0);
    }

    #[test]
    fn test_default_export_path() {
        let path = default_export_path(Path::new("data"));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(path.starts_with("data"));
        assert!(name.starts_with("scan_") && name.ends_with(".csv"));
    }

    #[cfg(feature = "storage_csv")]
    #[test]
    fn test_header_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("empty.csv");
        write_csv(&path, &SweepResult::new()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text.lines().next().unwrap(),
            "voltages, currents, uncertainties of U, uncertainties of I"
        );
        assert!(read_csv(&path).unwrap().is_empty());
    }
}
