//! CSV export of a simulated sweep.

#![cfg(feature = "storage_csv")]

use pv_daq::adapters::SimulatedArduino;
use pv_daq::data::storage::round_to_centi;
use pv_daq::data::{export_rows, read_csv, write_csv};
use pv_daq::experiment::DiodeExperiment;
use pv_daq::instrument::ArduinoVisaDevice;

#[tokio::test]
async fn test_export_matches_sweep() {
    let device = ArduinoVisaDevice::with_adapter(SimulatedArduino::with_jitter(2, 7))
        .await
        .unwrap();
    let mut experiment = DiodeExperiment::new(device);
    let result = experiment
        .scan_and_calculate_uncertainty(600, 640, 5)
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("scan.csv");
    write_csv(&path, &result).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        text.lines().next().unwrap(),
        "voltages, currents, uncertainties of U, uncertainties of I"
    );
    assert_eq!(text.lines().count(), result.len() + 1);

    let rows = read_csv(&path).unwrap();
    assert_eq!(rows.len(), result.len());
    assert_eq!(rows, export_rows(&result));

    for (row, point) in rows.iter().zip(result.points()) {
        assert_eq!(row.voltage, round_to_centi(point.mean_voltage));
        assert_eq!(row.current, point.mean_current);
        assert_eq!(row.voltage_uncertainty, point.std_voltage);
        assert_eq!(row.current_uncertainty, point.std_current);
    }
}

#[tokio::test]
async fn test_reading_garbage_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.csv");
    std::fs::write(
        &path,
        "voltages, currents, uncertainties of U, uncertainties of I\n1.0,abc,0,0\n",
    )
    .unwrap();

    assert!(read_csv(&path).is_err());
}
