//! Plot geometry for the current-voltage curve.
//!
//! Kept free of any GUI types so the shapes can be checked without a window.

use crate::experiment::{SweepProgress, SweepResult, SweepState};

/// Straight segment from one plot point to another.
pub type Segment = [[f64; 2]; 2];

/// `(mean voltage, mean current)` per sweep point.
pub fn mean_points(result: &SweepResult) -> Vec<[f64; 2]> {
    result
        .points()
        .iter()
        .map(|p| [p.mean_voltage, p.mean_current])
        .collect()
}

/// Symmetric error bars: one horizontal (±σU) and one vertical (±σI)
/// segment per sweep point.
pub fn error_bar_segments(result: &SweepResult) -> Vec<Segment> {
    let mut segments = Vec::with_capacity(result.len() * 2);
    for p in result.points() {
        let (x, y) = (p.mean_voltage, p.mean_current);
        segments.push([[x - p.std_voltage, y], [x + p.std_voltage, y]]);
        segments.push([[x, y - p.std_current], [x, y + p.std_current]]);
    }
    segments
}

/// One-line status for the window footer.
pub fn status_line(progress: &SweepProgress) -> String {
    let points = progress.result.len();
    match &progress.state {
        SweepState::Running => format!("Scanning... {} points", points),
        SweepState::Finished => format!("Scan finished, {} points", points),
        SweepState::Cancelled => format!("Scan stopped, {} points", points),
        SweepState::Failed(e) => format!("Scan failed after {} points: {}", points, e),
    }
}
