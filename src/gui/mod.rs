//! Presentation of sweep results.
//!
//! - `plot`: the shapes drawn for a sweep (mean markers and error bars).
//! - `app` (feature `gui_egui`): an eframe window that follows a background
//!   sweep through its [`SweepMonitor`], can stop it and can export the data.
//!   Plot appearance comes from the [`PlotConfig`] passed in, never from
//!   global state.
//!
//! [`SweepMonitor`]: crate::experiment::SweepMonitor
//! [`PlotConfig`]: crate::config::PlotConfig

pub mod plot;

#[cfg(feature = "gui_egui")]
mod app;

#[cfg(feature = "gui_egui")]
pub use app::{run_viewer, IvCurveApp};
