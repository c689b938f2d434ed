//! Core library for pv_daq.
//!
//! Drives an Arduino running the VISA firmware over a serial line to record
//! current-voltage curves of an LED, with repeated samples and population
//! standard deviation per output level, and to sweep a solar cell load while
//! selecting points by MOSFET resistance. It is used by the `pv_daq` binary.
//!
//! - [`adapters`]: transports (serial port, simulated board, scripted mock)
//! - [`instrument`]: the Arduino VISA command set over any adapter
//! - [`measurement`]: code/voltage conversion, circuit constants, statistics
//! - [`experiment`]: sweep procedures, including background sweeps
//! - [`data`]: CSV export
//! - [`gui`]: plot geometry and the optional egui viewer
//! - [`config`]: layered settings
//! - [`error`]: the crate error type

pub mod adapters;
pub mod config;
pub mod data;
pub mod error;
pub mod experiment;
pub mod gui;
pub mod instrument;
pub mod measurement;
