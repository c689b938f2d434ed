//! Data export.

pub mod storage;

pub use storage::{default_export_path, export_rows, read_csv, write_csv, ExportRow};
