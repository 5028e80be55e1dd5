//! # lidarqc-cli
//!
//! Command-line interface for the LidarQC toolkit.
//!
//! The binary exposes the `check-dataset` workflow: classify a delivery's
//! product folders, extract per-tile metadata, reconcile against the tile
//! index and write everything to a GeoPackage. Command implementations
//! live in [`commands`] so integration tests can drive them directly.

pub mod commands;
pub mod error;
pub mod logging;

pub use error::CliError;
