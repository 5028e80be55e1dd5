//! Command implementations.

pub mod check_dataset;
