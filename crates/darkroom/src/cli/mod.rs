//! Command-line interface implementation.

pub mod batch;
pub mod config;
pub mod convert;
pub mod enhance;
pub mod types;
pub mod watermark;
