//! Runtime bootstrap.

pub mod error;
pub mod telemetry;
