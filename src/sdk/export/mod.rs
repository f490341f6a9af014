//! Telemetry Export
pub mod metrics;
