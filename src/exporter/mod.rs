//! Exporters shipped with the SDK.
pub mod metrics;
