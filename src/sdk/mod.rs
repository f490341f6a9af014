//! # OpenTelemetry SDK
//!
//! The metrics SDK implementation: the aggregators behind every instrument,
//! the meter registry, the provider and its per-reader producers, and the
//! export API consumed by readers and exporters.
pub mod export;
pub mod instrumentation;
pub mod metrics;
pub mod resource;

pub use instrumentation::InstrumentationLibrary;
pub use resource::Resource;
