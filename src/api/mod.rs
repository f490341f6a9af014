//! # OpenTelemetry API
//!
//! Vocabulary shared by the SDK and its exporters: attribute key/values,
//! units, the collection `Context`, label sets and the metrics data types.
mod context;
mod core;
pub mod labels;
pub mod metrics;

pub use self::context::{CancelHandle, Context};
pub use self::core::{Key, KeyValue, Unit, Value};
