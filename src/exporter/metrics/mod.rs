//! Metric exporters.
pub mod stdout;

pub use stdout::{stdout, StdoutExporter, StdoutExporterBuilder};
