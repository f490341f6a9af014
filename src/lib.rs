//! # OpenTelemetry Metrics
//!
//! The in-process metrics pipeline of the OpenTelemetry SDK: measurements
//! recorded by application code are folded into aggregated statistics by
//! lock-free aggregators, and readers periodically (or on demand) pull
//! consistent snapshots of those statistics through a per-reader producer.
//!
//! ```
//! use opentelemetry_metrics::sdk::metrics::{controllers, MeterProvider};
//!
//! let reader = controllers::pull().build();
//! let provider = MeterProvider::builder().with_reader(reader.clone()).build();
//!
//! let meter = provider.meter("lib");
//! let requests = meter.i64_counter("requests").init();
//! requests.add(1);
//! requests.add(2);
//!
//! let metrics = reader.collect().unwrap();
//! assert_eq!(metrics.scopes()[0].instruments().len(), 1);
//! ```
#![warn(missing_docs, missing_debug_implementations)]

pub mod api;
pub mod exporter;
pub mod global;
pub mod sdk;
