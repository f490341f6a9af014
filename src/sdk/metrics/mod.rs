//! # OpenTelemetry Metrics SDK
//!
//! A [`MeterProvider`] hands out one [`Meter`] per instrumentation scope.
//! Meters create instruments, synchronous ones are recorded inline by
//! application code and asynchronous ones are reported by callbacks run at
//! the start of every collection cycle. Each reader added to the provider
//! harvests every instrument independently, with the temporality it asks
//! for.
pub mod aggregators;
mod callback;
pub mod controllers;
mod instrument;
mod meter;
mod pipeline;
mod provider;
pub mod selectors;
mod view;

pub use callback::Observer;
pub use controllers::{PullController, PushController, PushControllerWorker};
pub use instrument::{
    AsyncInstrument, Counter, InstrumentBuilder, InstrumentId, ObservableCounter, ObservableGauge,
    ObservableUpDownCounter, UpDownCounter,
};
pub use meter::Meter;
pub use provider::{MeterProvider, MeterProviderBuilder};
pub use view::View;
