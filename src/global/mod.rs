//! Process-wide state: the global meter provider and the handler that
//! receives errors which cannot be returned to a caller.
mod error_handler;
mod metrics;

pub use error_handler::{handle_error, set_error_handler};
pub use metrics::{meter, meter_provider, set_meter_provider};

#[cfg(test)]
pub(crate) use error_handler::capture_errors;
