use crate::api::metrics::{MetricsError, Result};
use std::fmt;
use std::sync::RwLock;

lazy_static::lazy_static! {
    /// The handler errors are routed to, logging when unset.
    static ref GLOBAL_ERROR_HANDLER: RwLock<Option<ErrorHandler>> = RwLock::new(None);
}

struct ErrorHandler(Box<dyn Fn(MetricsError) + Send + Sync>);

impl fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorHandler")
            .field("closure", &"Fn(MetricsError)")
            .finish()
    }
}

/// Report an error that has no caller to return to, such as a rejected
/// measurement, a panicking callback or a failed export.
///
/// Errors are logged with `tracing` unless a handler was installed with
/// [`set_error_handler`].
pub fn handle_error<T: Into<MetricsError>>(err: T) {
    let err = err.into();
    if let Ok(handler) = GLOBAL_ERROR_HANDLER.read() {
        if let Some(handler) = handler.as_ref() {
            (handler.0)(err);
            return;
        }
    }
    tracing::error!(error = %err, "OpenTelemetry metrics error occurred");
}

/// Replace the global error handler.
///
/// The handler must not call `set_error_handler` itself.
pub fn set_error_handler<F>(f: F) -> Result<()>
where
    F: Fn(MetricsError) + Send + Sync + 'static,
{
    GLOBAL_ERROR_HANDLER
        .write()
        .map(|mut handler| *handler = Some(ErrorHandler(Box::new(f))))
        .map_err(Into::into)
}

#[cfg(test)]
thread_local! {
    static CAPTURED: std::cell::RefCell<Option<Vec<String>>> = std::cell::RefCell::new(None);
}

/// Run `f` and return the errors reported on this thread while it ran.
///
/// Installs a handler once for the test binary that captures errors on
/// threads inside `capture_errors` and logs the rest.
#[cfg(test)]
pub(crate) fn capture_errors<T, F: FnOnce() -> T>(f: F) -> (T, Vec<String>) {
    static INSTALL: std::sync::Once = std::sync::Once::new();
    INSTALL.call_once(|| {
        set_error_handler(|err| {
            let captured = CAPTURED.with(|captured| {
                captured
                    .borrow_mut()
                    .as_mut()
                    .map(|errors| errors.push(err.to_string()))
                    .is_some()
            });
            if !captured {
                tracing::error!(error = %err, "OpenTelemetry metrics error occurred");
            }
        })
        .unwrap();
    });

    CAPTURED.with(|captured| *captured.borrow_mut() = Some(Vec::new()));
    let result = f();
    let errors = CAPTURED.with(|captured| captured.borrow_mut().take().unwrap_or_default());
    (result, errors)
}
