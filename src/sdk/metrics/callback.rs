use crate::api::metrics::{MetricsError, Numeric, Result};
use crate::api::Context;
use crate::global;
use crate::sdk::metrics::instrument::{InstrumentId, Recorder};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

pub(crate) type CallbackFn = dyn Fn(&Observer<'_>) + Send + Sync;

/// A function reporting the values of a fixed set of asynchronous
/// instruments.
pub(crate) struct Callback {
    instruments: Vec<InstrumentId>,
    function: Box<CallbackFn>,
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("instruments", &self.instruments)
            .finish()
    }
}

impl Callback {
    pub(crate) fn new(instruments: Vec<InstrumentId>, function: Box<CallbackFn>) -> Self {
        Callback {
            instruments,
            function,
        }
    }

    /// Run the callback for one reader's cycle.
    ///
    /// A panic inside the callback is caught and returned, the observations
    /// made before it are kept.
    pub(crate) fn run(&self, cx: &Context, reader: usize) -> Result<()> {
        let observer = Observer {
            cx,
            reader,
            instruments: &self.instruments,
        };
        panic::catch_unwind(AssertUnwindSafe(|| (self.function)(&observer)))
            .map_err(|payload| MetricsError::CallbackPanic(panic_message(payload.as_ref())))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Handed to a callback while it runs, observations are recorded through it.
///
/// Only the instruments the callback was registered with may be observed.
pub struct Observer<'a> {
    cx: &'a Context,
    reader: usize,
    instruments: &'a [InstrumentId],
}

impl fmt::Debug for Observer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("reader", &self.reader)
            .field("instruments", &self.instruments)
            .finish()
    }
}

impl<'a> Observer<'a> {
    /// The context of the running collection cycle.
    pub fn context(&self) -> &Context {
        self.cx
    }

    pub(crate) fn observe<N: Numeric>(&self, recorder: &dyn Recorder<N>, value: N) {
        if !self.instruments.contains(&recorder.id()) {
            global::handle_error(MetricsError::UnregisteredInstrument(
                recorder.descriptor().name().to_string(),
            ));
            return;
        }
        recorder.observe(self.reader, value)
    }
}
