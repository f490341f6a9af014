//! Metric Controllers
//!
//! Controllers are the readers shipped with the SDK: [`PullController`]
//! collects when asked, [`PushController`] collects on a timer and hands
//! every snapshot to an exporter.
use crate::sdk::export::metrics::Producer;
use std::sync::{Arc, Mutex, PoisonError};

mod pull;
mod push;

pub use pull::{pull, PullController, PullControllerBuilder};
pub use push::{push, PushController, PushControllerBuilder, PushControllerWorker};

/// The producer a controller was registered with.
#[derive(Debug, Default)]
struct ProducerSlot(Mutex<Option<Arc<dyn Producer>>>);

impl ProducerSlot {
    fn set(&self, producer: Box<dyn Producer>) {
        let mut slot = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            tracing::warn!("reader added to a second meter provider, replacing its producer");
        }
        *slot = Some(Arc::from(producer));
    }

    fn get(&self) -> Option<Arc<dyn Producer>> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
