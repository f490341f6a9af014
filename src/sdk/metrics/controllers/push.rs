use crate::api::metrics::{InstrumentKind, MetricsError, Result};
use crate::api::Context;
use crate::global;
use crate::sdk::export::metrics::{
    Exporter, MetricReader, Producer, Temporality, TemporalitySelector,
};
use crate::sdk::metrics::controllers::ProducerSlot;
use futures::{channel::mpsc, task, Future, Stream, StreamExt};
use std::fmt;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time;

lazy_static::lazy_static! {
    static ref DEFAULT_PUSH_PERIOD: time::Duration = time::Duration::from_secs(10);
    static ref DEFAULT_PUSH_TIMEOUT: time::Duration = time::Duration::from_secs(10);
}

/// Returns a builder for a reader that collects every period and exports
/// the snapshot.
///
/// `spawn` runs the returned worker future on the caller's runtime and
/// `interval` turns a period into a stream of ticks, for example
/// `tokio::time::interval`.
pub fn push<E, SP, SO, I, IO>(exporter: E, spawn: SP, interval: I) -> PushControllerBuilder<SP, I>
where
    E: Exporter + Send + Sync + 'static,
    SP: Fn(PushControllerWorker) -> SO,
    I: Fn(time::Duration) -> IO,
{
    PushControllerBuilder {
        exporter: Box::new(exporter),
        spawn,
        interval,
        temporality: None,
        period: None,
        timeout: None,
    }
}

/// A reader that exports on a timer from a spawned worker.
#[derive(Clone, Debug)]
pub struct PushController {
    inner: Arc<PushInner>,
}

#[derive(Debug)]
struct PushInner {
    message_sender: Mutex<mpsc::Sender<PushMessage>>,
    producer: Arc<ProducerSlot>,
    temporality: Box<dyn TemporalitySelector>,
}

#[derive(Debug)]
enum PushMessage {
    Tick,
    Shutdown,
}

/// The future driving a [`PushController`]. It completes after the final
/// export that follows `stop`.
pub struct PushControllerWorker {
    messages: Pin<Box<dyn Stream<Item = PushMessage> + Send>>,
    producer: Arc<ProducerSlot>,
    exporter: Box<dyn Exporter + Send + Sync>,
    timeout: time::Duration,
}

impl fmt::Debug for PushControllerWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushControllerWorker")
            .field("exporter", &self.exporter)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl PushControllerWorker {
    fn on_tick(&mut self) {
        let producer = match self.producer.get() {
            Some(producer) => producer,
            None => return,
        };
        let cx = Context::new().with_timeout(self.timeout);
        let metrics = producer.produce(&cx);
        if let Err(err) = self.exporter.export(&metrics) {
            global::handle_error(err);
        }
    }
}

impl Future for PushControllerWorker {
    type Output = ();
    fn poll(mut self: Pin<&mut Self>, cx: &mut task::Context<'_>) -> task::Poll<Self::Output> {
        loop {
            match futures::ready!(self.messages.poll_next_unpin(cx)) {
                Some(PushMessage::Tick) => self.on_tick(),
                Some(PushMessage::Shutdown) | None => {
                    self.on_tick();
                    return task::Poll::Ready(());
                }
            }
        }
    }
}

impl PushController {
    /// Ask the worker to collect and export now.
    pub fn force_push(&self) -> Result<()> {
        self.send(PushMessage::Tick)
    }

    /// Ask the worker to run a final export and stop.
    pub fn stop(&self) -> Result<()> {
        self.send(PushMessage::Shutdown)
    }

    fn send(&self, message: PushMessage) -> Result<()> {
        self.inner
            .message_sender
            .lock()?
            .try_send(message)
            .map_err(|err| MetricsError::Other(err.to_string()))
    }
}

impl TemporalitySelector for PushController {
    fn temporality(&self, kind: InstrumentKind) -> Temporality {
        self.inner.temporality.temporality(kind)
    }
}

impl MetricReader for PushController {
    fn register_producer(&self, producer: Box<dyn Producer>) {
        self.inner.producer.set(producer)
    }
}

/// Configuration for a [`PushController`].
pub struct PushControllerBuilder<S, I> {
    exporter: Box<dyn Exporter + Send + Sync>,
    spawn: S,
    interval: I,
    temporality: Option<Box<dyn TemporalitySelector>>,
    period: Option<time::Duration>,
    timeout: Option<time::Duration>,
}

impl<S, I> fmt::Debug for PushControllerBuilder<S, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushControllerBuilder")
            .field("exporter", &self.exporter)
            .field("temporality", &self.temporality)
            .field("period", &self.period)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl<S, SO, I, IS, ISI> PushControllerBuilder<S, I>
where
    S: Fn(PushControllerWorker) -> SO,
    I: Fn(time::Duration) -> IS,
    IS: Stream<Item = ISI> + Send + 'static,
{
    /// How often to collect and export. Defaults to 10 seconds.
    pub fn with_period(self, period: time::Duration) -> Self {
        PushControllerBuilder {
            period: Some(period),
            ..self
        }
    }

    /// How long one collection may take before it is cut short. Defaults to
    /// 10 seconds.
    pub fn with_timeout(self, timeout: time::Duration) -> Self {
        PushControllerBuilder {
            timeout: Some(timeout),
            ..self
        }
    }

    /// The temporality this reader asks for. Defaults to cumulative.
    pub fn with_temporality<T>(self, temporality: T) -> Self
    where
        T: TemporalitySelector + 'static,
    {
        PushControllerBuilder {
            temporality: Some(Box::new(temporality)),
            ..self
        }
    }

    /// Spawn the worker and return the reader. The reader must still be
    /// added to a provider.
    pub fn build(self) -> PushController {
        let producer = Arc::new(ProducerSlot::default());
        let (message_sender, message_receiver) = mpsc::channel(256);
        let ticker = (self.interval)(self.period.unwrap_or(*DEFAULT_PUSH_PERIOD))
            .map(|_| PushMessage::Tick);

        (self.spawn)(PushControllerWorker {
            messages: Box::pin(futures::stream::select(message_receiver, ticker)),
            producer: producer.clone(),
            exporter: self.exporter,
            timeout: self.timeout.unwrap_or(*DEFAULT_PUSH_TIMEOUT),
        });

        PushController {
            inner: Arc::new(PushInner {
                message_sender: Mutex::new(message_sender),
                producer,
                temporality: self
                    .temporality
                    .unwrap_or_else(|| Box::new(Temporality::Cumulative)),
            }),
        }
    }
}
