//! Stdout Metrics Exporter
//!
//! Writes one line per exported instrument:
//!
//! ```text
//! scope=lib name=requests kind=Counter temporality=Cumulative sum=6 start=1600000000.000000000 end=1600000010.000000000 resource="service.name=api"
//! ```
use crate::api::labels;
use crate::api::metrics::{self, MetricsError};
use crate::global;
use crate::sdk::export::metrics::{
    Aggregation, Exporter, InstrumentMetrics, ResourceMetrics, Temporality,
};
use crate::sdk::metrics::controllers::{self, PushController, PushControllerWorker};
use crate::sdk::metrics::MeterProvider;
use crate::sdk::{InstrumentationLibrary, Resource};
use futures::Stream;
use std::fmt::{self, Write as _};
use std::io::{self, Write};
use std::sync::Mutex;
use std::time::{self, SystemTime, UNIX_EPOCH};

/// Create a builder for a push controller exporting to stdout.
pub fn stdout<S, SO, I, IS, ISI>(spawn: S, interval: I) -> StdoutExporterBuilder<io::Stdout, S, I>
where
    S: Fn(PushControllerWorker) -> SO,
    I: Fn(time::Duration) -> IS,
    IS: Stream<Item = ISI> + Send + 'static,
{
    StdoutExporterBuilder {
        spawn,
        interval,
        writer: io::stdout(),
        do_not_print_time: false,
        label_encoder: None,
        resource: None,
        period: None,
        temporality: Temporality::Cumulative,
    }
}

/// Writes snapshots as text lines.
#[derive(Debug)]
pub struct StdoutExporter<W> {
    writer: Mutex<W>,
    do_not_print_time: bool,
    label_encoder: Box<dyn labels::Encoder + Send + Sync>,
}

impl<W: io::Write> StdoutExporter<W> {
    /// An exporter writing to `writer` with the default label encoder.
    pub fn new(writer: W) -> Self {
        StdoutExporter {
            writer: Mutex::new(writer),
            do_not_print_time: false,
            label_encoder: labels::default_encoder(),
        }
    }

    fn format_line(
        &self,
        library: &InstrumentationLibrary,
        instrument: &InstrumentMetrics,
        resource: &str,
    ) -> Result<String, fmt::Error> {
        let descriptor = instrument.descriptor();
        let mut line = String::new();

        write!(line, "scope={}", library.name)?;
        if let Some(version) = &library.version {
            write!(line, "@{}", version)?;
        }
        write!(
            line,
            " name={} kind={:?} temporality={:?}",
            descriptor.name(),
            descriptor.instrument_kind(),
            instrument.temporality()
        )?;

        let number_kind = descriptor.number_kind();
        match instrument.aggregation() {
            Aggregation::Sum(sum) => write!(line, " sum={}", sum.sum().display(number_kind))?,
            Aggregation::LastValue(last) => {
                write!(line, " last_value={}", last.last_value().display(number_kind))?
            }
        }
        if let Some(unit) = descriptor.unit().filter(|unit| !unit.is_empty()) {
            write!(line, " unit={}", unit)?;
        }
        if !self.do_not_print_time {
            write!(
                line,
                " start={} end={}",
                unix_seconds(instrument.start_time()),
                unix_seconds(instrument.end_time())
            )?;
        }
        if !resource.is_empty() {
            write!(line, " resource={:?}", resource)?;
        }
        Ok(line)
    }
}

fn unix_seconds(time: SystemTime) -> String {
    let since_epoch = time.duration_since(UNIX_EPOCH).unwrap_or_default();
    format!("{}.{:09}", since_epoch.as_secs(), since_epoch.subsec_nanos())
}

impl<W: io::Write + fmt::Debug> Exporter for StdoutExporter<W> {
    fn export(&self, metrics: &ResourceMetrics) -> metrics::Result<()> {
        let resource = metrics.resource().encoded(self.label_encoder.as_ref());
        let mut lines = Vec::new();
        for scope in metrics.scopes() {
            for instrument in scope.instruments() {
                lines.push(
                    self.format_line(scope.library(), instrument, &resource)
                        .map_err(|err| MetricsError::ExportFailed(Box::new(err)))?,
                );
            }
        }

        let mut writer = self.writer.lock()?;
        for line in lines {
            writeln!(writer, "{}", line)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Configuration for a stdout push pipeline.
pub struct StdoutExporterBuilder<W, S, I> {
    spawn: S,
    interval: I,
    writer: W,
    do_not_print_time: bool,
    label_encoder: Option<Box<dyn labels::Encoder + Send + Sync>>,
    resource: Option<Resource>,
    period: Option<time::Duration>,
    temporality: Temporality,
}

impl<W: fmt::Debug, S, I> fmt::Debug for StdoutExporterBuilder<W, S, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdoutExporterBuilder")
            .field("writer", &self.writer)
            .field("do_not_print_time", &self.do_not_print_time)
            .field("label_encoder", &self.label_encoder)
            .field("resource", &self.resource)
            .field("period", &self.period)
            .field("temporality", &self.temporality)
            .finish()
    }
}

impl<W, S, SO, I, IS, ISI> StdoutExporterBuilder<W, S, I>
where
    W: io::Write + fmt::Debug + Send + 'static,
    S: Fn(PushControllerWorker) -> SO,
    I: Fn(time::Duration) -> IS,
    IS: Stream<Item = ISI> + Send + 'static,
{
    /// Write to `writer` instead of stdout.
    pub fn with_writer<W2: io::Write>(self, writer: W2) -> StdoutExporterBuilder<W2, S, I> {
        StdoutExporterBuilder {
            spawn: self.spawn,
            interval: self.interval,
            writer,
            do_not_print_time: self.do_not_print_time,
            label_encoder: self.label_encoder,
            resource: self.resource,
            period: self.period,
            temporality: self.temporality,
        }
    }

    /// Leave start and end times out of every line.
    pub fn with_do_not_print_time(self, do_not_print_time: bool) -> Self {
        StdoutExporterBuilder {
            do_not_print_time,
            ..self
        }
    }

    /// Encode the resource with `label_encoder`.
    pub fn with_label_encoder<E>(self, label_encoder: E) -> Self
    where
        E: labels::Encoder + Send + Sync + 'static,
    {
        StdoutExporterBuilder {
            label_encoder: Some(Box::new(label_encoder)),
            ..self
        }
    }

    /// The resource of the provider built by `try_init`.
    pub fn with_resource(self, resource: Resource) -> Self {
        StdoutExporterBuilder {
            resource: Some(resource),
            ..self
        }
    }

    /// How often to export.
    pub fn with_period(self, period: time::Duration) -> Self {
        StdoutExporterBuilder {
            period: Some(period),
            ..self
        }
    }

    /// The temporality to export with. Defaults to cumulative.
    pub fn with_temporality(self, temporality: Temporality) -> Self {
        StdoutExporterBuilder {
            temporality,
            ..self
        }
    }

    /// Start the push controller, install a provider reading from it as the
    /// global provider and return the controller.
    pub fn try_init(self) -> metrics::Result<PushController> {
        let exporter = StdoutExporter {
            writer: Mutex::new(self.writer),
            do_not_print_time: self.do_not_print_time,
            label_encoder: self.label_encoder.unwrap_or_else(labels::default_encoder),
        };

        let mut controller = controllers::push(exporter, self.spawn, self.interval)
            .with_temporality(self.temporality);
        if let Some(period) = self.period {
            controller = controller.with_period(period);
        }
        let controller = controller.build();

        let mut provider = MeterProvider::builder().with_reader(controller.clone());
        if let Some(resource) = self.resource {
            provider = provider.with_resource(resource);
        }
        global::set_meter_provider(provider.build());
        Ok(controller)
    }
}
