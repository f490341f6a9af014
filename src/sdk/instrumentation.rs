//! Provides instrumentation information for both tracing and metric.
use std::borrow::Cow;

/// InstrumentationLibrary represents the instrumentation library.
///
/// It is the identity of a scope: two libraries are the same scope exactly
/// when name, version and schema URL are all equal.
#[derive(Debug, Default, Hash, Clone, PartialEq, Eq)]
pub struct InstrumentationLibrary {
    /// Name is the name of the instrumentation library. It should be the
    /// package name, not the name of the instrumented package.
    pub name: Cow<'static, str>,

    /// Version is the version of the instrumentation library.
    pub version: Option<Cow<'static, str>>,

    /// SchemaURL of the telemetry emitted by the library.
    pub schema_url: Option<Cow<'static, str>>,
}

impl InstrumentationLibrary {
    /// Create a new `InstrumentationLibrary`.
    pub fn new<T>(name: T, version: Option<T>, schema_url: Option<T>) -> Self
    where
        T: Into<Cow<'static, str>>,
    {
        InstrumentationLibrary {
            name: name.into(),
            version: version.map(Into::into),
            schema_url: schema_url.map(Into::into),
        }
    }
}
