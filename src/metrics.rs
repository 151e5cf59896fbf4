//! Prometheus request metrics.
//!
//! The registry owns a local (not globally installed) Prometheus recorder, so
//! each [`MetricsRegistry`] is an isolated set of instruments. Instruments are
//! declared up front through [`MetricsRegistryBuilder`] and the frozen registry
//! is shared behind an `Arc` by the instrumentation middleware and the
//! `/metrics` handler.
//!
//! Counters and histogram buckets are atomics inside the exporter, so
//! concurrent requests updating the same label set never lose updates.

use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{Counter, Histogram, Key, KeyName, Label, Level, Metadata, Recorder, SharedString};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use strum::Display;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error};

use crate::error::MetricsError;

// === Metric Name Constants ===

/// Request duration histogram metric name.
pub const METRIC_HTTP_REQUEST_DURATION: &str = "http_request_duration_seconds";
/// Request counter metric name.
pub const METRIC_HTTP_REQUESTS_TOTAL: &str = "http_requests_total";

/// Method label name.
pub const LABEL_METHOD: &str = "method";
/// Route pattern (or raw path) label name.
pub const LABEL_ROUTE: &str = "route";
/// Response status label name.
pub const LABEL_STATUS_CODE: &str = "status_code";

/// Bucket boundaries for the request duration histogram, in seconds.
pub const HTTP_DURATION_BUCKETS: [f64; 5] = [0.1, 0.5, 1.0, 2.0, 5.0];

/// Content type of the text exposition format.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

static METADATA: Metadata<'static> = Metadata::new(module_path!(), Level::INFO, Some(module_path!()));

/// Kind of a registered instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum InstrumentKind {
    /// Monotonic counter.
    Counter,
    /// Bucketed distribution.
    Histogram,
}

/// Declaration of a named instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    name: String,
    help: String,
    kind: InstrumentKind,
    label_names: Vec<String>,
    buckets: Vec<f64>,
}

impl Instrument {
    /// Declare a counter.
    pub fn counter(name: impl Into<String>, help: impl Into<String>, label_names: &[&str]) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            kind: InstrumentKind::Counter,
            label_names: label_names.iter().map(|l| l.to_string()).collect(),
            buckets: Vec::new(),
        }
    }

    /// Declare a histogram with fixed bucket boundaries.
    pub fn histogram(
        name: impl Into<String>,
        help: impl Into<String>,
        label_names: &[&str],
        buckets: &[f64],
    ) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            kind: InstrumentKind::Histogram,
            label_names: label_names.iter().map(|l| l.to_string()).collect(),
            buckets: buckets.to_vec(),
        }
    }

    /// Instrument name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Instrument kind.
    pub fn kind(&self) -> InstrumentKind {
        self.kind
    }

    /// Declared label names, in exposition order.
    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    /// Put caller labels into declared order, rejecting missing or extra names.
    fn labels(&self, labels: &[(&str, &str)]) -> Result<Vec<Label>, MetricsError> {
        let mismatch = || MetricsError::LabelMismatch {
            name: self.name.clone(),
            expected: self.label_names.clone(),
            actual: labels.iter().map(|(k, _)| k.to_string()).collect(),
        };

        if labels.len() != self.label_names.len() {
            return Err(mismatch());
        }

        self.label_names
            .iter()
            .map(|declared| {
                labels
                    .iter()
                    .find(|(k, _)| *k == declared.as_str())
                    .map(|(k, v)| Label::new(k.to_string(), v.to_string()))
                    .ok_or_else(|| mismatch())
            })
            .collect()
    }
}

/// Collects instrument declarations before the registry is frozen.
#[derive(Debug, Default)]
pub struct MetricsRegistryBuilder {
    instruments: Vec<Instrument>,
}

impl MetricsRegistryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an instrument. Names must be unique across kinds.
    pub fn register(&mut self, instrument: Instrument) -> Result<&mut Self, MetricsError> {
        if self.instruments.iter().any(|i| i.name == instrument.name) {
            return Err(MetricsError::DuplicateMetricName(instrument.name));
        }
        self.instruments.push(instrument);
        Ok(self)
    }

    /// Freeze the declarations into a recording registry.
    pub fn build(self) -> Result<MetricsRegistry, MetricsError> {
        let mut builder = PrometheusBuilder::new();
        for instrument in self.instruments.iter().filter(|i| i.kind == InstrumentKind::Histogram) {
            builder = builder.set_buckets_for_metric(Matcher::Full(instrument.name.clone()), &instrument.buckets)?;
        }

        let recorder = builder.build_recorder();
        let handle = recorder.handle();

        for instrument in &self.instruments {
            let key = KeyName::from(instrument.name.clone());
            let help = SharedString::from(instrument.help.clone());
            match instrument.kind {
                InstrumentKind::Counter => recorder.describe_counter(key, None, help),
                InstrumentKind::Histogram => recorder.describe_histogram(key, None, help),
            }
        }

        debug!(count = self.instruments.len(), "Metrics registry built");

        Ok(MetricsRegistry {
            recorder,
            handle,
            instruments: self
                .instruments
                .into_iter()
                .map(|i| (i.name.clone(), i))
                .collect(),
        })
    }
}

/// Frozen set of instruments plus their live aggregates.
pub struct MetricsRegistry {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
    instruments: HashMap<String, Instrument>,
}

impl fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.instruments.keys().collect();
        names.sort();
        f.debug_struct("MetricsRegistry")
            .field("instruments", &names)
            .finish_non_exhaustive()
    }
}

impl MetricsRegistry {
    /// Start declaring instruments.
    pub fn builder() -> MetricsRegistryBuilder {
        MetricsRegistryBuilder::new()
    }

    /// Registry with the HTTP request histogram and counter.
    pub fn for_http() -> Result<Self, MetricsError> {
        let labels = [LABEL_METHOD, LABEL_ROUTE, LABEL_STATUS_CODE];
        let mut builder = Self::builder();
        builder
            .register(Instrument::histogram(
                METRIC_HTTP_REQUEST_DURATION,
                "Duration of HTTP requests in seconds",
                &labels,
                &HTTP_DURATION_BUCKETS,
            ))?
            .register(Instrument::counter(
                METRIC_HTTP_REQUESTS_TOTAL,
                "Total number of HTTP requests",
                &labels,
            ))?;
        builder.build()
    }

    /// Registered instrument by name.
    pub fn instrument(&self, name: &str) -> Option<&Instrument> {
        self.instruments.get(name)
    }

    fn key_for(
        &self,
        name: &str,
        kind: InstrumentKind,
        labels: &[(&str, &str)],
    ) -> Result<Key, MetricsError> {
        let instrument = self
            .instruments
            .get(name)
            .ok_or_else(|| MetricsError::UnknownMetric(name.to_string()))?;

        if instrument.kind != kind {
            return Err(MetricsError::KindMismatch {
                name: name.to_string(),
                expected: kind,
                actual: instrument.kind,
            });
        }

        Ok(Key::from_parts(instrument.name.clone(), instrument.labels(labels)?))
    }

    fn histogram(&self, name: &str, labels: &[(&str, &str)]) -> Result<Histogram, MetricsError> {
        let key = self.key_for(name, InstrumentKind::Histogram, labels)?;
        Ok(self.recorder.register_histogram(&key, &METADATA))
    }

    fn counter(&self, name: &str, labels: &[(&str, &str)]) -> Result<Counter, MetricsError> {
        let key = self.key_for(name, InstrumentKind::Counter, labels)?;
        Ok(self.recorder.register_counter(&key, &METADATA))
    }

    /// Record one observation on a histogram.
    pub fn observe(&self, name: &str, labels: &[(&str, &str)], value: f64) -> Result<(), MetricsError> {
        self.histogram(name, labels)?.record(value);
        Ok(())
    }

    /// Increment a counter by one.
    pub fn increment(&self, name: &str, labels: &[(&str, &str)]) -> Result<(), MetricsError> {
        self.counter(name, labels)?.increment(1);
        Ok(())
    }

    /// Record one completed HTTP request on both request instruments.
    ///
    /// Both handles are resolved before either is touched, so a failure leaves
    /// neither instrument updated.
    pub fn record_http_request(
        &self,
        method: &str,
        route: &str,
        status: u16,
        elapsed: Duration,
    ) -> Result<(), MetricsError> {
        let status = status.to_string();
        let labels = [
            (LABEL_METHOD, method),
            (LABEL_ROUTE, route),
            (LABEL_STATUS_CODE, status.as_str()),
        ];

        let duration = self.histogram(METRIC_HTTP_REQUEST_DURATION, &labels)?;
        let total = self.counter(METRIC_HTTP_REQUESTS_TOTAL, &labels)?;
        duration.record(elapsed.as_secs_f64());
        total.increment(1);
        Ok(())
    }

    /// Render every instrument in the text exposition format.
    ///
    /// Never fails: a panic inside the exporter yields an empty body.
    pub fn export(&self) -> String {
        render_or_empty(|| self.handle.render())
    }

    /// Drain buffered histogram samples into their buckets.
    ///
    /// The local recorder has no background task, so samples accumulate until
    /// this runs or a scrape renders them.
    pub fn run_upkeep(&self) {
        self.handle.run_upkeep();
    }
}

fn render_or_empty(render: impl FnOnce() -> String) -> String {
    catch_unwind(AssertUnwindSafe(render)).unwrap_or_else(|_| {
        error!("Metrics exporter panicked while rendering");
        String::new()
    })
}

/// Period between histogram drains in the server.
pub const UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Run [`MetricsRegistry::run_upkeep`] every `period` until the task is aborted.
pub fn spawn_upkeep(registry: Arc<MetricsRegistry>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            registry.run_upkeep();
        }
    })
}

/// Measures one request from construction to [`RequestTimer::elapsed`].
#[derive(Debug, Clone, Copy)]
pub struct RequestTimer {
    start: Instant,
}

impl RequestTimer {
    /// Start timing now.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Time since start.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
