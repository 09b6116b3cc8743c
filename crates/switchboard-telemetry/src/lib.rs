//! Telemetry for Switchboard
//!
//! Structured logging through `tracing`, with optional OTLP export of traces and metrics

mod metadata;
pub mod metrics;

use std::time::Duration;

use opentelemetry::global;
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::{WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use switchboard_config::{ExportProtocol, ExporterConfig, LogFormat, TelemetryConfig};
use tracing_subscriber::Layer;
use tracing_subscriber::registry::LookupSpan;

pub use opentelemetry::{
    KeyValue,
    metrics::{Counter, Histogram, Meter, UpDownCounter},
};

/// Guard that flushes and shuts down exporters on drop
pub struct TelemetryGuard {
    meter_provider: Option<SdkMeterProvider>,
    tracer_provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.meter_provider.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("failed to shutdown meter provider: {e}");
        }
        if let Some(provider) = self.tracer_provider.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("failed to shutdown tracer provider: {e}");
        }
    }
}

/// Initialize logging and, when an OTLP exporter is configured, trace and metric export
///
/// The returned guard must be held for the lifetime of the process.
///
/// # Errors
///
/// Returns an error if an OTLP exporter cannot be built
pub fn init(config: Option<&TelemetryConfig>, log_filter: &str) -> anyhow::Result<TelemetryGuard> {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_new(log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let format = config.map(|c| c.log_format).unwrap_or_default();

    let mut guard = TelemetryGuard {
        meter_provider: None,
        tracer_provider: None,
    };

    let otlp = config.and_then(|c| c.exporters.otlp.as_ref().map(|exporter| (c, exporter)));

    let otel_layer = match otlp {
        Some((telemetry, exporter)) => {
            let resource = metadata::build_resource(telemetry);

            let meter_provider = init_metrics(exporter, resource.clone())?;
            global::set_meter_provider(meter_provider.clone());
            guard.meter_provider = Some(meter_provider);

            let tracer_provider = init_tracer(exporter, resource)?;
            let tracer = tracer_provider.tracer("switchboard");
            global::set_tracer_provider(tracer_provider.clone());
            guard.tracer_provider = Some(tracer_provider);

            Some(tracing_opentelemetry::layer().with_tracer(tracer))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer(format))
        .with(otel_layer)
        .init();

    Ok(guard)
}

fn fmt_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        LogFormat::Text => layer.boxed(),
        LogFormat::Json => layer.json().flatten_event(true).boxed(),
    }
}

fn init_metrics(config: &ExporterConfig, resource: opentelemetry_sdk::Resource) -> anyhow::Result<SdkMeterProvider> {
    use opentelemetry_otlp::MetricExporter;
    use opentelemetry_sdk::metrics::PeriodicReader;

    let timeout = Duration::from_secs(config.timeout);

    let exporter = match config.protocol {
        ExportProtocol::Grpc => MetricExporter::builder()
            .with_tonic()
            .with_endpoint(config.endpoint.as_str())
            .with_timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build gRPC metrics exporter: {e}"))?,
        ExportProtocol::HttpProto => MetricExporter::builder()
            .with_http()
            .with_endpoint(config.endpoint.as_str())
            .with_timeout(timeout)
            .with_headers(config.headers.clone())
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build HTTP metrics exporter: {e}"))?,
    };

    let reader = PeriodicReader::builder(exporter)
        .with_interval(Duration::from_secs(30))
        .build();

    Ok(SdkMeterProvider::builder()
        .with_resource(resource)
        .with_reader(reader)
        .build())
}

fn init_tracer(config: &ExporterConfig, resource: opentelemetry_sdk::Resource) -> anyhow::Result<SdkTracerProvider> {
    use opentelemetry_otlp::SpanExporter;

    let timeout = Duration::from_secs(config.timeout);

    let exporter = match config.protocol {
        ExportProtocol::Grpc => SpanExporter::builder()
            .with_tonic()
            .with_endpoint(config.endpoint.as_str())
            .with_timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build gRPC span exporter: {e}"))?,
        ExportProtocol::HttpProto => SpanExporter::builder()
            .with_http()
            .with_endpoint(config.endpoint.as_str())
            .with_timeout(timeout)
            .with_headers(config.headers.clone())
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build HTTP span exporter: {e}"))?,
    };

    Ok(SdkTracerProvider::builder()
        .with_resource(resource)
        .with_batch_exporter(exporter)
        .build())
}
