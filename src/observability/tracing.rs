use anyhow::{Context, Error, Result};
use once_cell::sync::OnceCell;
use opentelemetry::{KeyValue, global, trace::TracerProvider};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource,
    trace::{RandomIdGenerator, Sampler, SdkTracer, SdkTracerProvider},
};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static TRACING_INIT: OnceCell<()> = OnceCell::new();

/// Initializes the tracing subscriber exactly once.
///
/// When OTel configuration is provided, traces are sent via the OTLP
/// exporter. Without it, only the standard fmt layer is used.
///
/// # Errors
/// Returns an error if the subscriber fails to initialize.
pub fn init() -> Result<()> {
    TRACING_INIT.get_or_try_init(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let fmt_layer = tracing_subscriber::fmt::layer().with_target(false).json();

        // Note: OpenTelemetry is currently disabled due to a version mismatch
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|error| Error::msg(error.to_string()))?;

        info!("Standard tracing initialized");

        Ok::<(), Error>(())
    })?;
    Ok(())
}

/// Initializes an OpenTelemetry tracer via the OTLP exporter.
///
/// The sampling ratio is controlled by the `OTEL_SAMPLING_RATIO` environment
/// variable (default 1.0 = all traces).
///
/// # Errors
/// Returns an error if the tracer fails to initialize.
#[allow(dead_code)]
fn init_tracer(endpoint: &str) -> Result<SdkTracer> {
    let sampling_ratio = std::env::var("OTEL_SAMPLING_RATIO")
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(1.0);

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .context("failed to build OTLP span exporter")?;

    let resource = Resource::builder()
        .with_attributes([
            KeyValue::new("service.name", "trend-detector"),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
        ])
        .build();

    let tracer_provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_sampler(Sampler::TraceIdRatioBased(sampling_ratio))
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource)
        .build();

    let tracer = tracer_provider.tracer("trend-detector");

    // Set the global tracer provider
    global::set_tracer_provider(tracer_provider);

    Ok(tracer)
}

/// Runs the OpenTelemetry global shutdown, flushing any unsent spans.
///
/// Call this on application exit.
#[allow(dead_code)]
pub fn shutdown() {
    // OpenTelemetry 0.31.0 doesn't expose the SdkTracerProvider directly off
    // the global tracer provider, so shutdown has to be managed separately:
    // hold on to the SdkTracerProvider returned by init_tracer and call its
    // shutdown() directly on application exit.
}
