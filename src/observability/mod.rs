pub(crate) mod metrics;
pub(crate) mod tracing;

use std::sync::Arc;

use anyhow::Result;
use prometheus::{Encoder, Registry, TextEncoder};

use self::metrics::Metrics;

/// Owns telemetry (metrics and tracing) for the service.
#[derive(Debug, Clone)]
pub struct Telemetry {
    metrics: Arc<Metrics>,
}

impl Telemetry {
    /// Creates a new `Telemetry` instance, initializing tracing and metrics.
    pub fn new() -> Result<Self> {
        tracing::init()?;
        let registry = Arc::new(Registry::new());
        let metrics = Arc::new(Metrics::new(Arc::clone(&registry))?);
        Ok(Self { metrics })
    }

    /// Provides access to the metrics.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Records a readiness probe.
    pub fn record_ready_probe(&self) {
        ::tracing::info!("service ready probe recorded");
    }

    /// Records a liveness probe.
    pub fn record_live_probe(&self) {
        ::tracing::debug!("service live probe");
    }

    /// Records an admin-triggered rerun invocation.
    pub fn record_admin_retry_invocation(&self) {
        ::tracing::warn!("admin retry invoked");
    }

    /// Renders the Prometheus metrics.
    pub fn render_prometheus(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = prometheus::gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).ok();
        String::from_utf8(buffer).unwrap_or_default()
    }
}
