/// Prometheus metric definitions.
use prometheus::{
    Counter, CounterVec, Histogram, HistogramVec, Opts, Registry, register_counter_vec_with_registry,
    register_counter_with_registry, register_histogram_vec_with_registry, register_histogram_with_registry,
};
use std::sync::Arc;

/// Metrics collector.
#[derive(Debug, Clone)]
pub struct Metrics {
    /// Labeled by source family (`article`, `aggregator`, `social`).
    pub mentions_loaded: CounterVec,
    pub topics_aggregated: Counter,
    pub dedup_savings: Counter,
    /// Labeled by `reject_reason` (see `detection::quality_gate::RejectReason`).
    pub quality_gate_rejections: CounterVec,
    pub clusters_formed: Counter,
    pub events_upserted: Counter,
    pub evidence_rows_written: Counter,
    pub trending_total: Counter,
    pub breaking_total: Counter,
    pub persister_batch_failures: Counter,
    pub timeout_guard_trips: Counter,

    /// Labeled by `phase` (see `detection::error::Phase::as_str`).
    pub phase_duration: HistogramVec,
    pub run_duration: Histogram,
}

impl Metrics {
    /// Creates a new metrics collector.
    pub fn new(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        Ok(Self {
            mentions_loaded: register_counter_vec_with_registry!(
                Opts::new("trend_mentions_loaded_total", "Mentions loaded per source family"),
                &["source"],
                registry
            )?,
            topics_aggregated: register_counter_with_registry!(
                "trend_topics_aggregated_total",
                "Total number of distinct topic aggregates built in a run",
                registry
            )?,
            dedup_savings: register_counter_with_registry!(
                "trend_dedup_savings_total",
                "Raw mentions minus deduped mentions, summed across topics",
                registry
            )?,
            quality_gate_rejections: register_counter_vec_with_registry!(
                Opts::new("trend_quality_gate_rejections_total", "Topics rejected by the quality gate, by reason"),
                &["reason"],
                registry
            )?,
            clusters_formed: register_counter_with_registry!(
                "trend_clusters_formed_total",
                "Phrase clusters with at least two members",
                registry
            )?,
            events_upserted: register_counter_with_registry!(
                "trend_events_upserted_total",
                "Trend event rows upserted",
                registry
            )?,
            evidence_rows_written: register_counter_with_registry!(
                "trend_evidence_rows_written_total",
                "Evidence rows written",
                registry
            )?,
            trending_total: register_counter_with_registry!(
                "trend_trending_total",
                "Events flagged is_trending in a run",
                registry
            )?,
            breaking_total: register_counter_with_registry!(
                "trend_breaking_total",
                "Events flagged is_breaking in a run",
                registry
            )?,
            persister_batch_failures: register_counter_with_registry!(
                "trend_persister_batch_failures_total",
                "Upsert batches that failed and were skipped",
                registry
            )?,
            timeout_guard_trips: register_counter_with_registry!(
                "trend_timeout_guard_trips_total",
                "Runs where the timeout guard tripped before completion",
                registry
            )?,
            phase_duration: register_histogram_vec_with_registry!(
                "trend_phase_duration_seconds",
                "Wall-clock duration of each detection phase",
                &["phase"],
                registry
            )?,
            run_duration: register_histogram_with_registry!(
                "trend_run_duration_seconds",
                "Total wall-clock duration of a detection run",
                registry
            )?,
        })
    }
}
