//! Persister.
//!
//! Writes trend events, evidence, phrase clusters, and today's baseline
//! rollup, all in batches of `BATCH_SIZE`. When the `TimeoutGuard` trips
//! mid-persist, the remaining queue is reordered breaking-first-then-rank-
//! descending and truncated to `EMERGENCY_FLUSH_LIMIT` so the highest-value
//! events still land before the run ends.

use chrono::{NaiveDate, Utc};
use tracing::{error, warn};

use crate::store::dao::TrendDao;
use crate::util::error::{ErrorKind, classify_error};

use super::error::PersistError;
use super::model::{Evidence, PhraseCluster, TrendEvent};
use super::timeout::TimeoutGuard;

pub const BATCH_SIZE: usize = 100;
const EMERGENCY_FLUSH_LIMIT: usize = 50;
const SIMILARITY_THRESHOLD_FOR_PERSIST: f64 = 0.82;
const TOP_BASELINE_ROLLUP_COUNT: usize = 200;

#[derive(Debug, Clone, Default)]
pub struct PersistReport {
    pub events_upserted: u64,
    pub evidence_count: u64,
    pub clusters_created: u64,
    pub baselines_rolled_up: u64,
    pub batches_failed: u64,
}

/// One event plus the evidence rows backing it, kept together so a
/// priority reorder can carry both in lockstep.
#[derive(Clone)]
pub struct Persistable {
    pub event: TrendEvent,
    pub evidence: Vec<Evidence>,
}

pub struct Persister<'a> {
    dao: &'a dyn TrendDao,
    batch_size: usize,
    emergency_flush_limit: usize,
    baseline_rollup_top_n: usize,
}

impl<'a> Persister<'a> {
    #[must_use]
    pub fn new(dao: &'a dyn TrendDao) -> Self {
        Self {
            dao,
            batch_size: BATCH_SIZE,
            emergency_flush_limit: EMERGENCY_FLUSH_LIMIT,
            baseline_rollup_top_n: TOP_BASELINE_ROLLUP_COUNT,
        }
    }

    /// Override the batch size, emergency-flush cap, and baseline-rollup
    /// top-N from the run's `Config`, in place of the built-in defaults.
    #[must_use]
    pub fn with_limits(mut self, batch_size: usize, emergency_flush_limit: usize, baseline_rollup_top_n: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self.emergency_flush_limit = emergency_flush_limit;
        self.baseline_rollup_top_n = baseline_rollup_top_n;
        self
    }

    /// Persist every item, batching upserts and isolating per-batch
    /// failures. If `guard` is tripped before the first batch, or trips
    /// between batches, the not-yet-written remainder is reprioritized
    /// breaking-first-then-rank and truncated to `emergency_flush_limit`.
    pub async fn persist(
        &self,
        mut items: Vec<Persistable>,
        clusters: &[PhraseCluster],
        guard: &TimeoutGuard,
    ) -> PersistReport {
        let mut report = PersistReport::default();

        if guard.is_tripped() {
            warn!("timeout budget exhausted before persist; falling back to priority flush");
            items = emergency_priority_flush(items, self.emergency_flush_limit);
        }

        let mut offset = 0;
        let mut batch_index = 0;
        while offset < items.len() {
            if offset > 0 && guard.is_tripped() {
                warn!("timeout budget exhausted between persist batches; reprioritizing remaining queue");
                let remaining = items.split_off(offset);
                items = emergency_priority_flush(remaining, self.emergency_flush_limit);
                offset = 0;
                continue;
            }

            let end = (offset + self.batch_size).min(items.len());
            let events: Vec<TrendEvent> = items[offset..end].iter().map(|item| item.event.clone()).collect();
            match self.dao.upsert_trend_events(&events).await {
                Ok(affected) => report.events_upserted += affected,
                Err(source) => {
                    let kind = classify_error(&source);
                    let err = PersistError::Batch { index: batch_index, source };
                    if kind == ErrorKind::Fatal {
                        error!(error = %err, "trend event batch failed, skipping");
                    } else {
                        warn!(error = %err, "trend event batch failed, skipping");
                    }
                    report.batches_failed += 1;
                    offset = end;
                    batch_index += 1;
                    continue;
                }
            }

            for item in &items[offset..end] {
                if item.evidence.is_empty() {
                    continue;
                }
                if let Err(err) = self.dao.replace_evidence(&item.event.event_key, &item.evidence).await {
                    warn!(error = %err, event_key = %item.event.event_key, "failed to replace evidence");
                    continue;
                }
                report.evidence_count += item.evidence.len() as u64;
            }

            offset = end;
            batch_index += 1;
        }

        match self.dao.upsert_clusters(clusters, SIMILARITY_THRESHOLD_FOR_PERSIST).await {
            Ok(count) => report.clusters_created = count,
            Err(err) => warn!(error = %err, "failed to upsert phrase clusters"),
        }

        report
    }

    /// Roll up today's baseline for the top `TOP_BASELINE_ROLLUP_COUNT`
    /// events by rank, recomputing the relative std-dev guard against a
    /// zero mean. `window_hours` shortens the averaging divisor for
    /// windows under 24h so a partial-day run doesn't understate the rate.
    pub async fn rollup_baselines(&self, items: &[Persistable], today: NaiveDate, window_hours: u32) -> u64 {
        let mut ranked: Vec<&Persistable> = items.iter().collect();
        ranked.sort_by(|a, b| b.event.rank_score.total_cmp(&a.event.rank_score));

        let averaging_hours = f64::from(window_hours.min(24).max(1));
        let mut rolled_up = 0u64;
        for item in ranked.into_iter().take(self.baseline_rollup_top_n) {
            let event = &item.event;
            let hourly_average = f64::from(event.current_24h) / averaging_hours;
            let hourly_std_dev = event.velocity.abs() / 24.0_f64.sqrt();
            let relative_std_dev = if hourly_average > 0.0 {
                hourly_std_dev / hourly_average
            } else {
                0.0
            };
            let news_mentions = event.news_source_count.max(0);
            let social_mentions = event.social_source_count.max(0);

            if let Err(err) = self
                .dao
                .upsert_baseline_rollup(
                    &event.event_key,
                    today,
                    event.current_24h,
                    hourly_average,
                    hourly_std_dev,
                    relative_std_dev,
                    news_mentions,
                    social_mentions,
                )
                .await
            {
                warn!(error = %err, event_key = %event.event_key, "failed to roll up baseline");
                continue;
            }
            rolled_up += 1;
        }
        rolled_up
    }
}

/// Breaking events first, then by rank descending, truncated so the
/// persist pass still finishes inside whatever time remains.
fn emergency_priority_flush(mut items: Vec<Persistable>, limit: usize) -> Vec<Persistable> {
    items.sort_by(|a, b| {
        b.event
            .is_breaking
            .cmp(&a.event.is_breaking)
            .then_with(|| b.event.rank_score.total_cmp(&a.event.rank_score))
    });
    items.truncate(limit);
    items
}

#[must_use]
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::model::{LabelQuality, SentimentLabel, SourceFamily, Tier, TrendStage};
    use crate::store::dao::MockTrendDao;
    use chrono::TimeZone;
    use std::time::Duration;

    fn sample_event(key: &str, rank_score: f64, is_breaking: bool) -> TrendEvent {
        TrendEvent {
            event_key: key.to_string(),
            event_title: key.to_string(),
            canonical_label: key.to_string(),
            is_event_phrase: true,
            label_quality: LabelQuality::EventPhrase,
            label_source: "test".to_string(),
            related_entities: vec![],
            related_phrases: vec![],
            context_terms: vec![],
            context_phrases: vec![],
            context_summary: None,
            cluster_id: None,
            first_seen_at: Utc.with_ymd_and_hms(2026, 7, 28, 8, 0, 0).unwrap(),
            last_seen_at: Utc.with_ymd_and_hms(2026, 7, 28, 10, 0, 0).unwrap(),
            peak_at: None,
            baseline_7d: 1.0,
            baseline_30d: 1.0,
            current_1h: 3,
            current_6h: 6,
            current_24h: 10,
            velocity: 2.0,
            velocity_1h: 2.0,
            velocity_6h: 1.0,
            acceleration: 1.0,
            trend_score: 40.0,
            z_score_velocity: 3.0,
            confidence_score: 70,
            rank_score,
            recency_decay: 1.0,
            evergreen_penalty: 1.0,
            confidence_factors: super::super::model::ConfidenceFactors {
                velocity_component: 1.0,
                corroboration_component: 1.0,
                activity_component: 1.0,
                recency_decay: 1.0,
                evergreen_penalty: 1.0,
                label_quality_modifier: 1.0,
                context_penalty: 1.0,
                baseline_quality: 1.0,
                breaking_criteria: None,
            },
            is_trending: true,
            is_breaking,
            trend_stage: TrendStage::Surging,
            source_count: 3,
            news_source_count: 1,
            social_source_count: 1,
            corroboration_score: 20,
            evidence_count: 2,
            top_headline: Some("headline".to_string()),
            sentiment_score: Some(0.0),
            sentiment_label: SentimentLabel::Neutral,
            tier1_count: 1,
            tier2_count: 0,
            tier3_count: 1,
            weighted_evidence_score: 5.0,
            has_tier12_corroboration: true,
            is_tier3_only: false,
        }
    }

    fn sample_evidence(key: &str) -> Evidence {
        Evidence {
            source_type: SourceFamily::Article,
            source_id: format!("{key}-1"),
            source_url: None,
            source_title: "title".to_string(),
            source_domain: "example.com".to_string(),
            published_at: Utc.with_ymd_and_hms(2026, 7, 28, 10, 0, 0).unwrap(),
            contribution_score: 1.0,
            is_primary: true,
            canonical_url: None,
            content_hash: "abc".to_string(),
            sentiment_score: None,
            sentiment_label: None,
            source_tier: Tier::Tier1,
        }
    }

    #[tokio::test]
    async fn persists_events_and_evidence() {
        let dao = MockTrendDao::default();
        let persister = Persister::new(&dao);
        let items = vec![Persistable {
            event: sample_event("a", 50.0, false),
            evidence: vec![sample_evidence("a")],
        }];
        let guard = TimeoutGuard::new(Duration::from_secs(45));
        let report = persister.persist(items, &[], &guard).await;
        assert_eq!(report.events_upserted, 1);
        assert_eq!(report.evidence_count, 1);
    }

    #[tokio::test]
    async fn batch_failure_is_isolated() {
        let mut dao = MockTrendDao::default();
        dao.fail_upsert = true;
        let persister = Persister::new(&dao);
        let items = vec![Persistable {
            event: sample_event("a", 50.0, false),
            evidence: vec![],
        }];
        let guard = TimeoutGuard::new(Duration::from_secs(45));
        let report = persister.persist(items, &[], &guard).await;
        assert_eq!(report.events_upserted, 0);
        assert_eq!(report.batches_failed, 1);
    }

    #[test]
    fn emergency_flush_orders_breaking_first_then_rank() {
        let items = vec![
            Persistable { event: sample_event("low", 10.0, false), evidence: vec![] },
            Persistable { event: sample_event("breaking", 5.0, true), evidence: vec![] },
            Persistable { event: sample_event("high", 90.0, false), evidence: vec![] },
        ];
        let flushed = emergency_priority_flush(items, EMERGENCY_FLUSH_LIMIT);
        assert_eq!(flushed[0].event.event_key, "breaking");
        assert_eq!(flushed[1].event.event_key, "high");
        assert_eq!(flushed[2].event.event_key, "low");
    }

    #[test]
    fn emergency_flush_truncates_to_limit() {
        let items: Vec<Persistable> = (0..(EMERGENCY_FLUSH_LIMIT + 10))
            .map(|i| Persistable {
                event: sample_event(&format!("e{i}"), i as f64, false),
                evidence: vec![],
            })
            .collect();
        let flushed = emergency_priority_flush(items, EMERGENCY_FLUSH_LIMIT);
        assert_eq!(flushed.len(), EMERGENCY_FLUSH_LIMIT);
    }
}
