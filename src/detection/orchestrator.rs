//! Phase sequencing for one detection run.
//!
//! Each phase is guarded by the `TimeoutGuard`: once tripped, remaining
//! phases are skipped and whatever aggregates survived are pushed through
//! quality-gate/score/persist so the run still produces something.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use tracing::{info, warn};

use crate::config::Config;
use crate::observability::metrics::Metrics;
use crate::pipeline::embedding::EmbeddingService;
use crate::store::dao::TrendDao;

use super::aggregator::Aggregator;
use super::alias::AliasResolver;
use super::cluster::{self};
use super::error::{DetectError, Phase};
use super::keywords::is_evergreen_set_member;
use super::label;
use super::loader::MentionLoader;
use super::model::{
    DetectionReport, Evidence, Mention, PhraseCluster, RollingBaseline, SentimentLabel, Tier, TopicAggregate,
    TrendEvent,
};
use super::persist::{Persistable, Persister};
use super::quality_gate::{self, GateResult};
use super::scorer::{self, ScoringInputs};
use super::tier::TierResolver;
use super::timeout::TimeoutGuard;

pub struct Orchestrator<'a> {
    dao: &'a dyn TrendDao,
    embeddings: Option<&'a EmbeddingService>,
    config: &'a Config,
    metrics: Option<&'a Metrics>,
}

impl<'a> Orchestrator<'a> {
    #[must_use]
    pub fn new(
        dao: &'a dyn TrendDao,
        embeddings: Option<&'a EmbeddingService>,
        config: &'a Config,
        metrics: Option<&'a Metrics>,
    ) -> Self {
        Self { dao, embeddings, config, metrics }
    }

    /// Mark the timeout guard as having tripped before `phase`, for
    /// telemetry, then hand the phase back to the caller as the error.
    fn record_trip(&self, phase: Phase) -> Phase {
        if let Some(metrics) = self.metrics {
            metrics.timeout_guard_trips.inc();
        }
        phase
    }

    /// Record the wall-clock time spent since `checkpoint` against `phase`,
    /// then reset `checkpoint` to now.
    fn mark_phase(&self, phase: Phase, checkpoint: &mut std::time::Instant) {
        if let Some(metrics) = self.metrics {
            metrics
                .phase_duration
                .with_label_values(&[phase.as_str()])
                .observe(checkpoint.elapsed().as_secs_f64());
        }
        *checkpoint = std::time::Instant::now();
    }

    /// Run one full detection pass: load, aggregate, cluster, score,
    /// persist. Returns the run's `DetectionReport` on success; a
    /// `DetectError` marks which phase aborted the run outright (reserved
    /// for loader/budget failures severe enough that nothing downstream
    /// can run).
    pub async fn run(&self) -> Result<DetectionReport, DetectError> {
        let started = std::time::Instant::now();
        let mut checkpoint = started;
        let guard = TimeoutGuard::new(self.config.timeout_guard());
        let now = Utc::now();

        guard.check(Phase::LoadAliases).map_err(|phase| DetectError::BudgetExhausted(self.record_trip(phase)))?;
        let alias_table = self
            .dao
            .load_alias_table()
            .await
            .map_err(|source| DetectError::Phase { phase: Phase::LoadAliases, source })?;
        let alias_resolver = AliasResolver::new(alias_table);
        self.mark_phase(Phase::LoadAliases, &mut checkpoint);

        guard.check(Phase::LoadTiers).map_err(|phase| DetectError::BudgetExhausted(self.record_trip(phase)))?;
        let tier_table = self
            .dao
            .load_tier_table()
            .await
            .map_err(|source| DetectError::Phase { phase: Phase::LoadTiers, source })?;
        let tier_resolver = TierResolver::new(tier_table);
        self.mark_phase(Phase::LoadTiers, &mut checkpoint);

        guard.check(Phase::LoadBaselines).map_err(|phase| DetectError::BudgetExhausted(self.record_trip(phase)))?;
        let baselines = self
            .dao
            .load_baselines(7)
            .await
            .map_err(|source| DetectError::Phase { phase: Phase::LoadBaselines, source })?;
        let baselines_loaded = baselines.len() as u64;
        self.mark_phase(Phase::LoadBaselines, &mut checkpoint);

        guard.check(Phase::LoadMentions).map_err(|phase| DetectError::BudgetExhausted(self.record_trip(phase)))?;
        let mentions = self.load_all_mentions(&tier_resolver, now).await;
        self.mark_phase(Phase::LoadMentions, &mut checkpoint);

        guard.check(Phase::LoadPriorEvents).map_err(|phase| DetectError::BudgetExhausted(self.record_trip(phase)))?;
        let prior_events = self
            .dao
            .load_prior_events(self.config.max_prior_events_for_embedding() as i64)
            .await
            .map_err(|source| DetectError::Phase { phase: Phase::LoadPriorEvents, source })?;
        self.mark_phase(Phase::LoadPriorEvents, &mut checkpoint);

        guard.check(Phase::Aggregate).map_err(|phase| DetectError::BudgetExhausted(self.record_trip(phase)))?;
        let aggregator = Aggregator::new(&alias_resolver);
        let aggregates = aggregator.aggregate(&mentions);
        let topics_processed = aggregates.len() as u64;
        if let Some(metrics) = self.metrics {
            metrics.topics_aggregated.inc_by(topics_processed as f64);
        }
        self.mark_phase(Phase::Aggregate, &mut checkpoint);

        guard.check(Phase::Cluster).map_err(|phase| DetectError::BudgetExhausted(self.record_trip(phase)))?;
        let embeddings_by_key = self.compute_embeddings(&aggregates).await;
        let clusters = cluster::cluster_topics(
            &aggregates,
            &prior_events,
            &embeddings_by_key,
            self.config.embedding_similarity_threshold(),
            self.config.text_similarity_threshold(),
        );
        let cluster_of_key = index_clusters_by_member(&clusters);
        self.mark_phase(Phase::Cluster, &mut checkpoint);

        guard.check(Phase::Score).map_err(|phase| DetectError::BudgetExhausted(self.record_trip(phase)))?;
        let default_baseline = RollingBaseline::default();
        let phrase_neighbor_keys: HashSet<String> = aggregates
            .values()
            .filter(|a| a.is_event_phrase)
            .map(|a| a.key.clone())
            .collect();

        let mut quality_gate_filtered = 0u64;
        let mut items: Vec<Persistable> = Vec::with_capacity(aggregates.len());

        for (key, aggregate) in &aggregates {
            match quality_gate::evaluate(aggregate, &alias_resolver, now) {
                GateResult::Reject(reason) => {
                    quality_gate_filtered += 1;
                    info!(topic = %key, reason = reason.as_str(), "quality gate rejected topic");
                    if let Some(metrics) = self.metrics {
                        metrics.quality_gate_rejections.with_label_values(&[reason.as_str()]).inc();
                    }
                    continue;
                }
                GateResult::Pass { .. } => {}
            }

            let Some((event, evidence)) = self.score_and_build_event(
                aggregate,
                baselines.get(key).unwrap_or(&default_baseline),
                now,
                &phrase_neighbor_keys,
                cluster_of_key.get(key),
            ) else {
                continue;
            };

            items.push(Persistable { event, evidence });
        }
        self.mark_phase(Phase::Score, &mut checkpoint);

        if guard.check(Phase::Persist).is_err() {
            self.record_trip(Phase::Persist);
        }
        let persister = Persister::new(self.dao).with_limits(
            self.config.upsert_batch_size(),
            self.config.emergency_flush_top_n(),
            self.config.baseline_rollup_top_n(),
        );
        let trending_count = items.iter().filter(|i| i.event.is_trending).count() as u64;
        let breaking_count = items.iter().filter(|i| i.event.is_breaking).count() as u64;
        let persist_report = persister.persist(items.clone(), &clusters, &guard).await;
        let baselines_rolled_up = persister
            .rollup_baselines(&items, super::persist::today_utc(), self.config.window_hours())
            .await;
        let _ = baselines_rolled_up;
        self.mark_phase(Phase::Persist, &mut checkpoint);

        let deduped_savings = deduped_savings(&mentions, &aggregates);
        let duration = started.elapsed();

        if let Some(metrics) = self.metrics {
            metrics.dedup_savings.inc_by(deduped_savings as f64);
            metrics.clusters_formed.inc_by(persist_report.clusters_created as f64);
            metrics.events_upserted.inc_by(persist_report.events_upserted as f64);
            metrics.evidence_rows_written.inc_by(persist_report.evidence_count as f64);
            metrics.trending_total.inc_by(trending_count as f64);
            metrics.breaking_total.inc_by(breaking_count as f64);
            metrics.persister_batch_failures.inc_by(persist_report.batches_failed as f64);
            metrics.run_duration.observe(duration.as_secs_f64());
        }

        Ok(DetectionReport {
            topics_processed,
            events_upserted: persist_report.events_upserted,
            trending_count,
            breaking_count,
            quality_gate_filtered,
            evidence_count: persist_report.evidence_count,
            clusters_created: persist_report.clusters_created,
            deduped_savings,
            baselines_loaded,
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            perf_limits: super::model::PerfLimits {
                window_hours: self.config.window_hours(),
                article_cap: self.config.article_cap(),
                aggregator_cap: self.config.aggregator_cap(),
                social_cap: self.config.social_cap(),
                timeout_guard_secs: self.config.timeout_guard_secs(),
                upsert_batch_size: self.config.upsert_batch_size(),
                max_prior_events_for_embedding: self.config.max_prior_events_for_embedding(),
            },
        })
    }

    async fn load_all_mentions(&self, tier_resolver: &TierResolver, now: chrono::DateTime<Utc>) -> Vec<Mention> {
        let window_start = super::loader::default_window_start(now, i64::from(self.config.window_hours()));
        let loader = MentionLoader::new(self.dao, tier_resolver);

        let (articles, aggregator, social) = tokio::join!(
            loader.load_articles(window_start, self.config.article_cap() as i64),
            loader.load_aggregator(window_start, self.config.aggregator_cap() as i64),
            loader.load_social(window_start, self.config.social_cap() as i64),
        );

        if articles.failed {
            warn!(source = "articles", "mention source failed; continuing with partial data");
        }
        if aggregator.failed {
            warn!(source = "aggregator", "mention source failed; continuing with partial data");
        }
        if social.failed {
            warn!(source = "social", "mention source failed; continuing with partial data");
        }

        if let Some(metrics) = self.metrics {
            metrics
                .mentions_loaded
                .with_label_values(&["article"])
                .inc_by(articles.mentions.len() as f64);
            metrics
                .mentions_loaded
                .with_label_values(&["aggregator"])
                .inc_by(aggregator.mentions.len() as f64);
            metrics
                .mentions_loaded
                .with_label_values(&["social"])
                .inc_by(social.mentions.len() as f64);
        }

        let mut mentions = articles.mentions;
        mentions.extend(aggregator.mentions);
        mentions.extend(social.mentions);
        mentions
    }

    async fn compute_embeddings(&self, aggregates: &HashMap<String, TopicAggregate>) -> HashMap<String, Vec<f32>> {
        let Some(service) = self.embeddings else {
            return HashMap::new();
        };

        let mut keys: Vec<&String> = aggregates.keys().collect();
        keys.sort();
        let texts: Vec<String> = keys.iter().map(|k| aggregates[*k].title.clone()).collect();
        if texts.is_empty() {
            return HashMap::new();
        }

        match service.encode(&texts).await {
            Ok(vectors) => keys.into_iter().cloned().zip(vectors).collect(),
            Err(err) => {
                warn!(error = %err, "embedding generation failed; clustering falls back to text similarity only");
                HashMap::new()
            }
        }
    }

    /// Validate the label, score the aggregate, and assemble the
    /// persistable `TrendEvent` + its evidence. Returns `None` only if the
    /// aggregate somehow has no raw mentions (defensive; the aggregator
    /// never produces one).
    fn score_and_build_event(
        &self,
        aggregate: &TopicAggregate,
        baseline: &RollingBaseline,
        now: chrono::DateTime<Utc>,
        phrase_neighbor_keys: &HashSet<String>,
        member_cluster: Option<&PhraseCluster>,
    ) -> Option<(TrendEvent, Vec<Evidence>)> {
        let representative = most_authoritative_mention(aggregate)?;
        let is_single_word = aggregate.title.split_whitespace().count() <= 1;

        let validated = label::validate_label(
            aggregate.label_quality_hint,
            aggregate.is_event_phrase,
            &aggregate.title,
            Some(representative.title.as_str()),
            &aggregate.title,
        );

        let output = scorer::score(ScoringInputs {
            aggregate,
            baseline,
            now,
            is_event_phrase: aggregate.is_event_phrase,
            label_quality: validated.quality,
            evergreen_set_member: is_evergreen_set_member(&aggregate.key),
            is_single_word,
            phrase_neighbor_keys,
        });

        let (context_terms, context_phrases) = top_co_occurring(aggregate);
        let sentiment_score = if aggregate.sentiment_count > 0 {
            Some(aggregate.sentiment_sum / f64::from(aggregate.sentiment_count))
        } else {
            None
        };

        let evidence = build_evidence(aggregate, self.config.evidence_per_event_cap());
        let weighted_evidence_score = evidence.iter().map(|e| e.contribution_score).sum();

        let event = TrendEvent {
            event_key: aggregate.key.clone(),
            event_title: validated.label.clone(),
            canonical_label: aggregate.title.clone(),
            is_event_phrase: aggregate.is_event_phrase,
            label_quality: validated.quality,
            label_source: validated.source.to_string(),
            related_entities: aggregate.related_entities.iter().cloned().collect(),
            related_phrases: member_cluster.map(|c| c.member_keys.clone()).unwrap_or_default(),
            context_terms,
            context_phrases,
            context_summary: None,
            cluster_id: member_cluster.filter(|c| c.member_keys.len() >= 2).map(|c| c.canonical_key.clone()),
            first_seen_at: aggregate.first_seen,
            last_seen_at: aggregate.last_seen,
            peak_at: if output.trend_stage == super::model::TrendStage::Peaking {
                Some(aggregate.last_seen)
            } else {
                None
            },
            baseline_7d: baseline.baseline_7d,
            baseline_30d: baseline.baseline_30d,
            current_1h: output.current_1h,
            current_6h: output.current_6h,
            current_24h: output.current_24h,
            velocity: output.velocity,
            velocity_1h: output.velocity_1h,
            velocity_6h: output.velocity_6h,
            acceleration: output.acceleration,
            trend_score: output.trend_score,
            z_score_velocity: output.z_score_velocity,
            confidence_score: output.confidence_score,
            rank_score: output.rank_score,
            recency_decay: output.recency_decay,
            evergreen_penalty: output.evergreen_penalty,
            confidence_factors: output.confidence_factors,
            is_trending: output.is_trending,
            is_breaking: output.is_breaking,
            trend_stage: output.trend_stage,
            source_count: output.source_count,
            news_source_count: output.news_source_count,
            social_source_count: output.social_source_count,
            corroboration_score: output.corroboration_score,
            evidence_count: i32::try_from(evidence.len()).unwrap_or(i32::MAX),
            top_headline: Some(representative.title.clone()),
            sentiment_score,
            sentiment_label: sentiment_score.map_or(SentimentLabel::Neutral, SentimentLabel::from_score),
            tier1_count: output.tier1_count,
            tier2_count: output.tier2_count,
            tier3_count: output.tier3_count,
            weighted_evidence_score,
            has_tier12_corroboration: output.has_tier12_corroboration,
            is_tier3_only: output.is_tier3_only,
        };

        Some((event, evidence))
    }
}

/// The mention carrying the highest-tier, most recent deduped record —
/// used for the representative headline and label validation.
fn most_authoritative_mention(aggregate: &TopicAggregate) -> Option<&Mention> {
    aggregate
        .deduped
        .values()
        .filter_map(|&index| aggregate.raw_mentions.get(index))
        .min_by(|a, b| a.tier.cmp(&b.tier).then_with(|| b.published_at.cmp(&a.published_at)))
}

fn build_evidence(aggregate: &TopicAggregate, cap: usize) -> Vec<Evidence> {
    let mut candidates: Vec<&Mention> = aggregate
        .deduped
        .values()
        .filter_map(|&index| aggregate.raw_mentions.get(index))
        .collect();
    candidates.sort_by(|a, b| a.tier.cmp(&b.tier).then_with(|| b.published_at.cmp(&a.published_at)));

    candidates
        .into_iter()
        .take(cap)
        .enumerate()
        .map(|(i, mention)| Evidence {
            source_type: mention.source_family,
            source_id: mention.id.clone(),
            source_url: mention.canonical_url.clone(),
            source_title: mention.title.clone(),
            source_domain: mention.domain.clone(),
            published_at: mention.published_at,
            contribution_score: tier_contribution(mention.tier),
            is_primary: i == 0,
            canonical_url: mention.canonical_url.clone(),
            content_hash: format!("{:016x}", mention.content_hash),
            sentiment_score: mention.sentiment_score,
            sentiment_label: mention.sentiment_label,
            source_tier: mention.tier,
        })
        .collect()
}

fn tier_contribution(tier: Tier) -> f64 {
    match tier {
        Tier::Tier1 => 3.0,
        Tier::Tier2 => 2.0,
        Tier::Tier3 => 1.0,
    }
}

/// Top 5 co-occurring topic keys/titles by count, used for the
/// descriptive `context_terms`/`context_phrases` fields (not for gating).
fn top_co_occurring(aggregate: &TopicAggregate) -> (Vec<String>, Vec<String>) {
    let mut pairs: Vec<(&String, &u32)> = aggregate.co_occurrences.iter().collect();
    pairs.sort_by(|a, b| b.1.cmp(a.1));
    let terms: Vec<String> = pairs.iter().take(5).map(|(k, _)| (*k).clone()).collect();
    (terms.clone(), terms)
}

fn index_clusters_by_member(clusters: &[PhraseCluster]) -> HashMap<String, PhraseCluster> {
    let mut index = HashMap::new();
    for cluster in clusters {
        for member in &cluster.member_keys {
            index.insert(member.clone(), cluster.clone());
        }
    }
    index
}

fn deduped_savings(mentions: &[Mention], aggregates: &HashMap<String, TopicAggregate>) -> u64 {
    let raw_total: u64 = aggregates.values().map(|a| a.raw_count() as u64).sum();
    let deduped_total: u64 = aggregates.values().map(|a| a.deduped_count() as u64).sum();
    let _ = mentions;
    raw_total.saturating_sub(deduped_total)
}
