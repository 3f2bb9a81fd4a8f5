//! `TrendDaoImpl` - Postgres implementation of the `TrendDao` trait.

use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use crate::detection::model::{Evidence, PhraseCluster, PriorEvent, RollingBaseline, SentimentLabel, Tier, TrendEvent};
use crate::store::models::MentionRow;

use super::dao::TrendDao;

#[derive(Debug, Clone)]
pub struct TrendDaoImpl {
    pool: PgPool,
}

impl TrendDaoImpl {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse_tier(raw: &str) -> Tier {
    match raw {
        "tier1" => Tier::Tier1,
        "tier2" => Tier::Tier2,
        _ => Tier::Tier3,
    }
}

#[async_trait]
impl TrendDao for TrendDaoImpl {
    fn pool(&self) -> Option<&PgPool> {
        Some(&self.pool)
    }

    async fn load_alias_table(&self) -> anyhow::Result<HashMap<String, String>> {
        let rows = sqlx::query("SELECT raw_form, canonical_title FROM trend_aliases")
            .fetch_all(&self.pool)
            .await
            .context("failed to load alias table")?;

        let mut table = HashMap::with_capacity(rows.len());
        for row in rows {
            let raw_form: String = row.try_get("raw_form")?;
            let canonical_title: String = row.try_get("canonical_title")?;
            table.insert(raw_form.to_lowercase(), canonical_title);
        }
        Ok(table)
    }

    async fn load_tier_table(&self) -> anyhow::Result<HashMap<String, Tier>> {
        let rows = sqlx::query("SELECT domain, tier FROM trend_source_tiers")
            .fetch_all(&self.pool)
            .await
            .context("failed to load tier table")?;

        let mut table = HashMap::with_capacity(rows.len());
        for row in rows {
            let domain: String = row.try_get("domain")?;
            let tier: String = row.try_get("tier")?;
            table.insert(domain.to_lowercase(), parse_tier(&tier));
        }
        Ok(table)
    }

    async fn load_baselines(&self, window_days: i64) -> anyhow::Result<HashMap<String, RollingBaseline>> {
        let rows = sqlx::query(
            r"
            SELECT
                event_key,
                AVG(hourly_average) FILTER (WHERE baseline_date >= CURRENT_DATE - $1::int) AS baseline_window,
                AVG(hourly_average) FILTER (WHERE baseline_date >= CURRENT_DATE - 30) AS baseline_30d,
                AVG(hourly_std_dev) FILTER (WHERE baseline_date >= CURRENT_DATE - $1::int) AS stddev_window,
                COUNT(*) FILTER (WHERE baseline_date >= CURRENT_DATE - $1::int) AS data_points
            FROM trend_baselines
            WHERE baseline_date < CURRENT_DATE
            GROUP BY event_key
            ",
        )
        .bind(window_days as i32)
        .fetch_all(&self.pool)
        .await
        .context("failed to load baselines")?;

        let mut baselines = HashMap::with_capacity(rows.len());
        for row in rows {
            let event_key: String = row.try_get("event_key")?;
            let baseline_7d: Option<f64> = row.try_get("baseline_window")?;
            let baseline_30d: Option<f64> = row.try_get("baseline_30d")?;
            let stddev_7d: Option<f64> = row.try_get("stddev_window")?;
            let data_points_7d: i64 = row.try_get("data_points")?;
            baselines.insert(
                event_key,
                RollingBaseline {
                    baseline_7d: baseline_7d.unwrap_or(0.0),
                    baseline_30d: baseline_30d.unwrap_or(0.0),
                    stddev_7d: stddev_7d.unwrap_or(0.0),
                    data_points_7d: u32::try_from(data_points_7d).unwrap_or(0),
                },
            );
        }
        Ok(baselines)
    }

    async fn load_article_mentions(&self, since: DateTime<Utc>, cap: i64) -> anyhow::Result<Vec<MentionRow>> {
        load_mentions(&self.pool, "articles", since, cap).await
    }

    async fn load_aggregator_mentions(&self, since: DateTime<Utc>, cap: i64) -> anyhow::Result<Vec<MentionRow>> {
        load_mentions(&self.pool, "aggregator_items", since, cap).await
    }

    async fn load_social_mentions(&self, since: DateTime<Utc>, cap: i64) -> anyhow::Result<Vec<MentionRow>> {
        load_mentions(&self.pool, "social_posts", since, cap).await
    }

    async fn load_prior_events(&self, limit: i64) -> anyhow::Result<Vec<PriorEvent>> {
        let rows = sqlx::query(
            r"
            SELECT event_key, canonical_label, is_event_phrase, last_seen_at, embedding
            FROM trend_events
            WHERE last_seen_at >= now() - interval '7 days' AND embedding IS NOT NULL
            ORDER BY last_seen_at DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("failed to load prior events")?;

        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            let embedding: Option<Vec<f32>> = row.try_get("embedding")?;
            events.push(PriorEvent {
                event_key: row.try_get("event_key")?,
                canonical_label: row.try_get("canonical_label")?,
                is_event_phrase: row.try_get("is_event_phrase")?,
                last_seen_at: row.try_get("last_seen_at")?,
                embedding: embedding.unwrap_or_default(),
            });
        }
        Ok(events)
    }

    async fn upsert_trend_events(&self, events: &[TrendEvent]) -> anyhow::Result<u64> {
        if events.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.context("failed to begin trend event upsert tx")?;
        let mut affected = 0u64;

        for event in events {
            sqlx::query(
                r"
                INSERT INTO trend_events (
                    event_key, event_title, canonical_label, is_event_phrase, label_quality, label_source,
                    related_entities, related_phrases, context_terms, context_phrases, context_summary,
                    cluster_id, first_seen_at, last_seen_at, peak_at, baseline_7d, baseline_30d,
                    current_1h, current_6h, current_24h, velocity, velocity_1h, velocity_6h, acceleration,
                    trend_score, z_score_velocity, confidence_score, rank_score, recency_decay, evergreen_penalty,
                    confidence_factors, is_trending, is_breaking, trend_stage, source_count, news_source_count,
                    social_source_count, corroboration_score, evidence_count, top_headline, sentiment_score,
                    sentiment_label, tier1_count, tier2_count, tier3_count, weighted_evidence_score,
                    has_tier12_corroboration, is_tier3_only, updated_at
                ) VALUES (
                    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                    $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30, $31, $32, $33,
                    $34, $35, $36, $37, $38, $39, $40, $41, $42, $43, $44, $45, $46, $47, $48, now()
                )
                ON CONFLICT (event_key) DO UPDATE SET
                    event_title = EXCLUDED.event_title,
                    canonical_label = EXCLUDED.canonical_label,
                    is_event_phrase = EXCLUDED.is_event_phrase,
                    label_quality = EXCLUDED.label_quality,
                    label_source = EXCLUDED.label_source,
                    related_entities = EXCLUDED.related_entities,
                    related_phrases = EXCLUDED.related_phrases,
                    context_terms = EXCLUDED.context_terms,
                    context_phrases = EXCLUDED.context_phrases,
                    context_summary = EXCLUDED.context_summary,
                    cluster_id = EXCLUDED.cluster_id,
                    last_seen_at = EXCLUDED.last_seen_at,
                    peak_at = EXCLUDED.peak_at,
                    baseline_7d = EXCLUDED.baseline_7d,
                    baseline_30d = EXCLUDED.baseline_30d,
                    current_1h = EXCLUDED.current_1h,
                    current_6h = EXCLUDED.current_6h,
                    current_24h = EXCLUDED.current_24h,
                    velocity = EXCLUDED.velocity,
                    velocity_1h = EXCLUDED.velocity_1h,
                    velocity_6h = EXCLUDED.velocity_6h,
                    acceleration = EXCLUDED.acceleration,
                    trend_score = EXCLUDED.trend_score,
                    z_score_velocity = EXCLUDED.z_score_velocity,
                    confidence_score = EXCLUDED.confidence_score,
                    rank_score = EXCLUDED.rank_score,
                    recency_decay = EXCLUDED.recency_decay,
                    evergreen_penalty = EXCLUDED.evergreen_penalty,
                    confidence_factors = EXCLUDED.confidence_factors,
                    is_trending = EXCLUDED.is_trending,
                    is_breaking = EXCLUDED.is_breaking,
                    trend_stage = EXCLUDED.trend_stage,
                    source_count = EXCLUDED.source_count,
                    news_source_count = EXCLUDED.news_source_count,
                    social_source_count = EXCLUDED.social_source_count,
                    corroboration_score = EXCLUDED.corroboration_score,
                    evidence_count = EXCLUDED.evidence_count,
                    top_headline = EXCLUDED.top_headline,
                    sentiment_score = EXCLUDED.sentiment_score,
                    sentiment_label = EXCLUDED.sentiment_label,
                    tier1_count = EXCLUDED.tier1_count,
                    tier2_count = EXCLUDED.tier2_count,
                    tier3_count = EXCLUDED.tier3_count,
                    weighted_evidence_score = EXCLUDED.weighted_evidence_score,
                    has_tier12_corroboration = EXCLUDED.has_tier12_corroboration,
                    is_tier3_only = EXCLUDED.is_tier3_only,
                    updated_at = now()
                ",
            )
            .bind(&event.event_key)
            .bind(&event.event_title)
            .bind(&event.canonical_label)
            .bind(event.is_event_phrase)
            .bind(event.label_quality.as_str())
            .bind(&event.label_source)
            .bind(&event.related_entities)
            .bind(&event.related_phrases)
            .bind(&event.context_terms)
            .bind(&event.context_phrases)
            .bind(&event.context_summary)
            .bind(&event.cluster_id)
            .bind(event.first_seen_at)
            .bind(event.last_seen_at)
            .bind(event.peak_at)
            .bind(event.baseline_7d)
            .bind(event.baseline_30d)
            .bind(event.current_1h)
            .bind(event.current_6h)
            .bind(event.current_24h)
            .bind(event.velocity)
            .bind(event.velocity_1h)
            .bind(event.velocity_6h)
            .bind(event.acceleration)
            .bind(event.trend_score)
            .bind(event.z_score_velocity)
            .bind(event.confidence_score)
            .bind(event.rank_score)
            .bind(event.recency_decay)
            .bind(event.evergreen_penalty)
            .bind(Json(&event.confidence_factors))
            .bind(event.is_trending)
            .bind(event.is_breaking)
            .bind(event.trend_stage.as_str())
            .bind(event.source_count)
            .bind(event.news_source_count)
            .bind(event.social_source_count)
            .bind(event.corroboration_score)
            .bind(event.evidence_count)
            .bind(&event.top_headline)
            .bind(event.sentiment_score)
            .bind(event.sentiment_label.as_str())
            .bind(event.tier1_count)
            .bind(event.tier2_count)
            .bind(event.tier3_count)
            .bind(event.weighted_evidence_score)
            .bind(event.has_tier12_corroboration)
            .bind(event.is_tier3_only)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to upsert trend event {}", event.event_key))?;
            affected += 1;
        }

        tx.commit().await.context("failed to commit trend event batch")?;
        Ok(affected)
    }

    async fn replace_evidence(&self, event_key: &str, evidence: &[Evidence]) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await.context("failed to begin evidence replace tx")?;

        sqlx::query("DELETE FROM trend_evidence WHERE event_key = $1")
            .bind(event_key)
            .execute(&mut *tx)
            .await
            .context("failed to delete old evidence")?;

        for item in evidence {
            sqlx::query(
                r"
                INSERT INTO trend_evidence (
                    event_key, source_type, source_id, source_url, source_title, source_domain,
                    published_at, contribution_score, is_primary, canonical_url, content_hash,
                    sentiment_score, sentiment_label, source_tier
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
                ",
            )
            .bind(event_key)
            .bind(item.source_type.as_str())
            .bind(&item.source_id)
            .bind(&item.source_url)
            .bind(&item.source_title)
            .bind(&item.source_domain)
            .bind(item.published_at)
            .bind(item.contribution_score)
            .bind(item.is_primary)
            .bind(&item.canonical_url)
            .bind(&item.content_hash)
            .bind(item.sentiment_score)
            .bind(item.sentiment_label.map(SentimentLabel::as_str))
            .bind(item.source_tier.as_str())
            .execute(&mut *tx)
            .await
            .context("failed to insert evidence row")?;
        }

        tx.commit().await.context("failed to commit evidence replace")?;
        Ok(())
    }

    async fn upsert_clusters(&self, clusters: &[PhraseCluster], similarity_threshold: f64) -> anyhow::Result<u64> {
        let eligible: Vec<&PhraseCluster> = clusters.iter().filter(|c| c.member_keys.len() >= 2).collect();
        if eligible.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.context("failed to begin cluster upsert tx")?;
        for cluster in &eligible {
            let member_titles: Vec<String> = cluster.member_keys.clone();
            sqlx::query(
                r"
                INSERT INTO trend_phrase_clusters (
                    canonical_phrase, member_phrases, member_event_keys, similarity_threshold,
                    total_mentions, top_authority_score, updated_at
                ) VALUES ($1, $2, $3, $4, $5, $6, now())
                ON CONFLICT (canonical_phrase) DO UPDATE SET
                    member_phrases = EXCLUDED.member_phrases,
                    member_event_keys = EXCLUDED.member_event_keys,
                    similarity_threshold = EXCLUDED.similarity_threshold,
                    total_mentions = EXCLUDED.total_mentions,
                    top_authority_score = EXCLUDED.top_authority_score,
                    updated_at = now()
                ",
            )
            .bind(&cluster.canonical_title)
            .bind(&member_titles)
            .bind(&cluster.member_keys)
            .bind(similarity_threshold)
            .bind(i32::try_from(cluster.total_deduped_mentions).unwrap_or(i32::MAX))
            .bind(cluster.top_authority_score)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to upsert cluster {}", cluster.canonical_key))?;
        }
        tx.commit().await.context("failed to commit cluster batch")?;
        Ok(eligible.len() as u64)
    }

    async fn upsert_baseline_rollup(
        &self,
        event_key: &str,
        baseline_date: NaiveDate,
        mentions_count: i32,
        hourly_average: f64,
        hourly_std_dev: f64,
        relative_std_dev: f64,
        news_mentions: i32,
        social_mentions: i32,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r"
            INSERT INTO trend_baselines (
                event_key, baseline_date, mentions_count, hourly_average, hourly_std_dev,
                relative_std_dev, news_mentions, social_mentions
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (event_key, baseline_date) DO UPDATE SET
                mentions_count = EXCLUDED.mentions_count,
                hourly_average = EXCLUDED.hourly_average,
                hourly_std_dev = EXCLUDED.hourly_std_dev,
                relative_std_dev = EXCLUDED.relative_std_dev,
                news_mentions = EXCLUDED.news_mentions,
                social_mentions = EXCLUDED.social_mentions
            ",
        )
        .bind(event_key)
        .bind(baseline_date)
        .bind(mentions_count)
        .bind(hourly_average)
        .bind(hourly_std_dev)
        .bind(relative_std_dev)
        .bind(news_mentions)
        .bind(social_mentions)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to upsert baseline rollup for {event_key}"))?;
        Ok(())
    }
}

async fn load_mentions(pool: &PgPool, table: &str, since: DateTime<Utc>, cap: i64) -> anyhow::Result<Vec<MentionRow>> {
    let query = format!(
        r"
        SELECT id::text AS id, title, published_at, domain, canonical_url, persisted_tier,
               sentiment_score, sentiment_label, extracted_topics, tags
        FROM {table}
        WHERE published_at >= $1
        ORDER BY published_at DESC
        LIMIT $2
        "
    );

    let rows = sqlx::query(&query)
        .bind(since)
        .bind(cap)
        .fetch_all(pool)
        .await
        .with_context(|| format!("failed to load mentions from {table}"))?;

    let mut mentions = Vec::with_capacity(rows.len());
    for row in rows {
        mentions.push(MentionRow {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            published_at: row.try_get("published_at")?,
            domain: row.try_get("domain")?,
            canonical_url: row.try_get("canonical_url")?,
            persisted_tier: row.try_get("persisted_tier")?,
            sentiment_score: row.try_get("sentiment_score")?,
            sentiment_label: row.try_get("sentiment_label")?,
            extracted_topics: row.try_get("extracted_topics")?,
            tags: row.try_get("tags")?,
        });
    }
    Ok(mentions)
}
