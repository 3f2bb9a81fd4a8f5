//! `TrendDao` trait - data access layer abstraction.
//!
//! Scoped exactly to the core's external collaborators: a
//! reader for mentions within a window, a reader for rolling baselines and
//! prior trend events with embeddings, and writers for trend events,
//! evidence, clusters, and baseline rollups.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use crate::detection::model::{Evidence, PhraseCluster, PriorEvent, RollingBaseline, Tier, TrendEvent};
use crate::store::models::MentionRow;

#[async_trait]
pub trait TrendDao: Send + Sync {
    /// Returns a reference to the database connection pool (an implementation may return `None`).
    fn pool(&self) -> Option<&PgPool>;

    async fn load_alias_table(&self) -> anyhow::Result<HashMap<String, String>>;

    async fn load_tier_table(&self) -> anyhow::Result<HashMap<String, Tier>>;

    /// Baselines meaned over the prior `window_days` days, excluding today.
    async fn load_baselines(&self, window_days: i64) -> anyhow::Result<HashMap<String, RollingBaseline>>;

    async fn load_article_mentions(&self, since: DateTime<Utc>, cap: i64) -> anyhow::Result<Vec<MentionRow>>;

    async fn load_aggregator_mentions(&self, since: DateTime<Utc>, cap: i64) -> anyhow::Result<Vec<MentionRow>>;

    async fn load_social_mentions(&self, since: DateTime<Utc>, cap: i64) -> anyhow::Result<Vec<MentionRow>>;

    /// Prior events from the last 7 days of `trend_events`, most recently
    /// active first, capped to `limit` for the embedding index.
    async fn load_prior_events(&self, limit: i64) -> anyhow::Result<Vec<PriorEvent>>;

    /// Upsert one batch of trend events, keyed by `event_key`. Returns the
    /// number of rows affected.
    async fn upsert_trend_events(&self, events: &[TrendEvent]) -> anyhow::Result<u64>;

    /// Delete and reinsert all evidence rows for one event key.
    async fn replace_evidence(&self, event_key: &str, evidence: &[Evidence]) -> anyhow::Result<()>;

    /// Upsert phrase clusters that have at least two members.
    async fn upsert_clusters(&self, clusters: &[PhraseCluster], similarity_threshold: f64) -> anyhow::Result<u64>;

    /// Upsert today's baseline rollup row for one event key.
    #[allow(clippy::too_many_arguments)]
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
    ) -> anyhow::Result<()>;
}

#[cfg(test)]
pub struct MockTrendDao {
    pub alias_table: HashMap<String, String>,
    pub tier_table: HashMap<String, Tier>,
    pub baselines: HashMap<String, RollingBaseline>,
    pub article_mentions: Vec<MentionRow>,
    pub aggregator_mentions: Vec<MentionRow>,
    pub social_mentions: Vec<MentionRow>,
    pub prior_events: Vec<PriorEvent>,
    pub upserted_events: std::sync::Mutex<Vec<TrendEvent>>,
    pub fail_upsert: bool,
}

#[cfg(test)]
impl Default for MockTrendDao {
    fn default() -> Self {
        Self {
            alias_table: HashMap::new(),
            tier_table: HashMap::new(),
            baselines: HashMap::new(),
            article_mentions: Vec::new(),
            aggregator_mentions: Vec::new(),
            social_mentions: Vec::new(),
            prior_events: Vec::new(),
            upserted_events: std::sync::Mutex::new(Vec::new()),
            fail_upsert: false,
        }
    }
}

#[cfg(test)]
#[async_trait]
impl TrendDao for MockTrendDao {
    fn pool(&self) -> Option<&PgPool> {
        None
    }

    async fn load_alias_table(&self) -> anyhow::Result<HashMap<String, String>> {
        Ok(self.alias_table.clone())
    }

    async fn load_tier_table(&self) -> anyhow::Result<HashMap<String, Tier>> {
        Ok(self.tier_table.clone())
    }

    async fn load_baselines(&self, _window_days: i64) -> anyhow::Result<HashMap<String, RollingBaseline>> {
        Ok(self.baselines.clone())
    }

    async fn load_article_mentions(&self, _since: DateTime<Utc>, cap: i64) -> anyhow::Result<Vec<MentionRow>> {
        Ok(self.article_mentions.iter().take(cap as usize).cloned().collect())
    }

    async fn load_aggregator_mentions(&self, _since: DateTime<Utc>, cap: i64) -> anyhow::Result<Vec<MentionRow>> {
        Ok(self.aggregator_mentions.iter().take(cap as usize).cloned().collect())
    }

    async fn load_social_mentions(&self, _since: DateTime<Utc>, cap: i64) -> anyhow::Result<Vec<MentionRow>> {
        Ok(self.social_mentions.iter().take(cap as usize).cloned().collect())
    }

    async fn load_prior_events(&self, limit: i64) -> anyhow::Result<Vec<PriorEvent>> {
        Ok(self.prior_events.iter().take(limit as usize).cloned().collect())
    }

    async fn upsert_trend_events(&self, events: &[TrendEvent]) -> anyhow::Result<u64> {
        if self.fail_upsert {
            anyhow::bail!("mock upsert failure");
        }
        let mut guard = self.upserted_events.lock().expect("mutex poisoned");
        guard.extend_from_slice(events);
        Ok(events.len() as u64)
    }

    async fn replace_evidence(&self, _event_key: &str, _evidence: &[Evidence]) -> anyhow::Result<()> {
        Ok(())
    }

    async fn upsert_clusters(&self, clusters: &[PhraseCluster], _similarity_threshold: f64) -> anyhow::Result<u64> {
        Ok(clusters.iter().filter(|c| c.member_keys.len() >= 2).count() as u64)
    }

    async fn upsert_baseline_rollup(
        &self,
        _event_key: &str,
        _baseline_date: NaiveDate,
        _mentions_count: i32,
        _hourly_average: f64,
        _hourly_std_dev: f64,
        _relative_std_dev: f64,
        _news_mentions: i32,
        _social_mentions: i32,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_upsert_accumulates_events() {
        let dao = MockTrendDao::default();
        let events = vec![];
        let affected = dao.upsert_trend_events(&events).await.unwrap();
        assert_eq!(affected, 0);
    }

    #[tokio::test]
    async fn mock_upsert_respects_fail_flag() {
        let mut dao = MockTrendDao::default();
        dao.fail_upsert = true;
        let events = vec![];
        assert!(dao.upsert_trend_events(&events).await.is_err());
    }
}
