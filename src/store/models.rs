//! Database row shapes for the trend-detection store.
//!
//! These are deliberately thin compared to the domain types in
//! `crate::detection::model` — conversions happen in `dao_impl.rs` right
//! after the query returns, so nothing downstream of the DAO ever sees a
//! raw row.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use sqlx::FromRow;

/// One row from `articles`/`aggregator_items`/`social_posts`, normalized
/// to a shared shape the loader can map into a `Mention` regardless of
/// source family.
#[derive(Debug, Clone, FromRow)]
pub struct MentionRow {
    pub id: String,
    pub title: String,
    pub published_at: Option<DateTime<Utc>>,
    pub domain: Option<String>,
    pub canonical_url: Option<String>,
    pub persisted_tier: Option<String>,
    pub sentiment_score: Option<f64>,
    pub sentiment_label: Option<String>,
    pub extracted_topics: Option<Value>,
    pub tags: Option<Value>,
}

/// One row of `trend_baselines`, pre-aggregation (the loader means these
/// over the prior-day window per key).
#[derive(Debug, Clone, FromRow)]
pub struct BaselineRollupRow {
    pub event_key: String,
    pub baseline_date: NaiveDate,
    pub hourly_average: f64,
    pub hourly_std_dev: f64,
}

/// One row loaded from the last 7 days of `trend_events`, used to seed the
/// phrase clusterer's embedding index.
#[derive(Debug, Clone, FromRow)]
pub struct PriorEventRow {
    pub event_key: String,
    pub canonical_label: String,
    pub is_event_phrase: bool,
    pub last_seen_at: DateTime<Utc>,
    pub embedding: Option<Vec<f32>>,
}

/// One row of the persisted alias table: raw surface form -> title (or the
/// `__SKIP__` sentinel).
#[derive(Debug, Clone, FromRow)]
pub struct AliasRow {
    pub raw_form: String,
    pub canonical_title: String,
}

/// One row of the persisted tier table: publisher domain -> tier string.
#[derive(Debug, Clone, FromRow)]
pub struct TierRow {
    pub domain: String,
    pub tier: String,
}
