//! Mention Loader.
//!
//! Reads the three source families independently, applies per-source caps,
//! and converts each surviving DB row into a domain `Mention`. A query
//! failure on one source is isolated: it logs, contributes zero mentions,
//! and the remaining sources still run.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tracing::warn;

use crate::store::dao::TrendDao;
use crate::store::models::MentionRow;

use super::fingerprint::{article_content_hash, normalize_url, social_content_hash};
use super::model::{LabelQualityHint, Mention, RawTopic, SentimentLabel, SourceFamily, Tier};
use super::tier::TierResolver;

const SOCIAL_DOMAIN_SENTINEL: &str = "social";
const SOCIAL_TITLE_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, Copy)]
pub struct LoaderCaps {
    pub articles: i64,
    pub aggregator: i64,
    pub social: i64,
}

impl Default for LoaderCaps {
    fn default() -> Self {
        Self {
            articles: 1000,
            aggregator: 800,
            social: 2000,
        }
    }
}

/// Outcome of loading one source family: mentions plus whether the query
/// itself failed (a failed source still yields zero mentions, not an
/// aborted run, failure semantics).
#[derive(Debug, Default)]
pub struct LoadedSource {
    pub mentions: Vec<Mention>,
    pub failed: bool,
}

pub struct MentionLoader<'a> {
    dao: &'a dyn TrendDao,
    tier_resolver: &'a TierResolver,
}

impl<'a> MentionLoader<'a> {
    #[must_use]
    pub fn new(dao: &'a dyn TrendDao, tier_resolver: &'a TierResolver) -> Self {
        Self { dao, tier_resolver }
    }

    pub async fn load_articles(&self, window_start: DateTime<Utc>, cap: i64) -> LoadedSource {
        match self.dao.load_article_mentions(window_start, cap).await {
            Ok(rows) => LoadedSource {
                mentions: rows.into_iter().filter_map(|row| self.to_article_mention(row)).collect(),
                failed: false,
            },
            Err(err) => {
                warn!(error = %err, source = "articles", "mention loader failed for source");
                LoadedSource::default()
            }
        }
    }

    pub async fn load_aggregator(&self, window_start: DateTime<Utc>, cap: i64) -> LoadedSource {
        match self.dao.load_aggregator_mentions(window_start, cap).await {
            Ok(rows) => LoadedSource {
                mentions: rows.into_iter().filter_map(|row| self.to_aggregator_mention(row)).collect(),
                failed: false,
            },
            Err(err) => {
                warn!(error = %err, source = "aggregator", "mention loader failed for source");
                LoadedSource::default()
            }
        }
    }

    pub async fn load_social(&self, window_start: DateTime<Utc>, cap: i64) -> LoadedSource {
        match self.dao.load_social_mentions(window_start, cap).await {
            Ok(rows) => LoadedSource {
                mentions: rows.into_iter().filter_map(|row| self.to_social_mention(row)).collect(),
                failed: false,
            },
            Err(err) => {
                warn!(error = %err, source = "social", "mention loader failed for source");
                LoadedSource::default()
            }
        }
    }

    fn to_article_mention(&self, row: MentionRow) -> Option<Mention> {
        self.to_news_mention(row, SourceFamily::Article)
    }

    fn to_aggregator_mention(&self, row: MentionRow) -> Option<Mention> {
        self.to_news_mention(row, SourceFamily::Aggregator)
    }

    fn to_news_mention(&self, row: MentionRow, source_family: SourceFamily) -> Option<Mention> {
        let published_at = row.published_at?;
        let topics = resolve_raw_topics(&row);
        if topics.is_empty() {
            return None;
        }

        let canonical_url = row.canonical_url.as_deref().and_then(normalize_url);

        // Aggregator domains come from the canonical URL, never the
        // redirect host, so items don't all collapse under one aggregator.
        let domain = match source_family {
            SourceFamily::Aggregator => canonical_url
                .as_deref()
                .and_then(|url| url::Url::parse(url).ok())
                .and_then(|u| u.host_str().map(str::to_lowercase))
                .or_else(|| row.domain.clone().map(|d| d.to_lowercase())),
            _ => row.domain.clone().map(|d| d.to_lowercase()),
        }
        .unwrap_or_default();

        let tier = row
            .persisted_tier
            .as_deref()
            .map(parse_tier)
            .unwrap_or_else(|| self.tier_resolver.resolve(&domain));

        let content_hash = article_content_hash(&row.title, canonical_url.as_deref(), published_at);

        Some(Mention {
            id: row.id,
            source_family,
            title: row.title,
            published_at,
            domain,
            tier,
            sentiment_score: row.sentiment_score,
            sentiment_label: row.sentiment_label.as_deref().map(parse_sentiment_label),
            topics,
            content_hash,
            canonical_url,
        })
    }

    fn to_social_mention(&self, row: MentionRow) -> Option<Mention> {
        let published_at = row.published_at?;
        let topics = resolve_raw_topics(&row);
        if topics.is_empty() {
            return None;
        }

        let title: String = row.title.chars().take(SOCIAL_TITLE_MAX_CHARS).collect();
        let content_hash = social_content_hash(&title);

        Some(Mention {
            id: row.id,
            source_family: SourceFamily::Social,
            title,
            published_at,
            domain: SOCIAL_DOMAIN_SENTINEL.to_string(),
            tier: Tier::Tier3,
            sentiment_score: row.sentiment_score,
            sentiment_label: row.sentiment_label.as_deref().map(parse_sentiment_label),
            topics,
            content_hash,
            canonical_url: row.canonical_url.as_deref().and_then(normalize_url),
        })
    }
}

fn parse_tier(raw: &str) -> Tier {
    match raw {
        "tier1" => Tier::Tier1,
        "tier2" => Tier::Tier2,
        _ => Tier::Tier3,
    }
}

fn parse_sentiment_label(raw: &str) -> SentimentLabel {
    match raw {
        "positive" => SentimentLabel::Positive,
        "negative" => SentimentLabel::Negative,
        _ => SentimentLabel::Neutral,
    }
}

/// `extracted_topics` (structured) is preferred over legacy `tags`; if
/// present at all — even an empty array — `tags` is never consulted. Only
/// a literal absence (column NULL) falls back.
fn resolve_raw_topics(row: &MentionRow) -> Vec<RawTopic> {
    if let Some(value) = &row.extracted_topics {
        return parse_extracted_topics(value);
    }
    if let Some(value) = &row.tags {
        return parse_tags(value);
    }
    Vec::new()
}

fn parse_extracted_topics(value: &Value) -> Vec<RawTopic> {
    let Some(array) = value.as_array() else {
        return Vec::new();
    };
    array
        .iter()
        .filter_map(|item| {
            let text = item.get("text").and_then(Value::as_str)?.to_string();
            if text.trim().is_empty() {
                return None;
            }
            let label_quality_hint = item
                .get("label_quality_hint")
                .and_then(Value::as_str)
                .and_then(parse_label_quality_hint);
            let is_event_phrase_claim = item
                .get("is_event_phrase_claim")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            Some(RawTopic {
                text,
                label_quality_hint,
                is_event_phrase_claim,
            })
        })
        .collect()
}

fn parse_tags(value: &Value) -> Vec<RawTopic> {
    let Some(array) = value.as_array() else {
        return Vec::new();
    };
    array
        .iter()
        .filter_map(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(|text| RawTopic {
            text: text.to_string(),
            label_quality_hint: None,
            is_event_phrase_claim: false,
        })
        .collect()
}

fn parse_label_quality_hint(raw: &str) -> Option<LabelQualityHint> {
    match raw {
        "event_phrase" => Some(LabelQualityHint::EventPhrase),
        "fallback_generated" => Some(LabelQualityHint::FallbackGenerated),
        "entity_only" => Some(LabelQualityHint::EntityOnly),
        _ => None,
    }
}

/// Default detection window, tunable constants.
#[must_use]
pub fn default_window_start(now: DateTime<Utc>, window_hours: i64) -> DateTime<Utc> {
    now - Duration::hours(window_hours)
}
