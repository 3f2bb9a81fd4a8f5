//! In-memory data model for a single detection run.
//!
//! Everything here lives for the duration of one HTTP invocation; nothing
//! is `Clone`d into long-lived state. Persistence happens once, at the end
//! of the run, through `store::dao::TrendDao`.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

/// Authority class of a publisher. Social posts are always `Tier3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tier {
    Tier1,
    Tier2,
    Tier3,
}

impl Tier {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Tier1 => "tier1",
            Tier::Tier2 => "tier2",
            Tier::Tier3 => "tier3",
        }
    }
}

/// Which stream a mention came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFamily {
    Article,
    Aggregator,
    Social,
}

impl SourceFamily {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SourceFamily::Article => "article",
            SourceFamily::Aggregator => "aggregator",
            SourceFamily::Social => "social",
        }
    }
}

/// Upstream hint about whether a topic string is an event phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelQualityHint {
    EventPhrase,
    FallbackGenerated,
    EntityOnly,
}

/// Resolved label quality after validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelQuality {
    EventPhrase,
    FallbackGenerated,
    EntityOnly,
}

impl LabelQuality {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LabelQuality::EventPhrase => "event_phrase",
            LabelQuality::FallbackGenerated => "fallback_generated",
            LabelQuality::EntityOnly => "entity_only",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
        }
    }

    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score > 0.15 {
            SentimentLabel::Positive
        } else if score < -0.15 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendStage {
    Emerging,
    Surging,
    Peaking,
    Declining,
    Stable,
}

impl TrendStage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TrendStage::Emerging => "emerging",
            TrendStage::Surging => "surging",
            TrendStage::Peaking => "peaking",
            TrendStage::Declining => "declining",
            TrendStage::Stable => "stable",
        }
    }
}

/// A single raw topic string attached to a mention at ingestion time, with
/// whatever hint the upstream extractor supplied.
#[derive(Debug, Clone)]
pub struct RawTopic {
    pub text: String,
    pub label_quality_hint: Option<LabelQualityHint>,
    pub is_event_phrase_claim: bool,
}

/// A single piece of content observed from one source.
#[derive(Debug, Clone)]
pub struct Mention {
    pub id: String,
    pub source_family: SourceFamily,
    pub title: String,
    pub published_at: DateTime<Utc>,
    pub domain: String,
    pub tier: Tier,
    pub sentiment_score: Option<f64>,
    pub sentiment_label: Option<SentimentLabel>,
    pub topics: Vec<RawTopic>,
    pub content_hash: u64,
    pub canonical_url: Option<String>,
}

/// Per-topic historical hourly-rate statistics loaded once at run start.
#[derive(Debug, Clone, Default)]
pub struct RollingBaseline {
    pub baseline_7d: f64,
    pub baseline_30d: f64,
    pub stddev_7d: f64,
    pub data_points_7d: u32,
}

impl RollingBaseline {
    #[must_use]
    pub fn has_historical_baseline(&self) -> bool {
        self.data_points_7d >= 3
    }
}

/// Prior trend event metadata used for embedding-based clustering.
#[derive(Debug, Clone)]
pub struct PriorEvent {
    pub event_key: String,
    pub canonical_label: String,
    pub embedding: Vec<f32>,
    pub is_event_phrase: bool,
    pub last_seen_at: DateTime<Utc>,
}

/// One canonical topic key observed in the window.
#[derive(Debug, Clone)]
pub struct TopicAggregate {
    pub key: String,
    pub title: String,
    pub is_event_phrase: bool,
    pub label_quality_hint: Option<LabelQualityHint>,
    pub related_entities: HashSet<String>,
    pub co_occurrences: HashMap<String, u32>,
    pub raw_mentions: Vec<Mention>,
    pub deduped: HashMap<u64, usize>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub raw_count_by_source: HashMap<SourceFamily, u32>,
    pub deduped_count_by_source: HashMap<SourceFamily, u32>,
    pub deduped_count_by_tier: HashMap<Tier, u32>,
    pub sentiment_sum: f64,
    pub sentiment_count: u32,
    pub authority_score: f64,
}

impl TopicAggregate {
    #[must_use]
    pub fn new(key: String, title: String, mention: &Mention) -> Self {
        Self {
            key,
            title,
            is_event_phrase: false,
            label_quality_hint: None,
            related_entities: HashSet::new(),
            co_occurrences: HashMap::new(),
            raw_mentions: Vec::new(),
            deduped: HashMap::new(),
            first_seen: mention.published_at,
            last_seen: mention.published_at,
            raw_count_by_source: HashMap::new(),
            deduped_count_by_source: HashMap::new(),
            deduped_count_by_tier: HashMap::new(),
            sentiment_sum: 0.0,
            sentiment_count: 0,
            authority_score: 0.0,
        }
    }

    #[must_use]
    pub fn deduped_count(&self) -> usize {
        self.deduped.len()
    }

    #[must_use]
    pub fn raw_count(&self) -> usize {
        self.raw_mentions.len()
    }

    /// Deduped mention count within the last `hours` hours of the window,
    /// measured relative to `now`.
    #[must_use]
    pub fn deduped_count_within(&self, now: DateTime<Utc>, hours: i64) -> usize {
        let cutoff = now - chrono::Duration::hours(hours);
        let mut seen = HashSet::new();
        let mut count = 0usize;
        for mention in &self.raw_mentions {
            if mention.published_at < cutoff {
                continue;
            }
            if seen.insert(mention.content_hash) && self.deduped.contains_key(&mention.content_hash)
            {
                count += 1;
            }
        }
        count
    }

    #[must_use]
    pub fn distinct_domains(&self) -> HashSet<&str> {
        self.deduped
            .keys()
            .filter_map(|hash| {
                self.raw_mentions
                    .iter()
                    .find(|m| m.content_hash == *hash)
                    .map(|m| m.domain.as_str())
            })
            .collect()
    }

    #[must_use]
    pub fn source_families_present(&self) -> HashSet<SourceFamily> {
        self.deduped_count_by_source.keys().copied().collect()
    }

    #[must_use]
    pub fn has_tier12(&self) -> bool {
        self.deduped_count_by_tier.get(&Tier::Tier1).copied().unwrap_or(0) > 0
            || self.deduped_count_by_tier.get(&Tier::Tier2).copied().unwrap_or(0) > 0
    }

    #[must_use]
    pub fn news_mention_count(&self) -> usize {
        let mut seen = HashSet::new();
        self.raw_mentions
            .iter()
            .filter(|m| m.source_family != SourceFamily::Social && seen.insert(m.content_hash))
            .count()
    }
}

/// Equivalence class over topic keys whose meanings coincide.
#[derive(Debug, Clone)]
pub struct PhraseCluster {
    pub canonical_key: String,
    pub canonical_title: String,
    pub member_keys: Vec<String>,
    pub total_deduped_mentions: usize,
    pub top_authority_score: f64,
    pub canonical_is_event_phrase: bool,
}

/// Structured breakdown of scoring components, persisted as JSON.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ConfidenceFactors {
    pub velocity_component: f64,
    pub corroboration_component: f64,
    pub activity_component: f64,
    pub recency_decay: f64,
    pub evergreen_penalty: f64,
    pub label_quality_modifier: f64,
    pub context_penalty: f64,
    pub baseline_quality: f64,
    pub breaking_criteria: Option<BreakingCriteria>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct BreakingCriteria {
    pub breaking_path: String,
}

/// One per topic key that survives the quality gate; the persisted unit.
#[derive(Debug, Clone)]
pub struct TrendEvent {
    pub event_key: String,
    pub event_title: String,
    pub canonical_label: String,
    pub is_event_phrase: bool,
    pub label_quality: LabelQuality,
    pub label_source: String,
    pub related_entities: Vec<String>,
    pub related_phrases: Vec<String>,
    pub context_terms: Vec<String>,
    pub context_phrases: Vec<String>,
    pub context_summary: Option<String>,
    pub cluster_id: Option<String>,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub peak_at: Option<DateTime<Utc>>,
    pub baseline_7d: f64,
    pub baseline_30d: f64,
    pub current_1h: i32,
    pub current_6h: i32,
    pub current_24h: i32,
    pub velocity: f64,
    pub velocity_1h: f64,
    pub velocity_6h: f64,
    pub acceleration: f64,
    pub trend_score: f64,
    pub z_score_velocity: f64,
    pub confidence_score: i32,
    pub rank_score: f64,
    pub recency_decay: f64,
    pub evergreen_penalty: f64,
    pub confidence_factors: ConfidenceFactors,
    pub is_trending: bool,
    pub is_breaking: bool,
    pub trend_stage: TrendStage,
    pub source_count: i32,
    pub news_source_count: i32,
    pub social_source_count: i32,
    pub corroboration_score: i32,
    pub evidence_count: i32,
    pub top_headline: Option<String>,
    pub sentiment_score: Option<f64>,
    pub sentiment_label: SentimentLabel,
    pub tier1_count: i32,
    pub tier2_count: i32,
    pub tier3_count: i32,
    pub weighted_evidence_score: f64,
    pub has_tier12_corroboration: bool,
    pub is_tier3_only: bool,
}

/// A single supporting mention behind a persisted trend event.
#[derive(Debug, Clone)]
pub struct Evidence {
    pub source_type: SourceFamily,
    pub source_id: String,
    pub source_url: Option<String>,
    pub source_title: String,
    pub source_domain: String,
    pub published_at: DateTime<Utc>,
    pub contribution_score: f64,
    pub is_primary: bool,
    pub canonical_url: Option<String>,
    pub content_hash: String,
    pub sentiment_score: Option<f64>,
    pub sentiment_label: Option<SentimentLabel>,
    pub source_tier: Tier,
}

/// The tunable caps/thresholds a run actually executed under, echoed back
/// so a caller can tell an override took effect without re-reading config.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct PerfLimits {
    pub window_hours: u32,
    pub article_cap: usize,
    pub aggregator_cap: usize,
    pub social_cap: usize,
    pub timeout_guard_secs: u64,
    pub upsert_batch_size: usize,
    pub max_prior_events_for_embedding: usize,
}

/// Aggregate counters reported back to the caller of the detect endpoint.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct DetectionReport {
    pub topics_processed: u64,
    pub events_upserted: u64,
    pub trending_count: u64,
    pub breaking_count: u64,
    pub quality_gate_filtered: u64,
    pub evidence_count: u64,
    pub clusters_created: u64,
    pub deduped_savings: u64,
    pub baselines_loaded: u64,
    pub duration_ms: u64,
    pub perf_limits: PerfLimits,
}
