//! Crate-level integration coverage: fingerprinting/text utilities plus a
//! small end-to-end pass through aggregation, quality gating, and scoring
//! without touching the database.

use std::collections::{HashMap, HashSet};

use chrono::{Duration, TimeZone, Utc};
use trend_detector::detection::aggregator::Aggregator;
use trend_detector::detection::alias::AliasResolver;
use trend_detector::detection::model::{LabelQuality, Mention, RawTopic, RollingBaseline, SourceFamily, Tier};
use trend_detector::detection::quality_gate::{self, GateResult};
use trend_detector::detection::scorer::{self, ScoringInputs};
use trend_detector::util::text::{hash_text, is_near_duplicate, split_sentences};

#[test]
fn hash_text_is_deterministic() {
    let hash1 = hash_text("café");
    let hash2 = hash_text("café");
    assert_eq!(hash1, hash2);
    assert_ne!(hash1, 0);
}

#[test]
fn split_sentences_handles_punctuation() {
    let sentences = split_sentences("First sentence. Second sentence! Third sentence?");
    assert_eq!(sentences, vec!["First sentence.", "Second sentence!", "Third sentence?"]);
}

#[test]
fn is_near_duplicate_detects_identical_text() {
    let text = "This is a test sentence with some content.";
    assert!(is_near_duplicate(text, text, 10, 0.8));
}

fn mention(id: &str, hash: u64, minute_offset: i64, tier: Tier, source: SourceFamily) -> Mention {
    let published_at = Utc.with_ymd_and_hms(2026, 7, 28, 10, 0, 0).unwrap() + Duration::minutes(minute_offset);
    Mention {
        id: id.to_string(),
        source_family: source,
        title: "Congress passes sweeping reform bill".to_string(),
        published_at,
        domain: format!("outlet{hash}.example.com"),
        tier,
        sentiment_score: Some(0.1),
        sentiment_label: None,
        topics: vec![RawTopic {
            text: "congress reform bill".to_string(),
            label_quality_hint: None,
            is_event_phrase_claim: true,
        }],
        content_hash: hash,
        canonical_url: None,
    }
}

/// A topic corroborated by 4 distinct tier1/tier3 outlets across both news
/// and social should clear the quality gate and score as trending.
#[test]
fn corroborated_multi_word_topic_passes_gate_and_scores_trending() {
    let mentions = vec![
        mention("1", 1, 0, Tier::Tier1, SourceFamily::Article),
        mention("2", 2, 5, Tier::Tier1, SourceFamily::Article),
        mention("3", 3, 10, Tier::Tier3, SourceFamily::Social),
        mention("4", 4, 15, Tier::Tier3, SourceFamily::Social),
    ];

    let resolver = AliasResolver::new(HashMap::new());
    let aggregator = Aggregator::new(&resolver);
    let aggregates = aggregator.aggregate(&mentions);
    assert_eq!(aggregates.len(), 1);

    let now = Utc.with_ymd_and_hms(2026, 7, 28, 11, 0, 0).unwrap();
    let (key, aggregate) = aggregates.iter().next().expect("one aggregate");

    let gate_result = quality_gate::evaluate(aggregate, &resolver, now);
    assert!(matches!(gate_result, GateResult::Pass { .. }), "expected quality gate to pass for a corroborated topic");

    let baseline = RollingBaseline { baseline_7d: 0.3, baseline_30d: 0.3, stddev_7d: 0.2, data_points_7d: 7 };
    let neighbors: HashSet<String> = HashSet::new();
    let output = scorer::score(ScoringInputs {
        aggregate,
        baseline: &baseline,
        now,
        is_event_phrase: aggregate.is_event_phrase,
        label_quality: LabelQuality::EventPhrase,
        evergreen_set_member: false,
        is_single_word: false,
        phrase_neighbor_keys: &neighbors,
    });

    assert!(output.is_trending, "expected trending topic for {key}");
    assert!(output.source_count >= 2);
}
