//! Composite ranking and trend-stage classification.
//!
//! Combines the velocity/z-score computation (`baseline.rs`), the
//! evergreen/recency/context/label-quality modifiers (`modifiers.rs`), and
//! the breaking-path evaluation (`breaking.rs`) into the full set of
//! numeric fields a `TrendEvent` persists.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use super::baseline::{self, CurrentActivity};
use super::breaking::{self, BreakingInputs};
use super::modifiers;
use super::model::{ConfidenceFactors, LabelQuality, RollingBaseline, SourceFamily, Tier, TopicAggregate, TrendStage};

pub struct ScoringInputs<'a> {
    pub aggregate: &'a TopicAggregate,
    pub baseline: &'a RollingBaseline,
    pub now: DateTime<Utc>,
    pub is_event_phrase: bool,
    pub label_quality: LabelQuality,
    pub evergreen_set_member: bool,
    pub is_single_word: bool,
    pub phrase_neighbor_keys: &'a HashSet<String>,
}

#[derive(Debug, Clone)]
pub struct ScoreOutput {
    pub current_1h: i32,
    pub current_6h: i32,
    pub current_24h: i32,
    pub velocity: f64,
    pub velocity_1h: f64,
    pub velocity_6h: f64,
    pub acceleration: f64,
    pub z_score_velocity: f64,
    pub rank_score: f64,
    pub trend_score: f64,
    pub confidence_score: i32,
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
    pub tier1_count: i32,
    pub tier2_count: i32,
    pub tier3_count: i32,
    pub has_tier12_corroboration: bool,
    pub is_tier3_only: bool,
}

fn log2p1(n: i32) -> f64 {
    (f64::from(n) + 1.0).log2()
}

fn volume_gate(current_1h: i32, current_24h: i32, source_families: i32) -> bool {
    current_1h >= 2 || current_24h >= 5 || source_families >= 2
}

/// Score a single topic aggregate end-to-end.
#[must_use]
pub fn score(inputs: ScoringInputs) -> ScoreOutput {
    let aggregate = inputs.aggregate;

    let current_1h = aggregate.deduped_count_within(inputs.now, 1) as i32;
    let current_6h = aggregate.deduped_count_within(inputs.now, 6) as i32;
    let current_24h = aggregate.deduped_count_within(inputs.now, 24) as i32;

    let velocity_result = baseline::compute_velocity(
        inputs.baseline,
        CurrentActivity {
            current_1h,
            current_6h,
            current_24h,
        },
    );

    let tier1_count = i32::try_from(aggregate.deduped_count_by_tier.get(&Tier::Tier1).copied().unwrap_or(0)).unwrap_or(i32::MAX);
    let tier2_count = i32::try_from(aggregate.deduped_count_by_tier.get(&Tier::Tier2).copied().unwrap_or(0)).unwrap_or(i32::MAX);
    let tier3_count = i32::try_from(aggregate.deduped_count_by_tier.get(&Tier::Tier3).copied().unwrap_or(0)).unwrap_or(i32::MAX);
    let has_tier12_corroboration = tier1_count > 0 || tier2_count > 0;
    let is_tier3_only = !has_tier12_corroboration && tier3_count > 0;

    let source_families = aggregate.source_families_present();
    let source_count = i32::try_from(source_families.len()).unwrap_or(i32::MAX);
    let news_source_count = i32::from(
        source_families.contains(&SourceFamily::Article) || source_families.contains(&SourceFamily::Aggregator),
    );
    let social_source_count = i32::from(source_families.contains(&SourceFamily::Social));
    let news_and_social = news_source_count > 0 && social_source_count > 0;

    let corroboration_component = {
        let base = if source_count >= 3 {
            25.0
        } else if source_count >= 2 {
            15.0
        } else {
            0.0
        };
        let bonus_social = if news_and_social { 10.0 } else { 0.0 };
        let bonus_tier = if has_tier12_corroboration { 5.0 } else { 0.0 };
        (base + bonus_social + bonus_tier).min(30.0)
    };
    let corroboration_score = corroboration_component.round() as i32;

    let gate = volume_gate(current_1h, current_24h, source_count);

    let has_context = if inputs.label_quality == LabelQuality::EntityOnly {
        modifiers::has_sufficient_context(aggregate, inputs.phrase_neighbor_keys)
    } else {
        true
    };

    let evergreen = modifiers::is_evergreen(
        &aggregate.key,
        inputs.is_single_word,
        inputs.baseline,
        inputs.evergreen_set_member,
    );
    let is_single_word_entity_only = inputs.is_single_word && inputs.label_quality == LabelQuality::EntityOnly;
    let evergreen_penalty_factor = modifiers::evergreen_penalty(
        evergreen,
        is_single_word_entity_only,
        velocity_result.z_score,
        inputs.baseline.has_historical_baseline(),
    );

    let hours_since_last_seen = (inputs.now - aggregate.last_seen).num_seconds() as f64 / 3600.0;
    let recency_decay_factor = modifiers::recency_decay(hours_since_last_seen.max(0.0));

    let label_quality_modifier_factor =
        modifiers::label_quality_modifier(inputs.label_quality, has_tier12_corroboration, has_context);

    let context_penalty = if inputs.label_quality == LabelQuality::EntityOnly && !has_context {
        0.0
    } else {
        1.0
    };

    let velocity_component = (velocity_result.z_score * 5.0).clamp(0.0, 50.0) * velocity_result.baseline_quality;
    let activity_component =
        (4.0 * log2p1(current_1h) + 2.0 * log2p1(current_24h)).min(20.0);

    let rank_score_raw = (velocity_component + corroboration_component + activity_component)
        * recency_decay_factor
        * evergreen_penalty_factor
        * label_quality_modifier_factor
        * context_penalty;
    let rank_score = round_to(rank_score_raw * 10.0 / 10.0, 1);

    let velocity_score = velocity_result.z_score * 10.0 * velocity_result.baseline_quality;
    let corroboration_boost = if source_count >= 2 {
        15.0 + if news_and_social { 15.0 } else { 0.0 }
    } else {
        0.0
    };
    let volume_bonus = (5.0 * log2p1(current_24h)).min(20.0);
    let tier_boost = if tier1_count > 0 {
        20.0
    } else if tier2_count > 0 {
        12.0
    } else {
        0.0
    };
    let tier3_only_penalty = if is_tier3_only { 0.5 } else { 1.0 };
    let trend_score_raw = (velocity_score + corroboration_boost + volume_bonus + tier_boost) * tier3_only_penalty;
    let trend_score = round_to(if gate { trend_score_raw } else { 0.0 }, 1);

    // rank_score is authoritative for gating/ranking;
    // trend_score is carried for legacy consumers only.
    let is_trending = rank_score >= 20.0 && gate && (inputs.label_quality != LabelQuality::EntityOnly || has_context);

    let age_hours = (inputs.now - aggregate.first_seen).num_seconds() as f64 / 3600.0;
    let trend_stage = classify_stage(velocity_result.z_score, velocity_result.acceleration, age_hours);

    let breaking_inputs = BreakingInputs {
        has_tier12_corroboration,
        volume_gate: gate,
        z_score: velocity_result.z_score,
        news_source_count,
        age_hours,
        rank_score,
        has_historical_baseline: inputs.baseline.has_historical_baseline(),
        baseline_delta: (f64::from(current_1h) - inputs.baseline.baseline_7d).max(0.0),
        source_families: source_count,
        corroboration_score,
        current_1h,
        current_6h,
    };
    let breaking_path = breaking::evaluate(&breaking_inputs);
    let is_breaking = breaking_path.is_some() && is_trending;

    let confidence_score = (
        (corroboration_component / 30.0 * 40.0)
            + (velocity_result.baseline_quality * 30.0)
            + if inputs.is_event_phrase { 30.0 } else { 0.0 }
    )
    .round()
    .clamp(0.0, 100.0) as i32;

    let confidence_factors = ConfidenceFactors {
        velocity_component: round_to(velocity_component, 3),
        corroboration_component: round_to(corroboration_component, 3),
        activity_component: round_to(activity_component, 3),
        recency_decay: round_to(recency_decay_factor, 3),
        evergreen_penalty: round_to(evergreen_penalty_factor, 3),
        label_quality_modifier: round_to(label_quality_modifier_factor, 3),
        context_penalty: round_to(context_penalty, 3),
        baseline_quality: round_to(velocity_result.baseline_quality, 3),
        breaking_criteria: breaking_path.map(|path| super::model::BreakingCriteria {
            breaking_path: path.as_str().to_string(),
        }),
    };

    ScoreOutput {
        current_1h,
        current_6h,
        current_24h,
        velocity: round_to(velocity_result.velocity, 1),
        velocity_1h: round_to(velocity_result.velocity, 1),
        velocity_6h: round_to(velocity_result.velocity_6h, 1),
        acceleration: round_to(velocity_result.acceleration, 1),
        z_score_velocity: round_to(velocity_result.z_score, 1),
        rank_score,
        trend_score,
        confidence_score,
        recency_decay: round_to(recency_decay_factor, 3),
        evergreen_penalty: round_to(evergreen_penalty_factor, 3),
        confidence_factors,
        is_trending,
        is_breaking,
        trend_stage,
        source_count,
        news_source_count,
        social_source_count,
        corroboration_score,
        tier1_count,
        tier2_count,
        tier3_count,
        has_tier12_corroboration,
        is_tier3_only,
    }
}

fn classify_stage(z: f64, acceleration: f64, age_hours: f64) -> TrendStage {
    if z > 3.0 && acceleration > 50.0 && age_hours < 3.0 {
        TrendStage::Emerging
    } else if z > 1.5 && acceleration < -20.0 {
        TrendStage::Peaking
    } else if z < 0.0 || (z < 0.5 && acceleration < -30.0) {
        TrendStage::Declining
    } else if (z > 2.0 && acceleration > 20.0) || z > 0.5 {
        TrendStage::Surging
    } else {
        TrendStage::Stable
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::model::{Mention, SourceFamily, Tier};
    use chrono::TimeZone;

    fn mention_at(domain: &str, tier: Tier, source: SourceFamily, hash: u64, ts: DateTime<Utc>) -> Mention {
        Mention {
            id: hash.to_string(),
            source_family: source,
            title: "Senate Rejects Bill".to_string(),
            published_at: ts,
            domain: domain.to_string(),
            tier,
            sentiment_score: None,
            sentiment_label: None,
            topics: vec![],
            content_hash: hash,
            canonical_url: None,
        }
    }

    fn build_aggregate(now: DateTime<Utc>, mentions: Vec<Mention>) -> TopicAggregate {
        let first = mentions[0].clone();
        let mut agg = TopicAggregate::new("senate_rejects_bill".to_string(), "Senate Rejects Bill".to_string(), &first);
        agg.is_event_phrase = true;
        for m in mentions {
            agg.deduped.insert(m.content_hash, 0);
            *agg.deduped_count_by_tier.entry(m.tier).or_insert(0) += 1;
            *agg.deduped_count_by_source.entry(m.source_family).or_insert(0) += 1;
            if m.published_at < agg.first_seen {
                agg.first_seen = m.published_at;
            }
            if m.published_at > agg.last_seen {
                agg.last_seen = m.published_at;
            }
            agg.raw_mentions.push(m);
        }
        let _ = now;
        agg
    }

    #[test]
    fn extreme_zscore_breaking_scenario() {
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 0).unwrap();
        let mut mentions = Vec::new();
        for i in 0..10u64 {
            let ts = now - chrono::Duration::hours(1);
            let tier = if i < 2 { Tier::Tier1 } else if i < 3 { Tier::Tier2 } else { Tier::Tier3 };
            let domain = format!("domain{i}.com");
            mentions.push(mention_at(&domain, tier, SourceFamily::Article, i, ts));
        }
        let aggregate = build_aggregate(now, mentions);
        let baseline = RollingBaseline {
            baseline_7d: 0.1,
            baseline_30d: 0.1,
            stddev_7d: 0.2,
            data_points_7d: 7,
        };
        let neighbors = HashSet::new();
        let output = score(ScoringInputs {
            aggregate: &aggregate,
            baseline: &baseline,
            now,
            is_event_phrase: true,
            label_quality: LabelQuality::EventPhrase,
            evergreen_set_member: false,
            is_single_word: false,
            phrase_neighbor_keys: &neighbors,
        });

        assert!((output.z_score_velocity - 10.0).abs() < f64::EPSILON);
        assert!(output.is_trending);
        assert!(output.is_breaking);
        assert_eq!(
            output.confidence_factors.breaking_criteria.unwrap().breaking_path,
            "B:extreme_zscore"
        );
        assert_eq!(output.trend_stage, TrendStage::Emerging);
    }

    #[test]
    fn evergreen_single_word_entity_is_suppressed() {
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 0).unwrap();
        let mut mentions = Vec::new();
        for i in 0..3u64 {
            let ts = now - chrono::Duration::minutes(30);
            let domain = format!("domain{i}.com");
            mentions.push(mention_at(&domain, Tier::Tier2, SourceFamily::Article, i, ts));
        }
        let mut aggregate = build_aggregate(now, mentions);
        aggregate.is_event_phrase = false;
        let baseline = RollingBaseline {
            baseline_7d: 2.5,
            baseline_30d: 2.4,
            stddev_7d: 1.0,
            data_points_7d: 10,
        };
        let neighbors = HashSet::new();
        let output = score(ScoringInputs {
            aggregate: &aggregate,
            baseline: &baseline,
            now,
            is_event_phrase: false,
            label_quality: LabelQuality::EntityOnly,
            evergreen_set_member: true,
            is_single_word: true,
            phrase_neighbor_keys: &neighbors,
        });

        assert!(output.evergreen_penalty <= 0.15);
        assert!(output.rank_score < 10.0);
        assert!(!output.is_trending);
    }
}
