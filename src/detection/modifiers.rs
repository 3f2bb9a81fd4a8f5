//! Evergreen, recency, context, and label-quality modifiers.

use super::model::{LabelQuality, RollingBaseline, TopicAggregate};

/// True if a topic's baseline rate is persistently high and stable enough
/// that spikes must clear a much higher bar before counting as a trend.
#[must_use]
pub fn is_evergreen(key: &str, is_single_word: bool, baseline: &RollingBaseline, evergreen_set_member: bool) -> bool {
    if evergreen_set_member {
        return true;
    }
    let _ = key;
    let stability_ratio = if baseline.baseline_30d > 0.1 {
        (baseline.baseline_7d - baseline.baseline_30d).abs() / baseline.baseline_30d.max(0.1)
    } else {
        (baseline.baseline_7d - baseline.baseline_30d).abs() / 0.1
    };

    if is_single_word {
        baseline.baseline_30d >= 1.0 && baseline.baseline_7d >= 0.8 && stability_ratio < 0.5
    } else {
        baseline.baseline_30d >= 2.0 && baseline.baseline_7d >= 1.5 && stability_ratio < 0.3
    }
}

/// Multiplicative evergreen penalty. `has_history` gates the
/// "no significant spike" branch between the 0.05/0.08 constants.
#[must_use]
pub fn evergreen_penalty(evergreen: bool, is_single_word_entity_only: bool, z_score: f64, has_history: bool) -> f64 {
    if !evergreen || !is_single_word_entity_only {
        return 1.0;
    }

    let base = 0.15;
    if z_score >= 8.0 {
        base * 0.80
    } else if z_score >= 6.0 {
        base * 0.55
    } else if z_score >= 5.0 {
        base * 0.35
    } else if z_score >= 4.0 {
        base * 0.20
    } else if has_history {
        0.05
    } else {
        0.08
    }
}

/// Recency decay on hours since a topic was last seen.
#[must_use]
pub fn recency_decay(hours_since_last_seen: f64) -> f64 {
    if hours_since_last_seen <= 2.0 {
        1.0
    } else if hours_since_last_seen <= 12.0 {
        let t = (hours_since_last_seen - 2.0) / 10.0;
        1.0 - t * 0.5
    } else if hours_since_last_seen <= 24.0 {
        let t = (hours_since_last_seen - 12.0) / 12.0;
        0.5 - t * 0.2
    } else {
        0.3
    }
}

/// For entity-only labels: at least 2 co-occurring non-phrase neighbors, or
/// at least 1 co-occurring event-phrase neighbor.
#[must_use]
pub fn has_sufficient_context(
    aggregate: &TopicAggregate,
    phrase_neighbor_keys: &std::collections::HashSet<String>,
) -> bool {
    let mut phrase_neighbors = 0usize;
    let mut non_phrase_neighbors = 0usize;
    for key in aggregate.co_occurrences.keys() {
        if phrase_neighbor_keys.contains(key) {
            phrase_neighbors += 1;
        } else {
            non_phrase_neighbors += 1;
        }
    }
    phrase_neighbors >= 1 || non_phrase_neighbors >= 2
}

/// Label-quality modifier applied in the rank score.
#[must_use]
pub fn label_quality_modifier(quality: LabelQuality, has_tier12: bool, has_context: bool) -> f64 {
    let base = match quality {
        LabelQuality::EventPhrase => 1.0,
        LabelQuality::FallbackGenerated => 0.85,
        LabelQuality::EntityOnly => {
            if has_tier12 {
                0.6
            } else {
                0.4
            }
        }
    };

    if quality == LabelQuality::EntityOnly && !has_context {
        base * 0.35
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evergreen_multiword_threshold() {
        let baseline = RollingBaseline {
            baseline_7d: 2.0,
            baseline_30d: 2.1,
            stddev_7d: 0.3,
            data_points_7d: 10,
        };
        assert!(is_evergreen("politics", false, &baseline, false));
    }

    #[test]
    fn not_evergreen_when_volatile() {
        let baseline = RollingBaseline {
            baseline_7d: 5.0,
            baseline_30d: 2.0,
            stddev_7d: 0.3,
            data_points_7d: 10,
        };
        assert!(!is_evergreen("topic", false, &baseline, false));
    }

    #[test]
    fn evergreen_penalty_scales_with_zscore() {
        assert!((evergreen_penalty(true, true, 9.0, true) - 0.12).abs() < 1e-9);
        assert!((evergreen_penalty(true, true, 3.0, true) - 0.05).abs() < 1e-9);
        assert!((evergreen_penalty(true, true, 3.0, false) - 0.08).abs() < 1e-9);
    }

    #[test]
    fn evergreen_penalty_neutral_for_non_evergreen() {
        assert!((evergreen_penalty(false, true, 9.0, true) - 1.0).abs() < 1e-9);
        assert!((evergreen_penalty(true, false, 9.0, true) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn recency_decay_breakpoints() {
        assert!((recency_decay(1.0) - 1.0).abs() < 1e-9);
        assert!((recency_decay(2.0) - 1.0).abs() < 1e-9);
        assert!((recency_decay(7.0) - 0.75).abs() < 1e-9);
        assert!((recency_decay(12.0) - 0.5).abs() < 1e-9);
        assert!((recency_decay(18.0) - 0.4).abs() < 1e-9);
        assert!((recency_decay(30.0) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn label_quality_modifier_penalizes_entity_only_without_context() {
        let with_context = label_quality_modifier(LabelQuality::EntityOnly, true, true);
        let without_context = label_quality_modifier(LabelQuality::EntityOnly, true, false);
        assert!((with_context - 0.6).abs() < 1e-9);
        assert!((without_context - 0.21).abs() < 1e-9);
    }
}
