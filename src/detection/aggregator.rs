//! Topic Aggregator.
//!
//! Folds every mention's raw topic list into canonical `TopicAggregate`
//! records, keyed by the Alias Resolver's canonical key. Co-occurrence
//! counts are accumulated symmetrically across every unordered pair of
//! topics attached to the same mention.

use std::collections::HashMap;

use super::alias::AliasResolver;
use super::label;
use super::model::{LabelQualityHint, Mention, RawTopic, Tier, TopicAggregate};

/// Per-tier weight used to derive a topic's authority score, which the
/// clusterer uses to pick a canonical label among equivalent members.
fn tier_weight(tier: Tier) -> f64 {
    match tier {
        Tier::Tier1 => 3.0,
        Tier::Tier2 => 2.0,
        Tier::Tier3 => 1.0,
    }
}

/// Builds canonical topic aggregates out of a batch of mentions.
pub struct Aggregator<'a> {
    alias_resolver: &'a AliasResolver,
}

impl<'a> Aggregator<'a> {
    #[must_use]
    pub fn new(alias_resolver: &'a AliasResolver) -> Self {
        Self { alias_resolver }
    }

    /// Fold every mention (and its raw topics) into canonical aggregates,
    /// then run the co-occurrence pass over the resulting key sets.
    #[must_use]
    pub fn aggregate(&self, mentions: &[Mention]) -> HashMap<String, TopicAggregate> {
        let mut aggregates: HashMap<String, TopicAggregate> = HashMap::new();

        for mention in mentions {
            let mut resolved_keys: Vec<String> = Vec::new();
            for raw_topic in &mention.topics {
                if let Some(key) = self.add_mention(&mut aggregates, mention, raw_topic) {
                    resolved_keys.push(key);
                }
            }
            self.track_co_occurrences(&mut aggregates, &resolved_keys);
        }

        for aggregate in aggregates.values_mut() {
            aggregate.authority_score = aggregate
                .deduped_count_by_tier
                .iter()
                .map(|(tier, count)| tier_weight(*tier) * f64::from(*count))
                .sum();
        }

        aggregates
    }

    /// Resolve `raw_topic` and fold `mention` into its aggregate. Returns
    /// the canonical key on success, `None` if the alias resolver skipped
    /// the topic.
    fn add_mention(
        &self,
        aggregates: &mut HashMap<String, TopicAggregate>,
        mention: &Mention,
        raw_topic: &RawTopic,
    ) -> Option<String> {
        let resolved = self.alias_resolver.resolve(&raw_topic.text);
        if resolved.skipped || resolved.key.len() < 2 {
            return None;
        }

        let aggregate = aggregates.entry(resolved.key.clone()).or_insert_with(|| {
            let mut agg = TopicAggregate::new(resolved.key.clone(), resolved.title.clone(), mention);
            agg.label_quality_hint = raw_topic.label_quality_hint;
            agg.is_event_phrase =
                raw_topic.is_event_phrase_claim && label::is_event_phrase(&resolved.title)
                    || matches!(raw_topic.label_quality_hint, Some(LabelQualityHint::EventPhrase))
                        && label::is_event_phrase(&resolved.title);
            agg
        });

        aggregate.raw_mentions.push(mention.clone());
        *aggregate.raw_count_by_source.entry(mention.source_family).or_insert(0) += 1;

        if !aggregate.deduped.contains_key(&mention.content_hash) {
            let index = aggregate.raw_mentions.len() - 1;
            aggregate.deduped.insert(mention.content_hash, index);
            *aggregate
                .deduped_count_by_source
                .entry(mention.source_family)
                .or_insert(0) += 1;
            *aggregate.deduped_count_by_tier.entry(mention.tier).or_insert(0) += 1;
        }

        if mention.published_at < aggregate.first_seen {
            aggregate.first_seen = mention.published_at;
        }
        if mention.published_at > aggregate.last_seen {
            aggregate.last_seen = mention.published_at;
        }

        if let Some(score) = mention.sentiment_score {
            aggregate.sentiment_sum += score;
            aggregate.sentiment_count += 1;
        }

        Some(resolved.key)
    }

    /// For every unordered pair of canonical keys resolved off one mention,
    /// bump a symmetric counter on both aggregates.
    fn track_co_occurrences(&self, aggregates: &mut HashMap<String, TopicAggregate>, keys: &[String]) {
        let mut unique: Vec<&String> = Vec::new();
        for key in keys {
            if !unique.contains(&key) {
                unique.push(key);
            }
        }

        for i in 0..unique.len() {
            for j in (i + 1)..unique.len() {
                let (a, b) = (unique[i].clone(), unique[j].clone());
                if let Some(agg) = aggregates.get_mut(&a) {
                    *agg.co_occurrences.entry(b.clone()).or_insert(0) += 1;
                }
                if let Some(agg) = aggregates.get_mut(&b) {
                    *agg.co_occurrences.entry(a).or_insert(0) += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::model::SourceFamily;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap as Map;

    fn topic(text: &str) -> RawTopic {
        RawTopic {
            text: text.to_string(),
            label_quality_hint: None,
            is_event_phrase_claim: false,
        }
    }

    fn mention(id: &str, hash: u64, topics: Vec<RawTopic>) -> Mention {
        Mention {
            id: id.to_string(),
            source_family: SourceFamily::Article,
            title: "headline".to_string(),
            published_at: Utc.with_ymd_and_hms(2026, 7, 28, 10, 0, 0).unwrap(),
            domain: "example.com".to_string(),
            tier: Tier::Tier1,
            sentiment_score: Some(0.2),
            sentiment_label: None,
            topics,
            content_hash: hash,
            canonical_url: None,
        }
    }

    #[test]
    fn dedupes_repeat_content_hash() {
        let resolver = AliasResolver::new(Map::new());
        let aggregator = Aggregator::new(&resolver);
        let mentions = vec![
            mention("1", 42, vec![topic("congress")]),
            mention("2", 42, vec![topic("congress")]),
        ];
        let aggregates = aggregator.aggregate(&mentions);
        let agg = aggregates.get("congress").expect("present");
        assert_eq!(agg.raw_count(), 2);
        assert_eq!(agg.deduped_count(), 1);
    }

    #[test]
    fn co_occurrences_are_symmetric() {
        let resolver = AliasResolver::new(Map::new());
        let aggregator = Aggregator::new(&resolver);
        let mentions = vec![mention("1", 1, vec![topic("congress"), topic("senate")])];
        let aggregates = aggregator.aggregate(&mentions);
        assert_eq!(aggregates["congress"].co_occurrences.get("senate"), Some(&1));
        assert_eq!(aggregates["senate"].co_occurrences.get("congress"), Some(&1));
    }

    #[test]
    fn key_shorter_than_two_chars_is_dropped() {
        let resolver = AliasResolver::new(Map::new());
        let aggregator = Aggregator::new(&resolver);
        let mentions = vec![mention("1", 1, vec![topic("a")])];
        let aggregates = aggregator.aggregate(&mentions);
        assert!(aggregates.is_empty());
    }

    #[test]
    fn skipped_alias_drops_topic_entirely() {
        let mut persisted = Map::new();
        persisted.insert("weather".to_string(), super::super::alias::SKIP_SENTINEL.to_string());
        let resolver = AliasResolver::new(persisted);
        let aggregator = Aggregator::new(&resolver);
        let mentions = vec![mention("1", 1, vec![topic("weather")])];
        let aggregates = aggregator.aggregate(&mentions);
        assert!(aggregates.is_empty());
    }

    #[test]
    fn authority_score_weighted_by_tier() {
        let resolver = AliasResolver::new(Map::new());
        let aggregator = Aggregator::new(&resolver);
        let mentions = vec![mention("1", 1, vec![topic("congress")])];
        let aggregates = aggregator.aggregate(&mentions);
        // One tier1 deduped mention => weight 3.0.
        assert!((aggregates["congress"].authority_score - 3.0).abs() < f64::EPSILON);
    }
}
