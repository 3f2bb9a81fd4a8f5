//! Quality Gate.
//!
//! Runs after clustering resolves canonical labels but before scoring.
//! Rejects blocklisted generics, applies a higher bar to single-word
//! candidates, and requires source/tier corroboration for everything else.

use super::alias::AliasResolver;
use super::keywords::{is_blocklisted, is_single_word_allowlisted};
use super::model::{SourceFamily, TopicAggregate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    Blocklisted,
    AllWordsBlocklisted,
    SingleWordInsufficientMentions,
    SingleWordInsufficientDomains,
    SingleWordInsufficientNewsMentions,
    SingleWordNoTier12,
    MultiWordInsufficientMentions,
    MultiWordInsufficientCorroboration,
}

impl RejectReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RejectReason::Blocklisted => "blocklisted",
            RejectReason::AllWordsBlocklisted => "all_words_blocklisted",
            RejectReason::SingleWordInsufficientMentions => "single_word_insufficient_mentions",
            RejectReason::SingleWordInsufficientDomains => "single_word_insufficient_domains",
            RejectReason::SingleWordInsufficientNewsMentions => "single_word_insufficient_news_mentions",
            RejectReason::SingleWordNoTier12 => "single_word_no_tier12",
            RejectReason::MultiWordInsufficientMentions => "multi_word_insufficient_mentions",
            RejectReason::MultiWordInsufficientCorroboration => "multi_word_insufficient_corroboration",
        }
    }
}

pub enum GateResult {
    Pass { explain: Option<String> },
    Reject(RejectReason),
}

const SINGLE_WORD_MIN_DEDUPED: usize = 20;
const SINGLE_WORD_MIN_DOMAINS: usize = 3;
const SINGLE_WORD_MIN_NEWS_MENTIONS: usize = 3;
const MULTI_WORD_MIN_DEDUPED: usize = 3;
const MULTI_WORD_NEWS_TYPE_24H_MIN: usize = 5;

/// Evaluate one topic aggregate against the quality gate.
#[must_use]
pub fn evaluate(aggregate: &TopicAggregate, alias_resolver: &AliasResolver, now: chrono::DateTime<chrono::Utc>) -> GateResult {
    let key_lower = aggregate.key.to_lowercase();
    let title_lower = aggregate.title.to_lowercase();

    if is_blocklisted(&key_lower) || is_blocklisted(&title_lower) {
        return GateResult::Reject(RejectReason::Blocklisted);
    }

    let words: Vec<&str> = aggregate.title.split_whitespace().collect();
    if words.len() > 1 && words.iter().all(|w| is_blocklisted(w)) {
        return GateResult::Reject(RejectReason::AllWordsBlocklisted);
    }

    if words.len() <= 1 {
        evaluate_single_word(aggregate, alias_resolver, &key_lower)
    } else {
        evaluate_multi_word(aggregate, now)
    }
}

fn evaluate_single_word(aggregate: &TopicAggregate, alias_resolver: &AliasResolver, key_lower: &str) -> GateResult {
    let is_allowlisted =
        is_single_word_allowlisted(key_lower) || alias_resolver.acronym_for(&aggregate.key).is_some();

    let deduped = aggregate.deduped_count();
    let domains = aggregate.distinct_domains().len();
    let news_mentions = aggregate.news_mention_count();
    let has_tier12 = aggregate.has_tier12();

    if deduped < SINGLE_WORD_MIN_DEDUPED {
        return GateResult::Reject(RejectReason::SingleWordInsufficientMentions);
    }
    if domains < SINGLE_WORD_MIN_DOMAINS {
        return GateResult::Reject(RejectReason::SingleWordInsufficientDomains);
    }
    if news_mentions < SINGLE_WORD_MIN_NEWS_MENTIONS {
        return GateResult::Reject(RejectReason::SingleWordInsufficientNewsMentions);
    }
    if !has_tier12 && !is_allowlisted {
        return GateResult::Reject(RejectReason::SingleWordNoTier12);
    }

    GateResult::Pass {
        explain: Some(format!(
            "single_word_pass: deduped={deduped} domains={domains} news={news_mentions} tier12={has_tier12} allowlisted={is_allowlisted}"
        )),
    }
}

fn evaluate_multi_word(aggregate: &TopicAggregate, now: chrono::DateTime<chrono::Utc>) -> GateResult {
    let deduped = aggregate.deduped_count();
    if deduped < MULTI_WORD_MIN_DEDUPED {
        return GateResult::Reject(RejectReason::MultiWordInsufficientMentions);
    }

    let source_families = aggregate.source_families_present().len();
    let news_mentions_24h = count_news_deduped_within(aggregate, now, 24);

    let corroborated =
        source_families >= 2 || (aggregate.news_mention_count() >= 1 && news_mentions_24h >= MULTI_WORD_NEWS_TYPE_24H_MIN);

    if !corroborated {
        return GateResult::Reject(RejectReason::MultiWordInsufficientCorroboration);
    }

    GateResult::Pass { explain: None }
}

fn count_news_deduped_within(aggregate: &TopicAggregate, now: chrono::DateTime<chrono::Utc>, hours: i64) -> usize {
    let cutoff = now - chrono::Duration::hours(hours);
    let mut seen = std::collections::HashSet::new();
    aggregate
        .raw_mentions
        .iter()
        .filter(|m| {
            m.published_at >= cutoff
                && m.source_family != SourceFamily::Social
                && seen.insert(m.content_hash)
                && aggregate.deduped.contains_key(&m.content_hash)
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::model::{Mention, Tier};
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;

    fn now() -> chrono::DateTime<chrono::Utc> {
        Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 0).unwrap()
    }

    fn mention(id: usize, domain: &str, tier: Tier, source: SourceFamily, hash: u64) -> Mention {
        Mention {
            id: id.to_string(),
            source_family: source,
            title: "t".to_string(),
            published_at: now(),
            domain: domain.to_string(),
            tier,
            sentiment_score: None,
            sentiment_label: None,
            topics: vec![],
            content_hash: hash,
            canonical_url: None,
        }
    }

    fn aggregate_with(mentions: Vec<Mention>) -> TopicAggregate {
        let first = mentions[0].clone();
        let mut agg = TopicAggregate::new("congress".to_string(), "Congress".to_string(), &first);
        for (i, m) in mentions.into_iter().enumerate() {
            agg.deduped.insert(m.content_hash, i);
            *agg.deduped_count_by_tier.entry(m.tier).or_insert(0) += 1;
            *agg.deduped_count_by_source.entry(m.source_family).or_insert(0) += 1;
            agg.raw_mentions.push(m);
        }
        agg
    }

    #[test]
    fn single_word_rejects_one_domain_noise() {
        let mut mentions = Vec::new();
        for i in 0..40u64 {
            mentions.push(mention(i as usize, "same-domain.com", Tier::Tier3, SourceFamily::Article, i));
        }
        let aggregate = aggregate_with(mentions);
        let resolver = AliasResolver::new(HashMap::new());
        let result = evaluate(&aggregate, &resolver, now());
        assert!(matches!(result, GateResult::Reject(RejectReason::SingleWordInsufficientDomains)));
    }

    #[test]
    fn single_word_rejects_without_tier12() {
        let mut mentions = Vec::new();
        for i in 0..25u64 {
            let domain = format!("domain{}.com", i % 5);
            mentions.push(mention(i as usize, &domain, Tier::Tier3, SourceFamily::Article, i));
        }
        let aggregate = aggregate_with(mentions);
        let resolver = AliasResolver::new(HashMap::new());
        let result = evaluate(&aggregate, &resolver, now());
        assert!(matches!(result, GateResult::Reject(RejectReason::SingleWordNoTier12)));
    }

    #[test]
    fn single_word_passes_with_corroboration() {
        let mut mentions = Vec::new();
        for i in 0..25u64 {
            let domain = format!("domain{}.com", i % 5);
            let tier = if i == 0 { Tier::Tier1 } else { Tier::Tier3 };
            mentions.push(mention(i as usize, &domain, tier, SourceFamily::Article, i));
        }
        let aggregate = aggregate_with(mentions);
        let resolver = AliasResolver::new(HashMap::new());
        let result = evaluate(&aggregate, &resolver, now());
        assert!(matches!(result, GateResult::Pass { .. }));
    }

    #[test]
    fn blocklisted_key_rejected() {
        let mention = mention(0, "a.com", Tier::Tier1, SourceFamily::Article, 0);
        let mut agg = TopicAggregate::new("politics".to_string(), "Politics".to_string(), &mention);
        agg.deduped.insert(0, 0);
        agg.raw_mentions.push(mention);
        let resolver = AliasResolver::new(HashMap::new());
        let result = evaluate(&agg, &resolver, now());
        assert!(matches!(result, GateResult::Reject(RejectReason::Blocklisted)));
    }
}
