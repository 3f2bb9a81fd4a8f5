//! Phrase Clusterer.
//!
//! Pass 1 groups topic keys by cosine similarity of embeddings carried over
//! from recent prior trend events (threshold 0.82). Pass 2 groups whatever
//! is left over by Jaccard/containment text similarity (threshold 0.70).
//! Canonical selection always favors event phrases via a fixed authority
//! bonus, with a safety-net override pass at the end.

use std::collections::{HashMap, HashSet};

use crate::pipeline::embedding::cosine_similarity;

use super::label::is_event_phrase;
use super::model::{PhraseCluster, PriorEvent, TopicAggregate};

/// Added to a member's authority score when its canonical label is an
/// event phrase, so a verb-bearing phrase always outranks a bare entity at
/// comparable volume.
const EVENT_PHRASE_AUTHORITY_BONUS: f64 = 100.0;

struct Member<'a> {
    aggregate: &'a TopicAggregate,
    effective_authority: f64,
}

fn effective_authority(aggregate: &TopicAggregate) -> f64 {
    if aggregate.is_event_phrase {
        aggregate.authority_score + EVENT_PHRASE_AUTHORITY_BONUS
    } else {
        aggregate.authority_score
    }
}

/// Jaccard similarity over words longer than 2 characters, plus the
/// containment shortcut from pass 2.
#[must_use]
pub fn text_similarity(a: &str, b: &str) -> f64 {
    let a_lower = a.to_lowercase();
    let b_lower = b.to_lowercase();
    if a_lower == b_lower {
        return 1.0;
    }
    if a_lower.contains(&b_lower) || b_lower.contains(&a_lower) {
        return 0.85;
    }

    let words_of = |s: &str| -> HashSet<String> {
        s.split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
            .filter(|w| w.len() > 2)
            .collect()
    };
    let wa = words_of(&a_lower);
    let wb = words_of(&b_lower);
    if wa.is_empty() || wb.is_empty() {
        return 0.0;
    }
    let intersection = wa.intersection(&wb).count();
    let union = wa.union(&wb).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Cluster topic aggregates into equivalence classes. `prior_events` is the
/// embedding index (already capped to `max_prior_events_for_embedding` by
/// the loader); `embeddings` maps a topic key to its own freshly-computed
/// embedding, when one is available for this run.
#[must_use]
pub fn cluster_topics(
    aggregates: &HashMap<String, TopicAggregate>,
    prior_events: &[PriorEvent],
    embeddings: &HashMap<String, Vec<f32>>,
    embedding_threshold: f32,
    text_threshold: f64,
) -> Vec<PhraseCluster> {
    let mut clusters: Vec<PhraseCluster> = Vec::new();
    let mut assigned: HashSet<String> = HashSet::new();

    let mut keys: Vec<&String> = aggregates.keys().collect();
    keys.sort();

    // Pass 1: embedding similarity against the prior-event index.
    for key in &keys {
        if assigned.contains(*key) {
            continue;
        }
        let Some(embedding) = embeddings.get(*key) else {
            continue;
        };

        let mut best: Option<(&PriorEvent, f32)> = None;
        for prior in prior_events {
            let sim = cosine_similarity(embedding, &prior.embedding);
            if sim >= embedding_threshold && best.as_ref().is_none_or(|(_, b)| sim > *b) {
                best = Some((prior, sim));
            }
        }

        if let Some((prior, _)) = best {
            if let Some(cluster) = clusters.iter_mut().find(|c| c.canonical_key == prior.event_key) {
                join_cluster(cluster, aggregates.get(*key).expect("key present"));
            } else {
                let mut cluster = new_cluster_from_prior(prior);
                join_cluster(&mut cluster, aggregates.get(*key).expect("key present"));
                clusters.push(cluster);
            }
            assigned.insert((*key).clone());
        }
    }

    // Pass 2: text similarity over whatever pass 1 left unclustered.
    for key in &keys {
        if assigned.contains(*key) {
            continue;
        }
        let aggregate = aggregates.get(*key).expect("key present");

        let mut best: Option<(usize, f64)> = None;
        for (idx, cluster) in clusters.iter().enumerate() {
            let sim = text_similarity(&aggregate.title, &cluster.canonical_title);
            if sim >= text_threshold && best.is_none_or(|(_, b)| sim > b) {
                best = Some((idx, sim));
            }
        }

        if let Some((idx, _)) = best {
            join_cluster(&mut clusters[idx], aggregate);
        } else {
            clusters.push(PhraseCluster {
                canonical_key: aggregate.key.clone(),
                canonical_title: aggregate.title.clone(),
                member_keys: vec![aggregate.key.clone()],
                total_deduped_mentions: aggregate.deduped_count(),
                top_authority_score: effective_authority(aggregate),
                canonical_is_event_phrase: aggregate.is_event_phrase,
            });
        }
        assigned.insert((*key).clone());
    }

    for cluster in &mut clusters {
        apply_event_phrase_safety_net(cluster, aggregates);
    }

    clusters
}

fn new_cluster_from_prior(prior: &PriorEvent) -> PhraseCluster {
    PhraseCluster {
        canonical_key: prior.event_key.clone(),
        canonical_title: prior.canonical_label.clone(),
        member_keys: Vec::new(),
        total_deduped_mentions: 0,
        top_authority_score: if prior.is_event_phrase {
            EVENT_PHRASE_AUTHORITY_BONUS
        } else {
            0.0
        },
        canonical_is_event_phrase: prior.is_event_phrase,
    }
}

fn join_cluster(cluster: &mut PhraseCluster, aggregate: &TopicAggregate) {
    if !cluster.member_keys.contains(&aggregate.key) {
        cluster.member_keys.push(aggregate.key.clone());
    }
    cluster.total_deduped_mentions += aggregate.deduped_count();

    let candidate_authority = effective_authority(aggregate);
    if candidate_authority > cluster.top_authority_score {
        cluster.top_authority_score = candidate_authority;
        cluster.canonical_key = aggregate.key.clone();
        cluster.canonical_title = aggregate.title.clone();
        cluster.canonical_is_event_phrase = aggregate.is_event_phrase;
    }
}

/// If the elected canonical is not an event phrase but some member is (and
/// that member's label actually validates as one), override the canonical
/// to that member instead.
fn apply_event_phrase_safety_net(cluster: &mut PhraseCluster, aggregates: &HashMap<String, TopicAggregate>) {
    if cluster.canonical_is_event_phrase {
        return;
    }
    let mut best: Option<&Member> = None;
    let members: Vec<Member> = cluster
        .member_keys
        .iter()
        .filter_map(|key| aggregates.get(key))
        .filter(|agg| agg.is_event_phrase && is_event_phrase(&agg.title))
        .map(|agg| Member {
            aggregate: agg,
            effective_authority: effective_authority(agg),
        })
        .collect();
    for member in &members {
        if best.as_ref().is_none_or(|b| member.effective_authority > b.effective_authority) {
            best = Some(member);
        }
    }
    if let Some(member) = best {
        cluster.canonical_key = member.aggregate.key.clone();
        cluster.canonical_title = member.aggregate.title.clone();
        cluster.canonical_is_event_phrase = true;
        cluster.top_authority_score = member.effective_authority;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::model::{Mention, SourceFamily, Tier};
    use chrono::{TimeZone, Utc};

    fn mention(id: &str) -> Mention {
        Mention {
            id: id.to_string(),
            source_family: SourceFamily::Article,
            title: "t".to_string(),
            published_at: Utc.with_ymd_and_hms(2026, 7, 28, 0, 0, 0).unwrap(),
            domain: "example.com".to_string(),
            tier: Tier::Tier2,
            sentiment_score: None,
            sentiment_label: None,
            topics: vec![],
            content_hash: 1,
            canonical_url: None,
        }
    }

    fn aggregate(key: &str, title: &str, is_event_phrase: bool, authority: f64) -> TopicAggregate {
        let mut agg = TopicAggregate::new(key.to_string(), title.to_string(), &mention(key));
        agg.is_event_phrase = is_event_phrase;
        agg.authority_score = authority;
        agg
    }

    #[test]
    fn text_similarity_exact_match_is_one() {
        assert!((text_similarity("Patel", "Patel") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn text_similarity_containment_is_085() {
        let sim = text_similarity("Kash Patel", "Patel");
        assert!((sim - 0.85).abs() < f64::EPSILON);
    }

    #[test]
    fn text_similarity_jaccard_for_disjoint_word_sets() {
        let sim = text_similarity("senate rejects bill", "house passes budget");
        assert!((sim - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn cluster_elects_event_phrase_over_entity_at_equal_volume() {
        let mut aggregates = HashMap::new();
        aggregates.insert("patel".to_string(), aggregate("patel", "Patel", false, 10.0));
        aggregates.insert(
            "patel_confirmed_fbi_director".to_string(),
            aggregate(
                "patel_confirmed_fbi_director",
                "Patel Confirmed FBI Director",
                true,
                10.0,
            ),
        );

        let clusters = cluster_topics(&aggregates, &[], &HashMap::new(), 0.82, 0.70);
        let cluster = clusters
            .iter()
            .find(|c| c.member_keys.len() == 2)
            .expect("keys should cluster via containment/jaccard");
        assert_eq!(cluster.canonical_title, "Patel Confirmed FBI Director");
        assert!(cluster.canonical_is_event_phrase);
    }

    #[test]
    fn unclustered_singleton_stands_alone() {
        let mut aggregates = HashMap::new();
        aggregates.insert(
            "unrelated_topic".to_string(),
            aggregate("unrelated_topic", "Unrelated Topic", false, 5.0),
        );
        let clusters = cluster_topics(&aggregates, &[], &HashMap::new(), 0.82, 0.70);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].member_keys.len(), 1);
    }
}
