//! Scorer and clustering hot-path benchmarks over a synthetic window of
//! mentions, sized to approximate a busy hour of ingestion.
use std::collections::{HashMap, HashSet};

use chrono::{Duration, TimeZone, Utc};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

use trend_detector::detection::aggregator::Aggregator;
use trend_detector::detection::alias::AliasResolver;
use trend_detector::detection::cluster::cluster_topics;
use trend_detector::detection::model::{LabelQuality, Mention, RawTopic, RollingBaseline, SourceFamily, Tier};
use trend_detector::detection::scorer::{self, ScoringInputs};

fn synthetic_mentions(count: usize) -> Vec<Mention> {
    let base = Utc.with_ymd_and_hms(2026, 7, 28, 6, 0, 0).unwrap();
    (0..count)
        .map(|i| Mention {
            id: format!("m{i}"),
            source_family: if i % 3 == 0 { SourceFamily::Article } else { SourceFamily::Social },
            title: format!("congress passes bill {}", i % 40),
            published_at: base + Duration::minutes(i as i64 % 360),
            domain: format!("source{}.example.com", i % 15),
            tier: if i % 5 == 0 { Tier::Tier1 } else { Tier::Tier3 },
            sentiment_score: Some(0.1),
            sentiment_label: None,
            topics: vec![RawTopic {
                text: format!("topic{}", i % 40),
                label_quality_hint: None,
                is_event_phrase_claim: i % 2 == 0,
            }],
            content_hash: i as u64,
            canonical_url: None,
        })
        .collect()
}

fn bench_aggregate(c: &mut Criterion) {
    let mentions = synthetic_mentions(2000);
    let resolver = AliasResolver::new(HashMap::new());

    c.bench_function("aggregate_2000_mentions", |b| {
        b.iter(|| {
            let aggregator = Aggregator::new(&resolver);
            let aggregates = aggregator.aggregate(&mentions);
            black_box(aggregates.len());
        });
    });
}

fn bench_cluster(c: &mut Criterion) {
    let mentions = synthetic_mentions(2000);
    let resolver = AliasResolver::new(HashMap::new());
    let aggregator = Aggregator::new(&resolver);
    let aggregates = aggregator.aggregate(&mentions);
    let empty_embeddings: HashMap<String, Vec<f32>> = HashMap::new();

    c.bench_function("cluster_40_topics", |b| {
        b.iter(|| {
            let clusters = cluster_topics(&aggregates, &[], &empty_embeddings, 0.82, 0.70);
            black_box(clusters.len());
        });
    });
}

fn bench_score(c: &mut Criterion) {
    let mentions = synthetic_mentions(2000);
    let resolver = AliasResolver::new(HashMap::new());
    let aggregator = Aggregator::new(&resolver);
    let aggregates = aggregator.aggregate(&mentions);
    let baseline = RollingBaseline { baseline_7d: 5.0, baseline_30d: 4.0, stddev_7d: 1.5, data_points_7d: 7 };
    let now = Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 0).unwrap();
    let neighbors: HashSet<String> = HashSet::new();

    c.bench_function("score_40_topics", |b| {
        b.iter(|| {
            for aggregate in aggregates.values() {
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
                black_box(output.rank_score);
            }
        });
    });
}

criterion_group!(benches, bench_aggregate, bench_cluster, bench_score);
criterion_main!(benches);
