/// Text processing utilities.
///
/// Provides sentence splitting, hashing, and near-duplicate detection.
use unicode_segmentation::UnicodeSegmentation;
use xxhash_rust::xxh3::xxh3_64;

/// Hashes text with XXH3.
///
/// XXH3 is a fast hash algorithm with a low collision rate.
#[must_use]
pub fn hash_text(text: &str) -> u64 {
    xxh3_64(text.as_bytes())
}

/// Splits text into sentences.
///
/// Uses Unicode UAX#29-compliant sentence boundary detection.
#[must_use]
pub fn split_sentences(text: &str) -> Vec<String> {
    text.unicode_sentences()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Generates rolling-window N-character hashes for text.
///
/// Used for near-duplicate detection.
#[must_use]
pub(crate) fn rolling_hash_windows(text: &str, window_size: usize) -> Vec<u64> {
    if text.len() < window_size {
        return vec![hash_text(text)];
    }

    let chars: Vec<char> = text.chars().collect();
    let mut hashes = Vec::new();

    for window in chars.windows(window_size) {
        let window_text: String = window.iter().collect();
        hashes.push(hash_text(&window_text));
    }

    hashes
}

/// Determines whether two texts are near-duplicates.
///
/// # Arguments
/// * `text1` - the first text
/// * `text2` - the second text
/// * `window_size` - the rolling window size
/// * `threshold` - the similarity threshold for a duplicate verdict (0.0-1.0)
///
/// # Returns
/// `true` if the texts are near-duplicates
#[must_use]
pub fn is_near_duplicate(text1: &str, text2: &str, window_size: usize, threshold: f64) -> bool {
    if text1.is_empty() || text2.is_empty() {
        return false;
    }

    let hashes1 = rolling_hash_windows(text1, window_size);
    let hashes2 = rolling_hash_windows(text2, window_size);

    if hashes1.is_empty() || hashes2.is_empty() {
        return false;
    }

    use std::collections::HashMap;

    let mut counts1: HashMap<u64, usize> = HashMap::new();
    for hash in hashes1 {
        *counts1.entry(hash).or_insert(0) += 1;
    }

    let mut counts2: HashMap<u64, usize> = HashMap::new();
    for hash in hashes2 {
        *counts2.entry(hash).or_insert(0) += 1;
    }

    let mut intersection = 0usize;
    for (hash, count1) in &counts1 {
        if let Some(count2) = counts2.get(hash) {
            intersection += (*count1).min(*count2);
        }
    }

    let total1: usize = counts1.values().sum();
    let total2: usize = counts2.values().sum();
    let denominator = total1 + total2;

    if denominator == 0 {
        return false;
    }

    let similarity = (2 * intersection) as f64 / denominator as f64;
    similarity >= threshold
}
