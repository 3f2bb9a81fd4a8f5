//! Content fingerprinting for the Deduplicator.
//!
//! `content_hash` is computed once per mention by the loader, using the
//! XXH3 primitive in `util::text::hash_text`.

use chrono::{DateTime, Utc};

use crate::util::text::hash_text;

/// Tracking query parameters stripped during URL normalization.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "ref",
    "ref_src",
    "mc_cid",
    "mc_eid",
];

/// Normalize a URL for cross-source deduplication: lowercase scheme and
/// host, strip tracking parameters and the fragment. Non-tracking query
/// parameters are preserved (and kept sorted, so two URLs differing only
/// in parameter order still collapse to the same canonical form).
#[must_use]
pub fn normalize_url(raw: &str) -> Option<String> {
    let url = url::Url::parse(raw).ok()?;
    let mut normalized = url.clone();
    normalized.set_fragment(None);

    let scheme = url.scheme().to_lowercase();
    let host = url.host_str().map(str::to_lowercase);

    let mut kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !TRACKING_PARAMS.contains(&key.to_lowercase().as_str()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    kept.sort();

    let mut out = format!("{scheme}://{}", host.unwrap_or_default());
    if let Some(port) = url.port() {
        out.push(':');
        out.push_str(&port.to_string());
    }
    out.push_str(url.path());
    if !kept.is_empty() {
        out.push('?');
        let query = kept
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        out.push_str(&query);
    }
    Some(out)
}

/// Content hash for an article/aggregator mention: normalized title +
/// normalized URL + published timestamp truncated to the minute.
#[must_use]
pub fn article_content_hash(title: &str, canonical_url: Option<&str>, published_at: DateTime<Utc>) -> u64 {
    let normalized_title = normalize_title(title);
    let minute = published_at.format("%Y-%m-%dT%H:%M").to_string();
    let basis = format!(
        "{normalized_title}|{}|{minute}",
        canonical_url.unwrap_or("")
    );
    hash_text(&basis)
}

/// Content hash for a social post: first 100 characters of text after
/// whitespace collapse and lowercasing.
#[must_use]
pub fn social_content_hash(text: &str) -> u64 {
    let collapsed = collapse_whitespace(text).to_lowercase();
    let prefix: String = collapsed.chars().take(100).collect();
    hash_text(&prefix)
}

fn normalize_title(title: &str) -> String {
    collapse_whitespace(title).to_lowercase()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn url_normalization_strips_tracking_params() {
        let a = normalize_url("https://Example.com/story?utm_source=twitter&id=5").unwrap();
        let b = normalize_url("https://example.com/story?id=5").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn url_normalization_strips_fragment() {
        let a = normalize_url("https://example.com/story#section-2").unwrap();
        let b = normalize_url("https://example.com/story").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn url_normalization_sorts_remaining_params() {
        let a = normalize_url("https://example.com/s?b=2&a=1").unwrap();
        let b = normalize_url("https://example.com/s?a=1&b=2").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn article_hash_stable_under_tracking_param_addition() {
        let ts = Utc.with_ymd_and_hms(2026, 7, 28, 10, 0, 0).unwrap();
        let url1 = normalize_url("https://example.com/a?utm_source=x");
        let url2 = normalize_url("https://example.com/a");
        let h1 = article_content_hash("Senate Rejects Bill", url1.as_deref(), ts);
        let h2 = article_content_hash("Senate Rejects Bill", url2.as_deref(), ts);
        assert_eq!(h1, h2);
    }

    #[test]
    fn article_hash_stable_under_whitespace_and_case_changes() {
        let ts = Utc.with_ymd_and_hms(2026, 7, 28, 10, 0, 30).unwrap();
        let h1 = article_content_hash("Senate Rejects Bill", None, ts);
        let h2 = article_content_hash("  senate   rejects bill  ", None, ts);
        assert_eq!(h1, h2);
    }

    #[test]
    fn article_hash_truncates_to_minute() {
        let ts1 = Utc.with_ymd_and_hms(2026, 7, 28, 10, 0, 1).unwrap();
        let ts2 = Utc.with_ymd_and_hms(2026, 7, 28, 10, 0, 59).unwrap();
        let h1 = article_content_hash("Title", None, ts1);
        let h2 = article_content_hash("Title", None, ts2);
        assert_eq!(h1, h2);
    }

    #[test]
    fn social_hash_uses_first_100_chars() {
        let long_text = "a".repeat(200);
        let mut short_prefix = "a".repeat(100);
        short_prefix.push_str(&"b".repeat(100));
        assert_eq!(social_content_hash(&long_text), social_content_hash(&short_prefix));
    }
}
