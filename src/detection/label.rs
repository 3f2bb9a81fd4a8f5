//! Event-Phrase Detector and Label Validator.
//!
//! An event phrase is 2-6 words, contains a verb/event-noun, and is not an
//! unqualified entity reference. The validator reconciles an upstream hint
//! (`event_phrase` / `fallback_generated` / none) against what the phrase
//! actually contains, downgrading overclaims and attempting a
//! headline-derived fallback when useful.

use once_cell::sync::Lazy;
use regex::Regex;

use super::keywords::{is_event_noun, is_verb};
use super::model::{LabelQuality, LabelQualityHint};

static HONORIFIC_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:Mr|Mrs|Ms|Dr|Sen|Rep|Gov|Gen|Adm|Sgt|Pres|Judge)\.?\s+[A-Z][a-z]+$").unwrap());

static FIRST_LAST_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z][a-z]+\s+[A-Z][a-z]+$").unwrap());

static SINGLE_CAPITALIZED_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z][a-zA-Z'-]*$").unwrap());

static ALL_CAPS_ACRONYM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{2,5}$").unwrap());

static THE_ENTITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^The\s+[A-Z][a-zA-Z]*(?:\s+[A-Z][a-zA-Z]*)?$").unwrap());

fn word_count(phrase: &str) -> usize {
    phrase.split_whitespace().count()
}

fn has_verb_or_event_noun(phrase: &str) -> bool {
    phrase
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .any(|w| is_verb(w) || is_event_noun(w))
}

/// Matches one of the entity-only surface patterns from (b).
#[must_use]
pub fn matches_entity_only_pattern(phrase: &str) -> bool {
    let trimmed = phrase.trim();
    HONORIFIC_NAME.is_match(trimmed)
        || FIRST_LAST_NAME.is_match(trimmed)
        || SINGLE_CAPITALIZED_WORD.is_match(trimmed)
        || ALL_CAPS_ACRONYM.is_match(trimmed)
        || THE_ENTITY.is_match(trimmed)
}

/// True if `phrase` qualifies as an event phrase: 2-6 words, carries a
/// verb/event-noun, and any entity-only surface match is overridden by
/// that verb/noun presence.
#[must_use]
pub fn is_event_phrase(phrase: &str) -> bool {
    let words = word_count(phrase);
    if !(2..=6).contains(&words) {
        return false;
    }
    let has_action = has_verb_or_event_noun(phrase);
    if !has_action {
        return false;
    }
    // entity-only pattern alone would disqualify, but a verb/event-noun
    // match overrides it per (b).
    true
}

/// Attempt to synthesize a 3-5 word event phrase from a representative
/// headline. Slides windows of decreasing size over the headline's words,
/// preferring the first window anchored on a capitalized (subject-looking)
/// word that also carries a verb/event-noun; falls back to a plain
/// truncation when the headline at least mentions the entity.
#[must_use]
pub fn generate_fallback_phrase(headline: &str, entity_title: &str) -> Option<String> {
    let words: Vec<&str> = headline.split_whitespace().collect();

    for window_len in [5usize, 4, 3] {
        if words.len() < window_len {
            continue;
        }
        for start in 0..=(words.len() - window_len) {
            let window = &words[start..start + window_len];
            let first = window[0].trim_matches(|c: char| !c.is_alphanumeric());
            if first.chars().next().is_none_or(|c| !c.is_uppercase()) {
                continue;
            }
            let candidate = window.join(" ");
            if is_event_phrase(&candidate) {
                return Some(candidate);
            }
        }
    }

    // Last resort: first 5 non-trivial words, only if the headline
    // actually mentions the entity we're generating a fallback for.
    if headline.to_lowercase().contains(&entity_title.to_lowercase()) {
        let truncated: Vec<&str> = words.iter().filter(|w| w.len() > 1).take(5).copied().collect();
        if truncated.len() >= 3 {
            let candidate = truncated.join(" ");
            if is_event_phrase(&candidate) {
                return Some(candidate);
            }
        }
    }

    None
}

/// Outcome of reconciling an upstream hint against the actual phrase text.
#[derive(Debug, Clone)]
pub struct ValidatedLabel {
    pub quality: LabelQuality,
    pub label: String,
    /// Free-text description of how this quality was decided, persisted as
    /// `label_source`.
    pub source: &'static str,
}

/// Reconcile a claimed label against its upstream hint, falling back to a
/// headline-derived phrase when useful.
#[must_use]
pub fn validate_label(
    hint: Option<LabelQualityHint>,
    claimed_event_phrase: bool,
    label: &str,
    headline: Option<&str>,
    entity_title: &str,
) -> ValidatedLabel {
    match hint {
        Some(LabelQualityHint::FallbackGenerated) => {
            if claimed_event_phrase && is_event_phrase(label) {
                ValidatedLabel {
                    quality: LabelQuality::FallbackGenerated,
                    label: label.to_string(),
                    source: "hint_fallback_generated_confirmed",
                }
            } else {
                ValidatedLabel {
                    quality: LabelQuality::EntityOnly,
                    label: entity_title.to_string(),
                    source: "hint_fallback_generated_downgraded",
                }
            }
        }
        Some(LabelQualityHint::EventPhrase) => {
            if is_event_phrase(label) {
                ValidatedLabel {
                    quality: LabelQuality::EventPhrase,
                    label: label.to_string(),
                    source: "hint_event_phrase_confirmed",
                }
            } else {
                ValidatedLabel {
                    quality: LabelQuality::EntityOnly,
                    label: entity_title.to_string(),
                    source: "hint_event_phrase_downgraded",
                }
            }
        }
        Some(LabelQualityHint::EntityOnly) | None if claimed_event_phrase => {
            if is_event_phrase(label) {
                ValidatedLabel {
                    quality: LabelQuality::EventPhrase,
                    label: label.to_string(),
                    source: "no_hint_verb_check_passed",
                }
            } else if let Some(fallback) = headline.and_then(|h| generate_fallback_phrase(h, entity_title)) {
                ValidatedLabel {
                    quality: LabelQuality::FallbackGenerated,
                    label: fallback,
                    source: "no_hint_verb_check_failed_fallback_generated",
                }
            } else {
                ValidatedLabel {
                    quality: LabelQuality::EntityOnly,
                    label: entity_title.to_string(),
                    source: "no_hint_verb_check_failed_no_fallback",
                }
            }
        }
        _ => {
            if let Some(fallback) = headline.and_then(|h| generate_fallback_phrase(h, entity_title)) {
                ValidatedLabel {
                    quality: LabelQuality::FallbackGenerated,
                    label: fallback,
                    source: "not_claimed_fallback_generated",
                }
            } else {
                ValidatedLabel {
                    quality: LabelQuality::EntityOnly,
                    label: entity_title.to_string(),
                    source: "not_claimed_entity_only",
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_phrase_requires_verb() {
        assert!(is_event_phrase("Senate Rejects Bill"));
        assert!(!is_event_phrase("The United States Senate"));
    }

    #[test]
    fn event_phrase_requires_word_count_in_range() {
        assert!(!is_event_phrase("Rejects"));
        assert!(!is_event_phrase(
            "Senate Rejects The Controversial Immigration Reform Bill Today"
        ));
    }

    #[test]
    fn entity_only_patterns_recognized() {
        assert!(matches_entity_only_pattern("Trump"));
        assert!(matches_entity_only_pattern("Kash Patel"));
        assert!(matches_entity_only_pattern("Sen. Warren"));
        assert!(matches_entity_only_pattern("FBI"));
        assert!(matches_entity_only_pattern("The Senate"));
    }

    #[test]
    fn entity_only_pattern_overridden_by_verb() {
        // "Patel Confirmed" matches no entity-only pattern and has a verb.
        assert!(!matches_entity_only_pattern("Patel Confirmed FBI Director"));
        assert!(is_event_phrase("Patel Confirmed FBI Director"));
    }

    #[test]
    fn validate_hint_fallback_generated_accepts_valid_phrase() {
        let result = validate_label(
            Some(LabelQualityHint::FallbackGenerated),
            true,
            "Patel Confirmed FBI Director",
            None,
            "Kash Patel",
        );
        assert_eq!(result.quality.as_str(), "fallback_generated");
    }

    #[test]
    fn validate_hint_event_phrase_downgrades_on_failure() {
        let result = validate_label(
            Some(LabelQualityHint::EventPhrase),
            true,
            "Kash Patel",
            None,
            "Kash Patel",
        );
        assert_eq!(result.quality.as_str(), "entity_only");
        assert_eq!(result.label, "Kash Patel");
    }

    #[test]
    fn validate_no_hint_tries_headline_fallback() {
        let result = validate_label(
            None,
            false,
            "Kash Patel",
            Some("Patel Confirmed as FBI Director by Senate"),
            "Kash Patel",
        );
        assert_eq!(result.quality.as_str(), "fallback_generated");
    }

    #[test]
    fn validate_no_hint_no_headline_stays_entity_only() {
        let result = validate_label(None, false, "Kash Patel", None, "Kash Patel");
        assert_eq!(result.quality.as_str(), "entity_only");
    }
}
