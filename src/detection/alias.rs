//! Alias Resolver.
//!
//! Resolution precedence: persisted alias table (case-insensitive) →
//! hardcoded fallback table → default normalization. Any alias mapping to
//! the sentinel `__SKIP__` causes the topic to be dropped by the
//! aggregator.

use std::collections::HashMap;

/// Sentinel alias target that causes a topic to be dropped silently.
pub const SKIP_SENTINEL: &str = "__SKIP__";

/// A small set of acronym/short-form expansions that matter enough to ship
/// even without a populated persisted table. Keys are matched
/// case-insensitively against the raw topic string.
const HARDCODED_ALIASES: &[(&str, &str)] = &[
    ("potus", "President of the United States"),
    ("scotus", "Supreme Court of the United States"),
    ("doj", "Department of Justice"),
    ("dhs", "Department of Homeland Security"),
    ("fbi", "FBI"),
    ("cia", "CIA"),
    ("nsa", "NSA"),
    ("un", "United Nations"),
    ("eu", "European Union"),
    ("nato", "NATO"),
    ("gop", "Republican Party"),
    ("dnc", "Democratic Party"),
];

#[derive(Debug, Clone)]
pub struct Resolved {
    /// Lowercase, punctuation-stripped, underscored canonical key.
    pub key: String,
    /// Title-cased (or alias-supplied) canonical display title.
    pub title: String,
    /// True if the raw topic resolved to the skip sentinel.
    pub skipped: bool,
}

/// Resolves raw entity surface forms to canonical keys/titles.
#[derive(Debug, Clone, Default)]
pub struct AliasResolver {
    /// Case-insensitive persisted alias table: lowercased raw form → title.
    persisted: HashMap<String, String>,
    /// Reverse map from canonical key back to a "well-known acronym" flag,
    /// exposed to the quality gate for the single-word allow-list.
    reverse_acronyms: HashMap<String, String>,
}

impl AliasResolver {
    #[must_use]
    pub fn new(persisted: HashMap<String, String>) -> Self {
        let mut reverse_acronyms = HashMap::new();
        for (raw, title) in HARDCODED_ALIASES {
            reverse_acronyms.insert(canonical_key(title), (*raw).to_string());
        }
        Self {
            persisted,
            reverse_acronyms,
        }
    }

    /// Resolve a raw topic string to a canonical key/title pair.
    #[must_use]
    pub fn resolve(&self, raw: &str) -> Resolved {
        let lowered = raw.trim().to_lowercase();

        if let Some(title) = self.persisted.get(&lowered) {
            if title == SKIP_SENTINEL {
                return Resolved {
                    key: String::new(),
                    title: String::new(),
                    skipped: true,
                };
            }
            return Resolved {
                key: canonical_key(title),
                title: title.clone(),
                skipped: false,
            };
        }

        for (raw_form, title) in HARDCODED_ALIASES {
            if lowered == *raw_form {
                return Resolved {
                    key: canonical_key(title),
                    title: (*title).to_string(),
                    skipped: false,
                };
            }
        }

        let title = default_title_case(raw);
        Resolved {
            key: canonical_key(&title),
            title,
            skipped: false,
        }
    }

    /// Returns the known raw acronym for a canonical key, if any. Used by
    /// the quality gate's single-word allow-list.
    #[must_use]
    pub fn acronym_for(&self, key: &str) -> Option<&str> {
        self.reverse_acronyms.get(key).map(String::as_str)
    }
}

/// Lowercase, punctuation-stripped, underscored canonical key derivation,
/// shared by the resolver and by round-trip idempotence checks.
#[must_use]
pub fn canonical_key(title: &str) -> String {
    let mut key = String::with_capacity(title.len());
    let mut last_was_sep = true;
    for ch in title.chars() {
        if ch.is_alphanumeric() {
            key.extend(ch.to_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            key.push('_');
            last_was_sep = true;
        }
    }
    while key.ends_with('_') {
        key.pop();
    }
    key
}

/// Default title-casing used when neither table has an entry: strip
/// punctuation, collapse whitespace, title-case each word.
#[must_use]
pub fn default_title_case(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| {
            let cleaned: String = word.chars().filter(|c| c.is_alphanumeric()).collect();
            if cleaned.is_empty() {
                return String::new();
            }
            let mut chars = cleaned.chars();
            let first = chars.next().map(|c| c.to_uppercase().to_string()).unwrap_or_default();
            format!("{first}{}", chars.as_str().to_lowercase())
        })
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persisted_skip_sentinel_drops_topic() {
        let mut persisted = HashMap::new();
        persisted.insert("weather".to_string(), SKIP_SENTINEL.to_string());
        let resolver = AliasResolver::new(persisted);
        let resolved = resolver.resolve("Weather");
        assert!(resolved.skipped);
    }

    #[test]
    fn hardcoded_acronym_expands() {
        let resolver = AliasResolver::new(HashMap::new());
        let resolved = resolver.resolve("SCOTUS");
        assert_eq!(resolved.title, "Supreme Court of the United States");
        assert_eq!(resolved.key, "supreme_court_of_the_united_states");
    }

    #[test]
    fn default_normalization_title_cases_and_keys() {
        let resolver = AliasResolver::new(HashMap::new());
        let resolved = resolver.resolve("kash patel");
        assert_eq!(resolved.title, "Kash Patel");
        assert_eq!(resolved.key, "kash_patel");
    }

    #[test]
    fn canonical_key_is_idempotent() {
        let title = default_title_case("the senate's bill");
        let key1 = canonical_key(&title);
        let key2 = canonical_key(&default_title_case(&key1));
        assert_eq!(key1, key2);
    }

    #[test]
    fn acronym_for_looks_up_reverse_map() {
        let resolver = AliasResolver::new(HashMap::new());
        assert_eq!(
            resolver.acronym_for("supreme_court_of_the_united_states"),
            Some("scotus")
        );
        assert_eq!(resolver.acronym_for("unrelated_key"), None);
    }
}
