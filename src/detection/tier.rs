//! Source-Tier Resolver.
//!
//! Maps a mention's publisher domain to an authority tier. Social posts are
//! pinned to `Tier3` by the loader before this resolver ever sees them;
//! this module only adjudicates `article`/`aggregator` domains.

use std::collections::HashMap;

use super::model::Tier;

/// Hardcoded fallback used when the persisted tier table has no row for a
/// domain. Kept small and conservative: only domains an operator would
/// uncontroversially call "official" or "national newsroom" appear here.
const TIER1_FALLBACK: &[&str] = &[
    "whitehouse.gov",
    "congress.gov",
    "supremecourt.gov",
    "state.gov",
    "justice.gov",
    "fbi.gov",
    "reuters.com",
    "apnews.com",
];

const TIER2_FALLBACK: &[&str] = &[
    "nytimes.com",
    "washingtonpost.com",
    "wsj.com",
    "bbc.com",
    "bbc.co.uk",
    "npr.org",
    "cnn.com",
    "theguardian.com",
    "politico.com",
    "axios.com",
    "bloomberg.com",
];

/// Resolves publisher domains to authority tiers, backed by a persisted
/// table plus the hardcoded fallback above.
#[derive(Debug, Clone, Default)]
pub struct TierResolver {
    table: HashMap<String, Tier>,
}

impl TierResolver {
    #[must_use]
    pub fn new(table: HashMap<String, Tier>) -> Self {
        Self { table }
    }

    /// Resolve a domain to a tier. `domain` is expected lowercased by the
    /// caller (the loader normalizes before this is invoked).
    #[must_use]
    pub fn resolve(&self, domain: &str) -> Tier {
        if let Some(tier) = self.table.get(domain) {
            return *tier;
        }
        if TIER1_FALLBACK.contains(&domain) {
            return Tier::Tier1;
        }
        if TIER2_FALLBACK.contains(&domain) {
            return Tier::Tier2;
        }
        Tier::Tier3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persisted_table_takes_precedence_over_fallback() {
        let mut table = HashMap::new();
        table.insert("reuters.com".to_string(), Tier::Tier2);
        let resolver = TierResolver::new(table);
        assert_eq!(resolver.resolve("reuters.com"), Tier::Tier2);
    }

    #[test]
    fn fallback_recognizes_tier1_government_domains() {
        let resolver = TierResolver::new(HashMap::new());
        assert_eq!(resolver.resolve("whitehouse.gov"), Tier::Tier1);
    }

    #[test]
    fn fallback_recognizes_tier2_national_news() {
        let resolver = TierResolver::new(HashMap::new());
        assert_eq!(resolver.resolve("nytimes.com"), Tier::Tier2);
    }

    #[test]
    fn unknown_domain_defaults_to_tier3() {
        let resolver = TierResolver::new(HashMap::new());
        assert_eq!(resolver.resolve("some-random-blog.example"), Tier::Tier3);
    }

    use rstest::rstest;

    #[rstest]
    #[case("apnews.com", Tier::Tier1)]
    #[case("bbc.co.uk", Tier::Tier2)]
    #[case("politico.com", Tier::Tier2)]
    #[case("example-fan-blog.net", Tier::Tier3)]
    fn fallback_table_resolves_known_domains(#[case] domain: &str, #[case] expected: Tier) {
        let resolver = TierResolver::new(HashMap::new());
        assert_eq!(resolver.resolve(domain), expected);
    }
}
