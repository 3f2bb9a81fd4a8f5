//! Static word lists used by the event-phrase detector and the quality gate.
//!
//! These are data, not code: every list here is a plain `&[&str]` slice so
//! it can grow without touching the matching logic in `label.rs` or
//! `quality_gate.rs`.

use std::collections::HashSet;

use once_cell::sync::Lazy;

/// Action verbs (all common inflections) that mark a phrase as an event.
/// Covers legislative, executive, judicial, law-enforcement, diplomatic,
/// conflict, economic, and general-news categories.
pub(crate) const VERBS: &[&str] = &[
    // legislative
    "passes", "passed", "votes", "voted", "rejects", "rejected", "approves", "approved",
    "blocks", "blocked", "repeals", "repealed", "amends", "amended", "ratifies", "ratified",
    "vetoes", "vetoed", "introduces", "introduced", "debates", "debated",
    // executive / administrative
    "signs", "signed", "orders", "ordered", "announces", "announced", "declares", "declared",
    "appoints", "appointed", "nominates", "nominated", "fires", "fired", "resigns", "resigned",
    "dismisses", "dismissed", "launches", "launched", "unveils", "unveiled", "suspends", "suspended",
    // judicial
    "rules", "ruled", "sentences", "sentenced", "convicts", "convicted", "acquits", "acquitted",
    "indicts", "indicted", "charges", "charged", "sues", "sued", "appeals", "appealed",
    "overturns", "overturned", "upholds", "upheld",
    // law enforcement
    "arrests", "arrested", "raids", "raided", "seizes", "seized", "detains", "detained",
    "investigates", "investigated", "searches", "searched",
    // diplomatic
    "meets", "met", "negotiates", "negotiated", "signs", "agrees", "agreed", "condemns",
    "condemned", "sanctions", "sanctioned", "withdraws", "withdrew", "recognizes", "recognized",
    // conflict
    "attacks", "attacked", "strikes", "struck", "bombs", "bombed", "invades", "invaded",
    "kills", "killed", "wounds", "wounded", "clashes", "clashed", "retaliates", "retaliated",
    "ceasefire", "surrenders", "surrendered",
    // economic
    "raises", "raised", "cuts", "cut", "hikes", "hiked", "slashes", "slashed", "reports",
    "reported", "surges", "surged", "plunges", "plunged", "soars", "soared", "crashes", "crashed",
    "acquires", "acquired", "merges", "merged", "files", "filed", "bankrupt", "defaults", "defaulted",
    // general news
    "dies", "died", "wins", "won", "loses", "lost", "confirms", "confirmed", "denies", "denied",
    "admits", "admitted", "apologizes", "apologized", "protests", "protested", "strikes",
    "resolves", "resolved", "warns", "warned", "threatens", "threatened", "plans", "planned",
];

/// Event nouns used as an alternative to a verb match.
pub(crate) const EVENT_NOUNS: &[&str] = &[
    "ruling", "indictment", "ban", "attack", "strike", "ceasefire", "election", "referendum",
    "summit", "treaty", "sanctions", "resignation", "impeachment", "recall", "merger",
    "acquisition", "bankruptcy", "lawsuit", "verdict", "sentencing", "raid", "protest",
    "uprising", "coup", "blackout", "explosion", "earthquake", "flood", "outbreak", "recession",
    "shutdown", "boycott", "embargo", "crackdown", "scandal", "probe", "hearing", "vote",
    "shooting", "crash", "collapse", "evacuation",
];

/// Evergreen generic topics that never pass the quality gate on their own.
pub(crate) const BLOCKLIST: &[&str] = &[
    "politics", "news", "government", "world", "today", "update", "updates", "breaking",
    "latest", "report", "reports", "calendar", "schedule", "weather", "opinion", "editorial",
    "analysis", "the", "a", "an", "and", "or", "of", "in", "on", "at", "to", "for", "with",
    "by", "from", "as", "is", "are", "was", "were", "be", "been", "being",
];

/// Tiny allow-list of unambiguous government acronyms and proscribed
/// organizations that may pass the single-word gate without the usual
/// tier1/tier2 and source-diversity requirements applying as strictly.
pub(crate) const SINGLE_WORD_ALLOWLIST: &[&str] = &[
    "fbi", "cia", "nsa", "doj", "irs", "fda", "cdc", "nato", "eu", "un", "who", "fema",
    "isis", "isil", "al-qaeda", "hamas", "hezbollah", "taliban",
];

/// Canonical keys that are always evergreen regardless of their current
/// baseline stability: perennial officeholders, institutions, and topics
/// whose mention volume is structurally high rather than news-driven. A
/// spike against these still has to clear the stricter evergreen penalty
/// rather than ride the ordinary volume-based rank.
pub(crate) const EVERGREEN_SET: &[&str] = &[
    "trump", "biden", "congress", "the_white_house", "supreme_court_of_the_united_states",
    "democratic_party", "republican_party", "united_nations", "european_union", "nato",
    "federal_reserve", "wall_street", "the_senate", "the_house_of_representatives",
];

static VERB_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| VERBS.iter().copied().collect());
static EVENT_NOUN_SET: Lazy<HashSet<&'static str>> =
    Lazy::new(|| EVENT_NOUNS.iter().copied().collect());
static BLOCKLIST_SET: Lazy<HashSet<&'static str>> =
    Lazy::new(|| BLOCKLIST.iter().copied().collect());
static ALLOWLIST_SET: Lazy<HashSet<&'static str>> =
    Lazy::new(|| SINGLE_WORD_ALLOWLIST.iter().copied().collect());
static EVERGREEN_SET_LOOKUP: Lazy<HashSet<&'static str>> =
    Lazy::new(|| EVERGREEN_SET.iter().copied().collect());

#[must_use]
pub(crate) fn is_verb(word: &str) -> bool {
    VERB_SET.contains(word.to_lowercase().as_str())
}

#[must_use]
pub(crate) fn is_event_noun(word: &str) -> bool {
    EVENT_NOUN_SET.contains(word.to_lowercase().as_str())
}

#[must_use]
pub(crate) fn is_blocklisted(word: &str) -> bool {
    BLOCKLIST_SET.contains(word.to_lowercase().as_str())
}

#[must_use]
pub(crate) fn is_single_word_allowlisted(word: &str) -> bool {
    ALLOWLIST_SET.contains(word.to_lowercase().as_str())
}

/// True if `canonical_key` names a topic that is always evergreen.
#[must_use]
pub(crate) fn is_evergreen_set_member(canonical_key: &str) -> bool {
    EVERGREEN_SET_LOOKUP.contains(canonical_key)
}
