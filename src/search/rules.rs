/// Rule tables mapping free-text queries onto structured preferences.
///
/// Each table is scanned in order and the first category whose keyword list
/// has a substring hit wins. Order is part of the contract: "quick" appears in
/// both "casual meal" and "quick bite", and "casual meal" is listed first.

use regex::Regex;
use std::sync::OnceLock;

use crate::preferences::ExtractedPreferences;

/// An ordered first-match-wins keyword table.
pub type RuleTable = &'static [(&'static str, &'static [&'static str])];

pub const MOOD_RULES: RuleTable = &[
    ("happy", &["happy", "cheerful", "joyful", "excited"]),
    ("sad", &["sad", "down", "depressed", "blue"]),
    ("stressed", &["stressed", "tired", "exhausted", "busy"]),
    ("adventurous", &["adventurous", "exciting", "new", "try"]),
    ("relaxed", &["relaxed", "calm", "peaceful", "chill"]),
    ("celebratory", &["celebrate", "celebration", "special", "party"]),
];

pub const OCCASION_RULES: RuleTable = &[
    ("casual meal", &["casual", "quick", "simple"]),
    ("celebration", &["celebration", "birthday", "anniversary", "special"]),
    ("quick bite", &["quick", "fast", "grab"]),
    ("date night", &["date", "romantic", "dinner date"]),
    ("family dinner", &["family", "kids", "children"]),
];

pub const CUISINE_RULES: RuleTable = &[
    ("italian", &["italian", "pasta", "pizza"]),
    ("mexican", &["mexican", "taco", "burrito"]),
    ("indian", &["indian", "curry", "tikka"]),
    ("japanese", &["japanese", "sushi", "ramen"]),
    ("chinese", &["chinese", "dim sum"]),
    ("american", &["american", "burger", "bbq"]),
];

pub const DIETARY_RULES: RuleTable = &[
    ("vegetarian", &["vegetarian", "veggie"]),
    ("vegan", &["vegan"]),
    ("gluten-free", &["gluten-free", "gluten free"]),
];

pub const PRICE_RULES: RuleTable = &[
    ("affordable", &["cheap", "affordable", "budget"]),
    ("expensive", &["expensive", "fancy", "upscale", "fine dining"]),
];

/// First category in `table` with a keyword contained in `text` (already lower-cased).
pub fn first_match(table: RuleTable, text: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| text.contains(kw)))
        .map(|(category, _)| *category)
}

fn punctuation() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^\w\s]").ok()).as_ref()
}

/// Lower-cased query words longer than two characters, punctuation treated as whitespace.
pub fn extract_keywords(query: &str) -> Vec<String> {
    let lowered = query.to_lowercase();
    let cleaned = match punctuation() {
        Some(re) => re.replace_all(&lowered, " ").into_owned(),
        None => lowered,
    };
    cleaned
        .split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

/// Best-effort structured preferences from a query.
///
/// Hints are fallbacks only: a rule hit in the query always replaces them.
pub fn match_query_to_preferences(
    query: &str,
    mood_hint: Option<&str>,
    occasion_hint: Option<&str>,
    cuisine_hint: Option<&str>,
) -> ExtractedPreferences {
    let text = query.to_lowercase();
    let pick = |table: RuleTable, hint: Option<&str>| {
        first_match(table, &text)
            .map(str::to_string)
            .or_else(|| hint.map(str::to_string))
    };

    ExtractedPreferences {
        mood: pick(MOOD_RULES, mood_hint),
        occasion: pick(OCCASION_RULES, occasion_hint),
        cuisine: pick(CUISINE_RULES, cuisine_hint),
        dietary: pick(DIETARY_RULES, None),
        price_range: pick(PRICE_RULES, None),
        keywords: extract_keywords(query),
    }
}
