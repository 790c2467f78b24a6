//! Text vectorization shared by the catalog feature index and the search index.
//!
//! Documents are tokenized into lower-case words, stop words are dropped,
//! simple plurals are folded, and the result is weighted with TF-IDF into
//! L2-normalised sparse vectors compared by cosine similarity.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

pub mod stopwords;
pub mod tfidf;

pub use stopwords::StopWordsFilter;
pub use tfidf::TfidfVectorizer;

/// Sparse term-index → weight vector. Ordered so float sums are reproducible.
pub type SparseVector = BTreeMap<usize, f64>;

fn token_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b\w\w+\b").ok()).as_ref()
}

/// Fold a simple English plural onto its singular form.
///
/// `tacos` → `taco`, `noodles` → `noodle`; words ending in `ss` and words of
/// three characters or fewer are returned unchanged.
pub fn fold_plural(word: &str) -> &str {
    if word.chars().count() > 3 && word.ends_with('s') && !word.ends_with("ss") {
        &word[..word.len() - 1]
    } else {
        word
    }
}

/// Lower-case word tokens of at least two characters, stop words removed, plurals folded.
pub fn tokenize(text: &str, stop_words: &StopWordsFilter) -> Vec<String> {
    let Some(pattern) = token_pattern() else {
        return Vec::new();
    };
    let lowered = text.to_lowercase();
    pattern
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|token| !stop_words.is_stop_word(token))
        .map(|token| fold_plural(token).to_string())
        .collect()
}

/// Cosine similarity of two sparse vectors; 0.0 when either has zero norm.
pub fn cosine_similarity(a: &SparseVector, b: &SparseVector) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let dot: f64 = small
        .iter()
        .filter_map(|(idx, w)| large.get(idx).map(|other| w * other))
        .sum();

    let norm_a = a.values().map(|w| w * w).sum::<f64>().sqrt();
    let norm_b = b.values().map(|w| w * w).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
