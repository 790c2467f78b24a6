pub mod rules;

// Re-export key types for convenience
pub use rules::{extract_keywords, match_query_to_preferences};

use crate::catalog::Restaurant;
use crate::text::{cosine_similarity, fold_plural, SparseVector, TfidfVectorizer};

/// Vocabulary bound for the search index.
pub const SEARCH_MAX_TERMS: usize = 200;
pub const SEARCH_TOP_K: usize = 9;
pub const SEARCH_MIN_SCORE: f64 = 0.1;

const W_SEMANTIC: f64 = 0.7;
const W_KEYWORD: f64 = 0.3;

/// A restaurant hit for a free-text query.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub restaurant: Restaurant,
    /// 0.7 * semantic + 0.3 * keyword
    pub combined_score: f64,
    pub semantic_score: f64,
    pub keyword_score: f64,
}

/// Fraction of `keywords` found in `searchable_text`; 0.0 for an empty keyword list.
///
/// A keyword also counts when its folded singular form is present, so "tacos"
/// finds "taco town".
pub fn keyword_match_score(searchable_text: &str, keywords: &[String]) -> f64 {
    if keywords.is_empty() {
        return 0.0;
    }
    let matches = keywords
        .iter()
        .filter(|kw| searchable_text.contains(kw.as_str()) || searchable_text.contains(fold_plural(kw)))
        .count();
    matches as f64 / keywords.len() as f64
}

/// TF-IDF (unigram + bigram) index over each restaurant's searchable text,
/// blended with keyword overlap at query time.
#[derive(Debug, Clone)]
pub struct SearchMatcher {
    restaurants: Vec<Restaurant>,
    texts: Vec<String>,
    vectors: Vec<SparseVector>,
    vectorizer: TfidfVectorizer,
}

impl SearchMatcher {
    pub fn new(restaurants: &[Restaurant]) -> Self {
        let texts: Vec<String> = restaurants.iter().map(Restaurant::searchable_text).collect();
        let mut vectorizer = TfidfVectorizer::new()
            .with_max_features(SEARCH_MAX_TERMS)
            .with_ngram_range(1, 2);
        let vectors = vectorizer.fit_transform(&texts);

        tracing::debug!(
            restaurants = restaurants.len(),
            terms = vectorizer.vocabulary_size(),
            "Built search index"
        );

        SearchMatcher {
            restaurants: restaurants.to_vec(),
            texts,
            vectors,
            vectorizer,
        }
    }

    /// Search with the default cut-offs: top 9, combined score at least 0.1.
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        self.search_with(query, SEARCH_TOP_K, SEARCH_MIN_SCORE)
    }

    pub fn search_with(&self, query: &str, top_k: usize, min_score: f64) -> Vec<SearchHit> {
        if query.trim().is_empty() || self.restaurants.is_empty() {
            return Vec::new();
        }

        let keywords = extract_keywords(query);
        let query_vector = self.vectorizer.transform(&query.to_lowercase());

        let mut hits: Vec<SearchHit> = self
            .restaurants
            .iter()
            .zip(self.texts.iter().zip(self.vectors.iter()))
            .filter_map(|(restaurant, (text, vector))| {
                let semantic_score = cosine_similarity(&query_vector, vector);
                let keyword_score = keyword_match_score(text, &keywords);
                let combined_score = W_SEMANTIC * semantic_score + W_KEYWORD * keyword_score;
                (combined_score >= min_score).then(|| SearchHit {
                    restaurant: restaurant.clone(),
                    combined_score,
                    semantic_score,
                    keyword_score,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.combined_score
                .partial_cmp(&a.combined_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_k);

        tracing::debug!(query = %query, keywords = keywords.len(), hits = hits.len(), "Search complete");
        hits
    }
}
