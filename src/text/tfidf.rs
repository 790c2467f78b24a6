//! TF-IDF vectorizer with a bounded vocabulary and n-gram support.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::{tokenize, SparseVector, StopWordsFilter};

/// TF-IDF vectorizer.
///
/// Vocabulary is the `max_features` most frequent terms across the corpus
/// (ties broken alphabetically). IDF is smoothed: `ln((1 + n) / (1 + df)) + 1`.
/// Transformed vectors are L2-normalised.
///
/// An unfitted vectorizer, or one fitted on an empty corpus, transforms every
/// document into an empty vector.
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    max_features: Option<usize>,
    ngram_range: (usize, usize),
    stop_words: StopWordsFilter,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl Default for TfidfVectorizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TfidfVectorizer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_features: None,
            ngram_range: (1, 1),
            stop_words: StopWordsFilter::english(),
            vocabulary: HashMap::new(),
            idf: Vec::new(),
        }
    }

    /// Set maximum vocabulary size.
    #[must_use]
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    /// Set n-gram range for feature extraction, e.g. `(1, 2)` for unigrams and bigrams.
    #[must_use]
    pub fn with_ngram_range(mut self, min_n: usize, max_n: usize) -> Self {
        let min_n = min_n.max(1);
        self.ngram_range = (min_n, max_n.max(min_n));
        self
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn is_fitted(&self) -> bool {
        !self.vocabulary.is_empty()
    }

    /// Term index for a vocabulary entry, if present.
    pub fn term_index(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    /// Tokens of `text` expanded into the configured n-grams.
    fn analyze(&self, text: &str) -> Vec<String> {
        let tokens = tokenize(text, &self.stop_words);
        let (min_n, max_n) = self.ngram_range;
        let mut terms = Vec::new();
        for n in min_n..=max_n {
            if n == 1 {
                terms.extend(tokens.iter().cloned());
                continue;
            }
            if tokens.len() < n {
                break;
            }
            terms.extend(tokens.windows(n).map(|w| w.join(" ")));
        }
        terms
    }

    /// Learn vocabulary and document frequencies from `documents`.
    pub fn fit<S: AsRef<str>>(&mut self, documents: &[S]) {
        self.vocabulary.clear();
        self.idf.clear();

        let n_docs = documents.len();
        if n_docs == 0 {
            return;
        }

        let mut term_freq: HashMap<String, usize> = HashMap::new();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for doc in documents {
            let terms = self.analyze(doc.as_ref());
            let mut seen: HashSet<&str> = HashSet::new();
            for term in &terms {
                *term_freq.entry(term.clone()).or_insert(0) += 1;
                if seen.insert(term.as_str()) {
                    *doc_freq.entry(term.clone()).or_insert(0) += 1;
                }
            }
        }

        let mut ranked: Vec<(String, usize)> = term_freq.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        if let Some(max) = self.max_features {
            ranked.truncate(max);
        }

        // Indices follow alphabetical order of the kept terms
        let mut kept: Vec<String> = ranked.into_iter().map(|(term, _)| term).collect();
        kept.sort();

        let n = n_docs as f64;
        for (idx, term) in kept.into_iter().enumerate() {
            let df = doc_freq.get(&term).copied().unwrap_or(0) as f64;
            self.idf.push(((1.0 + n) / (1.0 + df)).ln() + 1.0);
            self.vocabulary.insert(term, idx);
        }
    }

    /// TF-IDF vector for a single document against the fitted vocabulary.
    pub fn transform(&self, document: &str) -> SparseVector {
        if !self.is_fitted() {
            return SparseVector::new();
        }

        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for term in self.analyze(document) {
            if let Some(&idx) = self.vocabulary.get(&term) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let mut vector: SparseVector = counts
            .into_iter()
            .map(|(idx, tf)| (idx, tf * self.idf[idx]))
            .collect();

        let norm = vector.values().map(|w| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for w in vector.values_mut() {
                *w /= norm;
            }
        }
        vector
    }

    pub fn fit_transform<S: AsRef<str>>(&mut self, documents: &[S]) -> Vec<SparseVector> {
        self.fit(documents);
        documents.iter().map(|d| self.transform(d.as_ref())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::cosine_similarity;

    #[test]
    fn test_empty_corpus_is_unfitted() {
        let mut v = TfidfVectorizer::new();
        let out = v.fit_transform::<&str>(&[]);
        assert!(out.is_empty());
        assert!(!v.is_fitted());
        assert!(v.transform("pizza pasta").is_empty());
    }

    #[test]
    fn test_max_features_keeps_most_frequent() {
        let docs = ["pizza pizza pasta", "pizza salad", "sushi"];
        let mut v = TfidfVectorizer::new().with_max_features(2);
        v.fit(&docs);
        assert_eq!(v.vocabulary_size(), 2);
        assert!(v.term_index("pizza").is_some());
        // pasta, salad and sushi tie on frequency; alphabetical order wins
        assert!(v.term_index("pasta").is_some());
        assert!(v.term_index("sushi").is_none());
    }

    #[test]
    fn test_bigrams_are_indexed() {
        let docs = ["fine dining italian", "quick bite burgers"];
        let mut v = TfidfVectorizer::new().with_ngram_range(1, 2);
        v.fit(&docs);
        assert!(v.term_index("fine dining").is_some());
        assert!(v.term_index("quick bite").is_some());
    }

    #[test]
    fn test_vectors_are_normalised() {
        let docs = ["italian pasta pizza", "mexican taco burrito"];
        let mut v = TfidfVectorizer::new();
        let vectors = v.fit_transform(&docs);
        for vec in &vectors {
            let norm: f64 = vec.values().map(|w| w * w).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-9);
        }
        assert_eq!(cosine_similarity(&vectors[0], &vectors[1]), 0.0);
    }

    #[test]
    fn test_query_matches_plural_document() {
        let docs = ["Taco Town mexican tacos affordable", "Pasta Palace italian"];
        let mut v = TfidfVectorizer::new();
        let vectors = v.fit_transform(&docs);
        let query = v.transform("cheap taco");
        assert!(cosine_similarity(&query, &vectors[0]) > 0.0);
        assert_eq!(cosine_similarity(&query, &vectors[1]), 0.0);
    }
}
