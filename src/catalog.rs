/// Restaurant catalog: entity records, document shape, and the per-restaurant
/// TF-IDF feature index used for content similarity.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::errors::MunchiesError;
use crate::store::{self, DocumentStore, StoreKey};
use crate::text::{cosine_similarity, SparseVector, TfidfVectorizer};

/// Vocabulary bound for the content feature index.
pub const FEATURE_MAX_TERMS: usize = 100;

/// Score assumed for a mood/occasion/time label the restaurant does not list.
pub const DEFAULT_LABEL_SCORE: f64 = 0.5;

/// A restaurant record. Immutable once loaded or merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Restaurant {
    pub id: i64,
    pub restaurant_name: String,
    pub cuisine: String,
    pub location: String,
    pub address: String,
    pub contact_details: String,
    pub popular_dishes: Vec<String>,
    pub dietary_options: Vec<String>,
    pub price_range: String,
    pub ambiance: String,
    pub mood_scores: BTreeMap<String, f64>,
    pub occasion_scores: BTreeMap<String, f64>,
    pub time_scores: BTreeMap<String, f64>,

    // Provenance, set only on enrichment-fetched entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(rename = "location_hint", skip_serializing_if = "Option::is_none")]
    pub location_hint: Option<String>,
    #[serde(rename = "user_preferences", skip_serializing_if = "Option::is_none")]
    pub user_preferences: Option<serde_json::Value>,
}

/// Case-insensitive score lookup with the 0.5 default, clamped to [0, 1].
pub fn label_score(scores: &BTreeMap<String, f64>, label: &str) -> f64 {
    let wanted = label.to_lowercase();
    let raw = scores.get(&wanted).copied().or_else(|| {
        scores
            .iter()
            .find(|(k, _)| k.to_lowercase() == wanted)
            .map(|(_, v)| *v)
    });
    raw.unwrap_or(DEFAULT_LABEL_SCORE).clamp(0.0, 1.0)
}

impl Restaurant {
    pub fn mood_score(&self, mood: &str) -> f64 {
        label_score(&self.mood_scores, mood)
    }

    pub fn occasion_score(&self, occasion: &str) -> f64 {
        label_score(&self.occasion_scores, occasion)
    }

    pub fn time_score(&self, time: &str) -> f64 {
        label_score(&self.time_scores, time)
    }

    pub fn has_dietary_option(&self, option: &str) -> bool {
        self.dietary_options
            .iter()
            .any(|o| o.eq_ignore_ascii_case(option))
    }

    /// Text fed to the content feature index.
    pub fn feature_text(&self) -> String {
        [
            self.cuisine.as_str(),
            self.ambiance.as_str(),
            self.popular_dishes.join(" ").as_str(),
            self.dietary_options.join(" ").as_str(),
            self.price_range.as_str(),
        ]
        .join(" ")
    }

    /// Lower-cased text fed to the search index and keyword matcher.
    pub fn searchable_text(&self) -> String {
        [
            self.restaurant_name.as_str(),
            self.cuisine.as_str(),
            self.location.as_str(),
            self.address.as_str(),
            self.ambiance.as_str(),
            self.popular_dishes.join(" ").as_str(),
            self.dietary_options.join(" ").as_str(),
            self.price_range.as_str(),
        ]
        .join(" ")
        .to_lowercase()
    }
}

/// A restaurant paired with one source's score.
#[derive(Debug, Clone)]
pub struct ScoredRestaurant {
    pub restaurant: Restaurant,
    pub score: f64,
}

/// Sort by score descending, keeping input order on ties, then keep the top `limit`.
pub fn rank_descending(scored: &mut Vec<ScoredRestaurant>, limit: usize) {
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);
}

/// On-disk shape of the base catalog and of the fetched-restaurant store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub restaurants: Vec<Restaurant>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Load the base catalog. Absence or corruption is fatal.
pub async fn load(store: &dyn DocumentStore) -> Result<Vec<Restaurant>, MunchiesError> {
    let doc: CatalogDocument = store::load_required(store, StoreKey::Catalog).await?;
    tracing::info!(restaurants = doc.restaurants.len(), "Loaded base catalog");
    Ok(doc.restaurants)
}

/// TF-IDF feature vectors over the restaurant set, keyed by restaurant id.
///
/// Must be rebuilt whenever the restaurant set changes.
#[derive(Debug, Clone)]
pub struct FeatureIndex {
    vectorizer: TfidfVectorizer,
    vectors: Vec<SparseVector>,
    positions: HashMap<i64, usize>,
}

impl FeatureIndex {
    pub fn build(restaurants: &[Restaurant]) -> Self {
        let texts: Vec<String> = restaurants.iter().map(Restaurant::feature_text).collect();
        let mut vectorizer = TfidfVectorizer::new().with_max_features(FEATURE_MAX_TERMS);
        let vectors = vectorizer.fit_transform(&texts);

        // First occurrence wins if ids collide
        let mut positions = HashMap::with_capacity(restaurants.len());
        for (i, r) in restaurants.iter().enumerate() {
            positions.entry(r.id).or_insert(i);
        }

        tracing::debug!(
            restaurants = restaurants.len(),
            terms = vectorizer.vocabulary_size(),
            "Built content feature index"
        );

        FeatureIndex {
            vectorizer,
            vectors,
            positions,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Vectorize free text against the catalog vocabulary.
    pub fn vectorize(&self, text: &str) -> SparseVector {
        self.vectorizer.transform(text)
    }

    /// Cosine similarity between `query` and a restaurant's feature vector, floored at 0.
    ///
    /// Returns 0.5 when the index is empty or the restaurant is not indexed.
    pub fn similarity(&self, query: &SparseVector, restaurant_id: i64) -> f64 {
        if self.vectors.is_empty() {
            return DEFAULT_LABEL_SCORE;
        }
        match self.positions.get(&restaurant_id) {
            Some(&pos) => cosine_similarity(query, &self.vectors[pos]).max(0.0),
            None => DEFAULT_LABEL_SCORE,
        }
    }
}
