/// Hybrid recommendation engine
///
/// Orchestrates the four score sources per request:
///   1. search: TF-IDF + keyword hits for the query, and query-extracted preference overrides
///   2. content: preference match over the current catalog snapshot
///   3. collaborative: neighbours' history for a known user
///   4. enrichment: AI-fetched candidates for the query, scored heuristically
///
/// The catalog (base + fetched restaurants with both indexes) is an immutable
/// snapshot behind an `RwLock<Arc<_>>`. Requests clone the `Arc`; a successful
/// enrichment publishes a fresh snapshot before the request returns.

pub mod combine;
pub mod format;

pub use combine::{combine, RankedRestaurant, ScoreBundle, SourceResults, SourceWeights, RESULT_LIMIT};
pub use format::{format_recommendations, RecommendationItem};

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::RwLock;

use crate::catalog::{self, FeatureIndex, Restaurant, ScoredRestaurant};
use crate::collaborative::{CollaborativeFilter, Interaction, NewInteraction, COLLAB_TOP_K};
use crate::content::ContentScorer;
use crate::enrichment::{CompletionProvider, EnrichmentGateway};
use crate::errors::MunchiesError;
use crate::preferences::{ExtractedPreferences, Preferences};
use crate::search::{match_query_to_preferences, SearchMatcher};
use crate::store::DocumentStore;

const AI_BASE_SCORE: f64 = 0.5;
const AI_CUISINE_BONUS: f64 = 0.2;
const AI_MOOD_BONUS: f64 = 0.2;
const AI_OCCASION_BONUS: f64 = 0.1;
const AI_LABEL_THRESHOLD: f64 = 0.7;

// ---------------------------------------------------------------------------
// Catalog snapshot
// ---------------------------------------------------------------------------

/// Restaurants plus the two indexes built over exactly that set.
#[derive(Debug)]
pub struct CatalogSnapshot {
    pub restaurants: Vec<Restaurant>,
    pub features: FeatureIndex,
    pub search: SearchMatcher,
}

impl CatalogSnapshot {
    pub fn build(restaurants: Vec<Restaurant>) -> Self {
        let features = FeatureIndex::build(&restaurants);
        let search = SearchMatcher::new(&restaurants);
        CatalogSnapshot {
            restaurants,
            features,
            search,
        }
    }

    fn merged(base: &[Restaurant], fetched: Vec<Restaurant>) -> Self {
        let mut restaurants = Vec::with_capacity(base.len() + fetched.len());
        restaurants.extend_from_slice(base);
        restaurants.extend(fetched);
        Self::build(restaurants)
    }
}

// ---------------------------------------------------------------------------
// Requests and results
// ---------------------------------------------------------------------------

/// One recommendation request.
#[derive(Debug, Clone)]
pub struct RecommendationRequest {
    pub preferences: Preferences,
    pub user_id: Option<String>,
    pub search_query: Option<String>,
    pub use_ai_fetch: bool,
}

impl RecommendationRequest {
    pub fn new(preferences: Preferences) -> Self {
        RecommendationRequest {
            preferences,
            user_id: None,
            search_query: None,
            use_ai_fetch: true,
        }
    }
}

/// Ranked output of one request.
#[derive(Debug, Clone)]
pub struct Recommendation {
    pub ranked: Vec<RankedRestaurant>,
    /// Preferences after query overrides, as used for scoring
    pub preferences: Preferences,
    /// Present when the request carried a query
    pub extracted: Option<ExtractedPreferences>,
    /// Restaurants persisted by enrichment during this request
    pub fetched_new: usize,
}

/// Engine health figures.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub restaurants: usize,
    pub base_restaurants: usize,
    pub fetched_restaurants: usize,
    pub interactions: usize,
    pub users: usize,
    pub ai_provider: Option<String>,
    pub ai_model: Option<String>,
    pub uptime_secs: u64,
}

/// Heuristic match score for an AI-fetched candidate.
pub fn ai_match_score(restaurant: &Restaurant, prefs: &Preferences) -> f64 {
    let mut score = AI_BASE_SCORE;
    if prefs.cuisine.eq_ignore_ascii_case("any") || restaurant.cuisine.eq_ignore_ascii_case(&prefs.cuisine) {
        score += AI_CUISINE_BONUS;
    }
    if restaurant.mood_score(&prefs.mood) > AI_LABEL_THRESHOLD {
        score += AI_MOOD_BONUS;
    }
    if restaurant.occasion_score(&prefs.occasion) > AI_LABEL_THRESHOLD {
        score += AI_OCCASION_BONUS;
    }
    score.min(1.0)
}

// ---------------------------------------------------------------------------
// HybridRanker
// ---------------------------------------------------------------------------

pub struct HybridRanker {
    base: Arc<Vec<Restaurant>>,
    snapshot: RwLock<Arc<CatalogSnapshot>>,
    collaborative: RwLock<CollaborativeFilter>,
    enrichment: EnrichmentGateway,
    started: Instant,
}

impl HybridRanker {
    /// Load the base catalog (fatal if missing or corrupt), fetched records and
    /// the interaction log (both tolerant), and build the first snapshot.
    pub async fn load(
        store: Arc<dyn DocumentStore>,
        provider: Option<Arc<dyn CompletionProvider>>,
        timeout: Duration,
        max_results: usize,
    ) -> Result<Self, MunchiesError> {
        let base = Arc::new(catalog::load(store.as_ref()).await?);
        let enrichment = EnrichmentGateway::load(store.clone(), base.clone(), provider, timeout, max_results).await;
        let collaborative = CollaborativeFilter::load(store).await;

        let snapshot = CatalogSnapshot::merged(&base, enrichment.fetched_restaurants().await);
        tracing::info!(
            restaurants = snapshot.restaurants.len(),
            base = base.len(),
            interactions = collaborative.interaction_count(),
            "Recommendation engine ready"
        );

        Ok(HybridRanker {
            base,
            snapshot: RwLock::new(Arc::new(snapshot)),
            collaborative: RwLock::new(collaborative),
            enrichment,
            started: Instant::now(),
        })
    }

    /// Current catalog snapshot.
    pub async fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.snapshot.read().await.clone()
    }

    /// Rebuild the snapshot from base + every fetched record and publish it.
    ///
    /// The write lock is held across reading the fetched records, rebuilding
    /// and publishing, so concurrent refreshes publish in order and the last
    /// one always covers every record persisted before it started.
    pub async fn refresh_catalog(&self) -> Arc<CatalogSnapshot> {
        let mut current = self.snapshot.write().await;
        let fetched = self.enrichment.fetched_restaurants().await;
        let fresh = Arc::new(CatalogSnapshot::merged(&self.base, fetched));
        *current = fresh.clone();
        drop(current);
        tracing::info!(restaurants = fresh.restaurants.len(), "Catalog indexes rebuilt");
        fresh
    }

    /// Rank restaurants for a request.
    pub async fn recommend(&self, request: &RecommendationRequest) -> Recommendation {
        let snapshot = self.snapshot().await;
        let query = request
            .search_query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty());
        let user_id = request
            .user_id
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty());

        let mut sources = SourceResults::default();
        let mut prefs = request.preferences.clone();
        let mut extracted = None;

        if let Some(q) = query {
            sources.search = snapshot.search.search(q);
            let guess = match_query_to_preferences(q, None, None, None);
            prefs = prefs.with_overrides(&guess);
            extracted = Some(guess);
        }

        sources.content = ContentScorer::new(&snapshot.restaurants, &snapshot.features).score(&prefs);

        if let Some(user) = user_id {
            let cf = self.collaborative.read().await;
            sources.collaborative = cf.get_collaborative_recommendations(user, &snapshot.restaurants, COLLAB_TOP_K);
        }

        let mut fetched_new = 0;
        if let Some(q) = query.filter(|_| request.use_ai_fetch) {
            let result = self
                .enrichment
                .search_fetched(q, prefs.location.as_deref(), Some(&prefs), true)
                .await;
            if result.fetched_new {
                fetched_new = result.restaurants.len();
                self.refresh_catalog().await;
            }
            sources.ai = result
                .restaurants
                .into_iter()
                .map(|r| ScoredRestaurant {
                    score: ai_match_score(&r, &prefs),
                    restaurant: r,
                })
                .collect();
        }

        let ranked = combine(&sources, RESULT_LIMIT);
        tracing::info!(
            query = query.unwrap_or(""),
            user_id = user_id.unwrap_or(""),
            content = sources.content.len(),
            collaborative = sources.collaborative.len(),
            search = sources.search.len(),
            ai = sources.ai.len(),
            returned = ranked.len(),
            "Recommendation complete"
        );

        Recommendation {
            ranked,
            preferences: prefs,
            extracted,
            fetched_new,
        }
    }

    /// Free-text search: preferences come from the query alone, enrichment enabled.
    pub async fn search(&self, query: &str, location: Option<String>, user_id: Option<String>) -> Result<Recommendation, MunchiesError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(MunchiesError::validation("query", "Search query cannot be empty"));
        }
        let extracted = match_query_to_preferences(query, None, None, None);
        let request = RecommendationRequest {
            preferences: Preferences::from_extracted(&extracted, location),
            user_id,
            search_query: Some(query.to_string()),
            use_ai_fetch: true,
        };
        Ok(self.recommend(&request).await)
    }

    /// Record an interaction. Writers are serialized by the filter's write lock.
    pub async fn track_interaction(&self, input: NewInteraction) -> Result<Interaction, MunchiesError> {
        self.collaborative.write().await.add_interaction(input).await
    }

    /// Neighbours of `user_id`, best first.
    pub async fn similar_users(&self, user_id: &str, top_k: usize) -> Vec<(String, f64)> {
        self.collaborative.read().await.get_similar_users(user_id, top_k)
    }

    pub async fn status(&self) -> EngineStatus {
        let restaurants = self.snapshot().await.restaurants.len();
        let (interactions, users) = {
            let cf = self.collaborative.read().await;
            (cf.interaction_count(), cf.user_count())
        };
        let provider = self.enrichment.provider();
        EngineStatus {
            restaurants,
            base_restaurants: self.base.len(),
            fetched_restaurants: self.enrichment.fetched_count().await,
            interactions,
            users,
            ai_provider: provider.map(|p| p.provider_name().to_string()),
            ai_model: provider.map(|p| p.model_name().to_string()),
            uptime_secs: self.started.elapsed().as_secs(),
        }
    }
}
