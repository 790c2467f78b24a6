/// Fetch, deduplicate and persist AI-sourced restaurants.
///
/// The provider call runs without holding any lock. Deduplication, id
/// assignment and the write to the fetched store happen under one mutex, so two
/// concurrent enrichments never hand out the same id or lose each other's records.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use super::{build_enrichment_prompt, enhance_query, is_duplicate, parse_candidates, CompletionProvider, EnrichmentError};
use crate::catalog::{CatalogDocument, Restaurant};
use crate::preferences::Preferences;
use crate::store::{self, DocumentStore, StoreKey};

/// First id handed out when no restaurant exists at all.
pub const FIRST_FETCHED_ID: i64 = 1000;
pub const FETCHED_SOURCE: &str = "ai_fetched";

/// Outcome of `search_fetched`.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentResult {
    pub restaurants: Vec<Restaurant>,
    /// True when this call persisted at least one new record
    pub fetched_new: bool,
}

pub struct EnrichmentGateway {
    provider: Option<Arc<dyn CompletionProvider>>,
    store: Arc<dyn DocumentStore>,
    base: Arc<Vec<Restaurant>>,
    fetched: Mutex<CatalogDocument>,
    timeout: Duration,
    max_results: usize,
}

impl EnrichmentGateway {
    /// Load previously fetched records (empty if absent or corrupt).
    pub async fn load(
        store: Arc<dyn DocumentStore>,
        base: Arc<Vec<Restaurant>>,
        provider: Option<Arc<dyn CompletionProvider>>,
        timeout: Duration,
        max_results: usize,
    ) -> Self {
        let fetched: CatalogDocument = store::load_or_default(store.as_ref(), StoreKey::Fetched).await;
        tracing::info!(
            fetched = fetched.restaurants.len(),
            provider = provider.as_ref().map(|p| p.provider_name()).unwrap_or("none"),
            "Enrichment gateway ready"
        );
        EnrichmentGateway {
            provider,
            store,
            base,
            fetched: Mutex::new(fetched),
            timeout,
            max_results,
        }
    }

    pub fn provider(&self) -> Option<&Arc<dyn CompletionProvider>> {
        self.provider.as_ref()
    }

    /// All records fetched so far, in insertion order.
    pub async fn fetched_restaurants(&self) -> Vec<Restaurant> {
        self.fetched.lock().await.restaurants.clone()
    }

    pub async fn fetched_count(&self) -> usize {
        self.fetched.lock().await.restaurants.len()
    }

    /// Ask the provider for candidates; errors and timeouts are reported, not raised.
    async fn request_candidates(
        &self,
        provider: &dyn CompletionProvider,
        prompt: &str,
    ) -> Result<Vec<Restaurant>, EnrichmentError> {
        let raw = tokio::time::timeout(self.timeout, provider.complete(prompt))
            .await
            .map_err(|_| EnrichmentError::Timeout(self.timeout.as_secs()))??;
        parse_candidates(&raw)
    }

    /// Fetch up to `max_results` new restaurants for `query` and persist the non-duplicates.
    ///
    /// Any provider failure yields an empty list.
    pub async fn fetch(
        &self,
        query: &str,
        location: Option<&str>,
        max_results: usize,
        prefs: Option<&Preferences>,
    ) -> Vec<Restaurant> {
        let Some(provider) = self.provider.as_ref() else {
            tracing::debug!("No enrichment provider configured");
            return Vec::new();
        };

        let enhanced = enhance_query(query, prefs);
        let prompt = build_enrichment_prompt(&enhanced, location, max_results);
        tracing::info!(
            query = %query,
            provider = provider.provider_name(),
            model = provider.model_name(),
            "Fetching restaurants from AI provider"
        );

        let candidates = match self.request_candidates(provider.as_ref(), &prompt).await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!(
                    query = %query,
                    provider = provider.provider_name(),
                    error = %e,
                    "AI enrichment failed, continuing without candidates"
                );
                return Vec::new();
            }
        };
        if candidates.is_empty() {
            return Vec::new();
        }

        let provenance = prefs.and_then(|p| serde_json::to_value(p).ok());
        let received = candidates.len();

        let mut fetched = self.fetched.lock().await;
        let mut next_id = self
            .base
            .iter()
            .chain(fetched.restaurants.iter())
            .map(|r| r.id)
            .max()
            .map_or(FIRST_FETCHED_ID, |max| max + 1);

        let mut accepted: Vec<Restaurant> = Vec::new();
        for mut candidate in candidates {
            let existing = self.base.iter().chain(fetched.restaurants.iter()).chain(accepted.iter());
            if is_duplicate(&candidate, existing) {
                tracing::info!(name = %candidate.restaurant_name, "Skipping duplicate restaurant");
                continue;
            }
            candidate.id = next_id;
            candidate.source = Some(FETCHED_SOURCE.to_string());
            candidate.query = Some(query.to_string());
            candidate.location_hint = location.map(str::to_string);
            candidate.user_preferences = provenance.clone();
            next_id += 1;
            accepted.push(candidate);
        }

        if accepted.is_empty() {
            return accepted;
        }

        fetched.restaurants.extend(accepted.iter().cloned());
        if let Err(e) = store::save(self.store.as_ref(), StoreKey::Fetched, &*fetched).await {
            let keep = fetched.restaurants.len() - accepted.len();
            fetched.restaurants.truncate(keep);
            tracing::error!(error = %e, "Failed to persist fetched restaurants");
            return Vec::new();
        }

        tracing::info!(
            stored = accepted.len(),
            skipped = received - accepted.len(),
            "Stored new AI-fetched restaurants"
        );
        accepted
    }

    /// Match `query` against previously fetched records, fetching new ones when nothing matches.
    ///
    /// A record matches when the whole query, or any query word longer than two
    /// characters, occurs in its name, cuisine, location or ambiance.
    pub async fn search_fetched(
        &self,
        query: &str,
        location: Option<&str>,
        prefs: Option<&Preferences>,
        fetch_if_not_found: bool,
    ) -> EnrichmentResult {
        let query_lower = query.to_lowercase();
        let words: Vec<&str> = query_lower
            .split_whitespace()
            .filter(|w| w.chars().count() > 2)
            .collect();

        let matches: Vec<Restaurant> = {
            let fetched = self.fetched.lock().await;
            fetched
                .restaurants
                .iter()
                .filter(|r| {
                    let text = [
                        r.restaurant_name.as_str(),
                        r.cuisine.as_str(),
                        r.location.as_str(),
                        r.ambiance.as_str(),
                    ]
                    .join(" ")
                    .to_lowercase();
                    text.contains(&query_lower) || words.iter().any(|w| text.contains(w))
                })
                .cloned()
                .collect()
        };

        if !matches.is_empty() || !fetch_if_not_found || self.provider.is_none() {
            return EnrichmentResult {
                restaurants: matches,
                fetched_new: false,
            };
        }

        tracing::debug!(query = %query, "No fetched matches, asking AI provider");
        let fresh = self.fetch(query, location, self.max_results, prefs).await;
        EnrichmentResult {
            fetched_new: !fresh.is_empty(),
            restaurants: fresh,
        }
    }
}
