/// User-based collaborative filtering
///
/// State is the append-only interaction log plus a user×user cosine similarity
/// matrix derived from it. The matrix is rebuilt in full after every appended
/// interaction: O(U²·R) for U users and R restaurants. That is a known scaling
/// ceiling for this engine, not something patched over with incremental updates.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::{Restaurant, ScoredRestaurant};
use crate::errors::MunchiesError;
use crate::store::{self, DocumentStore, StoreKey};

pub const RATING_MAX: f64 = 5.0;
pub const W_RATING: f64 = 2.0;
pub const W_CLICKED: f64 = 1.0;
pub const W_VIEWED: f64 = 0.5;

/// Neighbours consulted when recommending.
pub const NEIGHBOURHOOD_SIZE: usize = 10;
pub const COLLAB_TOP_K: usize = 9;
pub const SIMILAR_USERS_TOP_K: usize = 5;

fn is_false(b: &bool) -> bool {
    !*b
}

/// One recorded user/restaurant event. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub user_id: String,
    pub restaurant_id: i64,
    /// RFC 3339
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub clicked: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub viewed: bool,
}

impl Interaction {
    /// Strength of the signal: rating dominates clicks and views.
    pub fn strength(&self) -> f64 {
        let mut score = W_RATING * self.rating.unwrap_or(0.0);
        if self.clicked {
            score += W_CLICKED;
        }
        if self.viewed {
            score += W_VIEWED;
        }
        score
    }
}

/// On-disk interaction log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InteractionLog {
    #[serde(default)]
    pub users: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub interactions: Vec<Interaction>,
}

/// Input to `add_interaction`.
#[derive(Debug, Clone, Default)]
pub struct NewInteraction {
    pub user_id: String,
    pub restaurant_id: i64,
    pub rating: Option<f64>,
    pub clicked: bool,
    pub viewed: bool,
}

/// user → (other user → cosine similarity). Symmetric, no diagonal.
pub type SimilarityMatrix = BTreeMap<String, BTreeMap<String, f64>>;

/// Per-user interaction strengths; a later event for the same pair replaces the earlier one.
fn user_vectors(log: &InteractionLog) -> BTreeMap<String, BTreeMap<i64, f64>> {
    let mut vectors: BTreeMap<String, BTreeMap<i64, f64>> = BTreeMap::new();
    for interaction in &log.interactions {
        if interaction.user_id.is_empty() {
            continue;
        }
        vectors
            .entry(interaction.user_id.clone())
            .or_default()
            .insert(interaction.restaurant_id, interaction.strength());
    }
    vectors
}

fn cosine(a: &BTreeMap<i64, f64>, b: &BTreeMap<i64, f64>) -> f64 {
    let dot: f64 = a
        .iter()
        .filter_map(|(rid, x)| b.get(rid).map(|y| x * y))
        .sum();
    let norm_a = a.values().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.values().map(|y| y * y).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Full rebuild of the user similarity matrix. Empty unless at least two users have interactions.
pub fn build_similarity_matrix(log: &InteractionLog) -> SimilarityMatrix {
    let vectors = user_vectors(log);
    let mut matrix = SimilarityMatrix::new();
    if vectors.len() < 2 {
        return matrix;
    }

    let users: Vec<(&String, &BTreeMap<i64, f64>)> = vectors.iter().collect();
    for (i, (user_i, vec_i)) in users.iter().enumerate() {
        for (user_j, vec_j) in users.iter().skip(i + 1) {
            let sim = cosine(vec_i, vec_j);
            matrix
                .entry((*user_i).clone())
                .or_default()
                .insert((*user_j).clone(), sim);
            matrix
                .entry((*user_j).clone())
                .or_default()
                .insert((*user_i).clone(), sim);
        }
    }
    matrix
}

/// Interaction log plus derived similarity matrix.
pub struct CollaborativeFilter {
    store: Arc<dyn DocumentStore>,
    log: InteractionLog,
    similarity: SimilarityMatrix,
}

impl CollaborativeFilter {
    /// Load the interaction log (empty if absent or corrupt) and build the matrix.
    pub async fn load(store: Arc<dyn DocumentStore>) -> Self {
        let log: InteractionLog = store::load_or_default(store.as_ref(), StoreKey::Interactions).await;
        Self::from_log(store, log)
    }

    pub fn from_log(store: Arc<dyn DocumentStore>, log: InteractionLog) -> Self {
        let similarity = build_similarity_matrix(&log);
        tracing::info!(
            interactions = log.interactions.len(),
            users = similarity.len(),
            "Collaborative filter ready"
        );
        CollaborativeFilter {
            store,
            log,
            similarity,
        }
    }

    pub fn interaction_count(&self) -> usize {
        self.log.interactions.len()
    }

    /// Users present in the similarity matrix.
    pub fn user_count(&self) -> usize {
        self.similarity.len()
    }

    pub fn similarity(&self, a: &str, b: &str) -> Option<f64> {
        self.similarity.get(a).and_then(|row| row.get(b)).copied()
    }

    pub fn matrix(&self) -> &SimilarityMatrix {
        &self.similarity
    }

    /// Append an interaction, persist the log, and rebuild the matrix.
    ///
    /// The rating is clamped to [0, 5]. Unknown restaurant ids are accepted.
    /// Callers serialize writers; the log is restored if persisting fails.
    pub async fn add_interaction(&mut self, input: NewInteraction) -> Result<Interaction, MunchiesError> {
        if input.user_id.trim().is_empty() {
            return Err(MunchiesError::validation("userId", "User id cannot be empty"));
        }
        if let Some(rating) = input.rating {
            if !rating.is_finite() {
                return Err(MunchiesError::validation("rating", "Rating must be a finite number"));
            }
        }

        let interaction = Interaction {
            user_id: input.user_id,
            restaurant_id: input.restaurant_id,
            timestamp: chrono::Utc::now().to_rfc3339(),
            rating: input.rating.map(|r| r.clamp(0.0, RATING_MAX)),
            clicked: input.clicked,
            viewed: input.viewed,
        };

        self.log.interactions.push(interaction.clone());
        if let Err(e) = store::save(self.store.as_ref(), StoreKey::Interactions, &self.log).await {
            self.log.interactions.pop();
            tracing::error!(error = %e, user_id = %interaction.user_id, "Failed to persist interaction");
            return Err(e);
        }

        self.similarity = build_similarity_matrix(&self.log);
        tracing::info!(
            user_id = %interaction.user_id,
            restaurant_id = interaction.restaurant_id,
            interactions = self.log.interactions.len(),
            users = self.similarity.len(),
            "Interaction recorded"
        );
        Ok(interaction)
    }

    /// Most similar users, best first; ties by user id. Empty for unknown users.
    pub fn get_similar_users(&self, user_id: &str, top_k: usize) -> Vec<(String, f64)> {
        let Some(row) = self.similarity.get(user_id) else {
            return Vec::new();
        };
        let mut neighbours: Vec<(String, f64)> = row.iter().map(|(u, s)| (u.clone(), *s)).collect();
        neighbours.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        neighbours.truncate(top_k);
        neighbours
    }

    /// Restaurants the user's neighbours interacted with, scored by summed similarity.
    ///
    /// Restaurants the user already touched and ids missing from `restaurants` are skipped.
    pub fn get_collaborative_recommendations(
        &self,
        user_id: &str,
        restaurants: &[Restaurant],
        top_k: usize,
    ) -> Vec<ScoredRestaurant> {
        let neighbours = self.get_similar_users(user_id, NEIGHBOURHOOD_SIZE);
        if neighbours.is_empty() {
            return Vec::new();
        }

        let mut touched: HashMap<&str, BTreeSet<i64>> = HashMap::new();
        for interaction in &self.log.interactions {
            if interaction.user_id.is_empty() {
                continue;
            }
            touched
                .entry(interaction.user_id.as_str())
                .or_default()
                .insert(interaction.restaurant_id);
        }

        // Accumulate in first-seen order so equal scores rank deterministically
        let mut order: Vec<i64> = Vec::new();
        let mut scores: HashMap<i64, f64> = HashMap::new();
        for (neighbour, similarity) in &neighbours {
            let Some(ids) = touched.get(neighbour.as_str()) else {
                continue;
            };
            for &rid in ids {
                let entry = scores.entry(rid).or_insert_with(|| {
                    order.push(rid);
                    0.0
                });
                *entry += similarity;
            }
        }

        let own = touched.get(user_id);
        let by_id: HashMap<i64, &Restaurant> = restaurants.iter().map(|r| (r.id, r)).collect();

        let mut scored: Vec<ScoredRestaurant> = order
            .into_iter()
            .filter(|rid| own.map_or(true, |ids| !ids.contains(rid)))
            .filter_map(|rid| {
                by_id.get(&rid).map(|r| ScoredRestaurant {
                    restaurant: (*r).clone(),
                    score: scores.get(&rid).copied().unwrap_or(0.0),
                })
            })
            .collect();

        crate::catalog::rank_descending(&mut scored, top_k);
        scored
    }
}
