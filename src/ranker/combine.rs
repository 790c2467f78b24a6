/// Weighted blending of the four score sources
///
/// Each source's raw score is first mapped into [0, 1]:
///   content:       as-is, capped at 1
///   collaborative: divided by 5, capped at 1
///   search:        multiplied by 1.2, capped at 1
///   ai:            multiplied by 1.1, capped at 1
///
/// Per restaurant, the weight of any source that scored exactly zero moves onto
/// content, then the weights are renormalized to sum to 1.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::catalog::{Restaurant, ScoredRestaurant};
use crate::search::SearchHit;

/// Results returned per recommendation request.
pub const RESULT_LIMIT: usize = 9;

const COLLAB_SCALE: f64 = 5.0;
const SEARCH_BOOST: f64 = 1.2;
const AI_BOOST: f64 = 1.1;

/// Per-source blend weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceWeights {
    pub content: f64,
    pub collaborative: f64,
    pub search: f64,
    pub ai: f64,
}

impl SourceWeights {
    /// Weights for requests with neither search hits nor AI candidates.
    pub const DEFAULT: SourceWeights = SourceWeights {
        content: 0.4,
        collaborative: 0.3,
        search: 0.2,
        ai: 0.1,
    };

    /// Configured weights for a request.
    ///
    /// Query-driven requests (search hits or AI candidates present) trust those
    /// sources more; a query-mode source that produced nothing gets no weight.
    pub fn for_sources(has_search: bool, has_ai: bool) -> SourceWeights {
        if has_search || has_ai {
            SourceWeights {
                content: 0.3,
                collaborative: 0.2,
                search: if has_search { 0.3 } else { 0.0 },
                ai: if has_ai { 0.2 } else { 0.0 },
            }
        } else {
            SourceWeights::DEFAULT
        }
    }

    pub fn sum(&self) -> f64 {
        self.content + self.collaborative + self.search + self.ai
    }

    /// Weights actually applied to one restaurant's normalized scores.
    pub fn effective(&self, scores: &ScoreBundle) -> SourceWeights {
        let mut w = *self;
        if scores.collaborative == 0.0 {
            w.content += w.collaborative;
            w.collaborative = 0.0;
        }
        if scores.search == 0.0 {
            w.content += w.search;
            w.search = 0.0;
        }
        if scores.ai == 0.0 {
            w.content += w.ai;
            w.ai = 0.0;
        }
        let total = w.sum();
        if total > 0.0 {
            w.content /= total;
            w.collaborative /= total;
            w.search /= total;
            w.ai /= total;
        }
        w
    }
}

/// Four normalized sub-scores for one restaurant; 0.0 means "source did not score it".
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreBundle {
    pub content: f64,
    pub collaborative: f64,
    pub search: f64,
    pub ai: f64,
}

impl ScoreBundle {
    pub fn weighted(&self, w: &SourceWeights) -> f64 {
        self.content * w.content
            + self.collaborative * w.collaborative
            + self.search * w.search
            + self.ai * w.ai
    }
}

pub fn normalize_content(raw: f64) -> f64 {
    raw.clamp(0.0, 1.0)
}

pub fn normalize_collaborative(raw: f64) -> f64 {
    if raw > 0.0 {
        (raw / COLLAB_SCALE).min(1.0)
    } else {
        0.0
    }
}

pub fn normalize_search(raw: f64) -> f64 {
    (raw * SEARCH_BOOST).clamp(0.0, 1.0)
}

pub fn normalize_ai(raw: f64) -> f64 {
    (raw * AI_BOOST).clamp(0.0, 1.0)
}

/// A restaurant in the final ranking with its explanation.
#[derive(Debug, Clone)]
pub struct RankedRestaurant {
    pub restaurant: Restaurant,
    pub score: f64,
    pub scores: ScoreBundle,
    pub weights: SourceWeights,
}

/// Per-source result sets feeding one ranking.
#[derive(Debug, Clone, Default)]
pub struct SourceResults {
    pub content: Vec<ScoredRestaurant>,
    pub collaborative: Vec<ScoredRestaurant>,
    pub search: Vec<SearchHit>,
    pub ai: Vec<ScoredRestaurant>,
}

/// Restaurants keyed by id in first-appearance order. Later sources overwrite
/// the stored record.
#[derive(Default)]
struct Merged {
    order: Vec<i64>,
    entries: HashMap<i64, (Restaurant, ScoreBundle)>,
}

impl Merged {
    fn slot(&mut self, restaurant: &Restaurant) -> &mut ScoreBundle {
        match self.entries.entry(restaurant.id) {
            Entry::Occupied(occupied) => {
                let (stored, scores) = occupied.into_mut();
                stored.clone_from(restaurant);
                scores
            }
            Entry::Vacant(vacant) => {
                self.order.push(restaurant.id);
                &mut vacant.insert((restaurant.clone(), ScoreBundle::default())).1
            }
        }
    }
}

/// Blend all sources into one list, best first (stable on ties), top `limit`.
pub fn combine(sources: &SourceResults, limit: usize) -> Vec<RankedRestaurant> {
    let configured = SourceWeights::for_sources(!sources.search.is_empty(), !sources.ai.is_empty());

    let mut merged = Merged::default();
    for item in &sources.content {
        merged.slot(&item.restaurant).content = normalize_content(item.score);
    }
    for item in &sources.collaborative {
        merged.slot(&item.restaurant).collaborative = normalize_collaborative(item.score);
    }
    for hit in &sources.search {
        merged.slot(&hit.restaurant).search = normalize_search(hit.combined_score);
    }
    for item in &sources.ai {
        merged.slot(&item.restaurant).ai = normalize_ai(item.score);
    }

    let Merged { order, mut entries } = merged;
    let mut ranked: Vec<RankedRestaurant> = order
        .into_iter()
        .filter_map(|id| entries.remove(&id))
        .map(|(restaurant, scores)| {
            let weights = configured.effective(&scores);
            RankedRestaurant {
                score: scores.weighted(&weights),
                restaurant,
                scores,
                weights,
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(id: i64, score: f64) -> ScoredRestaurant {
        ScoredRestaurant {
            restaurant: Restaurant {
                id,
                restaurant_name: format!("R{}", id),
                ..Restaurant::default()
            },
            score,
        }
    }

    fn hit(id: i64, combined: f64) -> SearchHit {
        SearchHit {
            restaurant: scored(id, 0.0).restaurant,
            combined_score: combined,
            semantic_score: combined,
            keyword_score: 0.0,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_weight_modes() {
        assert_eq!(SourceWeights::for_sources(false, false), SourceWeights::DEFAULT);
        let query = SourceWeights::for_sources(true, false);
        assert_eq!(query.search, 0.3);
        assert_eq!(query.ai, 0.0);
        let both = SourceWeights::for_sources(true, true);
        assert!(approx(both.sum(), 1.0));
    }

    #[test]
    fn test_normalization() {
        assert_eq!(normalize_content(1.4), 1.0);
        assert_eq!(normalize_collaborative(2.5), 0.5);
        assert_eq!(normalize_collaborative(-1.0), 0.0);
        assert!(approx(normalize_search(0.5), 0.6));
        assert_eq!(normalize_search(0.9), 1.0);
        assert!(approx(normalize_ai(0.5), 0.55));
    }

    #[test]
    fn test_zero_sources_fold_into_content() {
        let sources = SourceResults {
            content: vec![scored(1, 0.8), scored(2, 0.6)],
            search: vec![hit(2, 0.5)],
            ..SourceResults::default()
        };
        let ranked = combine(&sources, RESULT_LIMIT);
        assert_eq!(ranked.len(), 2);

        for r in &ranked {
            assert!(approx(r.weights.sum(), 1.0));
            assert_eq!(r.weights.collaborative, 0.0);
            assert_eq!(r.weights.ai, 0.0);
            assert_eq!(r.scores.collaborative, 0.0);
            assert_eq!(r.scores.ai, 0.0);
        }

        // Restaurant 2: configured .3/.2/.3/0 with collab folded -> content .5, search .3
        let r2 = ranked.iter().find(|r| r.restaurant.id == 2).unwrap();
        assert!(approx(r2.weights.content, 0.5 / 0.8));
        assert!(approx(r2.weights.search, 0.3 / 0.8));
        assert!(approx(r2.score, 0.6 * 0.625 + 0.6 * 0.375));

        // Restaurant 1 has no search score: everything folds into content
        let r1 = ranked.iter().find(|r| r.restaurant.id == 1).unwrap();
        assert!(approx(r1.weights.content, 1.0));
        assert!(approx(r1.score, 0.8));
    }

    #[test]
    fn test_collaborative_only_restaurant_is_ranked() {
        let sources = SourceResults {
            content: vec![scored(1, 0.5)],
            collaborative: vec![scored(2, 5.0)],
            ..SourceResults::default()
        };
        let ranked = combine(&sources, RESULT_LIMIT);
        // Restaurant 2: content 0, collab 1.0, weights content .7 collab .3
        let r2 = ranked.iter().find(|r| r.restaurant.id == 2).unwrap();
        assert!(approx(r2.score, 0.3));
        assert_eq!(ranked[0].restaurant.id, 1);
    }

    #[test]
    fn test_ties_keep_first_appearance_and_limit() {
        let content: Vec<ScoredRestaurant> = (1..=12).map(|id| scored(id, 0.5)).collect();
        let sources = SourceResults {
            content,
            ..SourceResults::default()
        };
        let ranked = combine(&sources, RESULT_LIMIT);
        let ids: Vec<i64> = ranked.iter().map(|r| r.restaurant.id).collect();
        assert_eq!(ids, (1..=9).collect::<Vec<i64>>());
    }

    #[test]
    fn test_later_source_record_replaces_earlier() {
        let mut fetched = scored(1, 0.9);
        fetched.restaurant.restaurant_name = "Renamed".to_string();
        let sources = SourceResults {
            content: vec![scored(1, 0.5), scored(2, 0.4)],
            ai: vec![fetched],
            ..SourceResults::default()
        };
        let ranked = combine(&sources, RESULT_LIMIT);
        assert_eq!(ranked.len(), 2);
        let r1 = ranked.iter().find(|r| r.restaurant.id == 1).unwrap();
        assert_eq!(r1.restaurant.restaurant_name, "Renamed");
        assert_eq!(r1.scores.content, 0.5);
        assert!(approx(r1.scores.ai, 0.99));
    }

    #[test]
    fn test_combine_is_deterministic() {
        let sources = SourceResults {
            content: vec![scored(1, 0.7), scored(2, 0.7), scored(3, 0.2)],
            collaborative: vec![scored(3, 1.5)],
            search: vec![hit(2, 0.4), hit(4, 0.3)],
            ai: vec![scored(5, 0.9)],
        };
        let a: Vec<(i64, f64)> = combine(&sources, RESULT_LIMIT).iter().map(|r| (r.restaurant.id, r.score)).collect();
        let b: Vec<(i64, f64)> = combine(&sources, RESULT_LIMIT).iter().map(|r| (r.restaurant.id, r.score)).collect();
        assert_eq!(a, b);
    }
}
