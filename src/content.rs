/// Content-based scoring of restaurants against explicit preferences
///
/// The content score is a fixed-weight sum of six sub-scores, each in [0, 1]:
///   1. Mood (0.30): restaurant's mood score for the requested mood
///   2. Occasion (0.30): restaurant's occasion score
///   3. Time (0.10): restaurant's time-of-day score
///   4. Cuisine (0.10): 1.0 on match or "any", otherwise 0.3
///   5. Similarity (0.10): TF-IDF cosine between the preference text and the restaurant features
///   6. Notes (0.10): share of free-text intents the restaurant satisfies
///
/// Restaurants that fail the dietary gate are dropped before scoring.

use crate::catalog::{rank_descending, FeatureIndex, Restaurant, ScoredRestaurant};
use crate::preferences::Preferences;

pub const W_MOOD: f64 = 0.30;
pub const W_OCCASION: f64 = 0.30;
pub const W_TIME: f64 = 0.10;
pub const W_CUISINE: f64 = 0.10;
pub const W_SIMILARITY: f64 = 0.10;
pub const W_NOTES: f64 = 0.10;

/// Results returned per content request.
pub const CONTENT_TOP_K: usize = 9;

const CUISINE_MISMATCH_SCORE: f64 = 0.3;
const SPICY_CUISINES: &[&str] = &["indian", "mexican", "thai", "chinese"];

// ---------------------------------------------------------------------------
// Free-text note intents
// ---------------------------------------------------------------------------

/// Intent flags recognised in free-text notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteIntent {
    Spicy,
    Quiet,
    Romantic,
    FamilyFriendly,
    Healthy,
    Fast,
    Affordable,
    Upscale,
}

/// Substring keywords that switch each intent on.
pub const NOTE_RULES: &[(NoteIntent, &[&str])] = &[
    (NoteIntent::Spicy, &["spicy", "hot", "heat", "fiery"]),
    (NoteIntent::Quiet, &["quiet", "peaceful", "calm", "serene"]),
    (NoteIntent::Romantic, &["romantic", "date", "intimate", "cozy"]),
    (NoteIntent::FamilyFriendly, &["family", "kids", "children"]),
    (NoteIntent::Healthy, &["healthy", "fresh", "light", "nutritious"]),
    (NoteIntent::Fast, &["fast", "quick", "quickly", "hurry"]),
    (NoteIntent::Affordable, &["cheap", "affordable", "budget", "inexpensive"]),
    (NoteIntent::Upscale, &["fancy", "upscale", "elegant", "fine dining"]),
];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

impl NoteIntent {
    /// Whether the restaurant satisfies this intent, or `None` when no attribute
    /// heuristic exists for it.
    pub fn satisfied_by(self, restaurant: &Restaurant) -> Option<bool> {
        let ambiance = restaurant.ambiance.to_lowercase();
        let price = restaurant.price_range.to_lowercase();
        match self {
            NoteIntent::Spicy => Some(SPICY_CUISINES.contains(&restaurant.cuisine.to_lowercase().as_str())),
            NoteIntent::Quiet => Some(contains_any(&ambiance, &["quiet", "peaceful", "serene", "calm"])),
            NoteIntent::Romantic => Some(contains_any(&ambiance, &["romantic", "intimate", "cozy", "elegant"])),
            NoteIntent::FamilyFriendly => Some(contains_any(&ambiance, &["family", "casual", "friendly"])),
            NoteIntent::Healthy => Some(contains_any(&ambiance, &["healthy", "fresh", "light"])),
            NoteIntent::Fast => None,
            NoteIntent::Affordable => Some(price == "affordable"),
            NoteIntent::Upscale => Some(price == "expensive" || price == "moderate"),
        }
    }
}

/// Active intents in rule-table order.
pub fn parse_notes(notes: Option<&str>) -> Vec<NoteIntent> {
    let Some(notes) = notes else {
        return Vec::new();
    };
    let lowered = notes.to_lowercase();
    NOTE_RULES
        .iter()
        .filter(|(_, keywords)| contains_any(&lowered, keywords))
        .map(|(intent, _)| *intent)
        .collect()
}

/// Matched share of the active intents that have a heuristic; 1.0 when none do.
pub fn notes_score(intents: &[NoteIntent], restaurant: &Restaurant) -> f64 {
    let checks: Vec<bool> = intents
        .iter()
        .filter_map(|intent| intent.satisfied_by(restaurant))
        .collect();
    if checks.is_empty() {
        return 1.0;
    }
    checks.iter().filter(|&&ok| ok).count() as f64 / checks.len() as f64
}

// ---------------------------------------------------------------------------
// Pure scoring functions
// ---------------------------------------------------------------------------

/// Dietary gate.
///
/// "non-vegetarian" is permissive: it passes unless the restaurant lists
/// "vegetarian" without also listing "non-vegetarian". Any other preference
/// must appear in the restaurant's dietary options.
pub fn dietary_compatible(restaurant: &Restaurant, preference: &str) -> bool {
    if preference.eq_ignore_ascii_case("non-vegetarian") {
        return restaurant.has_dietary_option("non-vegetarian")
            || !restaurant.has_dietary_option("vegetarian");
    }
    restaurant.has_dietary_option(preference)
}

pub fn cuisine_score(restaurant: &Restaurant, preferred: &str) -> f64 {
    if preferred.eq_ignore_ascii_case("any") || restaurant.cuisine.eq_ignore_ascii_case(preferred) {
        1.0
    } else {
        CUISINE_MISMATCH_SCORE
    }
}

/// Text vectorized against the feature index for content similarity.
pub fn preference_text(prefs: &Preferences) -> String {
    [
        prefs.cuisine.as_str(),
        prefs.dietary_preference.as_str(),
        prefs.mood.as_str(),
        prefs.occasion.as_str(),
    ]
    .join(" ")
}

/// Sub-scores behind one content score.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentBreakdown {
    pub mood: f64,
    pub occasion: f64,
    pub time: f64,
    pub cuisine: f64,
    pub similarity: f64,
    pub notes: f64,
}

impl ContentBreakdown {
    pub fn total(&self) -> f64 {
        W_MOOD * self.mood
            + W_OCCASION * self.occasion
            + W_TIME * self.time
            + W_CUISINE * self.cuisine
            + W_SIMILARITY * self.similarity
            + W_NOTES * self.notes
    }
}

// ---------------------------------------------------------------------------
// ContentScorer
// ---------------------------------------------------------------------------

/// Scores a restaurant set against one preference record.
pub struct ContentScorer<'a> {
    restaurants: &'a [Restaurant],
    features: &'a FeatureIndex,
}

impl<'a> ContentScorer<'a> {
    pub fn new(restaurants: &'a [Restaurant], features: &'a FeatureIndex) -> Self {
        ContentScorer { restaurants, features }
    }

    /// Breakdown for a single restaurant; `None` if it fails the dietary gate.
    pub fn breakdown(&self, restaurant: &Restaurant, prefs: &Preferences) -> Option<ContentBreakdown> {
        let query = self.features.vectorize(&preference_text(prefs));
        let intents = parse_notes(prefs.additional_notes.as_deref());
        self.breakdown_with(restaurant, prefs, &query, &intents)
    }

    fn breakdown_with(
        &self,
        restaurant: &Restaurant,
        prefs: &Preferences,
        query: &crate::text::SparseVector,
        intents: &[NoteIntent],
    ) -> Option<ContentBreakdown> {
        if !dietary_compatible(restaurant, &prefs.dietary_preference) {
            return None;
        }
        Some(ContentBreakdown {
            mood: restaurant.mood_score(&prefs.mood),
            occasion: restaurant.occasion_score(&prefs.occasion),
            time: restaurant.time_score(&prefs.time),
            cuisine: cuisine_score(restaurant, &prefs.cuisine),
            similarity: self.features.similarity(query, restaurant.id).min(1.0),
            notes: notes_score(intents, restaurant),
        })
    }

    /// Score every dietary-eligible restaurant, best first, top 9.
    pub fn score(&self, prefs: &Preferences) -> Vec<ScoredRestaurant> {
        let query = self.features.vectorize(&preference_text(prefs));
        let intents = parse_notes(prefs.additional_notes.as_deref());

        let mut scored: Vec<ScoredRestaurant> = self
            .restaurants
            .iter()
            .filter_map(|r| {
                self.breakdown_with(r, prefs, &query, &intents)
                    .map(|b| ScoredRestaurant {
                        restaurant: r.clone(),
                        score: b.total().clamp(0.0, 1.0),
                    })
            })
            .collect();

        let eligible = scored.len();
        rank_descending(&mut scored, CONTENT_TOP_K);
        tracing::debug!(
            candidates = self.restaurants.len(),
            eligible,
            returned = scored.len(),
            "Content scoring complete"
        );
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn prefs(mood: &str, occasion: &str, cuisine: &str, dietary: &str) -> Preferences {
        Preferences {
            mood: mood.to_string(),
            occasion: occasion.to_string(),
            cuisine: cuisine.to_string(),
            dietary_preference: dietary.to_string(),
            time: "dinner".to_string(),
            location: None,
            additional_notes: None,
        }
    }

    fn with_dietary(id: i64, options: &[&str]) -> Restaurant {
        Restaurant {
            id,
            restaurant_name: format!("R{}", id),
            cuisine: "italian".to_string(),
            dietary_options: options.iter().map(|s| s.to_string()).collect(),
            ..Restaurant::default()
        }
    }

    #[test]
    fn test_dietary_gate() {
        let veg_only = with_dietary(1, &["vegetarian"]);
        let non_veg = with_dietary(2, &["non-vegetarian"]);
        let unlisted = with_dietary(3, &[]);
        let both = with_dietary(4, &["Vegetarian", "Non-Vegetarian"]);

        assert!(!dietary_compatible(&veg_only, "non-vegetarian"));
        assert!(dietary_compatible(&non_veg, "non-vegetarian"));
        assert!(dietary_compatible(&unlisted, "non-vegetarian"));
        assert!(dietary_compatible(&both, "non-vegetarian"));

        assert!(dietary_compatible(&veg_only, "vegetarian"));
        assert!(dietary_compatible(&both, "VEGETARIAN"));
        assert!(!dietary_compatible(&non_veg, "vegan"));
    }

    #[test]
    fn test_gate_excludes_from_results() {
        let restaurants = vec![with_dietary(1, &["vegetarian"]), with_dietary(2, &["non-vegetarian"])];
        let index = FeatureIndex::build(&restaurants);
        let scorer = ContentScorer::new(&restaurants, &index);
        let results = scorer.score(&prefs("happy", "celebration", "italian", "non-vegetarian"));
        let ids: Vec<i64> = results.iter().map(|s| s.restaurant.id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn test_happy_italian_vegetarian_scenario() {
        let mut mood_scores = BTreeMap::new();
        mood_scores.insert("happy".to_string(), 0.9);
        let restaurants = vec![Restaurant {
            id: 1,
            restaurant_name: "Trattoria".to_string(),
            cuisine: "italian".to_string(),
            dietary_options: vec!["vegetarian".to_string()],
            mood_scores,
            ..Restaurant::default()
        }];
        let index = FeatureIndex::build(&restaurants);
        let scorer = ContentScorer::new(&restaurants, &index);
        let p = prefs("happy", "celebration", "italian", "vegetarian");

        let breakdown = scorer.breakdown(&restaurants[0], &p).unwrap();
        assert_eq!(breakdown.cuisine, 1.0);
        assert_eq!(breakdown.mood, 0.9);

        let results = scorer.score(&p);
        assert_eq!(results.len(), 1);
        assert!(results[0].score > 0.5, "score was {}", results[0].score);
    }

    #[test]
    fn test_scores_stay_in_unit_interval() {
        let mut extreme = BTreeMap::new();
        extreme.insert("happy".to_string(), 5.0);
        let mut negative = BTreeMap::new();
        negative.insert("happy".to_string(), -3.0);
        let restaurants = vec![
            Restaurant { id: 1, mood_scores: extreme.clone(), occasion_scores: extreme.clone(), time_scores: extreme, ..Restaurant::default() },
            Restaurant { id: 2, mood_scores: negative, ..Restaurant::default() },
        ];
        let index = FeatureIndex::build(&restaurants);
        let scorer = ContentScorer::new(&restaurants, &index);
        let mut p = prefs("happy", "happy", "any", "non-vegetarian");
        p.time = "happy".to_string();
        p.additional_notes = Some("spicy and quiet please".to_string());
        for s in scorer.score(&p) {
            assert!((0.0..=1.0).contains(&s.score), "out of range: {}", s.score);
        }
    }

    #[test]
    fn test_ties_keep_catalog_order_and_top_nine() {
        let restaurants: Vec<Restaurant> = (1..=12)
            .map(|id| Restaurant { id, ..Restaurant::default() })
            .collect();
        let index = FeatureIndex::build(&restaurants);
        let scorer = ContentScorer::new(&restaurants, &index);
        let results = scorer.score(&Preferences::default());
        let ids: Vec<i64> = results.iter().map(|s| s.restaurant.id).collect();
        assert_eq!(ids, (1..=9).collect::<Vec<i64>>());
    }

    #[test]
    fn test_notes_parsing_and_score() {
        let intents = parse_notes(Some("Somewhere quiet and cheap, in a hurry"));
        assert_eq!(intents, vec![NoteIntent::Quiet, NoteIntent::Fast, NoteIntent::Affordable]);

        let cafe = Restaurant {
            ambiance: "Quiet cafe".to_string(),
            price_range: "moderate".to_string(),
            ..Restaurant::default()
        };
        // quiet matches, affordable does not, fast carries no weight
        assert_eq!(notes_score(&intents, &cafe), 0.5);
        assert_eq!(notes_score(&[], &cafe), 1.0);
        assert_eq!(notes_score(&[NoteIntent::Fast], &cafe), 1.0);
    }

    #[test]
    fn test_cuisine_score() {
        let r = with_dietary(1, &[]);
        assert_eq!(cuisine_score(&r, "any"), 1.0);
        assert_eq!(cuisine_score(&r, "Italian"), 1.0);
        assert_eq!(cuisine_score(&r, "thai"), 0.3);
    }
}
