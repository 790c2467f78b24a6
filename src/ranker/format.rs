/// Caller-facing recommendation items with a human-readable reason.

use serde::{Deserialize, Serialize};

use super::combine::RankedRestaurant;

pub const DEFAULT_FOOD_SUGGESTION: &str = "Chef's Special";

/// Raw label score above which a restaurant is called out for the mood or occasion.
const STANDOUT_LABEL_SCORE: f64 = 0.7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationItem {
    pub restaurant_name: String,
    pub food_suggestion: String,
    pub reason_for_recommendation: String,
    pub location: String,
    pub address: String,
    pub contact_details: Option<String>,
}

fn headline(score: f64) -> &'static str {
    if score > 0.8 {
        "This is an excellent match for your preferences"
    } else if score > 0.6 {
        "This is a great match for your preferences"
    } else {
        "This matches your preferences"
    }
}

/// Build the response list. An empty `mood` or `occasion` never produces a callout.
pub fn format_recommendations(ranked: &[RankedRestaurant], mood: &str, occasion: &str) -> Vec<RecommendationItem> {
    let mood = mood.trim().to_lowercase();
    let occasion = occasion.trim().to_lowercase();

    ranked
        .iter()
        .map(|item| {
            let r = &item.restaurant;
            let mut reasons = vec![headline(item.score).to_string()];
            if !mood.is_empty() && r.mood_score(&mood) > STANDOUT_LABEL_SCORE {
                reasons.push(format!("perfect for your {} mood", mood));
            }
            if !occasion.is_empty() && r.occasion_score(&occasion) > STANDOUT_LABEL_SCORE {
                reasons.push(format!("ideal for {}", occasion));
            }

            RecommendationItem {
                restaurant_name: r.restaurant_name.clone(),
                food_suggestion: r
                    .popular_dishes
                    .first()
                    .cloned()
                    .unwrap_or_else(|| DEFAULT_FOOD_SUGGESTION.to_string()),
                reason_for_recommendation: format!("{}.", reasons.join(". ")),
                location: r.location.clone(),
                address: r.address.clone(),
                contact_details: Some(r.contact_details.clone()).filter(|c| !c.is_empty()),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Restaurant;
    use crate::ranker::combine::{ScoreBundle, SourceWeights};

    fn ranked(restaurant: Restaurant, score: f64) -> RankedRestaurant {
        RankedRestaurant {
            restaurant,
            score,
            scores: ScoreBundle::default(),
            weights: SourceWeights::DEFAULT,
        }
    }

    #[test]
    fn test_reason_with_callouts() {
        let mut r = Restaurant {
            restaurant_name: "Luigi's".to_string(),
            popular_dishes: vec!["Lasagna".to_string(), "Tiramisu".to_string()],
            contact_details: "555-0100".to_string(),
            ..Restaurant::default()
        };
        r.mood_scores.insert("happy".to_string(), 0.9);
        r.occasion_scores.insert("date night".to_string(), 0.8);

        let items = format_recommendations(&[ranked(r, 0.85)], "Happy", "Date Night");
        assert_eq!(items[0].food_suggestion, "Lasagna");
        assert_eq!(
            items[0].reason_for_recommendation,
            "This is an excellent match for your preferences. perfect for your happy mood. ideal for date night."
        );
        assert_eq!(items[0].contact_details.as_deref(), Some("555-0100"));
    }

    #[test]
    fn test_defaults_without_dishes_or_callouts() {
        let items = format_recommendations(&[ranked(Restaurant::default(), 0.65)], "", "");
        assert_eq!(items[0].food_suggestion, DEFAULT_FOOD_SUGGESTION);
        assert_eq!(items[0].reason_for_recommendation, "This is a great match for your preferences.");
        assert!(items[0].contact_details.is_none());

        let low = format_recommendations(&[ranked(Restaurant::default(), 0.2)], "happy", "celebration");
        // Missing labels score 0.5, below the callout threshold
        assert_eq!(low[0].reason_for_recommendation, "This matches your preferences.");
    }

    #[test]
    fn test_item_serializes_camel_case() {
        let items = format_recommendations(&[ranked(Restaurant::default(), 0.5)], "", "");
        let json = serde_json::to_value(&items[0]).unwrap();
        assert!(json.get("restaurantName").is_some());
        assert!(json.get("reasonForRecommendation").is_some());
    }
}
