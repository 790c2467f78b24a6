/// Explicit preference record shared by the content scorer, the search matcher
/// and the hybrid ranker.

use serde::{Deserialize, Serialize};

pub const DEFAULT_MOOD: &str = "happy";
pub const DEFAULT_OCCASION: &str = "casual meal";
pub const DEFAULT_CUISINE: &str = "any";
pub const DEFAULT_DIETARY: &str = "non-vegetarian";
pub const DEFAULT_TIME: &str = "dinner";

/// What the user asked for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub mood: String,
    pub occasion: String,
    /// A cuisine label or "any"
    pub cuisine: String,
    /// "non-vegetarian" is the permissive default
    pub dietary_preference: String,
    /// Time-of-day label: breakfast, brunch, lunch, dinner, snack
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_notes: Option<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Preferences {
            mood: DEFAULT_MOOD.to_string(),
            occasion: DEFAULT_OCCASION.to_string(),
            cuisine: DEFAULT_CUISINE.to_string(),
            dietary_preference: DEFAULT_DIETARY.to_string(),
            time: DEFAULT_TIME.to_string(),
            location: None,
            additional_notes: None,
        }
    }
}

/// Best-effort structured guess extracted from free text; `None` means no rule fired.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedPreferences {
    pub mood: Option<String>,
    pub occasion: Option<String>,
    pub cuisine: Option<String>,
    pub dietary: Option<String>,
    pub price_range: Option<String>,
    /// Query words longer than two characters
    pub keywords: Vec<String>,
}

impl Preferences {
    /// Overlay every extracted field onto these preferences.
    ///
    /// Query intent wins over the stated preference; fields the extractor
    /// left empty keep their current value.
    pub fn with_overrides(&self, extracted: &ExtractedPreferences) -> Preferences {
        let mut merged = self.clone();
        if let Some(mood) = &extracted.mood {
            merged.mood = mood.clone();
        }
        if let Some(occasion) = &extracted.occasion {
            merged.occasion = occasion.clone();
        }
        if let Some(cuisine) = &extracted.cuisine {
            merged.cuisine = cuisine.clone();
        }
        if let Some(dietary) = &extracted.dietary {
            merged.dietary_preference = dietary.clone();
        }
        merged
    }

    /// Preferences for a bare search: extracted values, library defaults for the rest.
    pub fn from_extracted(extracted: &ExtractedPreferences, location: Option<String>) -> Preferences {
        Preferences {
            location,
            ..Preferences::default()
        }
        .with_overrides(extracted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_only_touch_extracted_fields() {
        let prefs = Preferences {
            mood: "sad".to_string(),
            cuisine: "indian".to_string(),
            ..Preferences::default()
        };
        let extracted = ExtractedPreferences {
            cuisine: Some("mexican".to_string()),
            ..ExtractedPreferences::default()
        };
        let merged = prefs.with_overrides(&extracted);
        assert_eq!(merged.mood, "sad");
        assert_eq!(merged.cuisine, "mexican");
        assert_eq!(merged.dietary_preference, DEFAULT_DIETARY);
    }

    #[test]
    fn test_from_extracted_fills_defaults() {
        let prefs = Preferences::from_extracted(&ExtractedPreferences::default(), None);
        assert_eq!(prefs, Preferences::default());
    }

    #[test]
    fn test_camel_case_wire_names() {
        let json = serde_json::to_value(Preferences::default()).unwrap();
        assert_eq!(json["dietaryPreference"], "non-vegetarian");
        assert!(json.get("additionalNotes").is_none());
    }
}
