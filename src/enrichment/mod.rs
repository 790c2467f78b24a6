/// Enrichment provider trait and supporting types
///
/// Enrichment asks an external text-completion model for restaurant candidates,
/// parses its JSON answer, and merges non-duplicate records into the fetched
/// store. Providers: OpenAI-compatible chat completions, Google Gemini, and a
/// local Ollama server.

pub mod gateway;
pub mod gemini;
pub mod ollama;
pub mod openai;

pub use gateway::{EnrichmentGateway, EnrichmentResult};

use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

use crate::catalog::Restaurant;
use crate::errors::MunchiesError;
use crate::preferences::Preferences;

/// Errors that can occur while talking to a completion provider.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    /// Request failed or the model output could not be used
    #[error("Enrichment generation error: {0}")]
    Generation(String),

    /// API provider returned an HTTP error
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Provider not configured (e.g., missing API key)
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    /// Provider did not answer within the configured deadline
    #[error("Provider timed out after {0}s")]
    Timeout(u64),
}

impl From<EnrichmentError> for MunchiesError {
    fn from(e: EnrichmentError) -> Self {
        match e {
            EnrichmentError::NotConfigured(msg) => MunchiesError::Config(msg),
            other => MunchiesError::Internal(other.to_string()),
        }
    }
}

/// Core trait for a black-box text-completion model.
///
/// Implementations must be Send + Sync to support use in async contexts
/// and across thread boundaries (e.g., Arc<dyn CompletionProvider>).
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Complete `prompt`, returning the model's raw text.
    async fn complete(&self, prompt: &str) -> Result<String, EnrichmentError>;

    /// Return the model name identifier used by this provider.
    fn model_name(&self) -> &str;

    /// Short provider identifier: "openai", "gemini", "ollama".
    fn provider_name(&self) -> &str;
}

/// System message sent to chat-style providers.
pub const SYSTEM_PROMPT: &str = "You are a restaurant data expert. Provide accurate restaurant \
     information in JSON format. Match the query exactly.";

/// Append the stated preferences to a search query.
///
/// `"ramen. Preferences: mood: sad, occasion: casual meal, cuisine: japanese, dietary: vegan"`
pub fn enhance_query(query: &str, prefs: Option<&Preferences>) -> String {
    let Some(prefs) = prefs else {
        return query.to_string();
    };
    let parts: Vec<String> = [
        ("mood", prefs.mood.as_str()),
        ("occasion", prefs.occasion.as_str()),
        ("cuisine", prefs.cuisine.as_str()),
        ("dietary", prefs.dietary_preference.as_str()),
    ]
    .iter()
    .filter(|(_, value)| !value.is_empty())
    .map(|(label, value)| format!("{}: {}", label, value))
    .collect();

    if parts.is_empty() {
        query.to_string()
    } else {
        format!("{}. Preferences: {}", query, parts.join(", "))
    }
}

/// Build the candidate-request prompt with the fixed record schema.
pub fn build_enrichment_prompt(query: &str, location: Option<&str>, max_results: usize) -> String {
    format!(
        "Based on the following search query, provide restaurant recommendations with detailed information.\n\
         \n\
         Search Query: {query}\n\
         Location: {location}\n\
         \n\
         For each restaurant (provide {max_results} restaurants), return the following information in JSON format:\n\
         {{\n\
         \x20 \"restaurantName\": \"Name of the restaurant\",\n\
         \x20 \"cuisine\": \"Type of cuisine (e.g., italian, mexican, indian, japanese, chinese, american)\",\n\
         \x20 \"location\": \"General area or neighborhood\",\n\
         \x20 \"address\": \"Full street address\",\n\
         \x20 \"contactDetails\": \"Phone number or website\",\n\
         \x20 \"popularDishes\": [\"Dish 1\", \"Dish 2\", \"Dish 3\"],\n\
         \x20 \"dietaryOptions\": [\"vegetarian\", \"non-vegetarian\", \"vegan\", \"gluten-free\"],\n\
         \x20 \"priceRange\": \"affordable/moderate/expensive\",\n\
         \x20 \"ambiance\": \"Description of ambiance (e.g., cozy, casual, romantic, elegant)\",\n\
         \x20 \"moodScores\": {{\"happy\": 0.0-1.0, \"sad\": 0.0-1.0, \"stressed\": 0.0-1.0, \"adventurous\": 0.0-1.0, \"relaxed\": 0.0-1.0, \"celebratory\": 0.0-1.0}},\n\
         \x20 \"occasionScores\": {{\"casual meal\": 0.0-1.0, \"celebration\": 0.0-1.0, \"quick bite\": 0.0-1.0, \"date night\": 0.0-1.0, \"family dinner\": 0.0-1.0}},\n\
         \x20 \"timeScores\": {{\"breakfast\": 0.0-1.0, \"brunch\": 0.0-1.0, \"lunch\": 0.0-1.0, \"dinner\": 0.0-1.0, \"snack\": 0.0-1.0}}\n\
         }}\n\
         \n\
         Return only a valid JSON array of restaurant objects. Do not include any markdown formatting or code blocks.",
        query = query,
        location = location.filter(|l| !l.trim().is_empty()).unwrap_or("Not specified"),
        max_results = max_results,
    )
}

/// Strip a surrounding markdown code fence (```json ... ``` or ``` ... ```).
pub fn strip_code_fences(raw: &str) -> &str {
    let mut content = raw.trim();
    if let Some(rest) = content.strip_prefix("```json") {
        content = rest;
    } else if let Some(rest) = content.strip_prefix("```") {
        content = rest;
    }
    if let Some(rest) = content.strip_suffix("```") {
        content = rest;
    }
    content.trim()
}

/// Parse model output into candidate records.
///
/// A single object is treated as a one-element array. Array elements that do
/// not look like restaurants are skipped with a warning.
pub fn parse_candidates(raw: &str) -> Result<Vec<Restaurant>, EnrichmentError> {
    let content = strip_code_fences(raw);
    let value: serde_json::Value = serde_json::from_str(content).map_err(|e| {
        EnrichmentError::Generation(format!("Failed to parse candidate JSON from model output: {}", e))
    })?;

    let items = match value {
        serde_json::Value::Array(items) => items,
        other => vec![other],
    };

    let mut candidates = Vec::with_capacity(items.len());
    for item in items {
        match serde_json::from_value::<Restaurant>(item) {
            Ok(r) => candidates.push(r),
            Err(e) => tracing::warn!(error = %e, "Skipping malformed candidate record"),
        }
    }
    Ok(candidates)
}

fn non_word() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^\w\s]").ok()).as_ref()
}

/// Lower-case, trim, drop non-word characters, collapse whitespace.
pub fn normalize_text(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    let stripped = match non_word() {
        Some(re) => re.replace_all(&lowered, "").into_owned(),
        None => lowered,
    };
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether `candidate` duplicates any of `existing`.
///
/// Duplicate when normalized names are equal, or when one name contains the
/// other and either both addresses are present and equal, or addresses are
/// missing and both names are longer than five characters.
pub fn is_duplicate<'a, I>(candidate: &Restaurant, existing: I) -> bool
where
    I: IntoIterator<Item = &'a Restaurant>,
{
    let name = normalize_text(&candidate.restaurant_name);
    if name.is_empty() {
        return false;
    }
    let address = normalize_text(&candidate.address);

    existing.into_iter().any(|other| {
        let other_name = normalize_text(&other.restaurant_name);
        if other_name.is_empty() {
            return false;
        }
        if name == other_name {
            return true;
        }
        if !(name.contains(&other_name) || other_name.contains(&name)) {
            return false;
        }
        let other_address = normalize_text(&other.address);
        if !address.is_empty() && !other_address.is_empty() {
            address == other_address
        } else {
            name.chars().count() > 5 && other_name.chars().count() > 5
        }
    })
}
