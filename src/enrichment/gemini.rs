/// Google Gemini completion provider
///
/// Calls the Generative Language `models/{model}:generateContent` endpoint.
/// Requires MUNCHIES_ENRICHMENT__GEMINI_API_KEY or GEMINI_API_KEY.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{CompletionProvider, EnrichmentError, SYSTEM_PROMPT};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

fn text_content(text: &str) -> Content {
    Content {
        parts: vec![Part {
            text: text.to_string(),
        }],
    }
}

/// Gemini-backed completion provider.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiProvider {
    /// # Errors
    /// Returns `EnrichmentError::NotConfigured` if api_key is empty.
    pub fn new(api_key: String, base_url: String, model: String) -> Result<Self, EnrichmentError> {
        if api_key.trim().is_empty() {
            return Err(EnrichmentError::NotConfigured(
                "Gemini API key is required when using the gemini enrichment provider. \
                 Set MUNCHIES_ENRICHMENT__GEMINI_API_KEY or GEMINI_API_KEY in the environment"
                    .to_string(),
            ));
        }

        Ok(GeminiProvider {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        })
    }
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    async fn complete(&self, prompt: &str) -> Result<String, EnrichmentError> {
        let request = GenerateRequest {
            system_instruction: text_content(SYSTEM_PROMPT),
            contents: vec![text_content(prompt)],
            generation_config: GenerationConfig {
                temperature: 0.7,
                max_output_tokens: 3000,
            },
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| EnrichmentError::Generation(format!("HTTP request failed: {}", e)))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(EnrichmentError::Api { status, message: body });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| EnrichmentError::Generation(format!("Failed to parse Gemini response: {}", e)))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(EnrichmentError::Generation("Gemini returned no candidate text".to_string()));
        }
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        "gemini"
    }
}
