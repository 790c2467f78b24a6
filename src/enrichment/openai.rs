/// OpenAI completion provider
///
/// Calls an OpenAI-compatible Chat Completions API.
/// Uses gpt-4o-mini by default; requires MUNCHIES_ENRICHMENT__OPENAI_API_KEY or OPENAI_API_KEY.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{CompletionProvider, EnrichmentError, SYSTEM_PROMPT};

/// Request body for OpenAI Chat Completions API
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Response from OpenAI Chat Completions API
#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-backed completion provider.
pub struct OpenAIProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAIProvider {
    /// Create a new OpenAIProvider.
    ///
    /// # Errors
    /// Returns `EnrichmentError::NotConfigured` if api_key is empty.
    pub fn new(api_key: String, base_url: String, model: String) -> Result<Self, EnrichmentError> {
        if api_key.trim().is_empty() {
            return Err(EnrichmentError::NotConfigured(
                "OpenAI API key is required when using the openai enrichment provider. \
                 Set MUNCHIES_ENRICHMENT__OPENAI_API_KEY or OPENAI_API_KEY in the environment"
                    .to_string(),
            ));
        }

        Ok(OpenAIProvider {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAIProvider {
    async fn complete(&self, prompt: &str) -> Result<String, EnrichmentError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: 0.7,
            max_tokens: 3000,
        };

        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
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

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| EnrichmentError::Generation(format!("Failed to parse OpenAI response: {}", e)))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| EnrichmentError::Generation("OpenAI returned no message content".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_not_configured() {
        let result = OpenAIProvider::new("  ".to_string(), "https://api.openai.com/v1".to_string(), "gpt-4o-mini".to_string());
        assert!(matches!(result, Err(EnrichmentError::NotConfigured(_))));
    }

    #[test]
    fn test_request_shape() {
        let request = ChatRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![ChatMessage { role: "user".to_string(), content: "hi".to_string() }],
            temperature: 0.7,
            max_tokens: 3000,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["max_tokens"], 3000);
    }
}
