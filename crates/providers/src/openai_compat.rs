//! OpenAI-compatible provider implementation.
//!
//! Works with: DeepSeek, OpenAI, OpenRouter, Ollama, vLLM, and any
//! OpenAI-compatible `/chat/completions` endpoint.
//!
//! Reasoning models (e.g. `deepseek-reasoner`) return their thinking in a
//! separate `reasoning_content` field; it is surfaced as
//! [`ProviderResponse::reasoning`].

use async_trait::async_trait;
use bertrand_core::error::ProviderError;
use bertrand_core::message::{Message, Role};
use bertrand_core::provider::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// An OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create a DeepSeek provider (convenience constructor).
    pub fn deepseek(api_key: impl Into<String>) -> Self {
        Self::new("deepseek", "https://api.deepseek.com/v1", api_key)
    }

    /// Create an OpenRouter provider (convenience constructor).
    pub fn openrouter(api_key: impl Into<String>) -> Self {
        Self::new("openrouter", "https://openrouter.ai/api/v1", api_key)
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    /// Create an Ollama provider (convenience constructor).
    pub fn ollama(base_url: Option<&str>) -> Self {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama", // Ollama doesn't need a real key
        )
    }

    /// Convert our Message types to OpenAI API format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: match m.role {
                    Role::User => "user".into(),
                    Role::Assistant => "assistant".into(),
                    Role::System => "system".into(),
                },
                content: Some(m.content.clone()),
                reasoning_content: None,
            })
            .collect()
    }

    /// Map a non-success HTTP status to a provider error.
    fn status_error(status: u16, body: String) -> ProviderError {
        match status {
            429 => ProviderError::RateLimited {
                retry_after_secs: 5,
            },
            401 | 403 => ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ),
            _ => ProviderError::ApiError {
                status_code: status,
                message: body,
            },
        }
    }

    /// Turn a decoded API response into our response type.
    fn convert_response(api_response: ApiResponse) -> Result<ProviderResponse, ProviderError> {
        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ApiError {
                status_code: 200,
                message: "No choices in response".into(),
            })?;

        let content = choice.message.content.unwrap_or_default();
        let reasoning = choice
            .message
            .reasoning_content
            .filter(|r| !r.trim().is_empty());

        if content.trim().is_empty() && reasoning.is_none() {
            return Err(ProviderError::EmptyResponse(
                choice.finish_reason.unwrap_or_else(|| "unknown".into()),
            ));
        }

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ProviderResponse {
            message: Message::assistant(content),
            reasoning,
            finish_reason: choice.finish_reason,
            usage,
            model: api_response.model,
        })
    }
}

#[async_trait]
impl bertrand_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "stream": false,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        debug!(provider = %self.name, model = %request.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(Self::status_error(status, error_body));
        }

        let api_response: ApiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        let converted = Self::convert_response(api_response);
        if let Err(e) = &converted {
            warn!(provider = %self.name, error = %e, "Unusable completion");
        }
        converted
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing)]
    reasoning_content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bertrand_core::Provider;

    #[test]
    fn deepseek_constructor() {
        let provider = OpenAiCompatProvider::deepseek("sk-test");
        assert_eq!(provider.name(), "deepseek");
        assert!(provider.base_url.contains("api.deepseek.com"));
    }

    #[test]
    fn ollama_constructor() {
        let provider = OpenAiCompatProvider::ollama(None);
        assert_eq!(provider.name(), "ollama");
        assert!(provider.base_url.contains("localhost:11434"));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let provider = OpenAiCompatProvider::new("custom", "http://host:1234/v1/", "k");
        assert_eq!(provider.base_url, "http://host:1234/v1");
    }

    #[test]
    fn message_conversion() {
        let messages = vec![Message::system("You price products"), Message::user("Price?")];
        let api_messages = OpenAiCompatProvider::to_api_messages(&messages);
        assert_eq!(api_messages.len(), 2);
        assert_eq!(api_messages[0].role, "system");
        assert_eq!(api_messages[1].role, "user");

        let json = serde_json::to_string(&api_messages[1]).unwrap();
        assert!(!json.contains("reasoning_content"));
    }

    #[test]
    fn parses_reasoning_model_response() {
        let data = r#"{
            "model": "deepseek-reasoner",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "1.85",
                    "reasoning_content": "Competitor held at 1.80 for three periods..."
                },
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 900, "completion_tokens": 400, "total_tokens": 1300}
        }"#;
        let api: ApiResponse = serde_json::from_str(data).unwrap();
        let resp = OpenAiCompatProvider::convert_response(api).unwrap();
        assert_eq!(resp.message.content, "1.85");
        assert!(resp.reasoning.unwrap().contains("three periods"));
        assert_eq!(resp.finish_reason.as_deref(), Some("stop"));
        assert_eq!(resp.usage.unwrap().total_tokens, 1300);
    }

    #[test]
    fn plain_model_response_has_no_reasoning() {
        let data = r#"{
            "model": "gpt-4o",
            "choices": [{"message": {"role": "assistant", "content": "1.72"}}],
            "usage": null
        }"#;
        let api: ApiResponse = serde_json::from_str(data).unwrap();
        let resp = OpenAiCompatProvider::convert_response(api).unwrap();
        assert!(resp.reasoning.is_none());
        assert!(resp.usage.is_none());
    }

    #[test]
    fn empty_content_and_reasoning_is_an_error() {
        let data = r#"{
            "model": "deepseek-reasoner",
            "choices": [{"message": {"role": "assistant", "content": ""}, "finish_reason": "length"}],
            "usage": null
        }"#;
        let api: ApiResponse = serde_json::from_str(data).unwrap();
        let err = OpenAiCompatProvider::convert_response(api).unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResponse(ref r) if r == "length"));
    }

    #[test]
    fn no_choices_is_an_error() {
        let api: ApiResponse =
            serde_json::from_str(r#"{"model": "m", "choices": [], "usage": null}"#).unwrap();
        assert!(OpenAiCompatProvider::convert_response(api).is_err());
    }

    #[test]
    fn status_codes_map_to_errors() {
        assert!(matches!(
            OpenAiCompatProvider::status_error(429, String::new()),
            ProviderError::RateLimited { .. }
        ));
        assert!(matches!(
            OpenAiCompatProvider::status_error(401, String::new()),
            ProviderError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            OpenAiCompatProvider::status_error(500, "boom".into()),
            ProviderError::ApiError { status_code: 500, .. }
        ));
    }
}
