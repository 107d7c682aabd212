//! Anthropic Messages API Provider

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{
    SYSTEM_PROMPT, TestGenerator, http_client, read_json, require_completion, settings_mismatch,
};
use crate::types::{GenerationParams, ProviderConfig, ProviderKind, ProviderSettings, Result};

const DEFAULT_API_BASE: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct ClaudeProvider {
    api_key: SecretString,
    api_base: String,
    model: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for ClaudeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

impl ClaudeProvider {
    pub fn new(config: &ProviderConfig, api_key: SecretString) -> Result<Self> {
        // The Messages API has no organization header; the key already scopes it
        let ProviderSettings::Claude {
            model, api_base, ..
        } = &config.settings
        else {
            return Err(settings_mismatch(ProviderKind::Claude, config));
        };

        Ok(Self {
            api_key,
            api_base: api_base
                .as_deref()
                .unwrap_or(DEFAULT_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            model: model.clone(),
            client: http_client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl TestGenerator for ClaudeProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Claude
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str, params: GenerationParams) -> Result<String> {
        info!(model = %self.model, temperature = params.temperature, "Generating with Claude");

        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: params.max_tokens,
            system: SYSTEM_PROMPT.to_string(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: params.temperature,
        };

        let url = format!("{}/v1/messages", self.api_base);
        debug!(url = %url, "Sending request to Anthropic API");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        let body: MessagesResponse = read_json(self.kind(), response).await?;
        require_completion(self.kind(), body.first_text())
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<Message>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

impl MessagesResponse {
    /// First `text` block; tool-use and other blocks are skipped
    fn first_text(self) -> Option<String> {
        self.content
            .into_iter()
            .find(|block| block.block_type == "text")
            .and_then(|block| block.text)
    }
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GenerationDefaults, GenerationRequest, TestWeaveError};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> ClaudeProvider {
        let config = ProviderConfig::new(
            ProviderSettings::Claude {
                model: "claude-2".to_string(),
                organization_id: Some("org".to_string()),
                api_base: Some(server.uri()),
            },
            5,
        );
        ClaudeProvider::new(&config, SecretString::from("ant-key".to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_messages_request_and_text_block() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "ant-key"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .and(body_partial_json(json!({"model": "claude-2", "system": SYSTEM_PROMPT})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "/* edge cases */\ntest('neg', () => {});"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = provider(&server)
            .generate_tests(&GenerationRequest::new("p", "s"), &GenerationDefaults::default())
            .await
            .unwrap();
        assert_eq!(result.test_code, "test('neg', () => {});");
        assert_eq!(result.explanation.as_deref(), Some("edge cases"));
    }

    #[tokio::test]
    async fn test_rate_limit_is_normalized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limit exceeded"))
            .mount(&server)
            .await;

        let err = provider(&server)
            .generate_tests(&GenerationRequest::new("p", "s"), &GenerationDefaults::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TestWeaveError::Generation { .. }));
        assert_eq!(
            err.to_string(),
            "Failed to generate tests: claude API error (429): rate limit exceeded"
        );
    }

    #[tokio::test]
    async fn test_validate_config() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"max_tokens": 10})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "ok"}]
            })))
            .mount(&server)
            .await;
        assert!(provider(&server).validate_config().await);
    }

    #[test]
    fn test_wrong_settings_rejected() {
        let config = ProviderConfig::new(
            ProviderSettings::OpenAi {
                model: "gpt-4".to_string(),
                organization_id: None,
                api_base: None,
            },
            5,
        );
        let err = ClaudeProvider::new(&config, SecretString::from("k".to_string())).unwrap_err();
        assert!(matches!(err, TestWeaveError::InvalidProviderConfig(_)));
    }
}
