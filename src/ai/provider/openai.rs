//! OpenAI API Provider
//!
//! Test generation through OpenAI's Chat Completions API. The request and
//! response types are shared with the Azure deployment flavour.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{
    SYSTEM_PROMPT, TestGenerator, http_client, read_json, require_completion, settings_mismatch,
};
use crate::types::{GenerationParams, ProviderConfig, ProviderKind, ProviderSettings, Result};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// OpenAI API Provider with secure API key handling
pub struct OpenAiProvider {
    /// API key stored securely - never exposed in logs or debug output
    api_key: SecretString,
    api_base: String,
    model: String,
    organization_id: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("organization_id", &self.organization_id)
            .finish()
    }
}

impl OpenAiProvider {
    pub fn new(config: &ProviderConfig, api_key: SecretString) -> Result<Self> {
        let ProviderSettings::OpenAi {
            model,
            organization_id,
            api_base,
        } = &config.settings
        else {
            return Err(settings_mismatch(ProviderKind::OpenAi, config));
        };

        Ok(Self {
            api_key,
            api_base: api_base
                .as_deref()
                .unwrap_or(DEFAULT_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            model: model.clone(),
            organization_id: organization_id.clone(),
            client: http_client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl TestGenerator for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str, params: GenerationParams) -> Result<String> {
        info!(
            "Generating with OpenAI (model: {}, temperature: {})",
            self.model, params.temperature
        );

        let request = ChatCompletionRequest::new(Some(self.model.clone()), prompt, params);
        let url = format!("{}/chat/completions", self.api_base);

        debug!("Sending request to OpenAI API");

        let mut builder = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request);
        if let Some(org) = &self.organization_id {
            builder = builder.header("OpenAI-Organization", org);
        }

        let response = builder.send().await?;
        let body: ChatCompletionResponse = read_json(self.kind(), response).await?;
        require_completion(self.kind(), body.into_content())
    }

    /// Lists models; cheaper than a completion and needs no tokens
    async fn validate_config(&self) -> bool {
        let url = format!("{}/models", self.api_base);

        let mut builder = self
            .client
            .get(&url)
            .bearer_auth(self.api_key.expose_secret());
        if let Some(org) = &self.organization_id {
            builder = builder.header("OpenAI-Organization", org);
        }

        match builder.send().await {
            Ok(resp) if resp.status().is_success() => {
                info!("OpenAI API is available");
                true
            }
            Ok(resp) => {
                warn!("OpenAI configuration validation failed: {}", resp.status());
                false
            }
            Err(e) => {
                warn!("OpenAI configuration validation failed: {}", e);
                false
            }
        }
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
pub(super) struct ChatCompletionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    n: u32,
}

impl ChatCompletionRequest {
    pub(super) fn new(model: Option<String>, prompt: &str, params: GenerationParams) -> Self {
        Self {
            model,
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
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            n: 1,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

impl ChatCompletionResponse {
    /// `choices[0].message.content`
    pub(super) fn into_content(self) -> Option<String> {
        self.choices.into_iter().next()?.message.content
    }
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}
