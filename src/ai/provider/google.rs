//! Google Vertex AI Provider
//!
//! Calls `:generateContent` on a publisher model in the configured project
//! and location.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{TestGenerator, http_client, read_json, require_completion, settings_mismatch};
use crate::types::{GenerationParams, ProviderConfig, ProviderKind, ProviderSettings, Result};

pub struct GoogleProvider {
    api_key: SecretString,
    api_base: String,
    model: String,
    project: String,
    location: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for GoogleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("project", &self.project)
            .field("location", &self.location)
            .finish()
    }
}

impl GoogleProvider {
    pub fn new(config: &ProviderConfig, api_key: SecretString) -> Result<Self> {
        let ProviderSettings::Google {
            model,
            project,
            location,
            api_base,
        } = &config.settings
        else {
            return Err(settings_mismatch(ProviderKind::Google, config));
        };

        let api_base = match api_base {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!("https://{}-aiplatform.googleapis.com", location),
        };

        Ok(Self {
            api_key,
            api_base,
            model: model.clone(),
            project: project.clone(),
            location: location.clone(),
            client: http_client(config.timeout_secs)?,
        })
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
            self.api_base, self.project, self.location, self.model
        )
    }
}

#[async_trait]
impl TestGenerator for GoogleProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str, params: GenerationParams) -> Result<String> {
        info!(model = %self.model, project = %self.project, "Generating with Vertex AI");

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: params.max_tokens,
                temperature: params.temperature,
            },
        };

        let url = self.generate_url();
        debug!(url = %url, "Sending request to Vertex AI");

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        let body: GenerateContentResponse = read_json(self.kind(), response).await?;
        require_completion(self.kind(), body.into_text())
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// `candidates[0].content.parts[0].text`
    fn into_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}
