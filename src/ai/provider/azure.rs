//! Azure OpenAI Provider
//!
//! Chat completions against a named deployment:
//! `{endpoint}/openai/deployments/{deployment}/chat/completions?api-version=...`

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};
use url::Url;

use super::openai::{ChatCompletionRequest, ChatCompletionResponse};
use super::{TestGenerator, http_client, read_json, require_completion, settings_mismatch};
use crate::types::{
    GenerationParams, ProviderConfig, ProviderKind, ProviderSettings, Result, TestWeaveError,
};

pub struct AzureProvider {
    api_key: SecretString,
    endpoint: Url,
    deployment_name: String,
    api_version: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for AzureProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureProvider")
            .field("api_key", &"[REDACTED]")
            .field("endpoint", &self.endpoint.as_str())
            .field("deployment_name", &self.deployment_name)
            .field("api_version", &self.api_version)
            .finish()
    }
}

impl AzureProvider {
    pub fn new(config: &ProviderConfig, api_key: SecretString) -> Result<Self> {
        let ProviderSettings::Azure {
            endpoint,
            deployment_name,
            api_version,
        } = &config.settings
        else {
            return Err(settings_mismatch(ProviderKind::Azure, config));
        };

        let endpoint = Url::parse(endpoint.trim()).map_err(|e| {
            TestWeaveError::InvalidProviderConfig(format!("azure endpoint '{}': {}", endpoint, e))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(TestWeaveError::InvalidProviderConfig(format!(
                "azure endpoint must be http(s), got '{}'",
                endpoint.scheme()
            )));
        }

        Ok(Self {
            api_key,
            endpoint,
            deployment_name: deployment_name.clone(),
            api_version: api_version.clone(),
            client: http_client(config.timeout_secs)?,
        })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions",
            self.endpoint.as_str().trim_end_matches('/'),
            self.deployment_name
        )
    }
}

#[async_trait]
impl TestGenerator for AzureProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Azure
    }

    fn model(&self) -> &str {
        &self.deployment_name
    }

    async fn complete(&self, prompt: &str, params: GenerationParams) -> Result<String> {
        info!(
            deployment = %self.deployment_name,
            temperature = params.temperature,
            "Generating with Azure OpenAI"
        );

        // The deployment selects the model
        let request = ChatCompletionRequest::new(None, prompt, params);
        let url = self.completions_url();
        debug!(url = %url, "Sending request to Azure OpenAI");

        let response = self
            .client
            .post(&url)
            .query(&[("api-version", self.api_version.as_str())])
            .header("api-key", self.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        let body: ChatCompletionResponse = read_json(self.kind(), response).await?;
        require_completion(self.kind(), body.into_content())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GenerationDefaults, GenerationRequest};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(endpoint: &str) -> ProviderConfig {
        ProviderConfig::new(
            ProviderSettings::Azure {
                endpoint: endpoint.to_string(),
                deployment_name: "tests-gpt4".to_string(),
                api_version: "2024-02-01".to_string(),
            },
            5,
        )
    }

    fn key() -> SecretString {
        SecretString::from("az-key".to_string())
    }

    #[tokio::test]
    async fn test_generate_against_deployment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/deployments/tests-gpt4/chat/completions"))
            .and(query_param("api-version", "2024-02-01"))
            .and(header("api-key", "az-key"))
            .and(body_partial_json(json!({"temperature": 0.25})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "import a from 'a';\nit('works', () => {});"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = AzureProvider::new(&config(&server.uri()), key()).unwrap();
        let request = GenerationRequest::new("p", "s").with_temperature(0.25);
        let result = provider
            .generate_tests(&request, &GenerationDefaults::default())
            .await
            .unwrap();

        assert_eq!(result.suggested_imports, vec!["import a from 'a';"]);
        assert_eq!(result.test_code, "it('works', () => {});");
    }

    #[tokio::test]
    async fn test_validate_false_on_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let provider = AzureProvider::new(&config(&server.uri()), key()).unwrap();
        assert!(!provider.validate_config().await);
    }

    #[test]
    fn test_rejects_invalid_endpoint() {
        let err = AzureProvider::new(&config("not a url"), key()).unwrap_err();
        assert!(matches!(err, TestWeaveError::InvalidProviderConfig(_)));

        let err = AzureProvider::new(&config("ftp://example.com"), key()).unwrap_err();
        assert!(err.to_string().contains("http(s)"));
    }

    #[test]
    fn test_model_is_deployment() {
        let provider = AzureProvider::new(&config("https://res.openai.azure.com/"), key()).unwrap();
        assert_eq!(provider.model(), "tests-gpt4");
        assert_eq!(
            provider.completions_url(),
            "https://res.openai.azure.com/openai/deployments/tests-gpt4/chat/completions"
        );
    }
}
