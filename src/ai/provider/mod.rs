//! AI Provider Abstraction
//!
//! Defines the `TestGenerator` trait implemented by every vendor backend.
//! The set of backends is closed (see `ProviderKind`); the registry maps each
//! kind to a constructor so tests can swap in stubs.
//!
//! ## Modules
//!
//! - `openai`, `azure`, `google`, `claude`: one HTTPS exchange per request
//! - `prompt`: shared prompt template

mod azure;
mod claude;
mod google;
mod openai;
mod prompt;

pub use azure::AzureProvider;
pub use claude::ClaudeProvider;
pub use google::GoogleProvider;
pub use openai::OpenAiProvider;
pub use prompt::{GENERATION_REQUIREMENTS, SYSTEM_PROMPT, build_prompt};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use tracing::{error, warn};

use crate::ai::response::ResponseParser;
use crate::constants::ai as ai_constants;
use crate::types::{
    GenerationDefaults, GenerationParams, GenerationRequest, GenerationResult, ProviderConfig,
    ProviderKind, Result, TestWeaveError,
};

// =============================================================================
// Test Generator Trait
// =============================================================================

/// A configured backend able to turn a request into generated tests
#[async_trait]
pub trait TestGenerator: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Model (or deployment) in use
    fn model(&self) -> &str;

    /// Single vendor exchange returning the raw completion text
    async fn complete(&self, prompt: &str, params: GenerationParams) -> Result<String>;

    /// Cheap token-bounded request; any failure means `false`
    async fn validate_config(&self) -> bool {
        let params = GenerationParams {
            max_tokens: ai_constants::VALIDATION_MAX_TOKENS,
            temperature: ai_constants::DEFAULT_TEMPERATURE,
        };
        match self.complete(ai_constants::VALIDATION_PROMPT, params).await {
            Ok(_) => true,
            Err(e) => {
                warn!(provider = %self.kind(), error = %e, "Provider validation failed");
                false
            }
        }
    }

    /// Build the prompt, call the vendor and parse the completion.
    ///
    /// Failures are normalized into `TestWeaveError::Generation`.
    async fn generate_tests(
        &self,
        request: &GenerationRequest,
        defaults: &GenerationDefaults,
    ) -> Result<GenerationResult> {
        let params = GenerationParams::merge(request, defaults);
        let prompt = build_prompt(request);

        match self.complete(&prompt, params).await {
            Ok(completion) => Ok(ResponseParser::shared().parse(&completion)),
            Err(e) => {
                error!(provider = %self.kind(), model = self.model(), error = %e, "Generation failed");
                Err(normalize_error(self.kind(), e))
            }
        }
    }
}

/// Shared provider handle; in-flight calls keep their own clone
pub type SharedProvider = Arc<dyn TestGenerator>;

/// Wrap any failure as `Generation`, leaving already-normalized errors alone
pub fn normalize_error(kind: ProviderKind, err: TestWeaveError) -> TestWeaveError {
    match err {
        TestWeaveError::Generation { .. } | TestWeaveError::Fatal { .. } => err,
        other => TestWeaveError::generation(kind.as_str(), other.to_string()),
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Builds a provider from its resolved config and API key
pub type ProviderConstructor =
    Arc<dyn Fn(&ProviderConfig, SecretString) -> Result<SharedProvider> + Send + Sync>;

/// Maps each provider kind to its constructor
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    constructors: HashMap<ProviderKind, ProviderConstructor>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

impl ProviderRegistry {
    /// Registry without any constructors
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the four HTTP backends
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        for kind in ProviderKind::ALL {
            registry.register(kind, create_standard);
        }
        registry
    }

    /// Register (or replace) the constructor for `kind`
    pub fn register<F>(&mut self, kind: ProviderKind, constructor: F) -> &mut Self
    where
        F: Fn(&ProviderConfig, SecretString) -> Result<SharedProvider> + Send + Sync + 'static,
    {
        self.constructors.insert(kind, Arc::new(constructor));
        self
    }

    /// Builder-style [`Self::register`]
    pub fn with<F>(mut self, kind: ProviderKind, constructor: F) -> Self
    where
        F: Fn(&ProviderConfig, SecretString) -> Result<SharedProvider> + Send + Sync + 'static,
    {
        self.register(kind, constructor);
        self
    }

    pub fn contains(&self, kind: ProviderKind) -> bool {
        self.constructors.contains_key(&kind)
    }

    pub fn kinds(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|k| self.contains(*k))
            .collect()
    }

    /// Construct the provider described by `config`
    pub fn create(&self, config: &ProviderConfig, api_key: SecretString) -> Result<SharedProvider> {
        let constructor = self
            .constructors
            .get(&config.kind())
            .ok_or_else(|| TestWeaveError::UnsupportedProvider(config.kind().to_string()))?;
        constructor(config, api_key)
    }
}

/// Constructor for the built-in backends
pub fn create_standard(config: &ProviderConfig, api_key: SecretString) -> Result<SharedProvider> {
    match config.kind() {
        ProviderKind::OpenAi => Ok(Arc::new(OpenAiProvider::new(config, api_key)?)),
        ProviderKind::Azure => Ok(Arc::new(AzureProvider::new(config, api_key)?)),
        ProviderKind::Google => Ok(Arc::new(GoogleProvider::new(config, api_key)?)),
        ProviderKind::Claude => Ok(Arc::new(ClaudeProvider::new(config, api_key)?)),
    }
}

// =============================================================================
// HTTP helpers shared by the backends
// =============================================================================

pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(TestWeaveError::from)
}

/// Decode a successful JSON body, or turn a non-2xx status into `Vendor`
pub(crate) async fn read_json<T: DeserializeOwned>(
    kind: ProviderKind,
    response: reqwest::Response,
) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(TestWeaveError::Vendor {
            provider: kind.to_string(),
            status: status.as_u16(),
            message: body.trim().to_string(),
        });
    }
    Ok(response.json().await?)
}

/// Reject a missing or blank completion
pub(crate) fn require_completion(kind: ProviderKind, text: Option<String>) -> Result<String> {
    match text {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(TestWeaveError::generation(
            kind.as_str(),
            "No test code generated",
        )),
    }
}

fn settings_mismatch(expected: ProviderKind, config: &ProviderConfig) -> TestWeaveError {
    TestWeaveError::InvalidProviderConfig(format!(
        "{} (settings are for {})",
        expected,
        config.kind()
    ))
}
