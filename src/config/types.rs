//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/testweave/) and project (.testweave/) level configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::CacheConfig;
use crate::constants::{ai as ai_constants, cache as cache_constants};
use crate::constants::{monitor as monitor_constants, retry as retry_constants};
use crate::types::{
    GenerationDefaults, ProviderConfig, ProviderKind, ProviderSettings, Result, TestWeaveError,
};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Local test framework settings
    pub test_framework: TestFrameworkConfig,

    /// AI provider settings
    pub ai: AiConfig,

    /// Notification toggles for the host UI
    pub notifications: NotificationConfig,

    /// Result cache settings
    pub cache: CacheSettings,

    /// Recovery engine settings
    pub retry: RetrySettings,

    /// Metrics and health monitor settings
    pub monitor: MonitorSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            test_framework: TestFrameworkConfig::default(),
            ai: AiConfig::default(),
            notifications: NotificationConfig::default(),
            cache: CacheSettings::default(),
            retry: RetrySettings::default(),
            monitor: MonitorSettings::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `TestWeaveError::Config` (or `UnsupportedProvider`) on failure.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.ai.temperature) {
            return Err(TestWeaveError::Config(format!(
                "AI temperature must be between 0.0 and 2.0, got {}",
                self.ai.temperature
            )));
        }

        if self.ai.max_tokens == 0 {
            return Err(TestWeaveError::Config(
                "AI max_tokens must be greater than 0".to_string(),
            ));
        }

        if self.ai.timeout_secs == 0 {
            return Err(TestWeaveError::Config(
                "AI timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.test_framework.pattern.trim().is_empty() {
            return Err(TestWeaveError::Config(
                "Test framework pattern is required".to_string(),
            ));
        }

        // Resolves the kind and its required fields
        self.ai.provider_config()?;

        if self.cache.ttl_secs == 0 || self.cache.sweep_interval_secs == 0 {
            return Err(TestWeaveError::Config(
                "Cache ttl_secs and sweep_interval_secs must be greater than 0".to_string(),
            ));
        }

        if self.retry.max_retries == 0 {
            return Err(TestWeaveError::Config(
                "Retry max_retries must be at least 1".to_string(),
            ));
        }

        if self.monitor.max_samples == 0 || self.monitor.health_interval_secs == 0 {
            return Err(TestWeaveError::Config(
                "Monitor max_samples and health_interval_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Test Framework Configuration
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TestFrameworkKind {
    #[default]
    Jest,
    Mocha,
}

impl std::fmt::Display for TestFrameworkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestFrameworkKind::Jest => write!(f, "jest"),
            TestFrameworkKind::Mocha => write!(f, "mocha"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TestFrameworkConfig {
    #[serde(rename = "type")]
    pub framework: TestFrameworkKind,
    /// Run generated tests automatically (consumed by the host)
    pub auto_run: bool,
    /// Glob pattern identifying test files
    pub pattern: String,
}

impl Default for TestFrameworkConfig {
    fn default() -> Self {
        Self {
            framework: TestFrameworkKind::Jest,
            auto_run: false,
            pattern: "**/*.test.{ts,js}".to_string(),
        }
    }
}

// =============================================================================
// AI Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AiConfig {
    /// Provider key: "openai", "azure", "google", "claude"
    pub provider: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    pub openai: OpenAiSection,
    pub azure: AzureSection,
    pub google: GoogleSection,
    pub claude: ClaudeSection,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            max_tokens: ai_constants::DEFAULT_MAX_TOKENS,
            temperature: ai_constants::DEFAULT_TEMPERATURE,
            timeout_secs: ai_constants::DEFAULT_TIMEOUT_SECS,
            openai: OpenAiSection::default(),
            azure: AzureSection::default(),
            google: GoogleSection::default(),
            claude: ClaudeSection::default(),
        }
    }
}

impl AiConfig {
    pub fn provider_kind(&self) -> Result<ProviderKind> {
        self.provider.parse()
    }

    /// Resolve the active provider's settings, enforcing its required fields
    pub fn provider_config(&self) -> Result<ProviderConfig> {
        let settings = match self.provider_kind()? {
            ProviderKind::OpenAi => ProviderSettings::OpenAi {
                model: self.openai.model.clone(),
                organization_id: non_empty(&self.openai.organization_id),
                api_base: non_empty(&self.openai.api_base),
            },
            ProviderKind::Azure => {
                if self.azure.endpoint.trim().is_empty() {
                    return Err(TestWeaveError::Config(
                        "Azure endpoint is required".to_string(),
                    ));
                }
                if self.azure.deployment_name.trim().is_empty() {
                    return Err(TestWeaveError::Config(
                        "Azure deployment name is required".to_string(),
                    ));
                }
                ProviderSettings::Azure {
                    endpoint: self.azure.endpoint.clone(),
                    deployment_name: self.azure.deployment_name.clone(),
                    api_version: self.azure.api_version.clone(),
                }
            }
            ProviderKind::Google => {
                if self.google.project.trim().is_empty() {
                    return Err(TestWeaveError::Config(
                        "Google project ID is required".to_string(),
                    ));
                }
                if self.google.location.trim().is_empty() {
                    return Err(TestWeaveError::Config(
                        "Google location is required".to_string(),
                    ));
                }
                ProviderSettings::Google {
                    model: self.google.model.clone(),
                    project: self.google.project.clone(),
                    location: self.google.location.clone(),
                    api_base: non_empty(&self.google.api_base),
                }
            }
            ProviderKind::Claude => ProviderSettings::Claude {
                model: self.claude.model.clone(),
                organization_id: non_empty(&self.claude.organization_id),
                api_base: non_empty(&self.claude.api_base),
            },
        };

        Ok(ProviderConfig::new(settings, self.timeout_secs))
    }

    pub fn defaults(&self) -> GenerationDefaults {
        GenerationDefaults {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OpenAiSection {
    pub model: String,
    pub organization_id: Option<String>,
    pub api_base: Option<String>,
}

impl Default for OpenAiSection {
    fn default() -> Self {
        Self {
            model: "gpt-4".to_string(),
            organization_id: None,
            api_base: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AzureSection {
    pub endpoint: String,
    pub deployment_name: String,
    pub api_version: String,
}

impl Default for AzureSection {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            deployment_name: String::new(),
            api_version: "2024-02-01".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GoogleSection {
    pub model: String,
    pub project: String,
    pub location: String,
    pub api_base: Option<String>,
}

impl Default for GoogleSection {
    fn default() -> Self {
        Self {
            model: "gemini-pro".to_string(),
            project: String::new(),
            location: "us-central1".to_string(),
            api_base: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClaudeSection {
    pub model: String,
    pub organization_id: Option<String>,
    pub api_base: Option<String>,
}

impl Default for ClaudeSection {
    fn default() -> Self {
        Self {
            model: "claude-2".to_string(),
            organization_id: None,
            api_base: None,
        }
    }
}

// =============================================================================
// Notifications
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotificationConfig {
    pub show_test_results: bool,
    pub show_ai_progress: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            show_test_results: true,
            show_ai_progress: true,
        }
    }
}

// =============================================================================
// Cache / Retry / Monitor
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheSettings {
    /// Cache generated results keyed by request
    pub enabled: bool,
    pub ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: cache_constants::DEFAULT_TTL_SECS,
            sweep_interval_secs: cache_constants::SWEEP_INTERVAL_SECS,
        }
    }
}

impl CacheSettings {
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            default_ttl: Duration::from_secs(self.ttl_secs),
            sweep_interval: Duration::from_secs(self.sweep_interval_secs),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: retry_constants::MAX_RETRIES,
            initial_backoff_ms: retry_constants::INITIAL_BACKOFF_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MonitorSettings {
    pub health_interval_secs: u64,
    pub max_samples: usize,
}

impl MonitorSettings {
    pub fn health_interval(&self) -> Duration {
        Duration::from_secs(self.health_interval_secs)
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            health_interval_secs: monitor_constants::HEALTH_INTERVAL_SECS,
            max_samples: monitor_constants::MAX_SAMPLES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ai.max_tokens, 2048);
        assert_eq!(config.ai.openai.model, "gpt-4");
        assert_eq!(config.test_framework.framework, TestFrameworkKind::Jest);
    }

    #[test]
    fn test_temperature_out_of_range() {
        let mut config = Config::default();
        config.ai.temperature = 3.5;
        assert!(matches!(config.validate(), Err(TestWeaveError::Config(_))));
    }

    #[test]
    fn test_unknown_provider_fails_validation() {
        let mut config = Config::default();
        config.ai.provider = "ollama".to_string();
        assert!(matches!(
            config.validate(),
            Err(TestWeaveError::UnsupportedProvider(_))
        ));
    }

    #[test]
    fn test_azure_requires_endpoint_and_deployment() {
        let mut config = Config::default();
        config.ai.provider = "azure".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Azure endpoint is required"));

        config.ai.azure.endpoint = "https://res.openai.azure.com".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("deployment name"));

        config.ai.azure.deployment_name = "tests".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_google_requires_project() {
        let mut config = Config::default();
        config.ai.provider = "google".to_string();
        assert!(config.validate().is_err());

        config.ai.google.project = "my-project".to_string();
        let provider = config.ai.provider_config().unwrap();
        assert_eq!(provider.kind(), ProviderKind::Google);
        assert_eq!(provider.settings.model(), "gemini-pro");
    }

    #[test]
    fn test_blank_optional_fields_are_dropped() {
        let mut config = Config::default();
        config.ai.openai.organization_id = Some("  ".to_string());
        let provider = config.ai.provider_config().unwrap();
        match provider.settings {
            ProviderSettings::OpenAi {
                organization_id, ..
            } => assert!(organization_id.is_none()),
            other => panic!("unexpected settings: {:?}", other),
        }
    }
}
