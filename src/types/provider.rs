//! Provider identity and per-kind settings.
//!
//! The provider set is closed: adding a backend means adding a variant here,
//! and every `match` over `ProviderKind` must then handle it.

use serde::{Deserialize, Serialize};

use super::error::{Result, TestWeaveError};

/// Closed enumeration of supported backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAi,
    Azure,
    Google,
    Claude,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::OpenAi,
        ProviderKind::Azure,
        ProviderKind::Google,
        ProviderKind::Claude,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Azure => "azure",
            ProviderKind::Google => "google",
            ProviderKind::Claude => "claude",
        }
    }

    /// Credential reference holding this provider's API key
    pub fn credential_key(&self) -> CredentialKey {
        match self {
            ProviderKind::OpenAi => CredentialKey::OpenAiApiKey,
            ProviderKind::Azure => CredentialKey::AzureApiKey,
            ProviderKind::Google => CredentialKey::GoogleApiKey,
            ProviderKind::Claude => CredentialKey::ClaudeApiKey,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = TestWeaveError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "azure" => Ok(ProviderKind::Azure),
            "google" => Ok(ProviderKind::Google),
            "claude" => Ok(ProviderKind::Claude),
            _ => Err(TestWeaveError::UnsupportedProvider(format!(
                "{}. Supported: openai, azure, google, claude",
                s
            ))),
        }
    }
}

/// Opaque reference to a secret; never the secret itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CredentialKey {
    OpenAiApiKey,
    AzureApiKey,
    GoogleApiKey,
    ClaudeApiKey,
}

impl CredentialKey {
    pub const ALL: [CredentialKey; 4] = [
        CredentialKey::OpenAiApiKey,
        CredentialKey::AzureApiKey,
        CredentialKey::GoogleApiKey,
        CredentialKey::ClaudeApiKey,
    ];

    /// Storage key name
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialKey::OpenAiApiKey => "openai.api_key",
            CredentialKey::AzureApiKey => "azure.api_key",
            CredentialKey::GoogleApiKey => "google.api_key",
            CredentialKey::ClaudeApiKey => "claude.api_key",
        }
    }

    /// Conventional environment variable for the secret
    pub fn env_var(&self) -> &'static str {
        match self {
            CredentialKey::OpenAiApiKey => "OPENAI_API_KEY",
            CredentialKey::AzureApiKey => "AZURE_OPENAI_API_KEY",
            CredentialKey::GoogleApiKey => "GOOGLE_API_KEY",
            CredentialKey::ClaudeApiKey => "ANTHROPIC_API_KEY",
        }
    }
}

impl std::fmt::Display for CredentialKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific fields; exactly one kind's fields exist per config
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProviderSettings {
    #[serde(rename = "openai")]
    OpenAi {
        model: String,
        organization_id: Option<String>,
        api_base: Option<String>,
    },
    Azure {
        endpoint: String,
        deployment_name: String,
        api_version: String,
    },
    Google {
        model: String,
        project: String,
        location: String,
        api_base: Option<String>,
    },
    Claude {
        model: String,
        organization_id: Option<String>,
        api_base: Option<String>,
    },
}

impl ProviderSettings {
    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderSettings::OpenAi { .. } => ProviderKind::OpenAi,
            ProviderSettings::Azure { .. } => ProviderKind::Azure,
            ProviderSettings::Google { .. } => ProviderKind::Google,
            ProviderSettings::Claude { .. } => ProviderKind::Claude,
        }
    }

    /// Model (or deployment) name used for logging and cache keys
    pub fn model(&self) -> &str {
        match self {
            ProviderSettings::OpenAi { model, .. }
            | ProviderSettings::Google { model, .. }
            | ProviderSettings::Claude { model, .. } => model,
            ProviderSettings::Azure {
                deployment_name, ..
            } => deployment_name,
        }
    }
}

/// Resolved configuration of the active provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderConfig {
    pub credential: CredentialKey,
    pub settings: ProviderSettings,
    /// HTTP timeout for vendor requests (seconds)
    pub timeout_secs: u64,
}

impl ProviderConfig {
    pub fn new(settings: ProviderSettings, timeout_secs: u64) -> Self {
        Self {
            credential: settings.kind().credential_key(),
            settings,
            timeout_secs,
        }
    }

    pub fn kind(&self) -> ProviderKind {
        self.settings.kind()
    }
}
