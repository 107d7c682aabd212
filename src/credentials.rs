//! Credential Stores
//!
//! Secrets are resolved through a narrow async interface so the orchestrator
//! never depends on where they live. Values are held as `SecretString` and
//! redacted from debug output.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use secrecy::SecretString;
use tracing::debug;

use crate::types::{CredentialKey, ProviderKind};

/// Source of provider secrets
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get_credential(&self, key: CredentialKey) -> Option<SecretString>;

    /// API key for a provider kind
    async fn provider_api_key(&self, kind: ProviderKind) -> Option<SecretString> {
        self.get_credential(kind.credential_key()).await
    }

    async fn has_credential(&self, key: CredentialKey) -> bool {
        self.get_credential(key).await.is_some()
    }
}

pub type SharedCredentials = Arc<dyn CredentialStore>;

/// Reads secrets from conventional environment variables
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentialStore;

#[async_trait]
impl CredentialStore for EnvCredentialStore {
    async fn get_credential(&self, key: CredentialKey) -> Option<SecretString> {
        let value = std::env::var(key.env_var()).ok()?;
        if value.trim().is_empty() {
            debug!(key = %key, "Credential env var is empty");
            return None;
        }
        Some(SecretString::from(value))
    }
}

/// In-process secret store
#[derive(Default)]
pub struct MemoryCredentialStore {
    secrets: DashMap<CredentialKey, SecretString>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(self, key: CredentialKey, value: impl Into<String>) -> Self {
        self.store(key, value);
        self
    }

    pub fn store(&self, key: CredentialKey, value: impl Into<String>) {
        self.secrets.insert(key, SecretString::from(value.into()));
    }

    pub fn delete(&self, key: CredentialKey) {
        self.secrets.remove(&key);
    }

    /// Remove every known secret
    pub fn clear(&self) {
        for key in CredentialKey::ALL {
            self.delete(key);
        }
    }
}

impl std::fmt::Debug for MemoryCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys: Vec<&str> = self.secrets.iter().map(|e| e.key().as_str()).collect();
        f.debug_struct("MemoryCredentialStore")
            .field("keys", &keys)
            .finish()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get_credential(&self, key: CredentialKey) -> Option<SecretString> {
        self.secrets.get(&key).map(|entry| entry.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[tokio::test]
    async fn test_memory_store_lifecycle() {
        let store = MemoryCredentialStore::new().with(CredentialKey::OpenAiApiKey, "sk-test");

        let key = store.provider_api_key(ProviderKind::OpenAi).await.unwrap();
        assert_eq!(key.expose_secret(), "sk-test");
        assert!(!store.has_credential(CredentialKey::ClaudeApiKey).await);

        store.delete(CredentialKey::OpenAiApiKey);
        assert!(!store.has_credential(CredentialKey::OpenAiApiKey).await);
    }

    #[tokio::test]
    async fn test_memory_store_clear() {
        let store = MemoryCredentialStore::new()
            .with(CredentialKey::AzureApiKey, "a")
            .with(CredentialKey::GoogleApiKey, "g");
        store.clear();
        for key in CredentialKey::ALL {
            assert!(!store.has_credential(key).await);
        }
    }

    #[test]
    fn test_debug_redacts_values() {
        let store = MemoryCredentialStore::new().with(CredentialKey::ClaudeApiKey, "secret-value");
        let debug = format!("{:?}", store);
        assert!(debug.contains("claude.api_key"));
        assert!(!debug.contains("secret-value"));
    }
}
