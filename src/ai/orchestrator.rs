//! Generation Orchestrator
//!
//! Owns the active provider and runs every request through the result cache
//! and the recovery engine.
//!
//! ## Provider lifecycle
//!
//! - The provider is built lazily on first use (or by `initialize`)
//! - `reinitialize` rebuilds from the current config snapshot and swaps the
//!   slot in one write; in-flight calls keep their own `Arc` to the old one
//! - Construction is serialized by an async mutex so concurrent first calls
//!   build exactly one provider
//! - Construction failures (unknown kind, missing key, failed validation) are
//!   logged and surfaced as `Fatal` without retrying

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::provider::{ProviderRegistry, SharedProvider, normalize_error};
use super::recovery::{RecoveryEngine, RetryPolicy};
use super::timeout::with_timeout;
use crate::cache::TtlCache;
use crate::config::SharedConfig;
use crate::credentials::{EnvCredentialStore, SharedCredentials};
use crate::logging::tracing_sink;
use crate::monitor::{HealthProbe, ProbeReport};
use crate::types::{
    GenerationParams, GenerationRequest, GenerationResult, ProviderKind, Result, TestWeaveError,
};

/// Recovery context label for provider construction
pub const INIT_CONTEXT: &str = "initialize";
/// Recovery context label for generation calls
pub const GENERATE_CONTEXT: &str = "generateTests";

pub type ResultCache = TtlCache<GenerationResult>;

/// Front door for test generation
pub struct Orchestrator {
    config: SharedConfig,
    credentials: SharedCredentials,
    registry: ProviderRegistry,
    recovery: RecoveryEngine,
    cache: Option<Arc<ResultCache>>,
    active: RwLock<Option<SharedProvider>>,
    init_lock: Mutex<()>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("registry", &self.registry)
            .field("recovery", &self.recovery)
            .field("cache", &self.cache)
            .field("current_provider", &self.current_provider())
            .finish()
    }
}

impl Orchestrator {
    pub fn builder(config: SharedConfig) -> OrchestratorBuilder {
        OrchestratorBuilder::new(config)
    }

    /// Active provider, if one has been built
    pub fn provider(&self) -> Option<SharedProvider> {
        self.active
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn current_provider(&self) -> Option<ProviderKind> {
        self.provider().map(|p| p.kind())
    }

    pub fn recovery(&self) -> &RecoveryEngine {
        &self.recovery
    }

    /// Build the provider from the current config, replacing any active one
    pub async fn initialize(&self) -> Result<ProviderKind> {
        let _guard = self.init_lock.lock().await;
        let provider = self.install().await?;
        Ok(provider.kind())
    }

    /// Rebuild after a configuration change. On failure the previous
    /// provider stays active.
    pub async fn reinitialize(&self) -> Result<ProviderKind> {
        info!(previous = ?self.current_provider(), "Reinitializing provider");
        self.initialize().await
    }

    /// Generate tests with the active provider, building it on first use
    #[instrument(
        skip(self, request),
        fields(request_id = %Uuid::new_v4(), provider = tracing::field::Empty)
    )]
    pub async fn generate_tests(&self, request: GenerationRequest) -> Result<GenerationResult> {
        let provider = self.ensure_provider().await?;
        tracing::Span::current().record("provider", provider.kind().as_str());

        let snapshot = self.config.snapshot();
        let defaults = snapshot.ai.defaults();
        let params = GenerationParams::merge(&request, &defaults);

        let cache = self.cache.as_ref().filter(|_| snapshot.cache.enabled);
        let key = cache_key(&provider, &request, &params)?;
        if let Some(cache) = cache
            && let Some(hit) = cache.get(&key)
        {
            debug!(key = %key, "Result cache hit");
            return Ok(hit);
        }

        let timeout = snapshot.ai.timeout();
        let request = &request;
        let result = self
            .recovery
            .execute(GENERATE_CONTEXT, || {
                let provider = Arc::clone(&provider);
                async move {
                    with_timeout(
                        timeout,
                        provider.generate_tests(request, &defaults),
                        GENERATE_CONTEXT,
                    )
                    .await
                    .map_err(|e| normalize_error(provider.kind(), e))
                }
            })
            .await?;

        if let Some(cache) = cache {
            cache.set(key, result.clone());
        }

        Ok(result)
    }

    /// Validate the active provider, building it first if needed.
    /// `false` when construction or validation fails.
    pub async fn validate_current_provider(&self) -> bool {
        if let Some(provider) = self.provider() {
            return provider.validate_config().await;
        }
        // Installing validates, so a fresh provider needs no second round-trip
        match self.ensure_provider().await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Provider could not be initialized for validation");
                false
            }
        }
    }

    async fn ensure_provider(&self) -> Result<SharedProvider> {
        if let Some(provider) = self.provider() {
            return Ok(provider);
        }

        let _guard = self.init_lock.lock().await;
        // Another caller may have finished while we waited
        if let Some(provider) = self.provider() {
            return Ok(provider);
        }
        self.install().await
    }

    /// Build and swap in; caller holds `init_lock`
    async fn install(&self) -> Result<SharedProvider> {
        let provider = self
            .build_provider()
            .await
            .map_err(|e| self.recovery.fail(e, INIT_CONTEXT))?;

        *self.active.write().unwrap_or_else(|p| p.into_inner()) = Some(Arc::clone(&provider));
        info!(provider = %provider.kind(), model = provider.model(), "Provider active");
        Ok(provider)
    }

    async fn build_provider(&self) -> Result<SharedProvider> {
        let snapshot = self.config.snapshot();
        let provider_config = snapshot.ai.provider_config()?;
        let kind = provider_config.kind();

        let api_key = self
            .credentials
            .get_credential(provider_config.credential)
            .await
            .ok_or_else(|| TestWeaveError::MissingCredential(kind.to_string()))?;

        let provider = self.registry.create(&provider_config, api_key)?;

        if !provider.validate_config().await {
            return Err(TestWeaveError::InvalidProviderConfig(kind.to_string()));
        }

        Ok(provider)
    }
}

#[derive(Serialize)]
struct CacheKeyInput<'a> {
    provider: ProviderKind,
    model: &'a str,
    request: &'a GenerationRequest,
    params: &'a GenerationParams,
}

/// SHA-256 over provider identity, request and effective params
fn cache_key(
    provider: &SharedProvider,
    request: &GenerationRequest,
    params: &GenerationParams,
) -> Result<String> {
    let input = CacheKeyInput {
        provider: provider.kind(),
        model: provider.model(),
        request,
        params,
    };
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(&input)?);
    Ok(format!("{:x}", hasher.finalize()))
}

// =============================================================================
// Builder
// =============================================================================

/// Assembles an [`Orchestrator`]; everything but the config source has a default
pub struct OrchestratorBuilder {
    config: SharedConfig,
    credentials: Option<SharedCredentials>,
    registry: Option<ProviderRegistry>,
    recovery: Option<RecoveryEngine>,
    cache: Option<Arc<ResultCache>>,
}

impl OrchestratorBuilder {
    pub fn new(config: SharedConfig) -> Self {
        Self {
            config,
            credentials: None,
            registry: None,
            recovery: None,
            cache: None,
        }
    }

    pub fn credentials(mut self, credentials: SharedCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn recovery(mut self, recovery: RecoveryEngine) -> Self {
        self.recovery = Some(recovery);
        self
    }

    pub fn cache(mut self, cache: Arc<ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Defaults: env credentials, standard registry, tracing-backed recovery
    /// using the configured retry policy, no cache
    pub fn build(self) -> Orchestrator {
        let recovery = self.recovery.unwrap_or_else(|| {
            let retry = self.config.snapshot().retry;
            RecoveryEngine::with_policy(tracing_sink(), RetryPolicy::from(&retry))
        });

        Orchestrator {
            credentials: self
                .credentials
                .unwrap_or_else(|| Arc::new(EnvCredentialStore)),
            registry: self.registry.unwrap_or_else(ProviderRegistry::standard),
            recovery,
            cache: self.cache,
            config: self.config,
            active: RwLock::new(None),
            init_lock: Mutex::new(()),
        }
    }
}

// =============================================================================
// Health
// =============================================================================

/// Health probe for the `AIService` entry
pub struct OrchestratorProbe {
    orchestrator: Arc<Orchestrator>,
}

impl OrchestratorProbe {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }
}

#[async_trait]
impl HealthProbe for OrchestratorProbe {
    async fn probe(&self) -> Result<ProbeReport> {
        let Some(kind) = self.orchestrator.current_provider() else {
            return Ok(ProbeReport::degraded("No active provider"));
        };
        if self.orchestrator.validate_current_provider().await {
            Ok(ProbeReport::healthy().with_details(format!("{} provider reachable", kind)))
        } else {
            Ok(ProbeReport::unhealthy(format!(
                "{} provider failed validation",
                kind
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::TestGenerator;
    use crate::cache::CacheConfig;
    use crate::config::{Config, InMemoryConfigSource};
    use crate::credentials::MemoryCredentialStore;
    use crate::logging::MemorySink;
    use crate::monitor::HealthStatus;
    use crate::types::{CredentialKey, ErrorKind};
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::Notify;

    /// Scripted backend: optional gate, per-call replies, recorded params
    struct StubGenerator {
        kind: ProviderKind,
        reply: String,
        valid: bool,
        failures_before_success: u32,
        calls: AtomicU32,
        params: StdMutex<Vec<GenerationParams>>,
        started: Option<Arc<Notify>>,
        gate: Option<Arc<Notify>>,
    }

    impl StubGenerator {
        fn new(kind: ProviderKind, reply: &str) -> Self {
            Self {
                kind,
                reply: reply.to_string(),
                valid: true,
                failures_before_success: 0,
                calls: AtomicU32::new(0),
                params: StdMutex::new(Vec::new()),
                started: None,
                gate: None,
            }
        }
    }

    #[async_trait]
    impl TestGenerator for StubGenerator {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        fn model(&self) -> &str {
            "stub"
        }

        async fn complete(&self, _prompt: &str, params: GenerationParams) -> Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.params.lock().unwrap().push(params);
            if let Some(started) = &self.started {
                started.notify_one();
            }
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if n <= self.failures_before_success {
                return Err(TestWeaveError::generation(
                    self.kind.as_str(),
                    "connection reset by peer",
                ));
            }
            Ok(self.reply.clone())
        }

        async fn validate_config(&self) -> bool {
            self.valid
        }
    }

    struct Harness {
        orchestrator: Arc<Orchestrator>,
        source: Arc<InMemoryConfigSource>,
        sink: Arc<MemorySink>,
    }

    fn harness(registry: ProviderRegistry, cache: Option<Arc<ResultCache>>) -> Harness {
        let source = Arc::new(InMemoryConfigSource::new(Config::default()));
        let sink = Arc::new(MemorySink::new());
        let credentials = MemoryCredentialStore::new()
            .with(CredentialKey::OpenAiApiKey, "sk-openai")
            .with(CredentialKey::ClaudeApiKey, "sk-claude");

        let mut builder = Orchestrator::builder(source.clone())
            .credentials(Arc::new(credentials))
            .registry(registry)
            .recovery(RecoveryEngine::new(sink.clone()));
        if let Some(cache) = cache {
            builder = builder.cache(cache);
        }

        Harness {
            orchestrator: Arc::new(builder.build()),
            source,
            sink,
        }
    }

    fn registry_with(stub: Arc<StubGenerator>) -> ProviderRegistry {
        let kind = stub.kind;
        ProviderRegistry::empty().with(kind, move |_, _| Ok(stub.clone() as SharedProvider))
    }

    #[tokio::test]
    async fn test_end_to_end_generation() {
        let stub = Arc::new(StubGenerator::new(
            ProviderKind::OpenAi,
            "import { add } from './add';\n// checks addition\ntest('adds', () => { add(1, 2); });",
        ));
        let h = harness(registry_with(stub), None);

        let request = GenerationRequest::new("cover edge cases", "function add(a,b){return a+b}");
        let result = h.orchestrator.generate_tests(request).await.unwrap();

        assert_eq!(result.suggested_imports.len(), 1);
        assert_eq!(result.estimated_coverage(), Some(5));
        assert!(!result.explanation.unwrap_or_default().is_empty());
        assert_eq!(h.orchestrator.current_provider(), Some(ProviderKind::OpenAi));
    }

    #[tokio::test]
    async fn test_caller_params_override_config_defaults() {
        let stub = Arc::new(StubGenerator::new(ProviderKind::OpenAi, "test('a', () => {});"));
        let h = harness(registry_with(stub.clone()), None);
        h.source
            .modify(|c| {
                c.ai.max_tokens = 1000;
                c.ai.temperature = 0.3;
            })
            .unwrap();

        let request = GenerationRequest::new("p", "s").with_max_tokens(64);
        h.orchestrator.generate_tests(request).await.unwrap();

        let params = stub.params.lock().unwrap().clone();
        assert_eq!(
            params,
            vec![GenerationParams {
                max_tokens: 64,
                temperature: 0.3
            }]
        );
    }

    #[tokio::test]
    async fn test_missing_credential_is_fatal() {
        let stub = Arc::new(StubGenerator::new(ProviderKind::Google, "unused"));
        let h = harness(registry_with(stub), None);
        h.source
            .modify(|c| {
                c.ai.provider = "google".to_string();
                c.ai.google.project = "acme".to_string();
            })
            .unwrap();

        let err = h
            .orchestrator
            .generate_tests(GenerationRequest::new("p", "s"))
            .await
            .unwrap_err();

        match &err {
            TestWeaveError::Fatal { record, attempts } => {
                assert_eq!(*attempts, 0);
                assert_eq!(record.kind, ErrorKind::PlatformApi);
                assert_eq!(record.context, INIT_CONTEXT);
                assert_eq!(record.message, "API key not found for provider: google");
            }
            other => panic!("expected Fatal, got {:?}", other),
        }
        assert_eq!(h.sink.count_prefix("[FATAL]"), 1);
        assert_eq!(h.orchestrator.current_provider(), None);
    }

    #[tokio::test]
    async fn test_failed_validation_is_fatal() {
        let mut stub = StubGenerator::new(ProviderKind::OpenAi, "unused");
        stub.valid = false;
        let stub = Arc::new(stub);
        let h = harness(registry_with(stub.clone()), None);

        let err = h.orchestrator.initialize().await.unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("Invalid configuration for provider: openai"));
        assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unregistered_kind_is_fatal() {
        let h = harness(ProviderRegistry::empty(), None);
        let err = h.orchestrator.initialize().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PlatformApi);
        assert!(err.to_string().contains("Unsupported provider: openai"));
    }

    #[tokio::test]
    async fn test_cache_hit_skips_provider() {
        let stub = Arc::new(StubGenerator::new(ProviderKind::OpenAi, "test('a', () => {});"));
        let cache = Arc::new(TtlCache::new(CacheConfig::default().default_ttl));
        let h = harness(registry_with(stub.clone()), Some(cache.clone()));

        let first = h
            .orchestrator
            .generate_tests(GenerationRequest::new("p", "s"))
            .await
            .unwrap();
        let second = h
            .orchestrator
            .generate_tests(GenerationRequest::new("p", "s"))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.size(), 1);

        // Different params, different key
        h.orchestrator
            .generate_tests(GenerationRequest::new("p", "s").with_temperature(0.1))
            .await
            .unwrap();
        assert_eq!(stub.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_is_recovered() {
        let mut stub = StubGenerator::new(ProviderKind::OpenAi, "test('a', () => {});");
        stub.failures_before_success = 1;
        let stub = Arc::new(stub);
        let h = harness(registry_with(stub.clone()), None);

        let result = h
            .orchestrator
            .generate_tests(GenerationRequest::new("p", "s"))
            .await
            .unwrap();

        assert_eq!(result.test_code, "test('a', () => {});");
        assert_eq!(stub.calls.load(Ordering::SeqCst), 2);
        assert_eq!(h.sink.count_prefix("[RECOVERED]"), 1);
    }

    #[tokio::test]
    async fn test_switch_provider_while_call_in_flight() {
        let started = Arc::new(Notify::new());
        let gate = Arc::new(Notify::new());
        let mut openai = StubGenerator::new(ProviderKind::OpenAi, "test('from openai', () => {});");
        openai.started = Some(started.clone());
        openai.gate = Some(gate.clone());
        let openai = Arc::new(openai);
        let claude = Arc::new(StubGenerator::new(
            ProviderKind::Claude,
            "test('from claude', () => {});",
        ));

        let registry = registry_with(openai.clone())
            .with(ProviderKind::Claude, move |_, _| Ok(claude.clone() as SharedProvider));
        let h = harness(registry, None);

        let orchestrator = h.orchestrator.clone();
        let in_flight = tokio::spawn(async move {
            orchestrator
                .generate_tests(GenerationRequest::new("p", "s"))
                .await
        });

        started.notified().await;
        h.source
            .modify(|c| c.ai.provider = "claude".to_string())
            .unwrap();
        assert_eq!(
            h.orchestrator.reinitialize().await.unwrap(),
            ProviderKind::Claude
        );
        assert_eq!(h.orchestrator.current_provider(), Some(ProviderKind::Claude));

        gate.notify_one();
        let old = in_flight.await.unwrap().unwrap();
        assert!(old.test_code.contains("from openai"));

        let new = h
            .orchestrator
            .generate_tests(GenerationRequest::new("p", "s"))
            .await
            .unwrap();
        assert!(new.test_code.contains("from claude"));
    }

    #[tokio::test]
    async fn test_failed_reinitialize_keeps_previous_provider() {
        let stub = Arc::new(StubGenerator::new(ProviderKind::OpenAi, "test('a', () => {});"));
        let h = harness(registry_with(stub), None);
        h.orchestrator.initialize().await.unwrap();

        // Claude has a key but no registered constructor
        h.source
            .modify(|c| c.ai.provider = "claude".to_string())
            .unwrap();
        assert!(h.orchestrator.reinitialize().await.is_err());
        assert_eq!(h.orchestrator.current_provider(), Some(ProviderKind::OpenAi));
    }

    #[tokio::test]
    async fn test_concurrent_first_calls_build_once() {
        let built = Arc::new(AtomicU32::new(0));
        let counter = built.clone();
        let registry = ProviderRegistry::empty().with(ProviderKind::OpenAi, move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(StubGenerator::new(ProviderKind::OpenAi, "test('a', () => {});"))
                as SharedProvider)
        });
        let h = harness(registry, None);

        let calls = (0..8).map(|_| {
            let orchestrator = h.orchestrator.clone();
            tokio::spawn(async move {
                orchestrator
                    .generate_tests(GenerationRequest::new("p", "s"))
                    .await
            })
        });
        for result in futures::future::join_all(calls).await {
            assert!(result.unwrap().is_ok());
        }
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_validate_builds_provider_lazily() {
        let stub = Arc::new(StubGenerator::new(ProviderKind::OpenAi, "x"));
        let h = harness(registry_with(stub.clone()), None);

        assert!(h.orchestrator.current_provider().is_none());
        assert!(h.orchestrator.validate_current_provider().await);
        assert_eq!(h.orchestrator.current_provider(), Some(ProviderKind::OpenAi));
        assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_validate_false_when_lazy_build_fails() {
        let mut stub = StubGenerator::new(ProviderKind::OpenAi, "x");
        stub.valid = false;
        let h = harness(registry_with(Arc::new(stub)), None);

        assert!(!h.orchestrator.validate_current_provider().await);
        assert!(h.orchestrator.current_provider().is_none());
        assert_eq!(h.sink.count_prefix("[FATAL]"), 1);
    }

    #[tokio::test]
    async fn test_probe_states() {
        let stub = Arc::new(StubGenerator::new(ProviderKind::OpenAi, "x"));
        let h = harness(registry_with(stub), None);
        let probe = OrchestratorProbe::new(h.orchestrator.clone());

        assert_eq!(probe.probe().await.unwrap().status, HealthStatus::Degraded);

        h.orchestrator.initialize().await.unwrap();
        assert_eq!(probe.probe().await.unwrap().status, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn test_probe_unhealthy_when_validation_fails() {
        let valid = Arc::new(std::sync::atomic::AtomicBool::new(true));
        struct Flaky(Arc<std::sync::atomic::AtomicBool>);

        #[async_trait]
        impl TestGenerator for Flaky {
            fn kind(&self) -> ProviderKind {
                ProviderKind::OpenAi
            }
            fn model(&self) -> &str {
                "flaky"
            }
            async fn complete(&self, _: &str, _: GenerationParams) -> Result<String> {
                Ok(String::new())
            }
            async fn validate_config(&self) -> bool {
                self.0.load(Ordering::SeqCst)
            }
        }

        let flag = valid.clone();
        let registry = ProviderRegistry::empty().with(ProviderKind::OpenAi, move |_, _| {
            Ok(Arc::new(Flaky(flag.clone())) as SharedProvider)
        });
        let h = harness(registry, None);
        h.orchestrator.initialize().await.unwrap();

        valid.store(false, Ordering::SeqCst);
        let report = OrchestratorProbe::new(h.orchestrator.clone())
            .probe()
            .await
            .unwrap();
        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert!(!h.orchestrator.validate_current_provider().await);
    }

    #[test]
    fn test_cache_key_is_stable_and_sensitive() {
        let provider: SharedProvider = Arc::new(StubGenerator::new(ProviderKind::OpenAi, "x"));
        let request = GenerationRequest::new("p", "s");
        let params = GenerationParams {
            max_tokens: 10,
            temperature: 0.5,
        };
        let a = cache_key(&provider, &request, &params).unwrap();
        let b = cache_key(&provider, &request, &params).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let other = GenerationRequest::new("p", "different source");
        assert_ne!(a, cache_key(&provider, &other, &params).unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_timeout_is_retried_then_fatal() {
        let stub = Arc::new(StubGenerator {
            gate: Some(Arc::new(Notify::new())),
            ..StubGenerator::new(ProviderKind::OpenAi, "never")
        });
        let h = harness(registry_with(stub.clone()), None);
        h.source.modify(|c| c.ai.timeout_secs = 1).unwrap();

        let err = h
            .orchestrator
            .generate_tests(GenerationRequest::new("p", "s"))
            .await
            .unwrap_err();

        match err {
            TestWeaveError::Fatal { record, attempts } => {
                assert_eq!(record.kind, ErrorKind::Network);
                assert_eq!(attempts, 3);
            }
            other => panic!("expected Fatal, got {:?}", other),
        }
        // Initial call plus three retries, each cut off by the timeout
        assert_eq!(stub.calls.load(Ordering::SeqCst), 4);
    }
}
