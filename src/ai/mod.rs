//! AI Integration Layer
//!
//! Provider adapters, response parsing, error recovery and the orchestrator
//! that ties them together.

pub mod orchestrator;
pub mod provider;
pub mod recovery;
pub mod response;
pub mod timeout;

pub use orchestrator::{Orchestrator, OrchestratorBuilder, OrchestratorProbe, ResultCache};
pub use provider::{
    AzureProvider, ClaudeProvider, GoogleProvider, OpenAiProvider, ProviderConstructor,
    ProviderRegistry, SharedProvider, TestGenerator, build_prompt, normalize_error,
};
pub use recovery::{RecoveryEngine, RetryPolicy};
pub use response::ResponseParser;
pub use timeout::{with_timeout, with_timeout_map};
