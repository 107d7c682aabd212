pub mod error;
pub mod generation;
pub mod provider;

pub use error::{ErrorClassifier, ErrorKind, ErrorRecord, Result, TestWeaveError};
pub use generation::{
    CoverageEstimate, GenerationDefaults, GenerationParams, GenerationRequest, GenerationResult,
};
pub use provider::{CredentialKey, ProviderConfig, ProviderKind, ProviderSettings};
