//! Generation request/result types shared by providers and the orchestrator.

use serde::{Deserialize, Serialize};

/// A single test-generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// Free-text instruction appended to the prompt
    pub prompt: String,
    /// Source code under test
    pub source_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_tests: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, source_code: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            source_code: source_code.into(),
            existing_tests: None,
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_existing_tests(mut self, tests: impl Into<String>) -> Self {
        self.existing_tests = Some(tests.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Configured fallbacks for request parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationDefaults {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            max_tokens: crate::constants::ai::DEFAULT_MAX_TOKENS,
            temperature: crate::constants::ai::DEFAULT_TEMPERATURE,
        }
    }
}

/// Parameters actually sent to a vendor
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenerationParams {
    /// Caller-supplied values win; defaults fill the gaps
    pub fn merge(request: &GenerationRequest, defaults: &GenerationDefaults) -> Self {
        Self {
            max_tokens: request.max_tokens.unwrap_or(defaults.max_tokens),
            temperature: request.temperature.unwrap_or(defaults.temperature),
        }
    }
}

/// Approximate coverage signal derived from test-construct counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageEstimate {
    /// 0-100, heuristic only
    pub estimated_coverage: u8,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uncovered_paths: Vec<String>,
}

/// Structured output of one generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub test_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    /// Insertion order preserved, duplicates allowed
    #[serde(default)]
    pub suggested_imports: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<CoverageEstimate>,
}

impl GenerationResult {
    pub fn estimated_coverage(&self) -> Option<u8> {
        self.coverage.as_ref().map(|c| c.estimated_coverage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_caller_values_win() {
        let request = GenerationRequest::new("p", "s")
            .with_max_tokens(100)
            .with_temperature(0.1);
        let defaults = GenerationDefaults {
            max_tokens: 2048,
            temperature: 0.7,
        };
        let params = GenerationParams::merge(&request, &defaults);
        assert_eq!(params.max_tokens, 100);
        assert_eq!(params.temperature, 0.1);
    }

    #[test]
    fn test_merge_falls_back_to_defaults() {
        let request = GenerationRequest::new("p", "s");
        let defaults = GenerationDefaults {
            max_tokens: 2048,
            temperature: 0.7,
        };
        let params = GenerationParams::merge(&request, &defaults);
        assert_eq!(params.max_tokens, 2048);
        assert_eq!(params.temperature, 0.7);
    }

    #[test]
    fn test_request_deserializes_camel_case() {
        let request: GenerationRequest = serde_json::from_str(
            r#"{"prompt":"cover edge cases","sourceCode":"function add(a,b){return a+b}"}"#,
        )
        .unwrap();
        assert_eq!(request.prompt, "cover edge cases");
        assert!(request.existing_tests.is_none());
    }
}
