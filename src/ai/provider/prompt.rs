//! Prompt template shared by every backend.

use crate::types::GenerationRequest;

/// System role sent alongside the user prompt
pub const SYSTEM_PROMPT: &str = "You are a senior software engineer specializing in test automation. \
Generate comprehensive unit tests following best practices and the specified test framework patterns.";

pub const GENERATION_REQUIREMENTS: [&str; 5] = [
    "Use best practices for unit testing",
    "Ensure comprehensive test coverage",
    "Include edge cases and error scenarios",
    "Follow the existing test patterns if present",
    "Add necessary imports and setup code",
];

/// Source, optional existing tests, requirements, then the caller's instruction
pub fn build_prompt(request: &GenerationRequest) -> String {
    let mut prompt = format!(
        "Please generate unit tests for the following code:\n\nSOURCE CODE:\n```\n{}\n```\n\n",
        request.source_code
    );

    if let Some(existing) = request
        .existing_tests
        .as_deref()
        .filter(|t| !t.trim().is_empty())
    {
        prompt.push_str(&format!("EXISTING TESTS:\n```\n{}\n```\n\n", existing));
    }

    prompt.push_str("Requirements:\n");
    for (i, requirement) in GENERATION_REQUIREMENTS.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, requirement));
    }

    prompt.push('\n');
    prompt.push_str(&request.prompt);
    prompt.push('\n');
    prompt
}
