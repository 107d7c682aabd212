//! Generate Command
//!
//! Generate tests for a source file with the configured provider.
//!
//! Usage:
//!   testweave generate src/math.ts [--prompt "..."] [--existing math.test.ts]
//!                      [--provider claude] [--output out.test.ts] [--json]

use std::path::PathBuf;

use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, read_source};
use crate::types::{GenerationRequest, GenerationResult, ProviderKind, Result};

/// Monitor operation name for generation calls
const GENERATE_OPERATION: &str = "generateTests";

pub struct GenerateOptions {
    pub source: PathBuf,
    pub prompt: Option<String>,
    pub existing: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub provider: Option<ProviderKind>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub json: bool,
    pub quiet: bool,
}

pub async fn run(options: GenerateOptions) -> Result<()> {
    let out = Output::quiet(options.quiet || options.json);
    let request = build_request(&options)?;

    let ctx = CommandContext::load(options.provider)?;
    let kind = ctx.orchestrator.initialize().await?;
    out.info(&format!(
        "Generating tests for {} with {}",
        options.source.display(),
        kind
    ));

    let result = ctx
        .monitor
        .track_performance(GENERATE_OPERATION, ctx.orchestrator.generate_tests(request))
        .await?;

    if options.json {
        out.raw(&serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let rendered = render_test_file(&result);
    match &options.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &rendered)?;
            out.success(&format!("Wrote {}", path.display()));
        }
        None => out.raw(&rendered),
    }

    if let Some(coverage) = result.estimated_coverage() {
        out.field("Coverage", format!("~{}%", coverage));
    }
    out.field("Imports", result.suggested_imports.len());
    if let Some(explanation) = &result.explanation {
        out.header("Explanation");
        out.info(explanation);
    }
    if let Some(sample) = ctx.monitor.samples().last() {
        out.field("Duration", format!("{}ms", sample.duration_ms));
    }

    Ok(())
}

fn build_request(options: &GenerateOptions) -> Result<GenerationRequest> {
    let source_code = read_source(&options.source)?;
    let prompt = options
        .prompt
        .clone()
        .unwrap_or_else(|| format!("Write unit tests for {}", options.source.display()));

    let mut request = GenerationRequest::new(prompt, source_code);
    if let Some(path) = &options.existing {
        request = request.with_existing_tests(read_source(path)?);
    }
    if let Some(max_tokens) = options.max_tokens {
        request = request.with_max_tokens(max_tokens);
    }
    if let Some(temperature) = options.temperature {
        request = request.with_temperature(temperature);
    }
    Ok(request)
}

/// Imports first, then the test body
fn render_test_file(result: &GenerationResult) -> String {
    if result.suggested_imports.is_empty() {
        return format!("{}\n", result.test_code);
    }
    format!(
        "{}\n\n{}\n",
        result.suggested_imports.join("\n"),
        result.test_code
    )
}
