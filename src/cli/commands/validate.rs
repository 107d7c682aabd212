//! Validate Command
//!
//! Check that the configured provider accepts our credentials.
//! Initialization already performs the vendor round-trip, so a successful
//! `initialize` is the whole check.

use crate::ai::Orchestrator;
use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::types::{ProviderKind, Result};

pub async fn run(provider: Option<ProviderKind>, quiet: bool) -> Result<()> {
    let out = Output::quiet(quiet);
    let ctx = CommandContext::load(provider)?;

    let kind = check(&ctx.orchestrator).await?;
    out.success(&format!("{} provider is configured and reachable", kind));
    if let Some(active) = ctx.orchestrator.provider() {
        out.field("Model", active.model());
    }
    Ok(())
}

/// Build and validate the configured provider
async fn check(orchestrator: &Orchestrator) -> Result<ProviderKind> {
    orchestrator.initialize().await
}
