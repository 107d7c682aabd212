//! Config Command
//!
//! Inspect and initialize TestWeave configuration.
//!
//! Usage:
//!   testweave config show [-f json]
//!   testweave config path
//!   testweave config init [--force]

use crate::cli::ui::Output;
use crate::config::ConfigLoader;
use crate::types::Result;

/// Show the merged effective configuration
pub fn show(format: &str) -> Result<()> {
    let config = ConfigLoader::load()?;
    Output::new().raw(&ConfigLoader::render(&config, format == "json")?);
    Ok(())
}

/// Show configuration paths
pub fn path() -> Result<()> {
    let out = Output::new();
    out.header("Configuration Files");
    for (label, path, exists) in ConfigLoader::describe_paths() {
        let value = match path {
            Some(p) if exists => p.display().to_string(),
            Some(p) => format!("{} (not found)", p.display()),
            None => "(cannot determine)".to_string(),
        };
        out.field(label, value);
    }
    out.field("Env prefix", "TESTWEAVE_ (nested keys split on __)");
    Ok(())
}

/// Initialize project configuration
pub fn init(force: bool) -> Result<()> {
    let root = std::env::current_dir()?;
    let config_path = ConfigLoader::init_project(&root, force)?;

    let out = Output::new();
    out.success("Initialized project configuration");
    out.field("Config", config_path.display());
    out.info("Set OPENAI_API_KEY (or the key for your provider) before generating");
    Ok(())
}
