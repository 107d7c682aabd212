use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use testweave::cli::commands::generate::GenerateOptions;
use testweave::cli::parse_provider;
use testweave::types::ProviderKind;

#[derive(Parser)]
#[command(name = "testweave")]
#[command(version, about = "AI-assisted unit test generation for JavaScript and TypeScript")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate tests for a source file
    Generate {
        #[arg(help = "Source file under test")]
        source: PathBuf,
        #[arg(long, short, help = "Extra instruction for the model")]
        prompt: Option<String>,
        #[arg(long, short, help = "Existing test file to extend")]
        existing: Option<PathBuf>,
        #[arg(long, short, help = "Write the generated test file here")]
        output: Option<PathBuf>,
        #[arg(long, value_parser = parse_provider, help = "Provider override (openai, azure, google, claude)")]
        provider: Option<ProviderKind>,
        #[arg(long, help = "Token budget override")]
        max_tokens: Option<u32>,
        #[arg(long, help = "Sampling temperature override (0.0-2.0)")]
        temperature: Option<f32>,
        #[arg(long, help = "Print the structured result as JSON")]
        json: bool,
    },

    /// Check provider configuration and credentials
    Validate {
        #[arg(long, value_parser = parse_provider, help = "Provider override")]
        provider: Option<ProviderKind>,
    },

    /// Probe monitored services
    Health {
        #[arg(long, value_parser = parse_provider, help = "Provider override")]
        provider: Option<ProviderKind>,
        #[arg(long, help = "Print JSON")]
        json: bool,
        #[arg(long, help = "Keep probing on the configured interval until Ctrl-C")]
        watch: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(
            short = 'f',
            long,
            default_value = "toml",
            help = "Output format: toml, json"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Create .testweave/config.toml in the current directory
    Init {
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mTestWeave encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Backtrace when RUST_BACKTRACE=1
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Generate {
            source,
            prompt,
            existing,
            output,
            provider,
            max_tokens,
            temperature,
            json,
        } => {
            let rt = Runtime::new()?;
            rt.block_on(testweave::cli::commands::generate::run(GenerateOptions {
                source,
                prompt,
                existing,
                output,
                provider,
                max_tokens,
                temperature,
                json,
                quiet: cli.quiet,
            }))?;
        }
        Commands::Validate { provider } => {
            let rt = Runtime::new()?;
            rt.block_on(testweave::cli::commands::validate::run(provider, cli.quiet))?;
        }
        Commands::Health {
            provider,
            json,
            watch,
        } => {
            let rt = Runtime::new()?;
            rt.block_on(testweave::cli::commands::health::run(provider, json, watch))?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => {
                testweave::cli::commands::config::show(&format)?;
            }
            ConfigAction::Path => {
                testweave::cli::commands::config::path()?;
            }
            ConfigAction::Init { force } => {
                testweave::cli::commands::config::init(force)?;
            }
        },
    }

    Ok(())
}
