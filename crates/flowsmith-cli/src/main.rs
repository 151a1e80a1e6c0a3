//! CLI entry point for Flowsmith.
//!
//! This binary provides the `flowsmith` command: generate a pair of RPA
//! workflow designs from a process description, or run the diagram parser
//! and the response salvager offline on saved text.

mod config;
mod output;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use flowsmith_llm::LlmClient;
use flowsmith_workflow::{SolutionGenerator, WorkflowError, diagram, salvage, solution};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::output::OutputFormat;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// Flowsmith: AI-centric and traditional RPA workflow designs from a
/// process description.
#[derive(Parser)]
#[command(
    name = "flowsmith",
    version,
    about = "Generate paired UiPath workflow designs from a process description"
)]
struct Cli {
    /// Configuration file (default: config/flowsmith.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the model for an AI-centric and a traditional solution.
    Generate {
        /// Process description.  Use --file to read it from a file instead.
        description: Option<String>,

        /// Read the description from a file (`-` for stdin).
        #[arg(long, conflicts_with = "description")]
        file: Option<PathBuf>,

        /// Allow Marketplace packages in addition to official ones.
        #[arg(long)]
        allow_marketplace: bool,

        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Parse an indented diagram and print the tree as JSON.
    Diagram {
        /// Diagram file; stdin when omitted or `-`.
        input: Option<PathBuf>,
    },

    /// Salvage and normalize a saved model response.
    Extract {
        /// Response file; stdin when omitted or `-`.
        input: Option<PathBuf>,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // A missing .env is fine.
    let _ = dotenvy::dotenv();
    init_tracing(if cli.verbose { "debug" } else { "info" }, cli.log_json);

    let result = match cli.command {
        Commands::Generate {
            description,
            file,
            allow_marketplace,
            format,
        } => {
            cmd_generate(
                cli.config.as_deref(),
                description,
                file.as_deref(),
                allow_marketplace,
                format,
            )
            .await
        }
        Commands::Diagram { input } => cmd_diagram(input.as_deref()),
        Commands::Extract { input } => cmd_extract(input.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", user_facing(&e));
            ExitCode::FAILURE
        }
    }
}

/// Initialize the tracing subscriber on stderr with the given default level.
fn init_tracing(default_level: &str, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

/// Workflow failures are reported through their user message; anything else
/// with its full context chain.
fn user_facing(error: &anyhow::Error) -> String {
    match error.downcast_ref::<WorkflowError>() {
        Some(workflow_error) => workflow_error.user_message(),
        None => format!("{error:#}"),
    }
}

// ---------------------------------------------------------------------------
// Subcommand: generate
// ---------------------------------------------------------------------------

async fn cmd_generate(
    config_path: Option<&Path>,
    description: Option<String>,
    file: Option<&Path>,
    allow_marketplace: bool,
    format: OutputFormat,
) -> Result<()> {
    let description = match (description, file) {
        (Some(description), _) => description,
        (None, Some(path)) => read_input(Some(path))?,
        (None, None) => bail!("a process description is required (argument or --file)"),
    };

    let mut config = AppConfig::load(config_path)?;
    config.apply_env(|key| std::env::var(key).ok());

    let api_key = config.api_key(|key| std::env::var(key).ok());
    let client = LlmClient::new(config.llm_client_config(api_key)?)
        .context("failed to create model client")?;
    info!(
        provider = %client.provider(),
        model = %config.model.name,
        "model client ready"
    );

    let generator = SolutionGenerator::new(Arc::new(client), config.generator_config());
    let allow_marketplace = allow_marketplace || config.generation.allow_marketplace;

    let pair = generator.generate_pair(&description, allow_marketplace).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&pair)?),
        OutputFormat::Text => print!("{}", output::render_pair(&pair)?),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommands: diagram, extract
// ---------------------------------------------------------------------------

fn cmd_diagram(input: Option<&Path>) -> Result<()> {
    let text = read_input(input)?;
    let forest = diagram::parse(&text);
    debug!(
        nodes = diagram::count_nodes(&forest),
        depth = diagram::max_depth(&forest),
        "diagram parsed"
    );
    println!("{}", serde_json::to_string_pretty(&forest)?);
    Ok(())
}

fn cmd_extract(input: Option<&Path>) -> Result<()> {
    let text = read_input(input)?;
    let salvaged = salvage::salvage(&text)?;
    debug!(strategy = %salvaged.strategy, "response salvaged");
    let solution = solution::normalize(salvaged.value)?;
    println!("{}", serde_json::to_string_pretty(&solution)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Read a whole file, or stdin for `None` and `-`.
fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            Ok(buf)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
