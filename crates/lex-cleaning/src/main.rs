//! CLI entry point for the data cleaning pipeline.

use anyhow::{Result, anyhow};
use clap::{ArgGroup, Parser, ValueEnum};
use dotenv::dotenv;
use lex_cleaning::{CleaningConfig, CleaningError, Pipeline, PipelineResult};
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[cfg(feature = "ai")]
use lex_cleaning::ai::{
    CompletionProvider, OllamaConfig, OllamaProvider, OpenRouterConfig, OpenRouterProvider,
};
#[cfg(feature = "ai")]
use lex_cleaning::autoconfig::{ConfigGenerator, RetryPolicy};
#[cfg(feature = "ai")]
use std::env;
#[cfg(feature = "ai")]
use std::sync::Arc;

/// Completion backend used to draft configs
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CliProvider {
    /// Ollama server (`/api/generate`)
    Ollama,
    /// OpenRouter chat completions (needs OPENROUTER_API_KEY)
    Openrouter,
}

#[derive(Parser, Debug)]
#[command(
    author = "Lex Machina Team",
    version,
    about = "Configuration-Driven Data Cleaning Pipeline",
    long_about = "Cleans a tabular dataset according to a JSON config, or asks a language \
                  model to draft that config from the dataset's schema first.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  OPENROUTER_API_KEY    API key for OpenRouter (required with --provider openrouter)\n  \
                  RUST_LOG              Overrides --log-level\n\n\
                  EXAMPLES:\n  \
                  # Run an existing config\n  \
                  lex-cleaning --config hotel_bookings.json\n\n  \
                  # Generate auto_hotel_bookings.json with a local model, then run it\n  \
                  lex-cleaning --dataset hotel_bookings.csv\n\n  \
                  # Use OpenRouter and print the result as JSON\n  \
                  lex-cleaning --dataset hotel_bookings.csv --provider openrouter --json"
)]
#[command(group(
    ArgGroup::new("source")
        .required(true)
        .args(["dataset", "config"]),
))]
struct Args {
    /// Dataset to generate a config for (writes auto_<stem>.json, then runs it)
    #[arg(short, long)]
    dataset: Option<PathBuf>,

    /// Cleaning config to run
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Completion endpoint URL (defaults to the provider's own)
    #[arg(long)]
    api_url: Option<String>,

    /// Model name as known to the provider
    #[arg(long)]
    model_name: Option<String>,

    /// Completion provider used with --dataset
    #[arg(long, value_enum, default_value = "ollama")]
    provider: CliProvider,

    /// Attempts at generating a valid config before giving up
    #[arg(long, default_value_t = 5)]
    max_retries: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only warnings and errors)
    #[arg(short, long)]
    quiet: bool,

    /// Print the pipeline result as JSON on stdout (disables logging)
    #[arg(long)]
    json: bool,
}

/// Initialize logging based on CLI flags.
///
/// `RUST_LOG` takes precedence over `--log-level`.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    // Keep stdout clean for the JSON result
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    // Load environment variables from .env file
    dotenv().ok();

    let config_path = match (&args.dataset, &args.config) {
        (Some(dataset), _) => generate_config(&args, dataset)?,
        (None, Some(config)) => config.clone(),
        (None, None) => return Err(anyhow!("Either --dataset or --config is required")),
    };

    let config = CleaningConfig::from_path(&config_path).map_err(|e| report_failure(&e))?;
    info!("Loaded config: {}", config_path.display());

    let pipeline = build_pipeline(&args, config)?;

    match pipeline.run() {
        Ok(result) => handle_pipeline_output(&result, &config_path, &args),
        Err(e) => Err(report_failure(&e)),
    }
}

/// Log a pipeline error and turn it into the process error.
///
/// Startup errors (config, formats) mean no stage ran and nothing was
/// written; anything else failed mid-run.
fn report_failure(e: &CleaningError) -> anyhow::Error {
    if e.is_startup_error() {
        error!("Cannot start pipeline [{}]: {}", e.error_code(), e);
        anyhow!("Cannot start pipeline: {}", e)
    } else {
        error!("Pipeline failed [{}]: {}", e.error_code(), e);
        anyhow!("Pipeline failed: {}", e)
    }
}

/// Ask the selected provider for a config and save it next to the working
/// directory. Returns the path of the saved config.
#[cfg(feature = "ai")]
fn generate_config(args: &Args, dataset: &Path) -> Result<PathBuf> {
    if !dataset.exists() {
        return Err(anyhow!("Dataset not found: {}", dataset.display()));
    }

    let provider = build_provider(args)?;
    info!(
        "Generating config for {} with {} ({})",
        dataset.display(),
        provider.name(),
        provider.model().unwrap_or("default model")
    );

    let retry = RetryPolicy::new(args.max_retries, RetryPolicy::default().backoff);
    let generator = ConfigGenerator::new(provider).with_retry_policy(retry);

    generator.generate_to_file(dataset, ".").map_err(|e| {
        error!("Config generation failed [{}]: {}", e.error_code(), e);
        anyhow!("Config generation failed: {}", e)
    })
}

#[cfg(not(feature = "ai"))]
fn generate_config(_args: &Args, _dataset: &Path) -> Result<PathBuf> {
    Err(anyhow!(
        "Config generation is not compiled in. Rebuild with --features ai, or pass --config."
    ))
}

#[cfg(feature = "ai")]
fn build_provider(args: &Args) -> Result<Arc<dyn CompletionProvider>> {
    match args.provider {
        CliProvider::Ollama => {
            let mut config = OllamaConfig::builder();
            if let Some(ref url) = args.api_url {
                config = config.api_url(url);
            }
            if let Some(ref model) = args.model_name {
                config = config.model(model);
            }
            Ok(Arc::new(OllamaProvider::with_config(config.build())?))
        }
        CliProvider::Openrouter => {
            let api_key = env::var("OPENROUTER_API_KEY")
                .map_err(|_| anyhow!("OPENROUTER_API_KEY must be set to use OpenRouter"))?;
            let mut config = OpenRouterConfig::builder();
            if let Some(ref url) = args.api_url {
                config = config.base_url(url);
            }
            if let Some(ref model) = args.model_name {
                config = config.model(model);
            }
            Ok(Arc::new(OpenRouterProvider::with_config(api_key, config.build())?))
        }
    }
}

fn build_pipeline(args: &Args, config: CleaningConfig) -> Result<Pipeline> {
    let mut builder = Pipeline::builder().config(config);

    if !args.quiet && !args.json {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }

    Ok(builder.build()?)
}

/// Print the result as JSON (`--json`) or as a human-readable summary.
fn handle_pipeline_output(result: &PipelineResult, config_path: &Path, args: &Args) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    print_human_readable_summary(result, config_path);
    Ok(())
}

fn print_human_readable_summary(result: &PipelineResult, config_path: &Path) {
    println!();
    println!("{}", "=".repeat(80));
    println!("CLEANING COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!("Config: {}", config_path.display());
    if let Some(ref input) = result.input_file {
        println!(
            "Input:  {} ({} rows x {} columns)",
            input.display(),
            result.rows_before,
            result.columns_before
        );
    }
    println!(
        "Output: {} ({} rows x {} columns)",
        result.output_file.display(),
        result.rows_after,
        result.columns_after
    );
    println!();

    println!("Processing Summary:");
    println!("  Duration: {}ms", result.duration_ms);
    println!(
        "  Rows: {} -> {} ({} removed)",
        result.rows_before,
        result.rows_after,
        result.rows_removed()
    );
    let after = &result.quality.after;
    println!(
        "  Missing values: {} | Duplicate rows: {}",
        after.missing_values, after.duplicate_rows
    );
    if !result.scalers.is_empty() {
        let scaled: Vec<&str> = result.scalers.iter().map(|(name, _)| name).collect();
        println!("  Scaled: {}", scaled.join(", "));
    }
    println!();

    if !result.steps.is_empty() {
        println!("Actions Taken:");
        for step in result.steps.iter().take(10) {
            println!("  - {}", step);
        }
        if result.steps.len() > 10 {
            println!("  ... and {} more actions", result.steps.len() - 10);
        }
        println!();
    }

    if !result.warnings.is_empty() {
        println!("Warnings:");
        for warning in &result.warnings {
            println!("  ! {}", warning);
        }
        println!();
    }

    if !result.report_files.is_empty() {
        println!("Reports:");
        for path in &result.report_files {
            println!("  - {}", path.display());
        }
        println!();
    }

    println!("Use --json for machine-readable output");
}
