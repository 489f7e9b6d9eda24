mod cleaning;
mod config;
mod error;
mod features;
mod pipeline;
mod schema;
mod store;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::pipeline::{RunMode, RunSummary};

#[derive(Parser)]
#[command(
    name = "books_pipeline",
    about = "Book catalog cleaning and feature engineering pipeline"
)]
struct Cli {
    /// Path to a JSON configuration file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run cleaning and feature engineering end to end
    Run,
    /// Run the cleaning stage only
    Clean,
    /// Run feature engineering against an existing processed table
    Features,
    /// Write the default configuration to a JSON file
    InitConfig {
        /// Where to write the template
        path: PathBuf,
    },
    /// Describe the pipeline stages and their outputs
    Info,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            exit_code(&err)
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .try_init();
}

fn dispatch(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run => run_mode(RunMode::Full, cli.config.as_deref()),
        Commands::Clean => run_mode(RunMode::CleaningOnly, cli.config.as_deref()),
        Commands::Features => run_mode(RunMode::FeaturesOnly, cli.config.as_deref()),
        Commands::InitConfig { path } => {
            crate::config::write_template(&path)?;
            println!("Default configuration written to {}", path.display());
            println!("Edit it and pass it back with --config.");
            Ok(())
        }
        Commands::Info => {
            print_info();
            Ok(())
        }
    }
}

fn run_mode(mode: RunMode, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = PipelineConfig::load(config_path)?;
    let summary = pipeline::run(mode, &config)?;
    print_summary(&summary, &config);
    Ok(())
}

/// Operators script against these: 2 means the input data is bad, 3
/// means a prerequisite file is missing, 1 is everything else.
fn exit_code(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<PipelineError>() {
        Some(
            PipelineError::Integrity(_)
            | PipelineError::UnrecognizedValue { .. }
            | PipelineError::IdentityConflict { .. }
            | PipelineError::Domain { .. }
            | PipelineError::SchemaViolation { .. },
        ) => ExitCode::from(2),
        Some(PipelineError::MissingInput(_)) => ExitCode::from(3),
        _ => ExitCode::FAILURE,
    }
}

fn print_summary(summary: &RunSummary, config: &PipelineConfig) {
    println!("Rows processed:        {}", summary.rows_processed);
    println!("Rows rejected:         {}", summary.rows_rejected);
    if summary.mode != RunMode::FeaturesOnly {
        println!("Categories normalized: {}", summary.categories_normalized);
        println!("Processed output:      {}", config.processed_output.display());
    }
    if summary.mode != RunMode::CleaningOnly {
        println!("Features created:      {}", summary.features_created);
        println!("Features output:       {}", config.features_output.display());
    }
    println!("Done in {}", format_duration(summary.elapsed));
}

fn print_info() {
    println!("Book catalog pipeline");
    println!("=====================\n");
    println!("Cleaning stage:");
    println!("  - null scan over every raw column (aborts the run, nothing is imputed)");
    println!("  - one unique id per row");
    println!("  - sentinel categories replaced with the default label");
    println!("  - availability yes/no mapped to 1/0");
    println!("  - schema gate, then write to the processed output");
    println!();
    println!("Feature stage:");
    println!("  - price_range buckets (breakpoints 20 / 40 / 50)");
    println!("  - title shape: subtitle, series, leading \"The\", length, words, digits");
    println!("  - rating_category and stock_level buckets");
    println!("  - popularity_score = rating/5 * 0.7 + normalized stock * 0.3");
    println!("  - one one-hot column per distinct category");
    println!("  - schema gate, then write to the features output");
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
