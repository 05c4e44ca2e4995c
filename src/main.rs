// src/main.rs
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use matching_lib::persistence::JsonLinesSink;
use matching_lib::pipeline::{run_auto_match, run_duplicate_scan, run_manual_match, run_suggestions};
use matching_lib::sources::JsonFileSource;
use matching_lib::utils::env::load_env;
use matching_lib::utils::matching_config::MatchingConfig;
use matching_lib::utils::progress_bars::progress_config::ProgressConfig;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable progress bars
    #[arg(long, global = true)]
    no_progress: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct InputArgs {
    /// JSON array of opportunity records
    #[arg(long)]
    externals: PathBuf,

    /// JSON array of transactional records
    #[arg(long)]
    internals: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Match every opportunity to its best transactional row and store the matches
    AutoMatch {
        #[command(flatten)]
        input: InputArgs,

        /// Overrides AUTO_MATCH_THRESHOLD
        #[arg(long)]
        threshold: Option<f64>,

        /// JSON lines file receiving merged records
        #[arg(long, default_value = "matches.jsonl")]
        output: PathBuf,
    },
    /// Rank candidate rows for review without storing anything
    Suggest {
        #[command(flatten)]
        input: InputArgs,

        /// Only suggest for this opportunity id
        #[arg(long)]
        opportunity_id: Option<String>,

        /// Overrides SUGGESTION_THRESHOLD
        #[arg(long)]
        threshold: Option<f64>,

        /// Overrides MAX_SUGGESTIONS
        #[arg(long)]
        limit: Option<usize>,

        /// Write the JSON report here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Find transactional rows that look like duplicates of each other
    Duplicates {
        /// JSON array of transactional records
        #[arg(long)]
        internals: PathBuf,

        /// Overrides DUPLICATE_THRESHOLD
        #[arg(long)]
        threshold: Option<f64>,

        /// Write the JSON report here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Store a reviewer-chosen pairing whatever its score
    ManualMatch {
        #[command(flatten)]
        input: InputArgs,

        #[arg(long)]
        opportunity_id: String,

        #[arg(long)]
        row_key: String,

        /// JSON lines file receiving merged records
        #[arg(long, default_value = "matches.jsonl")]
        output: PathBuf,
    },
}

fn write_report<T: Serialize>(report: &T, output: Option<&PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!("📝 Report written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_file = load_env();
    let cli = Cli::parse();
    let mut logger = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();
    match env_file {
        Some(path) => info!("Loaded environment from {}", path.display()),
        None => info!("No .env file found, using environment variables from system"),
    }

    let start_time = Instant::now();
    let mut config = MatchingConfig::from_env();
    let progress = if cli.no_progress {
        ProgressConfig::disabled()
    } else {
        ProgressConfig::from_env()
    };

    match cli.command {
        Command::AutoMatch { input, threshold, output } => {
            if let Some(threshold) = threshold {
                config.auto_match_threshold = threshold;
            }
            config.log_config();
            let source = JsonFileSource::new(input.externals, input.internals);
            let mut sink = JsonLinesSink::open(&output)?;
            let stats = run_auto_match(&config, &progress, &source, &mut sink).await?;
            write_report(&stats, None)?;
        }
        Command::Suggest {
            input,
            opportunity_id,
            threshold,
            limit,
            output,
        } => {
            if let Some(threshold) = threshold {
                config.suggestion_threshold = threshold;
            }
            if let Some(limit) = limit {
                config.max_suggestions = limit;
            }
            config.log_config();
            let source = JsonFileSource::new(input.externals, input.internals);
            let sets = run_suggestions(&config, &source, opportunity_id.as_deref()).await?;
            write_report(&sets, output.as_ref())?;
        }
        Command::Duplicates {
            internals,
            threshold,
            output,
        } => {
            if let Some(threshold) = threshold {
                config.duplicate_threshold = threshold;
            }
            config.log_config();
            // Externals are never read by the duplicate scan.
            let source = JsonFileSource::new(PathBuf::new(), internals);
            let pairs = run_duplicate_scan(&config, &source).await?;
            write_report(&pairs, output.as_ref())?;
        }
        Command::ManualMatch {
            input,
            opportunity_id,
            row_key,
            output,
        } => {
            config.log_config();
            let source = JsonFileSource::new(input.externals, input.internals);
            let mut sink = JsonLinesSink::open(&output)?;
            match run_manual_match(&config, &source, &mut sink, &opportunity_id, &row_key)? {
                Some(merged) => write_report(&merged, None)?,
                None => info!("✅ {} ↔ {} is already stored", opportunity_id, row_key),
            }
        }
    }

    info!("⏱️  Finished in {:.2?}", start_time.elapsed());
    Ok(())
}
