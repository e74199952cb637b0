//! get-papers-list - find PubMed papers with industry-affiliated authors
//!
//! ## Usage
//!
//! ```bash
//! get-papers-list "acne AND pharmaceutical"
//! get-papers-list "diabetes drug" --file diabetes.csv --debug
//! get-papers-list "cancer research" --format json --file results.json
//! ```
//!
//! Exit codes: 0 success, 2 invalid input, 3 network, 4 PubMed API,
//! 5 data processing, 6 output, 130 interrupted, 1 anything else.

use anyhow::Result;
use clap::Parser;
use pharmaextract::config::{ClassifierConfig, DEFAULT_FETCH_LIMIT};
use pharmaextract::output::{self, OutputWriter};
use pharmaextract::pipeline::{self, FetchOptions};
use pharmaextract::pubmed::{ClientConfig, PubMedClient};
use pharmaextract::{validation, AffiliationClassifier, ExtractorError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Search PubMed for papers with pharmaceutical/biotech company authors
#[derive(Parser)]
#[command(name = "get-papers-list")]
#[command(version, about, long_about = None)]
struct Cli {
    /// PubMed search query
    query: String,

    /// Output file name
    #[arg(short, long, default_value = "output.csv")]
    file: String,

    /// Output format: csv or json
    #[arg(long, default_value = "csv")]
    format: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Maximum number of articles to fetch
    #[arg(long, default_value_t = DEFAULT_FETCH_LIMIT)]
    max_results: u32,

    /// Articles per fetch request
    #[arg(long, default_value_t = DEFAULT_FETCH_LIMIT)]
    batch_size: u32,

    /// Contact email sent to NCBI
    #[arg(long, env = "NCBI_EMAIL")]
    email: Option<String>,

    /// NCBI API key
    #[arg(long, env = "NCBI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// E-utilities base URL
    #[arg(long, env = "EUTILS_BASE_URL", hide = true)]
    base_url: Option<String>,

    /// JSON file with academic keywords (see ClassifierConfig)
    #[arg(long)]
    keywords_file: Option<PathBuf>,

    /// Consult every affiliation of an author, not just the first
    #[arg(long)]
    all_affiliations: bool,
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let debug_enabled = cli.debug;

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .init();

    let result = tokio::select! {
        result = run(cli) => result,
        _ = tokio::signal::ctrl_c() => {
            println!("\nOperation cancelled by user");
            return ExitCode::from(130);
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report_error(&err, debug_enabled),
    }
}

fn report_error(err: &anyhow::Error, debug_enabled: bool) -> ExitCode {
    match err.downcast_ref::<ExtractorError>() {
        Some(e) => {
            error!(error = %e, "Run failed");
            eprintln!("Error: {}", e);
            eprintln!("Tip: {}", e.hint());
            ExitCode::from(e.exit_code())
        }
        None => {
            eprintln!("Unexpected error: {:#}", err);
            eprintln!("This is an unexpected error. Please report this issue.");
            if debug_enabled {
                eprintln!("{:?}", err);
            }
            ExitCode::from(1)
        }
    }
}

// ============================================================================
// Run
// ============================================================================

async fn run(cli: Cli) -> Result<()> {
    debug!(query = %cli.query, format = %cli.format, "Running query");

    let query = validation::validate_query(&cli.query)?;
    let filename = validation::validate_filename(&cli.file)?;
    let format = validation::validate_format(&cli.format)?;

    let mut classifier_config = match &cli.keywords_file {
        Some(path) => ClassifierConfig::load(path)?,
        None => ClassifierConfig::default(),
    };
    classifier_config.all_affiliations |= cli.all_affiliations;
    let classifier = AffiliationClassifier::from_config(&classifier_config);

    let mut client_config = ClientConfig {
        email: cli.email,
        api_key: cli.api_key,
        ..Default::default()
    };
    if let Some(base_url) = cli.base_url {
        client_config.base_url = base_url;
    }
    let client = PubMedClient::new(client_config)?;

    let options = FetchOptions {
        max_results: cli.max_results,
        batch_size: cli.batch_size,
    };

    println!("Searching PubMed...");
    let outcome = pipeline::run(&client, &query, &options, &classifier).await?;

    if let Some(total) = outcome.total_found {
        println!("Found {} total papers in PubMed", total);
    }
    println!(
        "Checked {} papers, {} with industry affiliations",
        outcome.articles_requested,
        outcome.records.len()
    );

    println!("Writing results...");
    let writer = OutputWriter::new(&filename, format);
    let summary = writer.write(&outcome.records)?;

    if summary.written == 0 && summary.file_size.is_none() {
        println!("No non-academic papers found to save.");
    } else {
        println!("Results saved to '{}'", filename);
        println!("Saved {} papers with industry affiliations", summary.written);
        if let Some(size) = summary.file_size {
            println!("File size: {}", output::format_size(size));
        }
    }

    println!("Successfully processed query: '{}'", query);
    Ok(())
}
