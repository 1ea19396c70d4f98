//! Colibri main entry point
//!
//! This is the command-line interface for the Colibri extractor.

use clap::Parser;
use colibri::config::{load_config, load_rules, Config};
use colibri::output::{failure_report, write_json};
use colibri::{Colibri, Error, ErrorSet};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Colibri: rule-driven structured data extraction
///
/// Colibri fetches the URL named by a rule file, walks the rule's selectors
/// over the response and prints the extracted data as JSON. Selectors marked
/// `follow` are fetched and extracted in turn, respecting robots.txt and
/// per-host delays.
#[derive(Parser, Debug)]
#[command(name = "colibri")]
#[command(version)]
#[command(about = "Rule-driven structured data extraction", long_about = None)]
struct Cli {
    /// Path to a JSON (or TOML) rule file
    #[arg(value_name = "RULES")]
    rules: PathBuf,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr so stdout carries only the extracted JSON.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("colibri=info,warn"),
            1 => EnvFilter::new("colibri=debug,info"),
            2 => EnvFilter::new("colibri=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the configuration and rules, runs the extraction and prints the result
fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)?
        }
        None => Config::default(),
    };

    let colibri = Colibri::from_config(&config)?;

    tracing::info!("Loading rules from: {}", cli.rules.display());
    let rule = load_rules(&cli.rules, &config.defaults)?;
    tracing::info!(
        "Extracting {} selectors from {}",
        rule.selectors.len(),
        rule.url.as_ref().map(|u| u.as_str()).unwrap_or_default()
    );

    match colibri.extract(&rule) {
        Ok(output) => {
            write_json(io::stdout().lock(), &output.serializable(), cli.pretty)?;
            Ok(())
        }
        Err(Error::Extraction { output, errors }) => {
            let report = failure_report(Some(output.as_ref()), &errors);
            write_json(io::stdout().lock(), &report, cli.pretty)?;
            Err(format!("extraction finished with {} errors", errors.len()).into())
        }
        Err(e) => {
            let message = e.to_string();
            let report = failure_report(None, &ErrorSet::from_iter([("extract", e)]));
            write_json(io::stdout().lock(), &report, cli.pretty)?;
            Err(message.into())
        }
    }
}
