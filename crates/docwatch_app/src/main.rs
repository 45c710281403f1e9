//! `docwatch`: checks documentation pages for content changes and dispatches
//! a re-index job for each page whose canonical text moved.

mod logging;
mod wiring;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use docwatch_engine::{load_config, LinkDiscovery, NotifierConfig, RunReport, WatchConfig};
use docwatch_logging::{parse_level, watch_error, watch_info};
use log::LevelFilter;

use crate::logging::LogDestination;

#[derive(Parser, Debug)]
#[command(
    name = "docwatch",
    version,
    about = "Detect documentation content changes and dispatch re-index jobs"
)]
struct Cli {
    /// RON configuration file. A missing file means defaults.
    #[arg(long, env = "DOCWATCH_CONFIG", default_value = "docwatch.ron")]
    config: PathBuf,

    /// Where log output goes.
    #[arg(long, value_enum, default_value_t = LogDestination::Terminal)]
    log: LogDestination,

    /// Log level (off, error, warn, info, debug, trace).
    #[arg(long, default_value = "info", value_parser = parse_level_arg)]
    log_level: LevelFilter,

    /// Report changes without dispatching jobs or storing fingerprints.
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Check these pages instead of discovering them from the listing page.
    #[arg(long = "url", value_name = "URL")]
    urls: Vec<String>,
}

fn parse_level_arg(value: &str) -> Result<LevelFilter, String> {
    parse_level(value).ok_or_else(|| format!("unknown log level {value:?}"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::initialize(cli.log, cli.log_level);

    match run(&cli) {
        Ok(report) => {
            println!("{}", report.summary());
            for url in report.changed_urls() {
                println!("changed: {url}");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            watch_error!("Run failed: {:#}", err);
            eprintln!("docwatch: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<RunReport> {
    let config = resolve_config(&cli.config, cli.dry_run)?;
    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    runtime.block_on(scan(cli, &config))
}

async fn scan(cli: &Cli, config: &WatchConfig) -> Result<RunReport> {
    let scanner = wiring::build_scanner(config).await?;
    if !cli.urls.is_empty() {
        return Ok(scanner.run(&cli.urls).await);
    }
    let discovery = LinkDiscovery::new(config.listing_url()?, config.link_prefix.clone());
    watch_info!("Discovering pages from {}", config.base_url);
    Ok(scanner.run_discovered(&discovery).await?)
}

/// Loads the configuration and applies command-line overrides.
fn resolve_config(path: &Path, dry_run: bool) -> Result<WatchConfig> {
    let mut config = load_config(path)?;
    if dry_run {
        config.notifier = NotifierConfig::DryRun;
    }
    if config.write_back && !config.write_back_enabled() {
        watch_info!("Dry-run notifier: fingerprints will not be stored");
        config.write_back = false;
    }
    Ok(config)
}
