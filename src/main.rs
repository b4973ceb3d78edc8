mod collector;
mod config;
mod dashboard;
mod error;
mod github;
mod logger;
mod merge;
mod models;
mod report;
mod store;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::Parser;
use std::fs;
use tracing::{error, info};

use collector::Collector;
use config::{BuildConfig, Cli, CollectConfig, Command};
use dashboard::Dashboard;
use github::GithubClient;
use report::{HtmlFormatter, ReportFormatter};
use store::RecordStore;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    logger::init_logger(cli.log_format, &cli.log_level);

    if let Err(e) = run(cli).await {
        error!("Application error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Collect(args) => {
            let config = CollectConfig::from_args(args, cli.data_dir)
                .context("Invalid collector configuration")?;
            collect(config).await
        }
        Command::Build(args) => build(BuildConfig::from_args(args, cli.data_dir)),
    }
}

async fn collect(config: CollectConfig) -> Result<()> {
    info!(
        owner = %config.owner,
        api_url = %config.api_url,
        data_dir = %config.data_dir.display(),
        request_timeout = config.request_timeout,
        dry_run = config.dry_run,
        "Configuration loaded"
    );

    let client = GithubClient::new(&config.github_token, &config.api_url, config.request_timeout)?;
    let collector = Collector::new(
        client,
        RecordStore::new(&config.data_dir),
        config.owner,
        config.dry_run,
    );

    let report = collector
        .run(&mut std::io::stdout())
        .await
        .context("Collection failed")?;

    if report.failed_writes > 0 {
        bail!(
            "{} repository records could not be written",
            report.failed_writes
        );
    }

    Ok(())
}

fn build(config: BuildConfig) -> Result<()> {
    info!(
        data_dir = %config.data_dir.display(),
        output_dir = %config.output_dir.display(),
        rank_by = %config.rank_by,
        "Configuration loaded"
    );

    let store = RecordStore::new(&config.data_dir);
    let records = store.load_all_records()?;
    let summary = store.load_summary();

    let dashboard = Dashboard::build(&records, summary.as_ref(), config.rank_by, Utc::now());
    let html = HtmlFormatter::new().format(&dashboard)?;

    fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            config.output_dir.display()
        )
    })?;
    let out = config.output_dir.join("index.html");
    fs::write(&out, html).with_context(|| format!("Failed to write {}", out.display()))?;

    println!(
        "Dashboard written to {} ({} repos)",
        out.display(),
        records.len()
    );
    Ok(())
}
