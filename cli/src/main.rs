//! Jobhound command-line entry point.
//!
//! Thin shell over the library crates: loads config, launches the browser,
//! runs one scrape and prints the `ScrapeResult` as JSON on stdout. Logs go
//! to stderr.

mod args;

use anyhow::{Context, Result};
use args::{Cli, Command, ScrapeArgs};
use clap::Parser;
use jobhound_browser::BrowserSession;
use jobhound_core::{AppConfig, CandidateProfile, ScrapeOutcome};
use jobhound_scraper::{CaptchaHandle, ScrapeOrchestrator, SelectorCatalog};
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Initialize tracing subscriber for logging
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,jobhound=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let mut config = match path {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => AppConfig::load().context("loading config")?,
    };
    config.apply_env(|key| std::env::var(key).ok());
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn load_profile(args: &ScrapeArgs) -> Result<CandidateProfile> {
    let mut profile = match &args.profile {
        Some(path) => CandidateProfile::new(
            std::fs::read_to_string(path)
                .with_context(|| format!("reading profile {}", path.display()))?,
        ),
        None => CandidateProfile::default(),
    };
    if let Some(path) = &args.resume {
        profile = profile.with_resume(
            std::fs::read_to_string(path)
                .with_context(|| format!("reading resume {}", path.display()))?,
        );
    }
    Ok(profile)
}

/// Every line on stdin signals that a challenge was solved in the browser.
fn spawn_resolution_listener(handle: CaptchaHandle) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(_)) = lines.next_line().await {
            info!("Resolution signalled from stdin");
            handle.resolve();
        }
    });
}

/// Ctrl-C cancels the scrape; partial results are still printed.
fn spawn_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling scrape");
            cancel.cancel();
        }
    });
}

async fn scrape(mut config: AppConfig, args: ScrapeArgs) -> Result<ExitCode> {
    if args.headed {
        config.browser.headless = false;
    }

    let mut catalog = SelectorCatalog::builtin();
    if let Some(path) = &config.extraction.selector_overrides {
        catalog = catalog
            .with_overrides_file(path)
            .with_context(|| format!("loading selector overrides from {}", path.display()))?;
    }

    let request = args.to_request(config.scraping.max_jobs);
    let profile = load_profile(&args)?;
    let scorer = jobhound_qualifier::scorer_from_config(&config)
        .context("configuring the scoring provider")?;

    let session = BrowserSession::launch(&config.browser, &config.scraping)
        .await
        .context("launching the browser")?;
    let orchestrator = ScrapeOrchestrator::new(session, Arc::new(catalog), &config)
        .with_scorer(scorer, profile);

    spawn_resolution_listener(orchestrator.captcha_handle());
    spawn_ctrl_c(orchestrator.cancellation_token());

    let result = orchestrator.scrape(request).await?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &result)?;
    writeln!(out)?;

    Ok(match &result.outcome {
        ScrapeOutcome::Completed => ExitCode::SUCCESS,
        ScrapeOutcome::Failed { reason } => {
            warn!(?reason, jobs = result.jobs.len(), "Scrape ended early");
            ExitCode::from(2)
        }
    })
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();
    info!("Starting Jobhound v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Scrape(args) => scrape(config, args).await,
        Command::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}
