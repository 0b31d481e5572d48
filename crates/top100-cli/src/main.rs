// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use top100_application::{report_path, write_csv, Matcher, RankingEngine, RankingRun, RunSummary};
use top100_catalog::{CatalogClient, CatalogError};
use top100_config::{load as load_config, AppConfig, ConfigError, TelemetryConfig};
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const EXIT_FATAL: u8 = 1;
const EXIT_CONFIG: u8 = 2;

/// Build the monthly Top 100 chart for a local audio library.
#[derive(Parser, Debug)]
#[command(name = "top100", version)]
struct Cli {
    /// Run immediately.
    #[arg(long)]
    run_now: bool,

    /// Label month to chart, defaults to the current month.
    #[arg(long, value_name = "YYYY-MM")]
    month: Option<String>,

    /// Match and rank without writing the CSV report.
    #[arg(long)]
    dry_run: bool,

    /// Enable debug logging.
    #[arg(long)]
    verbose: bool,

    /// Process at most N files.
    #[arg(long, value_name = "N")]
    limit: Option<usize>,

    /// TOML configuration file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Library root, overriding `library.root`.
    #[arg(long, value_name = "PATH")]
    library: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if !cli.run_now {
        eprintln!("Error: --run-now is required\n");
        Cli::command().print_help().ok();
        return ExitCode::from(EXIT_FATAL);
    }

    let config = match load_and_validate(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    init_tracing(&config.telemetry, cli.verbose);

    let client = match build_client(&config) {
        Ok(client) => client,
        Err(err) => {
            error!(target: "cli", error = %err, "invalid catalog configuration");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    match run(&cli, &config, client).await {
        Ok(summary) => {
            info!(
                target: "cli",
                matched = summary.matched,
                unmatched = summary.unmatched,
                eligible = summary.eligible,
                "run completed successfully"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(target: "cli", "fatal error: {err:#}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn load_and_validate(cli: &Cli) -> Result<AppConfig, ConfigError> {
    let mut config = load_config(cli.config.as_deref())?;
    apply_overrides(&mut config, cli);
    config.validate()?;
    Ok(config)
}

fn apply_overrides(config: &mut AppConfig, cli: &Cli) {
    if let Some(root) = &cli.library {
        config.library.root = Some(root.clone());
    }
    if let Some(limit) = cli.limit {
        config.library.process_limit = limit;
    }
}

fn init_tracing(telemetry: &TelemetryConfig, verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&telemetry.log_level))
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    if telemetry.format.eq_ignore_ascii_case("json") {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_level(true))
            .init();
    }
}

fn build_client(config: &AppConfig) -> Result<CatalogClient, CatalogError> {
    let catalog = &config.catalog;
    let mut builder = CatalogClient::builder()
        .base_url(catalog.base_url.clone())
        .timeout(Duration::from_secs(catalog.timeout_secs))
        .requests_per_second(catalog.requests_per_second)
        .max_retries(catalog.max_retries)
        .base_delay_ms(catalog.base_delay_ms);
    if let Some(token) = &catalog.access_token {
        builder = builder.access_token(token.clone());
    }
    builder.build()
}

fn label_month(cli: &Cli) -> String {
    cli.month
        .clone()
        .unwrap_or_else(|| chrono::Local::now().format("%Y-%m").to_string())
}

async fn run(cli: &Cli, config: &AppConfig, client: CatalogClient) -> Result<RunSummary> {
    let label_month = label_month(cli);
    let root = config
        .library
        .root
        .clone()
        .context("library root is not configured")?;
    info!(target: "cli", label_month, root = %root.display(), dry_run = cli.dry_run, "starting run");

    let matcher = Matcher::from_config(Arc::new(client), &config.matching)?;
    let engine = RankingEngine::new(config.ranking.top_n)?;
    let ranking_run = RankingRun::new(matcher, engine)
        .with_eligibility_months(config.ranking.eligibility_months)
        .with_process_limit(config.library.process_limit);

    let report = ranking_run
        .run_library(&root, &label_month)
        .await
        .with_context(|| format!("ranking run for {label_month} failed"))?;

    if cli.dry_run {
        info!(target: "cli", ranked = report.ranked.len(), "dry run, skipping report");
    } else {
        let path = report_path(&config.report.output_dir, &label_month);
        write_csv(&report.ranked, &path)?;
        info!(target: "cli", path = %path.display(), "report written");
    }

    Ok(report.summary)
}
