// file: src/main.rs
// description: commandline application entry point with mode handling
// reference: application bootstrap and orchestration

use anyhow::{Context, Result};
use clap::{ArgAction, ArgGroup, CommandFactory, Parser};
use std::io::IsTerminal;
use std::path::PathBuf;
use template_aggregator::utils::logging::{format_error, format_info, format_success, format_warning};
use template_aggregator::{
    AggregatorError, Config, GixBackend, HostingClient, ReportExporter, RunSummary, SyncMode,
    TemplatePipeline,
};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "template_aggregator")]
#[command(author = "cipher")]
#[command(version = "0.1.0")]
#[command(about = "Collect, deduplicate and filter scanner templates from git repositories", long_about = None)]
#[command(group(ArgGroup::new("mode").args(["all", "update"])))]
struct Cli {
    /// Clone every repository, filter, and rebuild the aggregate directory
    #[arg(short, long)]
    all: bool,

    /// Pull existing repositories only, filter, and report new templates
    #[arg(short, long)]
    update: bool,

    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,

    /// Overrides `workdir` from the configuration file
    #[arg(long, value_name = "DIR")]
    workdir: Option<PathBuf>,

    /// Write a JSON run report
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    color: bool,

    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mode = match (cli.all, cli.update) {
        (true, _) => SyncMode::Clone,
        (_, true) => SyncMode::Update,
        _ => {
            Cli::command().print_help()?;
            println!();
            std::process::exit(2);
        }
    };

    template_aggregator::utils::logging::init_logger(cli.color, cli.verbose);
    colored::control::set_override(cli.color);

    info!("Loading configuration from: {}", cli.config.display());
    let mut config = match Config::load(Some(cli.config.as_path())) {
        Ok(config) => config,
        Err(AggregatorError::Credential(message)) => {
            error!("{}", message);
            std::process::exit(1);
        }
        Err(e) => return Err(e).context("Failed to load configuration"),
    };

    if let Some(workdir) = cli.workdir {
        config.workdir = workdir;
    }
    std::fs::create_dir_all(&config.workdir)
        .with_context(|| format!("Failed to create {}", config.workdir.display()))?;

    check_hosting(&config).await;

    let show_progress = std::io::stderr().is_terminal();
    let pipeline = TemplatePipeline::new(config.clone()).with_progress(show_progress);
    let summary = pipeline
        .run(GixBackend::new(config.clone_depth), mode)
        .await
        .context("Template aggregation failed")?;

    if let Some(path) = cli.report {
        ReportExporter::new(path, true)
            .export(&summary)
            .context("Failed to write run report")?;
    }

    print_summary(&summary);
    Ok(())
}

/// Exits on a rejected token; any other hosting problem only warns.
async fn check_hosting(config: &Config) {
    let client = HostingClient::new(config.api_url.clone(), config.token.clone());

    match client.verify_token().await {
        Ok(login) => info!("Authenticated to hosting API as {}", login),
        Err(AggregatorError::Credential(message)) => {
            error!("{}, generate a new one at https://github.com/settings/tokens", message);
            std::process::exit(1);
        }
        Err(e) => warn!("Could not verify token, continuing: {}", e),
    }

    if config.check_archived {
        let blacklist = config.blacklist_set();
        let targets: Vec<String> = config
            .repositories
            .iter()
            .filter(|url| !blacklist.contains(url.as_str()))
            .cloned()
            .collect();
        client.report_archived(&targets).await;
    }
}

fn print_summary(summary: &RunSummary) {
    let fleet = &summary.fleet;
    let line = format!(
        "Synced {} of {} repositories ({} skipped)",
        fleet.succeeded(),
        fleet.attempted(),
        fleet.skipped()
    );
    if fleet.failed() > 0 {
        println!("{}", format_warning(&line));
        for result in &fleet.results {
            if let template_aggregator::SyncOutcome::Failed { reason } = &result.outcome {
                println!("  {}", format_error(&format!("{}: {}", result.url, reason)));
            }
        }
    } else {
        println!("{}", format_success(&line));
    }

    let filters = &summary.filters;
    println!(
        "{}",
        format_info(&format!(
            "Removed {} duplicates and {} low-severity templates",
            filters.dedup.removed, filters.severity.removed
        ))
    );
    if summary.mode == SyncMode::Update {
        println!(
            "{}",
            format_info(&format!("{} new templates", filters.aggregate.added.len()))
        );
    }
    println!(
        "{}",
        format_success(&format!("{} unique templates", filters.aggregate.total))
    );
}
