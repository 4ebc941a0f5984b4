mod cli;
mod config;
mod convergence;
mod error;
mod event;
mod gateway;
mod grouping;
mod instance;
mod logging;
mod orchestrator;
mod ordering;
mod report;
mod ui;

use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Parser;

use cli::{Cli, Command};
use config::StartStopConfig;
use error::StartStopError;
use event::StartStopEvent;
use gateway::HttpGateway;
use orchestrator::Orchestrator;
use ui::TerminalObserver;

#[tokio::main]
async fn main() -> Result<()> {
    let Cli {
        command,
        config,
        log_level,
        verbose,
    } = Cli::parse();

    let (event_path, force_dry_run) = match &command {
        Command::Run { event, dry_run } => (event.as_path(), *dry_run),
        Command::Plan { event } => (event.as_path(), false),
    };

    let mut event = load_event(event_path)?;
    event.dry_run |= force_dry_run;
    let level = logging::resolve_level(log_level.as_deref(), verbose, &event.log_level)?;
    logging::init(level);
    tracing::info!(?event, "start stop event");

    let config = StartStopConfig::load(config.as_deref())?;
    if config.endpoint.is_empty() {
        bail!(StartStopError::Config(
            "no control-plane endpoint; set `endpoint` in startstop.toml or STARTSTOP_ENDPOINT"
                .to_string()
        ));
    }
    let gateway = HttpGateway::new(&config.endpoint, config.request_timeout())
        .context("failed to build control-plane client")?;
    let orch = Orchestrator::new(&gateway, &config);

    match command {
        Command::Run { .. } => {
            let mut observer = TerminalObserver::new();
            match orch.run(&event, &mut observer).await {
                Ok(report) => {
                    observer.print_report(&report)?;
                    Ok(())
                }
                Err(aborted) => {
                    tracing::error!(error = %aborted.error, "run aborted");
                    if aborted.error.is_configuration() {
                        observer.fail(&format!("{} (no instance was touched)", aborted.error));
                    } else {
                        observer.fail(&aborted.error.to_string());
                    }
                    if let Some(report) = &aborted.report
                        && let Err(e) = observer.print_report(report)
                    {
                        tracing::error!(error = %e, "failed to print partial report");
                    }
                    Err(aborted.into())
                }
            }
        }
        Command::Plan { .. } => {
            event.validate()?;
            let groups = orch.discover(&event).await?;
            tracing::info!(
                groups = groups.len(),
                instances = groups.instance_count(),
                "planned run"
            );
            let plan = orchestrator::plan(&groups, &event.order_by_tag, &event.order_by);
            ui::print_plan(&plan);
            Ok(())
        }
    }
}

fn load_event(path: &Path) -> Result<StartStopEvent> {
    StartStopEvent::load(path).with_context(|| format!("failed to load event {}", path.display()))
}
