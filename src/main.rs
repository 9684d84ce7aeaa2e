//! CLI entry point for the coreget tool.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use coreget_core::{
    Event, EventBus, FixedIdentity, Flavor, ResolutionEngine, TransferExecutor,
    build_default_provider_registry,
};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

mod cli;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (warn)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let events = EventBus::new();
    let identity = Arc::new(FixedIdentity::new("coreget-cli"));
    let registry = build_default_provider_registry(identity, events.clone());
    let engine = ResolutionEngine::new(registry)?;

    if let Some(provider) = &args.provider {
        engine.switch_provider(provider)?;
    }
    info!(provider = engine.active_provider_name(), "engine ready");

    match args.command {
        Command::Versions => {
            let versions = engine.list_runtime_versions().await;
            if versions.is_empty() {
                bail!("no runtime versions available (all providers unreachable?)");
            }
            for version in versions {
                println!("{}", version.id);
            }
        }
        Command::Flavors { version } => {
            for flavor in engine.probe_flavors(&version).await {
                println!("{flavor}");
            }
        }
        Command::Builds { version, flavor } => {
            let builds = engine.list_builds(&version, flavor).await;
            if builds.is_empty() {
                bail!("no {flavor} builds found for {version}");
            }
            for build in builds {
                println!("{}", build.id);
            }
        }
        Command::Fetch {
            version,
            flavor,
            build,
            output,
        } => {
            fetch(&engine, events, &version, flavor, &build, output, args.quiet).await?;
        }
    }

    Ok(())
}

async fn fetch(
    engine: &ResolutionEngine,
    events: EventBus,
    version: &str,
    flavor: Flavor,
    build: &str,
    output: std::path::PathBuf,
    quiet: bool,
) -> Result<()> {
    let location = engine
        .resolve_artifact(version, flavor, build)
        .await
        .with_context(|| format!("could not resolve {flavor} build {build} for {version}"))?;
    println!("Resolved: {}", location.url);

    let progress = spawn_progress_ui(&events, show_progress_bar(quiet, stdout_is_terminal()));
    let executor = TransferExecutor::new(events);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let result = executor
        .download(&location, &output, &location.suggested_file_name, &cancel)
        .await;

    // The bar task ends on the Done event; bound the wait in case the
    // transfer was rejected before one was emitted.
    if let Some(handle) = progress {
        let _ = tokio::time::timeout(Duration::from_millis(500), handle).await;
    }

    let path = result.with_context(|| format!("download of {} failed", location.url))?;
    println!("Saved to {}", path.display());
    Ok(())
}

fn stdout_is_terminal() -> bool {
    use std::io::IsTerminal;
    std::io::stdout().is_terminal()
}

/// The bar is drawn only on an interactive terminal and never under `-q`.
fn show_progress_bar(quiet: bool, interactive: bool) -> bool {
    !quiet && interactive
}

/// Drives an indicatif bar from the event stream until the terminal
/// outcome arrives.
fn spawn_progress_ui(events: &EventBus, enabled: bool) -> Option<tokio::task::JoinHandle<()>> {
    if !enabled {
        return None;
    }
    let mut rx = events.subscribe();
    Some(tokio::spawn(async move {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template("{bar:40} {pos:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        loop {
            match rx.recv().await {
                Ok(Event::Progress(percent)) => bar.set_position(u64::from(percent)),
                Ok(Event::Log(line)) => bar.set_message(line),
                Ok(Event::Done { .. }) => {
                    bar.finish_and_clear();
                    break;
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    }))
}
