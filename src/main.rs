//! roundup - autonomous interview round scheduler.
//!
//! Usage:
//!   roundup run [-c roundup.yaml]       Run the scheduler and control API until Ctrl-C
//!   roundup check [-c roundup.yaml]     Run a single cycle and print the outcome
//!   roundup validate [-c roundup.yaml]  Validate the configuration without running

use clap::{Parser, Subcommand};
use roundup::{
    ApiConfig, ApiState, AppConfig, CycleOutcome, DispatchEvent, DispatchObserver, EventLog,
    ObserverSet, SchedulerBuilder, SchedulerOptions, YamlLoader, start_server,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// How long shutdown waits for an in-flight cycle.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(15);

/// roundup - autonomous interview round scheduler
#[derive(Parser)]
#[command(name = "roundup")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file (defaults apply when absent)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduler and the control API
    Run {
        /// Override the batch size
        #[arg(short = 'b', long)]
        batch_size: Option<usize>,

        /// Override the poll interval in milliseconds
        #[arg(long)]
        poll_interval_ms: Option<u64>,

        /// Override the control API port
        #[arg(short = 'p', long)]
        port: Option<u16>,

        /// Do not serve the control API
        #[arg(long)]
        no_api: bool,
    },

    /// Run one check-and-process cycle and print the outcome
    Check {
        /// Override the batch size
        #[arg(short = 'b', long)]
        batch_size: Option<usize>,
    },

    /// Validate the configuration without running
    Validate,
}

/// Observer that logs dispatch events.
struct LoggingObserver;

#[async_trait::async_trait]
impl DispatchObserver for LoggingObserver {
    async fn on_event(&self, event: &DispatchEvent) {
        match event {
            DispatchEvent::BatchScheduled {
                batch_id,
                candidates,
                ..
            } => {
                let ids: Vec<&str> = candidates.iter().map(|c| c.id().as_str()).collect();
                info!("Batch {} scheduled: {}", batch_id, ids.join(", "));
            }
            DispatchEvent::BatchFailed {
                batch_id,
                candidates,
                error,
                ..
            } => {
                warn!(
                    "Batch {} failed for {} candidate(s): {}",
                    batch_id,
                    candidates.len(),
                    error
                );
            }
            DispatchEvent::DirectoryWarning { error, .. } => {
                warn!("Candidate directory returned unusable data: {}", error);
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            batch_size,
            poll_interval_ms,
            port,
            no_api,
        } => {
            run_scheduler(config, batch_size, poll_interval_ms, port, no_api).await?;
        }
        Commands::Check { batch_size } => {
            check_once(config, batch_size).await?;
        }
        Commands::Validate => {
            validate_config(&config);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            YamlLoader::load_config(path).map_err(|e| {
                error!("Invalid configuration: {}", e);
                e.into()
            })
        }
        None => {
            info!("No configuration file given, using defaults");
            Ok(AppConfig::default())
        }
    }
}

/// Run the scheduler until Ctrl-C.
async fn run_scheduler(
    mut config: AppConfig,
    batch_size: Option<usize>,
    poll_interval_ms: Option<u64>,
    port: Option<u16>,
    no_api: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(n) = batch_size {
        config.scheduler.batch_size = n;
    }
    if let Some(ms) = poll_interval_ms {
        config.scheduler.poll_interval_ms = ms;
    }
    if let Some(port) = port {
        config.api.port = port;
    }
    if no_api {
        config.api.enabled = false;
    }
    YamlLoader::validate(&config)?;

    let scheduler = SchedulerBuilder::build(&config)?;
    let events = Arc::new(EventLog::default());
    scheduler.set_observer(Arc::new(
        ObserverSet::new()
            .with(Arc::new(LoggingObserver))
            .with(events.clone()),
    ));

    info!(
        "Candidates from {}, rounds to {}",
        config.backend.candidates_url(),
        config.backend.rounds_url()
    );

    let server = if config.api.enabled {
        let state = ApiState::new(scheduler.clone(), events);
        Some(start_server(ApiConfig::from(&config.api), state).await?)
    } else {
        None
    };

    scheduler.start();
    info!("Press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    if let Err(e) = scheduler.shutdown(SHUTDOWN_TIMEOUT).await {
        warn!("{}", e);
    }
    if let Some(server) = server {
        server.abort();
    }

    info!("Goodbye!");
    Ok(())
}

/// Run one cycle and print its outcome.
async fn check_once(
    config: AppConfig,
    batch_size: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let scheduler = SchedulerBuilder::build(&config)?;
    scheduler.set_observer(Arc::new(LoggingObserver));
    if let Some(n) = batch_size {
        let rejected = scheduler.configure(SchedulerOptions::new().batch_size(n));
        if let Some(e) = rejected.into_iter().next() {
            return Err(e.into());
        }
    }

    match scheduler.run_cycle().await {
        CycleOutcome::Dispatched {
            batch_id,
            candidates,
        } => {
            println!("Dispatched batch {} ({} candidates):", batch_id, candidates.len());
            for id in &candidates {
                println!("  - {}", id);
            }
        }
        CycleOutcome::BelowThreshold { eligible, required } => {
            println!(
                "Not enough eligible candidates: {} of {} required",
                eligible, required
            );
        }
        CycleOutcome::DirectoryFailed { error, .. } => {
            return Err(format!("candidate directory failed: {}", error).into());
        }
        CycleOutcome::DispatchFailed { batch_id, error } => {
            return Err(format!("batch {} failed: {}", batch_id, error).into());
        }
        outcome => println!("Cycle outcome: {}", outcome.label()),
    }

    Ok(())
}

/// Print the effective configuration.
fn validate_config(config: &AppConfig) {
    let s = &config.scheduler;
    println!("Configuration is valid:");
    println!("  Batch size: {}", s.batch_size);
    println!("  Round duration: {} min", s.round_duration_minutes);
    println!("  Poll interval: {} ms", s.poll_interval_ms);
    println!("  Min dispatch gap: {} s", s.min_dispatch_gap_secs);
    println!("  Request timeout: {} s", s.request_timeout_secs);
    println!("  Reset on start: {}", s.reset_on_start);
    println!("  Timezone: {}", s.timezone);
    println!("  Candidates: {}", config.backend.candidates_url());
    println!("  Rounds: {}", config.backend.rounds_url());
    match &config.backend.api_token_env {
        Some(var) => println!("  Token variable: {}", var),
        None => println!("  Token variable: (none)"),
    }
    if config.api.enabled {
        println!("  API: http://{}:{}", config.api.host, config.api.port);
    } else {
        println!("  API: disabled");
    }
}
