//! Ledger orchestration simulator
//!
//! Drives one bulk operation through a [`ControlSurface`] backed by the
//! in-process [`SimulatedLedger`] and prints the execution report as JSON.
//!
//! ```text
//! ledger-orch-sim --items 23 --scenario late-failure --verbose
//! ```

#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(unused_must_use)]

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use ledger_orchestrator::config::OrchestratorConfig;
use ledger_orchestrator::ledger::simulated::{Scenario, SimulatedLedger, SimulatedOperation};
use ledger_orchestrator::metrics::metrics;
use ledger_orchestrator::orchestrator::sinks::{CollectingNotifier, TracingRelay};
use ledger_orchestrator::{ControlSurface, ExecutionHooks};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScenarioArg {
    Success,
    Reject,
    EarlyFailure,
    LateFailure,
    Abandon,
}

impl ScenarioArg {
    fn scenario(self) -> Scenario {
        match self {
            Self::Success => Scenario::Succeed,
            Self::Reject => Scenario::RejectOnSubmit("simulated network rejection".into()),
            Self::EarlyFailure => {
                Scenario::FailBeforeRunning("simulated validation failure".into())
            }
            Self::LateFailure => Scenario::FailAfterRunning("simulated execution failure".into()),
            Self::Abandon => Scenario::Vanish,
        }
    }
}

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Number of items in the bulk operation
    #[arg(short, long, default_value_t = 23)]
    items: u64,

    /// Scripted ledger behaviour
    #[arg(short, long, value_enum, default_value_t = ScenarioArg::Success)]
    scenario: ScenarioArg,

    /// Delay between simulated status changes, in milliseconds
    #[arg(long, default_value_t = 50)]
    step_ms: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = load_config(&args.config)?;
    init_logging(&config, args.verbose)?;

    info!("Starting ledger orchestration simulator");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        items = args.items,
        scenario = ?args.scenario,
        max_chunk_size = config.batch.max_chunk_size,
        "Simulation parameters"
    );

    let ledger = Arc::new(
        SimulatedLedger::new(args.scenario.scenario())
            .with_step_delay(Duration::from_millis(args.step_ms)),
    );
    let notifier = Arc::new(CollectingNotifier::new());
    let surface = ControlSurface::new(
        "simulator",
        Arc::clone(&ledger),
        &config,
        notifier.clone(),
        Arc::new(TracingRelay),
    )
    .context("Failed to create control surface")?
    .with_refresh_hook(|| info!("Refreshing dependent views"));

    let hooks = ExecutionHooks::new()
        .on_running(|| info!("Transaction running"))
        .on_succeeded(|| info!("Transaction succeeded"));
    let report = surface
        .submit_bulk(
            (0..args.items).collect(),
            |chunk| SimulatedOperation::new("redeem", chunk),
            hooks,
        )
        .await;

    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to serialize report")?
    );
    for message in notifier.messages() {
        warn!("Operator notification: {}", message);
    }

    if config.monitoring.enable_metrics {
        print!("{}", metrics().render()?);
    }

    Ok(())
}

/// Initialize logging subsystem
fn init_logging(config: &OrchestratorConfig, verbose: bool) -> Result<()> {
    let default_filter = if verbose {
        "ledger_orchestrator=debug,info".to_string()
    } else {
        format!("ledger_orchestrator={},warn", config.logging.level)
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    // Logs go to stderr so stdout carries only the report
    let registry = tracing_subscriber::registry().with(env_filter);
    if config.logging.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .context("Failed to install JSON subscriber")?;
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .context("Failed to install subscriber")?;
    }

    Ok(())
}

/// Load configuration from file with fallback to defaults
fn load_config(path: &str) -> Result<OrchestratorConfig> {
    if std::path::Path::new(path).exists() {
        OrchestratorConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path))
    } else {
        let mut config = OrchestratorConfig::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }
}
