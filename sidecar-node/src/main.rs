// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! Validator health sidecar
#![warn(missing_docs)]
#![warn(unused_crate_dependencies)]

use crate::settings::{Overrides, Settings};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use sidecar_health_exports::HealthReporter;
use sidecar_health_worker::{
    check_closing, check_sync, start_health_worker, FanoutReporter, JsonlReporter,
    TracingReporter,
};
use sidecar_metrics::{start_metrics_server, SidecarMetrics};
use sidecar_models::config::{ANTITHESIS_OUTPUT_DIR_ENV, ANTITHESIS_OUTPUT_FILE};
use sidecar_models::NodeId;
use sidecar_sdk::RpcClient;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{info, warn};

mod settings;

#[derive(Parser, Debug)]
#[command(name = "sidecar", version, about = "Watches validators for stalled or regressing ledgers")]
struct Args {
    /// Validator to poll, as host, host:port or URL. Repeat for each validator.
    #[arg(short = 'v', long = "validator", value_name = "HOST")]
    validators: Vec<NodeId>,
    /// Seconds between the starts of two health check passes
    #[arg(short, long, value_name = "SECS")]
    interval: Option<u64>,
    /// Passes a validator may keep the same validated ledger before it is stalled
    #[arg(short, long, value_name = "CYCLES")]
    tolerance: Option<u64>,
    /// Stalls below this validated ledger index are not escalated
    #[arg(long, value_name = "INDEX")]
    min: Option<u64>,
    /// Stop after this many passes, 0 to run until interrupted
    #[arg(long, value_name = "CYCLES")]
    stop: Option<u64>,
    /// JSON-RPC port of validators given without one
    #[arg(long)]
    port: Option<u16>,
    /// Bound on a single node query, in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Append events and assertions to this JSON lines file
    #[arg(long, value_name = "PATH")]
    events_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Exit successfully if the node is synced
    CheckSync {
        /// node to check
        node: NodeId,
    },
    /// Exit successfully if every validator is proposing and closing ledgers
    CheckClosing {
        /// validator to check, defaults to the configured ones
        #[arg(short = 'v', long = "validator", value_name = "HOST")]
        validators: Vec<NodeId>,
    },
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            nodes: self.validators.clone(),
            interval_secs: self.interval,
            tolerance: self.tolerance,
            min_index_for_alert: self.min,
            max_cycles: self.stop,
            port: self.port,
            timeout_ms: self.timeout_ms,
            events_file: self.events_file.clone(),
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(code) => code,
        Err(e) => {
            // logging may not be set up yet
            eprintln!("{}", failure_message(&e));
            ExitCode::FAILURE
        }
    }
}

/// One line with the whole context chain
fn failure_message(e: &anyhow::Error) -> String {
    format!("sidecar: {:#}", e)
}

fn run(args: Args) -> Result<ExitCode> {
    let mut settings = Settings::load().context("could not load settings")?;
    settings.apply(args.overrides());
    sidecar_logging::init_tracing(settings.logging.level).map_err(|e| anyhow!(e))?;

    let rpc = RpcClient::new(settings.rpc_config())?;
    match args.command {
        Some(Command::CheckSync { node }) => {
            let synced = block_on(check_sync(&rpc, &node))?;
            if synced {
                info!("{} is synced", node);
            } else {
                warn!("{} is not synced", node);
            }
            Ok(exit_code(synced))
        }
        Some(Command::CheckClosing { validators }) => {
            let nodes = if validators.is_empty() {
                settings.health.nodes.clone()
            } else {
                validators
            };
            if nodes.is_empty() {
                return Err(anyhow!("no validator to check"));
            }
            let closing = block_on(check_closing(
                &rpc,
                &nodes,
                Duration::from_millis(settings.closing.poll_interval_ms),
                Duration::from_secs(settings.closing.timeout_secs),
            ))?;
            Ok(exit_code(closing))
        }
        None => run_health(&settings, rpc),
    }
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn block_on<F: std::future::Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("could not build runtime")?;
    Ok(runtime.block_on(future))
}

/// Events file from the settings, or the Antithesis output directory
fn events_path(settings: &Settings) -> Option<PathBuf> {
    settings.events.file.clone().or_else(|| {
        std::env::var_os(ANTITHESIS_OUTPUT_DIR_ENV)
            .map(|dir| PathBuf::from(dir).join(ANTITHESIS_OUTPUT_FILE))
    })
}

fn build_reporter(settings: &Settings) -> Result<Box<dyn HealthReporter>> {
    let mut sinks: Vec<Box<dyn HealthReporter>> = vec![Box::new(TracingReporter)];
    if let Some(path) = events_path(settings) {
        let jsonl = JsonlReporter::create(&path)
            .with_context(|| format!("could not open events file {}", path.display()))?;
        info!("writing events to {}", path.display());
        sinks.push(Box::new(jsonl));
    }
    Ok(Box::new(FanoutReporter(sinks)))
}

fn run_health(settings: &Settings, rpc: RpcClient) -> Result<ExitCode> {
    let reporter = build_reporter(settings)?;

    let metrics = SidecarMetrics::new(settings.metrics.enabled);
    let mut metrics_stopper = if metrics.is_enabled() {
        let bind: SocketAddr = settings
            .metrics
            .bind
            .parse()
            .with_context(|| format!("invalid metrics address {}", settings.metrics.bind))?;
        start_metrics_server(&metrics, bind)
    } else {
        None
    };

    let (mut health_manager, done_rx) =
        start_health_worker(settings.health_config(), Box::new(rpc), reporter, metrics)?;

    // interrupt signal listener
    let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })
    .context("could not set the signal handler")?;

    crossbeam_channel::select! {
        recv(stop_rx) -> _ => info!("interrupt signal received, finishing the current pass"),
        recv(done_rx) -> passes => match passes {
            Ok(passes) => info!("health check done after {} passes", passes),
            Err(_) => warn!("health worker exited unexpectedly"),
        },
    }

    health_manager.stop();
    if let Some(stopper) = metrics_stopper.as_mut() {
        stopper.stop();
    }
    info!("sidecar stopped");
    Ok(ExitCode::SUCCESS)
}
