// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Vaultline Node
//!
//! Entry point for the `vaultline-node` binary. Parses CLI arguments,
//! initializes logging and metrics, and either serves the HTTP API or runs
//! a one-shot command.
//!
//! - `serve`    — REST API and metrics over an in-memory ledger
//! - `inspect`  — commitment and selector table of a definition
//! - `evaluate` — verify a proposal file against vault files
//! - `build`    — plan and converge an unsigned spend
//! - `version`  — print build version information
//!
//! One-shot commands print JSON on stdout; logs go to stderr.

mod api;
mod cli;
mod ledger;
mod logging;
mod metrics;
mod service;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::sync::Arc;
use tokio::signal;

use vaultline_contracts::planner::plan_and_build;
use vaultline_contracts::{verify_proposal, BuildRequest, VaultRegistry};
use vaultline_protocol::config::PROTOCOL_VERSION;
use vaultline_protocol::transaction::{ChainTip, TransactionProposal};
use vaultline_protocol::value::Utxo;

use cli::{Commands, VaultlineCli};
use ledger::Ledger;
use metrics::NodeMetrics;
use service::{VaultService, VaultSummary};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = VaultlineCli::parse();
    logging::init_logging(logging::DEFAULT_FILTER, cli.log_format);

    match cli.command {
        Commands::Serve(args) => serve(args).await,
        Commands::Inspect(args) => inspect(args),
        Commands::Evaluate(args) => evaluate(args),
        Commands::Build(args) => build(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the API server and the metrics endpoint.
async fn serve(args: cli::ServeArgs) -> Result<()> {
    tracing::info!(
        rpc_port = args.rpc_port,
        metrics_port = args.metrics_port,
        height = args.height,
        fee_rate = args.builder.fee_rate,
        "starting vaultline-node"
    );

    // --- Ledger ---
    let ledger = Arc::new(Ledger::new(ChainTip::at_height(args.height)));
    if let Some(path) = &args.ledger_seed {
        let utxos: Vec<Utxo> = cli::read_json(path)?;
        let count = utxos.len();
        for utxo in utxos {
            ledger.fund(utxo);
        }
        tracing::info!(path = %path.display(), count, "ledger seeded");
    }

    // --- Metrics ---
    let node_metrics =
        Arc::new(NodeMetrics::new().context("failed to register Prometheus metrics")?);

    // --- Service ---
    let service = Arc::new(VaultService::new(
        ledger.clone(),
        ledger,
        args.builder.params(),
        Arc::clone(&node_metrics),
    ));
    for vault in cli::load_vaults(&args.vaults)? {
        service.register(vault)?;
    }

    let app_state = api::AppState {
        version: format!(
            "{} (protocol {})",
            env!("CARGO_PKG_VERSION"),
            PROTOCOL_VERSION
        ),
        service,
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("{}:{}", args.bind, args.rpc_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind RPC listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("{}:{}", args.bind, args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    tracing::info!("vaultline-node stopped");
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to encode output")?
    );
    Ok(())
}

fn inspect(args: cli::InspectArgs) -> Result<()> {
    let summaries: Vec<VaultSummary> = cli::load_vaults(&[args.vault])?
        .iter()
        .map(VaultSummary::of)
        .collect();
    print_json(&summaries)
}

fn evaluate(args: cli::EvaluateArgs) -> Result<()> {
    let mut registry = VaultRegistry::new();
    for vault in cli::load_vaults(&args.vaults)? {
        registry.insert(vault);
    }
    let proposal: TransactionProposal = cli::read_json(&args.proposal)?;
    let evaluations = verify_proposal(&proposal, &registry, ChainTip::at_height(args.height))
        .with_context(|| format!("proposal {} rejected", args.proposal.display()))?;
    print_json(&evaluations)
}

fn build(args: cli::BuildArgs) -> Result<()> {
    let vault = cli::load_vaults(std::slice::from_ref(&args.vault))?
        .into_iter()
        .next()
        .with_context(|| format!("no vault in {}", args.vault.display()))?;
    let utxo: Utxo = cli::read_json(&args.utxo)?;
    let request: BuildRequest = match &args.request {
        Some(path) => cli::read_json(path)?,
        None => BuildRequest::default(),
    };
    let built = plan_and_build(
        &vault,
        args.function,
        &utxo,
        &request,
        ChainTip::at_height(args.height),
        &args.builder.params(),
    )
    .with_context(|| format!("cannot build {}", args.function))?;
    print_json(&built)
}

/// Prints version information to stdout.
fn print_version() {
    println!("vaultline-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol       {}", PROTOCOL_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported. If a handler cannot be
/// installed, that branch never resolves.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
