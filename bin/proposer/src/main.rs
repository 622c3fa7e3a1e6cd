//! Proof orchestrator CLI.
//!
//! Loads the proposer's `config.toml` and the per-chain rollup config, opens the
//! sqlite-backed ledger, and runs the orchestrator's tick loop until `SIGTERM`/`SIGINT`.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::info;

use proposer_config::{Config, RollupConfig};
use proposer_derivation::RangeDeriver;
use proposer_ledger::Ledger;
use proposer_orchestrator::{Orchestrator, OrchestratorConfig};
use prover_gateway::ProverGateway;

mod error;
mod rpc;

/// Proof orchestrator for a span/aggregate-proof rollup proposer service.
#[derive(Parser, Debug)]
#[command(name = "proposer")]
#[command(about = "Drives span and aggregate proof requests for a ZK-rollup proposer")]
struct Cli {
    /// Path to the application config file.
    #[arg(long, short, default_value = "config.toml")]
    config: PathBuf,

    /// Tracing directive (e.g. `debug`, `proposer=trace`), overriding the built-in default.
    #[arg(long)]
    log_level: Option<String>,

    /// Run a single tick and exit instead of starting the tick loop, for operational scripts.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_directive = cli.log_level.clone().unwrap_or_else(|| "proposer=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(default_directive.parse()?))
        .init();

    let config = Config::load(&cli.config)?;

    let metrics_handle = proposer_orchestrator::metrics::init_metrics();
    tokio::spawn(serve_metrics(metrics_handle));

    let orchestrator = Arc::new(build_orchestrator(&config).await?);

    if cli.once {
        orchestrator.tick().await?;
        return Ok(());
    }

    let shutdown_token = CancellationToken::new();
    let handle = orchestrator.spawn(shutdown_token.clone());

    shutdown_signal().await;
    shutdown_token.cancel();
    handle.await?;

    Ok(())
}

async fn build_orchestrator(config: &Config) -> anyhow::Result<Orchestrator> {
    let rollup_config_path = config.rollup_configs_dir.join(format!("{}.json", config.l2_chain_id));
    let rollup_config_json = std::fs::read_to_string(&rollup_config_path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", rollup_config_path.display()))?;
    let rollup_config = RollupConfig::from_json(&rollup_config_json)?;

    let ledger = Ledger::open(&config.sqlite_path).await?;

    let rollup_client = Arc::new(rpc::RollupRpcClient::new(config.l2_rpc_url.clone()));
    let l1_client = Arc::new(rpc::L1RpcClient::new(config.l1_rpc_url.clone()));
    let beacon_client = Arc::new(rpc::BeaconHttpClient::new(config.beacon_rpc_url.clone()));

    let deriver = RangeDeriver::new(
        rollup_client.clone(),
        l1_client,
        beacon_client,
        rollup_config,
        config.scratch_dir.clone(),
        config.batch_sender_address.clone(),
        config.batch_inbox_address.clone(),
        600, // max L1-block deviation before derivation gives up and retries next tick
    );

    let gateway = ProverGateway::new(config.prover_base_url.clone());

    let output_oracle = Arc::new(rpc::OutputOracleRpcClient::new(
        config.l1_rpc_url.clone(),
        config.output_oracle_address.clone(),
    ));
    let checkpoint_provider = Arc::new(rpc::LatestL1CheckpointProvider::new(config.l1_rpc_url.clone()));

    info!(
        prover_base_url = %config.prover_base_url,
        l2_chain_id = config.l2_chain_id,
        sqlite_path = %config.sqlite_path.display(),
        "proposer configured"
    );

    Ok(Orchestrator::new(
        ledger,
        gateway,
        deriver,
        rollup_client,
        output_oracle,
        checkpoint_provider,
        OrchestratorConfig {
            proof_timeout: config.proof_timeout(),
            max_concurrent_span_requests: config.max_concurrent_span_requests as u64,
            tick_interval: config.tick_interval(),
        },
    ))
}

/// Serves Prometheus metrics on `:9090/metrics`, mirroring `zkboost-server`'s own
/// axum-based `/metrics` endpoint.
async fn serve_metrics(handle: metrics_exporter_prometheus::PrometheusHandle) {
    use axum::{routing::get, Router};

    let app = Router::new().route(
        "/metrics",
        get(move || {
            let handle = handle.clone();
            async move { handle.render() }
        }),
    );

    let listener = match tokio::net::TcpListener::bind("0.0.0.0:9090").await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, "failed to bind metrics listener");
            return;
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "metrics server failed");
    }
}

async fn shutdown_signal() {
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, starting graceful shutdown"),
        _ = sigint.recv() => info!("received SIGINT (Ctrl-C), starting graceful shutdown"),
    }
}
