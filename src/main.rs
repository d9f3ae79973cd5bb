mod script;

use anyhow::Result;
use clap::Parser;
use containers::{Address, BlockHeader, RootChainConfig};
use metrics::server::{run_metrics_server, MetricsServerConfig};
use metrics::RootChainMetrics;
use root_chain::get_root_chain_store;
use script::{Script, ScriptRunner};
use std::io;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
struct Args {
    /// YAML file overriding the devnet parameters.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// YAML script of transactions to run.
    #[arg(short, long)]
    script: PathBuf,

    #[arg(short, long, default_value = "0x00000000000000000000000000000000000000aa")]
    operator: Address,

    /// Keep serving metrics after the script finished.
    #[arg(long)]
    metrics: bool,

    #[arg(long, default_value = "127.0.0.1")]
    metrics_address: IpAddr,

    #[arg(long, default_value_t = 5054)]
    metrics_port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => RootChainConfig::load_from_file(path)?,
        None => RootChainConfig::default(),
    };
    let script = Script::load_from_file(&args.script)?;
    let store = get_root_chain_store(
        config,
        args.operator,
        BlockHeader::default(),
        script.genesis_time,
    )?;

    let metrics = Arc::new(RootChainMetrics::new()?);
    let mut runner = ScriptRunner::new(store, Some(metrics.clone()), io::stdout().lock());
    runner.run(&script)?;

    let store = &runner.store;
    metrics.set_current_fork(store.current_fork as i64);
    metrics.set_current_epoch(store.active_fork().current_epoch() as i64);
    metrics.set_last_finalized_block(store.active_fork().last_finalized_block as i64);
    info!(
        forks = store.num_forks(),
        events = store.events.len(),
        collected_fees = store.collected_fees,
        "state after script"
    );

    if args.metrics {
        let server_config = MetricsServerConfig {
            metrics_address: args.metrics_address,
            metrics_port: args.metrics_port,
        };
        tokio::select! {
            result = run_metrics_server(server_config, metrics) => result?,
            _ = tokio::signal::ctrl_c() => info!("shutting down"),
        }
    }

    Ok(())
}
