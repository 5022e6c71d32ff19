#![deny(unsafe_code)]

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use shortcut_broker::common::debug;
use shortcut_broker::config::BrokerConfig;
use shortcut_broker::daemon;

#[derive(Parser)]
#[command(name = "shortcut-broker")]
#[command(version)]
#[command(about = "Desktop-wide global shortcut broker", long_about = None)]
struct Cli {
    /// Name of the IPC server to connect to for calls and notifications
    #[arg(long)]
    ipc_server: Option<String>,

    /// Broker settings file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep shortcuts in memory only
    #[arg(long)]
    no_persist: bool,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    /// Load the registry, print it as JSON and exit
    #[arg(long)]
    dump: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG overrides the default level
    let level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let mut config = match &cli.config {
        Some(path) => BrokerConfig::load_from(path)?,
        None => BrokerConfig::load()?,
    };
    if cli.no_persist {
        config.persist = false;
    }

    debug::log_system_info(&config.search_paths());

    if cli.dump {
        let registry = daemon::build_registry(&config)?;
        println!("{}", debug::dump_registry(&registry)?);
        return Ok(());
    }

    let Some(server_name) = cli.ipc_server else {
        anyhow::bail!("--ipc-server is required unless --dump is given");
    };

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build Tokio runtime")?;

    rt.block_on(daemon::run_broker(config, server_name))
}
