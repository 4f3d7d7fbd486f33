//! mongotunnel - MongoDB wire protocol tooling
//!
//! Single binary that provides:
//! - A logging proxy between drivers and a MongoDB server
//! - Insert mirroring into a second collection
//! - Local handshake answering and TLS to the upstream
//! - An insert/query/drop smoke test

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

use mongotunnel_common::config::{ProxyConfig, TesterConfig};
use mongotunnel_common::logging;
use mongotunnel_proxy::ProxyServer;
use mongotunnel_tester::{MongoPeopleStore, OperationSet};

mod cli;
mod config;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = config::load(&cli.config).await?;
    cli.apply_logging(&mut config.logging);
    logging::init(&config.logging).context("failed to initialise logging")?;

    match cli.command {
        Commands::Proxy(args) => {
            args.apply(&mut config.proxy);
            run_proxy(&config.proxy).await?;
        }

        Commands::Tester(args) => {
            args.apply(&mut config.tester);
            run_tester(&args.operations(), &config.tester).await?;
        }

        Commands::Version => {
            println!("mongotunnel version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

async fn run_proxy(config: &ProxyConfig) -> Result<()> {
    info!("Starting mongotunnel proxy...");
    let server = ProxyServer::new(config).context("invalid proxy configuration")?;

    // Handle shutdown gracefully
    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutdown signal received");
    };

    tokio::select! {
        result = server.run() => result.context("proxy stopped")?,
        () = shutdown => {}
    }

    Ok(())
}

async fn run_tester(ops: &OperationSet, config: &TesterConfig) -> Result<()> {
    debug!("Requested operations {}", ops);

    let store = MongoPeopleStore::connect(config)
        .await
        .with_context(|| format!("failed to connect to {}", config.address))?;
    let report = mongotunnel_tester::run(&store, ops, config).await?;

    debug!(
        "Run finished: {} inserts, {} found, dropped={}",
        report.inserts.len(),
        report.found.len(),
        report.dropped
    );
    Ok(())
}
