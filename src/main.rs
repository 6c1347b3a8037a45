use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::Level;

use sentinel_files::config::Config;
use sentinel_files::server::{Dispatcher, PoolPolicy, Server};

/// Serve files from a directory over a minimal HTTP/1.1.
#[derive(Debug, Parser)]
#[command(name = "sentinel-files", version)]
struct Args {
    /// Directory to serve files from
    root: Option<PathBuf>,

    /// Port to listen on
    port: Option<u16>,

    /// Host to bind (default: all interfaces)
    host: Option<String>,

    /// Maximum number of connections served at once
    #[arg(long)]
    max_connections: Option<usize>,

    /// YAML config file; positional arguments override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> anyhow::Result<Config> {
        let mut cfg = match &self.config {
            Some(path) => Config::from_yaml_file(path)?,
            None => Config::default(),
        };

        if let Some(root) = self.root {
            cfg.files.root = Some(root);
        }
        if let Some(port) = self.port {
            cfg.server.port = port;
        }
        if let Some(host) = self.host {
            cfg.server.host = host;
        }
        if let Some(max) = self.max_connections {
            cfg.server.max_connections = max;
        }

        Ok(cfg)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let cfg = args
        .into_config()?
        .validate()
        .context("invalid server configuration")?;

    let dispatcher = Dispatcher::new(PoolPolicy::for_max_connections(cfg.max_connections));
    let policy = dispatcher.policy();
    tracing::info!(core = policy.core, max = policy.max, "Worker pool ready");
    let server = Server::bind(&cfg, dispatcher).await?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutdown signal received");
        })
        .await;

    Ok(())
}
