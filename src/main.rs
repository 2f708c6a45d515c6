// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use meshbox::cli::Cli;
use meshbox::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing, defaulting to info
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: cluster={}, app_namespace={}, poll={}x{:?}",
        config.cluster_name, config.app_namespace, config.poll.max_attempts, config.poll.delay
    );

    // anyhow prints the error on return
    cli.run(&config).await.inspect_err(|e| {
        if let Some(hint) = e.hint() {
            warn!("Hint: {}", hint);
        }
    })?;

    Ok(())
}
