// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Command-line surface

use crate::config::Config;
use crate::environment;
use crate::error::Result;
use clap::{Parser, Subcommand};

/// Disposable local service-mesh environment running the Bookinfo sample
#[derive(Parser, Debug)]
#[command(name = "meshbox", version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Create the cluster, install the mesh and deploy Bookinfo
    Start,
    /// Stop cloud-provider-kind and delete the cluster
    Destroy,
}

impl Cli {
    pub async fn run(self, config: &Config) -> Result<()> {
        match self.command {
            Commands::Start => {
                let ready = environment::start(config).await?;
                println!("Bookinfo is available at {}", ready.url);
                println!("{}", ready.marker);
            }
            Commands::Destroy => {
                environment::destroy(config).await?;
                println!("Environment '{}' destroyed", config.cluster_name);
            }
        }
        Ok(())
    }
}
