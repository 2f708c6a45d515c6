// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Top-level `start` and `destroy` flows.

use crate::config::Config;
use crate::constants::{istio, tools};
use crate::error::Result;
use crate::kubernetes::load_balancer_address;
use crate::readiness::{check_readiness, Ready};
use crate::steps::{destroy_plan, start_plan, RunReport, StepRunner};
use crate::tools::{ensure_installed, SystemToolchain, Toolchain};
use tracing::{info, instrument};

/// Binaries the start flow drives
pub const START_TOOLS: &[&str] = &[
    tools::KIND,
    tools::KUBECTL,
    tools::ISTIOCTL,
    tools::CLOUD_PROVIDER_KIND,
];

/// Binaries the destroy flow drives
pub const DESTROY_TOOLS: &[&str] = &[tools::KIND];

/// Provision the environment, deploy the sample and verify it answers
#[instrument(skip(config), fields(cluster = %config.cluster_name))]
pub async fn start(config: &Config) -> Result<Ready> {
    ensure_installed(START_TOOLS)?;
    provision(StepRunner::from_config(SystemToolchain, config), config).await
}

/// Run the start plan on `runner`, then wait for the gateway to serve the sample
pub async fn provision<T: Toolchain>(mut runner: StepRunner<T>, config: &Config) -> Result<Ready> {
    let report = runner.run(&start_plan(config)).await?;
    info!(
        "Provisioning done: {} steps run, {} already satisfied",
        report.executed.len(),
        report.skipped.len()
    );

    if let Some(helper) = runner.take_helper() {
        info!(
            "cloud-provider-kind running with pid {} (marker {})",
            helper.pid(),
            helper.marker().path().display()
        );
    }

    let client = runner.client().await?;
    check_readiness(
        || load_balancer_address(&client, istio::NAMESPACE, istio::INGRESS_SERVICE),
        &config.poll,
        &config.probe,
    )
    .await
}

/// Stop the helper and delete the cluster
#[instrument(skip(config), fields(cluster = %config.cluster_name))]
pub async fn destroy(config: &Config) -> Result<RunReport> {
    ensure_installed(DESTROY_TOOLS)?;
    teardown(StepRunner::from_config(SystemToolchain, config), config).await
}

/// Run the destroy plan on `runner`
pub async fn teardown<T: Toolchain>(mut runner: StepRunner<T>, config: &Config) -> Result<RunReport> {
    let report = runner.run(&destroy_plan(config)).await?;
    info!(
        "Teardown done: {} steps run, {} already satisfied",
        report.executed.len(),
        report.skipped.len()
    );
    Ok(report)
}
