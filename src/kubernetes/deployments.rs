// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Rollout waiting for the sample application

use crate::error::{MeshboxError, Result};
use k8s_openapi::api::apps::v1::Deployment;
use kube::{api::ListParams, Api, Client, ResourceExt};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{info, instrument, warn};

/// Check if a deployment reports the Available=True condition
pub fn is_deployment_available(deployment: &Deployment) -> bool {
    deployment
        .status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .is_some_and(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Available" && c.status == "True")
        })
}

/// Names of deployments that are not available yet
fn pending_deployments(deployments: &[Deployment]) -> Vec<String> {
    deployments
        .iter()
        .filter(|d| !is_deployment_available(d))
        .map(|d| d.name_any())
        .collect()
}

/// Wait until the namespace has deployments and all of them are available
#[instrument(skip(client))]
pub async fn wait_for_deployments(
    client: &Client,
    namespace: &str,
    timeout: Duration,
    interval: Duration,
) -> Result<()> {
    let deployments: Api<Deployment> = Api::namespaced(client.clone(), namespace);
    let started = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;

        match deployments.list(&ListParams::default()).await {
            Ok(list) if list.items.is_empty() => {
                info!("No deployments in {} yet, waiting {:?}...", namespace, interval);
            }
            Ok(list) => {
                let pending = pending_deployments(&list.items);
                if pending.is_empty() {
                    info!("All {} deployments in {} are available", list.items.len(), namespace);
                    return Ok(());
                }
                info!(
                    "Waiting for deployments in {}: {}",
                    namespace,
                    pending.join(", ")
                );
            }
            Err(e) => {
                warn!("Error listing deployments in {}: {}, retrying...", namespace, e);
            }
        }

        if started.elapsed() + interval > timeout {
            return Err(MeshboxError::RolloutTimeout {
                namespace: namespace.to_string(),
                attempts,
                waited: started.elapsed(),
            });
        }

        sleep(interval).await;
    }
}
