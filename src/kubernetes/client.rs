// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Client creation for the local kind cluster

use crate::error::{MeshboxError, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::{debug, instrument};

/// Create a Kubernetes client for a context of the default kubeconfig
#[instrument]
pub async fn create_cluster_client(context: &str) -> Result<Client> {
    let kubeconfig = Kubeconfig::read()
        .map_err(|e| MeshboxError::Kubeconfig(format!("Failed to read kubeconfig: {}", e)))?;

    create_client_from_kubeconfig(kubeconfig, context).await
}

/// Create a client for `context` from an already parsed kubeconfig
pub async fn create_client_from_kubeconfig(kubeconfig: Kubeconfig, context: &str) -> Result<Client> {
    ensure_context(&kubeconfig, context)?;

    let options = KubeConfigOptions {
        context: Some(context.to_string()),
        ..Default::default()
    };
    let client_config = Config::from_custom_kubeconfig(kubeconfig, &options)
        .await
        .map_err(|e| MeshboxError::Kubeconfig(format!("Failed to create config: {}", e)))?;

    debug!("Using API server {}", client_config.cluster_url);

    Client::try_from(client_config)
        .map_err(|e| MeshboxError::Kubeconfig(format!("Failed to create client: {}", e)))
}

/// Check that the kubeconfig defines the context
fn ensure_context(kubeconfig: &Kubeconfig, context: &str) -> Result<()> {
    if kubeconfig.contexts.iter().any(|c| c.name == context) {
        Ok(())
    } else {
        Err(MeshboxError::Kubeconfig(format!(
            "context '{}' not found; has the cluster been created?",
            context
        )))
    }
}
