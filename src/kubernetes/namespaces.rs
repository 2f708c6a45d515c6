// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Namespace lookups and labelling

use crate::constants::FIELD_MANAGER;
use crate::error::Result;
use k8s_openapi::api::core::v1::Namespace;
use kube::{
    api::{Patch, PatchParams},
    Api, Client,
};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

/// Fetch a namespace, or None if it does not exist
async fn get_namespace(client: &Client, namespace: &str) -> Result<Option<Namespace>> {
    let namespaces: Api<Namespace> = Api::all(client.clone());

    match namespaces.get(namespace).await {
        Ok(ns) => Ok(Some(ns)),
        Err(kube::Error::Api(err)) if err.code == 404 => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Check whether a namespace exists
#[instrument(skip(client))]
pub async fn namespace_exists(client: &Client, namespace: &str) -> Result<bool> {
    let exists = get_namespace(client, namespace).await?.is_some();
    debug!("Namespace {} exists: {}", namespace, exists);
    Ok(exists)
}

/// Check whether a namespace exists and carries `key=value`
#[instrument(skip(client))]
pub async fn namespace_has_label(
    client: &Client,
    namespace: &str,
    key: &str,
    value: &str,
) -> Result<bool> {
    Ok(get_namespace(client, namespace)
        .await?
        .and_then(|ns| ns.metadata.labels)
        .and_then(|labels| labels.get(key).cloned())
        .is_some_and(|v| v == value))
}

/// Set a single label on a namespace using server-side apply
#[instrument(skip(client))]
pub async fn label_namespace(client: &Client, namespace: &str, key: &str, value: &str) -> Result<()> {
    let namespaces: Api<Namespace> = Api::all(client.clone());

    let labels = BTreeMap::from([(key, value)]);
    let patch = json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {
            "name": namespace,
            "labels": labels
        }
    });

    let pp = PatchParams::apply(FIELD_MANAGER).force();
    namespaces.patch(namespace, &pp, &Patch::Apply(&patch)).await?;

    info!("Labelled namespace {} with {}={}", namespace, key, value);
    Ok(())
}
