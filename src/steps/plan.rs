// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Step lists for `start` and `destroy`

use super::{Action, Guard, Step};
use crate::config::Config;
use crate::constants::{istio, tools};
use crate::tools::Invocation;

/// Bring up the cluster, mesh and sample application
pub fn start_plan(config: &Config) -> Vec<Step> {
    let context = config.kube_context();

    vec![
        Step::new("create cluster", Action::CreateCluster(config.cluster_name.clone()))
            .skip_if(Guard::ClusterExists(config.cluster_name.clone())),
        Step::new(
            "start cloud-provider-kind",
            Action::LaunchHelper(Invocation::new(tools::CLOUD_PROVIDER_KIND)),
        )
        .skip_if(Guard::HelperRunning),
        Step::new(
            "install istio",
            Action::Invoke(
                Invocation::new(tools::ISTIOCTL)
                    .args(["install", "--context", context.as_str(), "-y", "--set"])
                    .arg(format!("profile={}", config.istio_profile)),
            ),
        )
        .skip_if(Guard::NamespaceExists(istio::NAMESPACE.to_string())),
        Step::new(
            "enable sidecar injection",
            Action::LabelNamespace {
                namespace: config.app_namespace.clone(),
                key: istio::INJECTION_LABEL.to_string(),
                value: istio::INJECTION_ENABLED.to_string(),
            },
        )
        .skip_if(Guard::NamespaceLabelled {
            namespace: config.app_namespace.clone(),
            key: istio::INJECTION_LABEL.to_string(),
            value: istio::INJECTION_ENABLED.to_string(),
        }),
        Step::new(
            "deploy bookinfo",
            Action::Invoke(kubectl_apply(&context, &config.app_namespace, &config.bookinfo_manifest)),
        ),
        Step::new(
            "deploy bookinfo gateway",
            Action::Invoke(kubectl_apply(&context, &config.app_namespace, &config.gateway_manifest)),
        ),
        Step::new(
            "wait for bookinfo",
            Action::WaitForDeployments {
                namespace: config.app_namespace.clone(),
                timeout: config.rollout_timeout,
                interval: config.rollout_poll_interval,
            },
        ),
    ]
}

/// Stop the helper and remove the cluster
pub fn destroy_plan(config: &Config) -> Vec<Step> {
    vec![
        Step::new("stop cloud-provider-kind", Action::StopHelper).skip_if(Guard::MarkerAbsent),
        Step::new("delete cluster", Action::DeleteCluster(config.cluster_name.clone()))
            .skip_if(Guard::ClusterAbsent(config.cluster_name.clone())),
    ]
}

fn kubectl_apply(context: &str, namespace: &str, manifest: &str) -> Invocation {
    Invocation::new(tools::KUBECTL).args(["--context", context, "apply", "-n", namespace, "-f", manifest])
}
