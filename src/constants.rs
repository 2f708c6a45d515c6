// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// The field manager name used for server-side apply
pub const FIELD_MANAGER: &str = "meshbox";

/// External binaries driven by meshbox
pub mod tools {
    pub const KIND: &str = "kind";
    pub const KUBECTL: &str = "kubectl";
    pub const ISTIOCTL: &str = "istioctl";
    pub const CLOUD_PROVIDER_KIND: &str = "cloud-provider-kind";
}

/// Istio installation layout
pub mod istio {
    pub const NAMESPACE: &str = "istio-system";
    pub const INGRESS_SERVICE: &str = "istio-ingressgateway";
    /// Namespace label that enables sidecar injection
    pub const INJECTION_LABEL: &str = "istio-injection";
    pub const INJECTION_ENABLED: &str = "enabled";
}

/// Defaults for values that can be overridden through configuration
pub mod defaults {
    pub const CLUSTER_NAME: &str = "meshbox";
    pub const ISTIO_PROFILE: &str = "demo";
    pub const APP_NAMESPACE: &str = "default";
    pub const BOOKINFO_MANIFEST: &str =
        "https://raw.githubusercontent.com/istio/istio/release-1.24/samples/bookinfo/platform/kube/bookinfo.yaml";
    pub const GATEWAY_MANIFEST: &str =
        "https://raw.githubusercontent.com/istio/istio/release-1.24/samples/bookinfo/networking/bookinfo-gateway.yaml";
    pub const PID_FILE: &str = "cloud-provider-kind.pid";
    pub const HELPER_LOG: &str = "cloud-provider-kind.log";

    pub const POLL_ATTEMPTS: u32 = 6;
    pub const POLL_DELAY_SECS: u64 = 10;

    pub const PROBE_PATH: &str = "productpage";
    pub const PROBE_TIMEOUT_SECS: u64 = 5;
    pub const PROBE_MARKER: &str = "<title>.*</title>";

    pub const ROLLOUT_TIMEOUT_SECS: u64 = 300;
    pub const ROLLOUT_POLL_INTERVAL_SECS: u64 = 5;
}
