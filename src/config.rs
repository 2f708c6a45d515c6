// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::defaults;
use crate::poller::PollSettings;
use crate::probe::ProbeSettings;
use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Environment variable pointing at an optional YAML configuration file
pub const CONFIG_FILE_VAR: &str = "MESHBOX_CONFIG";

/// Tool configuration, resolved from environment variables, an optional
/// YAML file and built-in defaults (in that order of precedence)
#[derive(Debug, Clone)]
pub struct Config {
    /// Name of the kind cluster
    pub cluster_name: String,
    /// Istio installation profile passed to istioctl
    pub istio_profile: String,
    /// Namespace the sample application is deployed into
    pub app_namespace: String,
    /// Path or URL of the Bookinfo manifest
    pub bookinfo_manifest: String,
    /// Path or URL of the Bookinfo gateway manifest
    pub gateway_manifest: String,
    /// Process marker for the cloud-provider-kind helper
    pub pid_file: PathBuf,
    /// Log file receiving the helper's output
    pub helper_log: PathBuf,
    pub poll: PollSettings,
    pub probe: ProbeSettings,
    /// Upper bound for the application rollout
    pub rollout_timeout: Duration,
    pub rollout_poll_interval: Duration,
}

/// Values accepted in the YAML configuration file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileOverrides {
    pub cluster_name: Option<String>,
    pub istio_profile: Option<String>,
    pub app_namespace: Option<String>,
    pub bookinfo_manifest: Option<String>,
    pub gateway_manifest: Option<String>,
    pub pid_file: Option<PathBuf>,
    pub helper_log: Option<PathBuf>,
    pub poll_attempts: Option<u32>,
    pub poll_delay_secs: Option<u64>,
    pub probe_path: Option<String>,
    pub probe_timeout_secs: Option<u64>,
    pub probe_marker: Option<String>,
    pub rollout_timeout_secs: Option<u64>,
    pub rollout_poll_interval_secs: Option<u64>,
}

impl FileOverrides {
    /// Read overrides from a YAML file
    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let file = match env::var(CONFIG_FILE_VAR) {
            Ok(path) => FileOverrides::read(Path::new(&path))?,
            Err(_) => FileOverrides::default(),
        };

        Self::resolve(|key| env::var(key).ok(), file)
    }

    /// Resolve the configuration from a variable lookup and file overrides
    pub fn resolve<F>(lookup: F, file: FileOverrides) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |key: &str, file_value: Option<String>, default: &str| {
            lookup(key)
                .or(file_value)
                .unwrap_or_else(|| default.to_string())
        };

        let cluster_name = string("MESHBOX_CLUSTER_NAME", file.cluster_name, defaults::CLUSTER_NAME);
        let istio_profile = string("MESHBOX_ISTIO_PROFILE", file.istio_profile, defaults::ISTIO_PROFILE);
        let app_namespace = string("MESHBOX_APP_NAMESPACE", file.app_namespace, defaults::APP_NAMESPACE);
        let bookinfo_manifest = string(
            "MESHBOX_BOOKINFO_MANIFEST",
            file.bookinfo_manifest,
            defaults::BOOKINFO_MANIFEST,
        );
        let gateway_manifest = string(
            "MESHBOX_GATEWAY_MANIFEST",
            file.gateway_manifest,
            defaults::GATEWAY_MANIFEST,
        );
        let pid_file = lookup("MESHBOX_PID_FILE")
            .map(PathBuf::from)
            .or(file.pid_file)
            .unwrap_or_else(|| PathBuf::from(defaults::PID_FILE));
        let helper_log = lookup("MESHBOX_HELPER_LOG")
            .map(PathBuf::from)
            .or(file.helper_log)
            .unwrap_or_else(|| PathBuf::from(defaults::HELPER_LOG));

        let max_attempts = parse_var(&lookup, "MESHBOX_POLL_ATTEMPTS")?
            .or(file.poll_attempts)
            .unwrap_or(defaults::POLL_ATTEMPTS);
        if max_attempts == 0 {
            bail!("MESHBOX_POLL_ATTEMPTS must be at least 1");
        }
        let delay_secs = parse_var(&lookup, "MESHBOX_POLL_DELAY_SECS")?
            .or(file.poll_delay_secs)
            .unwrap_or(defaults::POLL_DELAY_SECS);

        let probe_timeout_secs = parse_var(&lookup, "MESHBOX_PROBE_TIMEOUT_SECS")?
            .or(file.probe_timeout_secs)
            .unwrap_or(defaults::PROBE_TIMEOUT_SECS);
        if probe_timeout_secs == 0 {
            bail!("MESHBOX_PROBE_TIMEOUT_SECS must be at least 1");
        }
        let probe_path = string("MESHBOX_PROBE_PATH", file.probe_path, defaults::PROBE_PATH);
        let marker = string("MESHBOX_PROBE_MARKER", file.probe_marker, defaults::PROBE_MARKER);
        let marker = Regex::new(&marker)
            .with_context(|| format!("MESHBOX_PROBE_MARKER is not a valid pattern: {}", marker))?;

        let rollout_timeout_secs = parse_var(&lookup, "MESHBOX_ROLLOUT_TIMEOUT_SECS")?
            .or(file.rollout_timeout_secs)
            .unwrap_or(defaults::ROLLOUT_TIMEOUT_SECS);
        let rollout_poll_interval_secs = parse_var(&lookup, "MESHBOX_ROLLOUT_POLL_INTERVAL_SECS")?
            .or(file.rollout_poll_interval_secs)
            .unwrap_or(defaults::ROLLOUT_POLL_INTERVAL_SECS);
        if rollout_poll_interval_secs == 0 {
            bail!("MESHBOX_ROLLOUT_POLL_INTERVAL_SECS must be at least 1");
        }

        Ok(Config {
            cluster_name,
            istio_profile,
            app_namespace,
            bookinfo_manifest,
            gateway_manifest,
            pid_file,
            helper_log,
            poll: PollSettings {
                max_attempts,
                delay: Duration::from_secs(delay_secs),
            },
            probe: ProbeSettings {
                path: probe_path,
                timeout: Duration::from_secs(probe_timeout_secs),
                marker,
            },
            rollout_timeout: Duration::from_secs(rollout_timeout_secs),
            rollout_poll_interval: Duration::from_secs(rollout_poll_interval_secs),
        })
    }

    /// kubeconfig context that kind creates for the cluster
    pub fn kube_context(&self) -> String {
        format!("kind-{}", self.cluster_name)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| anyhow::anyhow!("{} has invalid value '{}': {}", key, raw, e))
        })
        .transpose()
}
