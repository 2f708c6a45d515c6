// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MeshboxError {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to load kubeconfig: {0}")]
    Kubeconfig(String),

    #[error("Required tool '{0}' was not found on PATH")]
    MissingTool(String),

    #[error("Command `{command}` failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Timed out waiting for {what} after {attempts} attempts ({waited:?} elapsed)")]
    Timeout {
        what: String,
        attempts: u32,
        waited: Duration,
    },

    #[error("Deployments in {namespace} not available after {attempts} checks ({waited:?} elapsed)")]
    RolloutTimeout {
        namespace: String,
        attempts: u32,
        waited: Duration,
    },

    #[error("Validation probe against {url} failed: {reason}")]
    Validation { url: String, reason: ProbeFailure },

    #[error("Process marker {path}: {message}")]
    ProcessMarker { path: PathBuf, message: String },

    #[error("Failed to signal process: {0}")]
    Signal(#[from] nix::Error),

    #[error("Step '{step}' failed: {source}")]
    StepFailed {
        step: String,
        #[source]
        source: Box<MeshboxError>,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Reason a validation probe did not find the expected marker
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    #[error("invalid probe target: {0}")]
    InvalidTarget(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("no complete response within {0:?}")]
    TimedOut(Duration),

    #[error("HTTP exchange failed: {0}")]
    Http(String),

    #[error("marker /{pattern}/ not found in response (status {status})")]
    MarkerMissing { pattern: String, status: u16 },
}

impl MeshboxError {
    /// Operator-facing hint for failures that have a likely cause
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            MeshboxError::Timeout { .. } => Some(
                "the ingress gateway never received an address; check that cloud-provider-kind is running (see its log file)",
            ),
            MeshboxError::RolloutTimeout { .. } => Some(
                "the application pods never became available; inspect them with `kubectl get pods -n <namespace>` and `kubectl describe pod`",
            ),
            MeshboxError::Validation {
                reason: ProbeFailure::MarkerMissing { .. },
                ..
            } => Some("the gateway answered but the application is not serving yet; check the Bookinfo pods with `kubectl get pods`"),
            MeshboxError::Validation { .. } => {
                Some("the load-balancer address is not reachable from this host; cloud-provider-kind may need elevated privileges")
            }
            MeshboxError::MissingTool(_) => {
                Some("install kind, kubectl, istioctl and cloud-provider-kind and make sure they are on PATH")
            }
            MeshboxError::StepFailed { source, .. } => source.hint(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, MeshboxError>;
