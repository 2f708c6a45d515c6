// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Executes a step list, skipping steps whose guard is already satisfied.

use super::{Action, Guard, Step};
use crate::config::Config;
use crate::constants::tools;
use crate::error::{MeshboxError, Result};
use crate::kubernetes::{
    create_cluster_client, label_namespace, namespace_exists, namespace_has_label,
    wait_for_deployments,
};
use crate::process::{ManagedProcess, ProcessMarker};
use crate::tools::{Invocation, Toolchain};
use kube::Client;
use std::path::PathBuf;
use tracing::{info, instrument, warn};

/// Steps executed and skipped during a run, in order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub executed: Vec<String>,
    pub skipped: Vec<String>,
}

pub struct StepRunner<T> {
    toolchain: T,
    kube_context: String,
    marker: ProcessMarker,
    helper_log: PathBuf,
    client: Option<Client>,
    helper: Option<ManagedProcess>,
}

impl<T: Toolchain> StepRunner<T> {
    pub fn new(
        toolchain: T,
        kube_context: impl Into<String>,
        marker: ProcessMarker,
        helper_log: impl Into<PathBuf>,
    ) -> Self {
        Self {
            toolchain,
            kube_context: kube_context.into(),
            marker,
            helper_log: helper_log.into(),
            client: None,
            helper: None,
        }
    }

    pub fn from_config(toolchain: T, config: &Config) -> Self {
        Self::new(
            toolchain,
            config.kube_context(),
            ProcessMarker::new(&config.pid_file),
            &config.helper_log,
        )
    }

    /// Use an existing client instead of creating one from the kubeconfig
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Helper launched during the run, if any
    pub fn take_helper(&mut self) -> Option<ManagedProcess> {
        self.helper.take()
    }

    /// Kubernetes client for the cluster, created on first use
    pub async fn client(&mut self) -> Result<Client> {
        if let Some(client) = &self.client {
            return Ok(client.clone());
        }
        let client = create_cluster_client(&self.kube_context).await?;
        self.client = Some(client.clone());
        Ok(client)
    }

    /// Run the steps in order, stopping at the first failure
    pub async fn run(&mut self, steps: &[Step]) -> Result<RunReport> {
        let mut report = RunReport::default();

        for step in steps {
            let outcome = self.run_step(step).await.map_err(|e| MeshboxError::StepFailed {
                step: step.name.clone(),
                source: Box::new(e),
            })?;

            if outcome {
                report.executed.push(step.name.clone());
            } else {
                report.skipped.push(step.name.clone());
            }
        }

        Ok(report)
    }

    /// Returns whether the action ran
    #[instrument(skip(self, step), fields(step = %step.name))]
    async fn run_step(&mut self, step: &Step) -> Result<bool> {
        if self.is_satisfied(&step.guard).await? {
            info!("Skipping '{}': already done", step.name);
            return Ok(false);
        }

        info!("Running '{}'", step.name);
        self.execute(&step.action).await?;
        Ok(true)
    }

    async fn is_satisfied(&mut self, guard: &Guard) -> Result<bool> {
        match guard {
            Guard::Never => Ok(false),
            Guard::ClusterExists(name) => self.cluster_exists(name).await,
            Guard::ClusterAbsent(name) => Ok(!self.cluster_exists(name).await?),
            Guard::NamespaceExists(namespace) => {
                let client = self.client().await?;
                namespace_exists(&client, namespace).await
            }
            Guard::NamespaceLabelled {
                namespace,
                key,
                value,
            } => {
                let client = self.client().await?;
                namespace_has_label(&client, namespace, key, value).await
            }
            Guard::HelperRunning => self.helper_running(),
            Guard::MarkerAbsent => Ok(!self.marker.exists()),
        }
    }

    async fn execute(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::CreateCluster(name) => {
                self.toolchain
                    .run(&Invocation::new(tools::KIND).args(["create", "cluster", "--name", name.as_str()]))
                    .await?;
            }
            Action::DeleteCluster(name) => {
                self.toolchain
                    .run(&Invocation::new(tools::KIND).args(["delete", "cluster", "--name", name.as_str()]))
                    .await?;
            }
            Action::LaunchHelper(invocation) => {
                let helper =
                    ManagedProcess::launch(invocation, self.marker.clone(), &self.helper_log)?;
                self.helper = Some(helper);
            }
            Action::StopHelper => {
                let helper = match self.helper.take() {
                    Some(helper) => Some(helper),
                    None => self.adopt_for_stop()?,
                };
                match helper {
                    Some(helper) => helper.stop()?,
                    None => info!("No helper process recorded in {}", self.marker.path().display()),
                }
            }
            Action::Invoke(invocation) => {
                let output = self.toolchain.run(invocation).await?;
                for line in output.stdout.lines().filter(|l| !l.trim().is_empty()) {
                    info!("{}", line);
                }
            }
            Action::LabelNamespace {
                namespace,
                key,
                value,
            } => {
                let client = self.client().await?;
                label_namespace(&client, namespace, key, value).await?;
            }
            Action::WaitForDeployments {
                namespace,
                timeout,
                interval,
            } => {
                let client = self.client().await?;
                wait_for_deployments(&client, namespace, *timeout, *interval).await?;
            }
        }
        Ok(())
    }

    async fn cluster_exists(&self, name: &str) -> Result<bool> {
        let output = self
            .toolchain
            .run(&Invocation::new(tools::KIND).args(["get", "clusters"]))
            .await?;
        Ok(output.stdout.lines().any(|line| line.trim() == name))
    }

    /// An unreadable marker is discarded so teardown can continue
    fn adopt_for_stop(&self) -> Result<Option<ManagedProcess>> {
        match ManagedProcess::adopt(self.marker.clone()) {
            Err(MeshboxError::ProcessMarker { path, message }) => {
                warn!("Discarding unreadable marker {}: {}", path.display(), message);
                self.marker.remove()?;
                Ok(None)
            }
            adopted => adopted,
        }
    }

    /// A marker whose process is gone is removed so the helper can be relaunched
    fn helper_running(&self) -> Result<bool> {
        let Some(helper) = ManagedProcess::adopt(self.marker.clone())? else {
            return Ok(false);
        };

        if helper.is_running() {
            info!("Helper already running with pid {}", helper.pid());
            return Ok(true);
        }

        warn!(
            "Removing stale marker {} for pid {}",
            self.marker.path().display(),
            helper.pid()
        );
        self.marker.remove()?;
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{namespace_json, MockService, RecordingToolchain};
    use std::process::Command;
    use std::time::Duration;
    use tempfile::TempDir;

    fn runner(toolchain: RecordingToolchain, dir: &TempDir) -> StepRunner<RecordingToolchain> {
        StepRunner::new(
            toolchain,
            "kind-meshbox",
            ProcessMarker::new(dir.path().join("helper.pid")),
            dir.path().join("helper.log"),
        )
        .with_client(MockService::new().into_client())
    }

    fn create_cluster_step() -> Step {
        Step::new("create cluster", Action::CreateCluster("meshbox".to_string()))
            .skip_if(Guard::ClusterExists("meshbox".to_string()))
    }

    #[tokio::test]
    async fn test_creates_missing_cluster() {
        let dir = TempDir::new().unwrap();
        let toolchain = RecordingToolchain::new().with_output("kind get clusters", "other\n");
        let mut runner = runner(toolchain.clone(), &dir);

        let report = runner.run(&[create_cluster_step()]).await.unwrap();

        assert_eq!(report.executed, vec!["create cluster"]);
        assert_eq!(
            toolchain.calls(),
            vec!["kind get clusters", "kind create cluster --name meshbox"]
        );
    }

    #[tokio::test]
    async fn test_skips_existing_cluster() {
        let dir = TempDir::new().unwrap();
        let toolchain = RecordingToolchain::new().with_output("kind get clusters", "meshbox\n");
        let mut runner = runner(toolchain.clone(), &dir);

        let report = runner.run(&[create_cluster_step()]).await.unwrap();

        assert_eq!(report.skipped, vec!["create cluster"]);
        assert!(report.executed.is_empty());
        assert_eq!(toolchain.calls(), vec!["kind get clusters"]);
    }

    #[tokio::test]
    async fn test_failure_stops_the_run() {
        let dir = TempDir::new().unwrap();
        let toolchain = RecordingToolchain::new()
            .with_failure("istioctl install -y", "Error: failed to install manifests");
        let mut runner = runner(toolchain.clone(), &dir);

        let steps = vec![
            Step::new(
                "install istio",
                Action::Invoke(Invocation::new("istioctl").args(["install", "-y"])),
            ),
            Step::new(
                "deploy bookinfo",
                Action::Invoke(Invocation::new("kubectl").args(["apply", "-f", "bookinfo.yaml"])),
            ),
        ];

        let err = runner.run(&steps).await.unwrap_err();

        match err {
            MeshboxError::StepFailed { step, source } => {
                assert_eq!(step, "install istio");
                assert!(matches!(*source, MeshboxError::CommandFailed { .. }));
            }
            other => panic!("expected step failure, got {:?}", other),
        }
        assert_eq!(toolchain.calls(), vec!["istioctl install -y"]);
    }

    #[tokio::test]
    async fn test_namespace_guard_uses_cluster_api() {
        let dir = TempDir::new().unwrap();
        let toolchain = RecordingToolchain::new();
        let client = MockService::new()
            .on_get("/api/v1/namespaces/istio-system", 200, &namespace_json("istio-system"))
            .into_client();
        let mut runner = runner(toolchain.clone(), &dir).with_client(client);

        let steps = vec![Step::new(
            "install istio",
            Action::Invoke(Invocation::new("istioctl").args(["install", "-y"])),
        )
        .skip_if(Guard::NamespaceExists("istio-system".to_string()))];

        let report = runner.run(&steps).await.unwrap();

        assert_eq!(report.skipped, vec!["install istio"]);
        assert!(toolchain.calls().is_empty());
    }

    #[tokio::test]
    async fn test_launch_then_stop_helper() {
        let dir = TempDir::new().unwrap();
        let mut runner = runner(RecordingToolchain::new(), &dir);
        let marker = ProcessMarker::new(dir.path().join("helper.pid"));

        let launch = Step::new(
            "start helper",
            Action::LaunchHelper(Invocation::new("sleep").arg("30")),
        )
        .skip_if(Guard::HelperRunning);

        let report = runner.run(&[launch.clone()]).await.unwrap();
        assert_eq!(report.executed, vec!["start helper"]);
        let pid = runner.take_helper().unwrap().pid();
        assert_eq!(marker.read().unwrap(), Some(pid));

        // Second run sees the live helper and does not launch another one
        let report = runner.run(&[launch]).await.unwrap();
        assert_eq!(report.skipped, vec!["start helper"]);
        assert_eq!(marker.read().unwrap(), Some(pid));

        let stop = Step::new("stop helper", Action::StopHelper).skip_if(Guard::MarkerAbsent);
        let report = runner.run(&[stop.clone()]).await.unwrap();
        assert_eq!(report.executed, vec!["stop helper"]);
        assert!(!marker.exists());

        let report = runner.run(&[stop]).await.unwrap();
        assert_eq!(report.skipped, vec!["stop helper"]);
    }

    #[tokio::test]
    async fn test_corrupt_marker_does_not_block_teardown() {
        let dir = TempDir::new().unwrap();
        let marker = ProcessMarker::new(dir.path().join("helper.pid"));
        std::fs::write(marker.path(), "not-a-pid\n").unwrap();
        let toolchain = RecordingToolchain::new().with_output("kind get clusters", "meshbox\n");
        let mut runner = runner(toolchain.clone(), &dir);

        let steps = vec![
            Step::new("stop helper", Action::StopHelper).skip_if(Guard::MarkerAbsent),
            Step::new("delete cluster", Action::DeleteCluster("meshbox".to_string()))
                .skip_if(Guard::ClusterAbsent("meshbox".to_string())),
        ];
        let report = runner.run(&steps).await.unwrap();

        assert_eq!(report.executed, vec!["stop helper", "delete cluster"]);
        assert!(!marker.exists());
        assert_eq!(
            toolchain.calls(),
            vec!["kind get clusters", "kind delete cluster --name meshbox"]
        );
    }

    #[tokio::test]
    async fn test_absent_cluster_is_not_deleted() {
        let dir = TempDir::new().unwrap();
        let toolchain = RecordingToolchain::new().with_output("kind get clusters", "other\n");
        let mut runner = runner(toolchain.clone(), &dir);

        let report = runner
            .run(&[Step::new("delete cluster", Action::DeleteCluster("meshbox".to_string()))
                .skip_if(Guard::ClusterAbsent("meshbox".to_string()))])
            .await
            .unwrap();

        assert_eq!(report.skipped, vec!["delete cluster"]);
        assert_eq!(toolchain.calls(), vec!["kind get clusters"]);
    }

    #[tokio::test]
    async fn test_stale_marker_is_replaced() {
        let dir = TempDir::new().unwrap();
        let marker = ProcessMarker::new(dir.path().join("helper.pid"));
        let mut finished = Command::new("true").spawn().unwrap();
        let stale_pid = finished.id();
        finished.wait().unwrap();
        marker.write(stale_pid).unwrap();

        let mut runner = runner(RecordingToolchain::new(), &dir);
        let report = runner
            .run(&[Step::new(
                "start helper",
                Action::LaunchHelper(Invocation::new("sleep").arg("30")),
            )
            .skip_if(Guard::HelperRunning)])
            .await
            .unwrap();

        assert_eq!(report.executed, vec!["start helper"]);
        let helper = runner.take_helper().unwrap();
        assert_ne!(marker.read().unwrap(), Some(stale_pid));
        helper.stop().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_step_times_out() {
        let dir = TempDir::new().unwrap();
        let mut runner = runner(RecordingToolchain::new(), &dir);

        let err = runner
            .run(&[Step::new(
                "wait for bookinfo",
                Action::WaitForDeployments {
                    namespace: "default".to_string(),
                    timeout: Duration::from_secs(12),
                    interval: Duration::from_secs(5),
                },
            )])
            .await
            .unwrap_err();

        match err {
            MeshboxError::StepFailed { step, source } => {
                assert_eq!(step, "wait for bookinfo");
                assert!(matches!(*source, MeshboxError::RolloutTimeout { .. }));
            }
            other => panic!("expected step failure, got {:?}", other),
        }
    }
}
