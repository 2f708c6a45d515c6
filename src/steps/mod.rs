// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Declarative steps: each step names the condition under which it is
//! already done and the action that does it.

pub mod plan;
pub mod runner;

pub use plan::{destroy_plan, start_plan};
pub use runner::{RunReport, StepRunner};

use crate::tools::Invocation;
use std::time::Duration;

/// Condition under which a step is already satisfied and is skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    /// Always run
    Never,
    ClusterExists(String),
    ClusterAbsent(String),
    NamespaceExists(String),
    NamespaceLabelled {
        namespace: String,
        key: String,
        value: String,
    },
    /// The process marker names a live process
    HelperRunning,
    MarkerAbsent,
}

/// What a step does when its guard is not satisfied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    CreateCluster(String),
    DeleteCluster(String),
    /// Launch a detached helper tracked by the process marker
    LaunchHelper(Invocation),
    StopHelper,
    Invoke(Invocation),
    LabelNamespace {
        namespace: String,
        key: String,
        value: String,
    },
    WaitForDeployments {
        namespace: String,
        timeout: Duration,
        interval: Duration,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub name: String,
    pub guard: Guard,
    pub action: Action,
}

impl Step {
    pub fn new(name: impl Into<String>, action: Action) -> Self {
        Self {
            name: name.into(),
            guard: Guard::Never,
            action,
        }
    }

    pub fn skip_if(mut self, guard: Guard) -> Self {
        self.guard = guard;
        self
    }
}
