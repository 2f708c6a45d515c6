// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes API helpers for client creation, namespaces, services and rollouts.

pub mod client;
pub mod deployments;
pub mod namespaces;
pub mod services;

pub use client::create_cluster_client;
pub use deployments::wait_for_deployments;
pub use namespaces::{label_namespace, namespace_exists, namespace_has_label};
pub use services::load_balancer_address;
