// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test doubles for the Kubernetes API and the external tools.

use crate::error::{MeshboxError, Result};
use crate::tools::{CommandOutput, Invocation, Toolchain};
use http::{Request, Response};
use kube::client::Body;
use kube::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

type Responses = HashMap<(String, String), (u16, String)>;

/// A mock HTTP service that returns predefined responses based on request paths.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<Responses>>,
    requests: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), (status, body.to_string()));
        self
    }

    /// Add a response for GET requests matching the path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    /// Add a response for PATCH requests matching the path
    pub fn on_patch(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PATCH", path, status, body)
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    /// Method and path of every request received so far
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let responses = self.responses.lock().unwrap();

        // Try exact match first
        if let Some(resp) = responses.get(&(method.to_string(), path.to_string())) {
            return Some(resp.clone());
        }

        // Fall back to prefix match
        for ((m, p), resp) in responses.iter() {
            if m == method && path.starts_with(p) {
                return Some(resp.clone());
            }
        }

        None
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        self.requests
            .lock()
            .unwrap()
            .push((method.clone(), path.clone()));
        let response = self.find_response(&method, &path);

        Box::pin(async move {
            let (status, body) = response.unwrap_or_else(|| (404, not_found_json("resource", &path)));
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

/// Create a mock namespace JSON response
pub fn namespace_json(name: &str) -> String {
    namespace_json_with_labels(name, &[])
}

/// Create a mock namespace JSON response carrying labels
pub fn namespace_json_with_labels(name: &str, labels: &[(&str, &str)]) -> String {
    let labels: serde_json::Map<String, serde_json::Value> = labels
        .iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
        .collect();

    serde_json::json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {
            "name": name,
            "uid": "test-uid",
            "labels": labels
        }
    })
    .to_string()
}

/// Create a mock ingress gateway Service, with or without an assigned IP
pub fn service_json(ip: Option<&str>) -> String {
    gateway_service_json(ip, 80)
}

/// Create a mock ingress gateway Service serving HTTP on `port`
pub fn service_json_with_port(ip: &str, port: u16) -> String {
    gateway_service_json(Some(ip), port)
}

fn gateway_service_json(ip: Option<&str>, port: u16) -> String {
    let load_balancer = match ip {
        Some(ip) => serde_json::json!({ "ingress": [{ "ip": ip }] }),
        None => serde_json::json!({}),
    };

    serde_json::json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": { "name": "istio-ingressgateway", "namespace": "istio-system" },
        "spec": { "type": "LoadBalancer", "ports": [{ "name": "http2", "port": port }] },
        "status": { "loadBalancer": load_balancer }
    })
    .to_string()
}

/// Create a mock DeploymentList from (name, available) pairs
pub fn deployment_list_json(deployments: &[(&str, bool)]) -> String {
    let items: Vec<serde_json::Value> = deployments
        .iter()
        .map(|(name, available)| {
            let status = if *available { "True" } else { "False" };
            serde_json::json!({
                "apiVersion": "apps/v1",
                "kind": "Deployment",
                "metadata": { "name": name, "namespace": "default" },
                "spec": {
                    "selector": { "matchLabels": { "app": name } },
                    "template": { "metadata": { "labels": { "app": name } } }
                },
                "status": {
                    "conditions": [{
                        "type": "Available",
                        "status": status
                    }]
                }
            })
        })
        .collect();

    serde_json::json!({
        "apiVersion": "apps/v1",
        "kind": "DeploymentList",
        "metadata": { "resourceVersion": "1" },
        "items": items
    })
    .to_string()
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": format!("{} \"{}\" not found", resource, name),
        "reason": "NotFound",
        "code": 404
    })
    .to_string()
}

/// Toolchain that records invocations and answers from canned output
#[derive(Clone, Default)]
pub struct RecordingToolchain {
    outputs: Arc<Mutex<HashMap<String, std::result::Result<String, String>>>>,
    calls: Arc<Mutex<Vec<Invocation>>>,
}

impl RecordingToolchain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the command line `command` with `stdout`
    pub fn with_output(self, command: &str, stdout: &str) -> Self {
        self.outputs
            .lock()
            .unwrap()
            .insert(command.to_string(), Ok(stdout.to_string()));
        self
    }

    /// Fail the command line `command` with `stderr`
    pub fn with_failure(self, command: &str, stderr: &str) -> Self {
        self.outputs
            .lock()
            .unwrap()
            .insert(command.to_string(), Err(stderr.to_string()));
        self
    }

    /// Command lines run so far
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|i| i.to_string())
            .collect()
    }
}

impl Toolchain for RecordingToolchain {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push(invocation.clone());
        let command = invocation.to_string();
        let canned = self.outputs.lock().unwrap().get(&command).cloned();

        match canned {
            Some(Err(stderr)) => Err(MeshboxError::CommandFailed {
                command,
                status: "exit status: 1".to_string(),
                stderr,
            }),
            Some(Ok(stdout)) => Ok(CommandOutput {
                stdout,
                stderr: String::new(),
            }),
            None => Ok(CommandOutput::default()),
        }
    }
}
