// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Load-balancer address discovery

use crate::error::Result;
use k8s_openapi::api::core::v1::Service;
use kube::{Api, Client};
use std::net::Ipv6Addr;
use tracing::{debug, instrument};

/// Port names the gateway uses for plain HTTP
const HTTP_PORT_NAMES: &[&str] = &["http2", "http"];
const DEFAULT_HTTP_PORT: i32 = 80;

/// First load-balancer ingress address of a Service, preferring the IP
pub fn ingress_address(service: &Service) -> Option<String> {
    let ingress = service
        .status
        .as_ref()
        .and_then(|s| s.load_balancer.as_ref())
        .and_then(|lb| lb.ingress.as_ref())
        .and_then(|ingress| ingress.first())?;

    ingress
        .ip
        .clone()
        .or_else(|| ingress.hostname.clone())
        .filter(|address| !address.is_empty())
}

/// Port the Service exposes for HTTP, if it names one
fn http_port(service: &Service) -> Option<i32> {
    service
        .spec
        .as_ref()?
        .ports
        .as_ref()?
        .iter()
        .find(|p| {
            p.name
                .as_deref()
                .is_some_and(|name| HTTP_PORT_NAMES.contains(&name))
        })
        .map(|p| p.port)
}

/// Ingress address, with `:port` appended when HTTP is not served on 80
pub fn ingress_endpoint(service: &Service) -> Option<String> {
    let address = ingress_address(service)?;

    match http_port(service) {
        Some(port) if port != DEFAULT_HTTP_PORT => {
            if address.parse::<Ipv6Addr>().is_ok() {
                Some(format!("[{}]:{}", address, port))
            } else {
                Some(format!("{}:{}", address, port))
            }
        }
        _ => Some(address),
    }
}

/// Look up the load-balancer endpoint of a Service.
///
/// A Service that does not exist yet has no address; this is not an error.
#[instrument(skip(client))]
pub async fn load_balancer_address(
    client: &Client,
    namespace: &str,
    name: &str,
) -> Result<Option<String>> {
    let services: Api<Service> = Api::namespaced(client.clone(), namespace);

    match services.get(name).await {
        Ok(service) => Ok(ingress_endpoint(&service)),
        Err(kube::Error::Api(err)) if err.code == 404 => {
            debug!("Service {}/{} does not exist yet", namespace, name);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}
