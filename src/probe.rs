// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Single-shot HTTP validation of a deployed application

use crate::error::{MeshboxError, ProbeFailure, Result};
use bytes::Bytes;
use http::{header, Request, StatusCode, Uri};
use http_body_util::{BodyExt, Empty};
use hyper_util::rt::TokioIo;
use regex::Regex;
use std::net::Ipv6Addr;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{debug, info, instrument};

/// What to request and what to look for in the response
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    /// Request path, with or without the leading slash
    pub path: String,
    /// Upper bound for connect, request and body read together
    pub timeout: Duration,
    /// Pattern whose first match is extracted from the body
    pub marker: Regex,
}

/// Build the probe URL for an address (optionally `host:port`) and a path.
/// A bare IPv6 address is bracketed.
pub fn probe_url(address: &str, path: &str) -> String {
    let path = path.trim_start_matches('/');
    match address.parse::<Ipv6Addr>() {
        Ok(ip) => format!("http://[{}]/{}", ip, path),
        Err(_) => format!("http://{}/{}", address, path),
    }
}

/// Issue one GET against `http://<address>/<path>` and return the first
/// match of `marker` in the body. Never retried.
#[instrument(skip(marker), fields(marker = %marker.as_str()))]
pub async fn validate_http_response(
    address: &str,
    path: &str,
    timeout: Duration,
    marker: &Regex,
) -> Result<String> {
    let url = probe_url(address, path);
    let fail = |reason: ProbeFailure| MeshboxError::Validation {
        url: url.clone(),
        reason,
    };

    let uri: Uri = url
        .parse()
        .map_err(|e: http::uri::InvalidUri| fail(ProbeFailure::InvalidTarget(e.to_string())))?;

    info!("Probing {}", url);

    let (status, body) = match tokio::time::timeout(timeout, fetch(&uri)).await {
        Ok(exchange) => exchange.map_err(fail)?,
        Err(_) => return Err(fail(ProbeFailure::TimedOut(timeout))),
    };

    debug!(status = status.as_u16(), bytes = body.len(), "Probe response received");

    let body = String::from_utf8_lossy(&body);
    match marker.find(&body) {
        Some(found) => {
            info!("Probe matched: {}", found.as_str());
            Ok(found.as_str().to_string())
        }
        None => Err(fail(ProbeFailure::MarkerMissing {
            pattern: marker.as_str().to_string(),
            status: status.as_u16(),
        })),
    }
}

async fn fetch(uri: &Uri) -> std::result::Result<(StatusCode, Bytes), ProbeFailure> {
    let host = uri
        .host()
        .ok_or_else(|| ProbeFailure::InvalidTarget(format!("{} has no host", uri)))?;
    let port = uri.port_u16().unwrap_or(80);

    // uri.host() keeps the brackets around IPv6 literals
    let connect_host = host.trim_start_matches('[').trim_end_matches(']');
    let stream = TcpStream::connect((connect_host, port))
        .await
        .map_err(|e| ProbeFailure::Connect(e.to_string()))?;

    let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .map_err(|e| ProbeFailure::Http(e.to_string()))?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            debug!("Probe connection closed with error: {}", e);
        }
    });

    let authority = uri.authority().map(|a| a.as_str()).unwrap_or(host);
    let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
    let request = Request::get(path)
        .header(header::HOST, authority)
        .body(Empty::<Bytes>::new())
        .map_err(|e| ProbeFailure::Http(e.to_string()))?;

    let response = sender
        .send_request(request)
        .await
        .map_err(|e| ProbeFailure::Http(e.to_string()))?;
    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .map_err(|e| ProbeFailure::Http(e.to_string()))?
        .to_bytes();

    Ok((status, body))
}
