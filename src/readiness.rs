// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Readiness check: wait for an address, then probe it once.

use crate::error::{MeshboxError, Result};
use crate::poller::{await_endpoint, PollSettings};
use crate::probe::{probe_url, validate_http_response, ProbeSettings};
use std::fmt;
use std::fmt::Display;
use std::future::Future;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessState {
    AwaitingAddress,
    Probing,
    Ready,
    TimedOut,
    ProbeFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessEvent {
    AddressFound,
    AttemptsExhausted,
    MarkerFound,
    MarkerMissing,
}

impl ReadinessState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ReadinessState::Ready | ReadinessState::TimedOut | ReadinessState::ProbeFailed
        )
    }

    /// Next state, or None if the event is not valid in this state
    pub fn on(self, event: ReadinessEvent) -> Option<ReadinessState> {
        use ReadinessEvent as E;
        use ReadinessState as S;

        match (self, event) {
            (S::AwaitingAddress, E::AddressFound) => Some(S::Probing),
            (S::AwaitingAddress, E::AttemptsExhausted) => Some(S::TimedOut),
            (S::Probing, E::MarkerFound) => Some(S::Ready),
            (S::Probing, E::MarkerMissing) => Some(S::ProbeFailed),
            _ => None,
        }
    }
}

impl fmt::Display for ReadinessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReadinessState::AwaitingAddress => "awaiting-address",
            ReadinessState::Probing => "probing",
            ReadinessState::Ready => "ready",
            ReadinessState::TimedOut => "timed-out",
            ReadinessState::ProbeFailed => "probe-failed",
        };
        f.write_str(name)
    }
}

/// Outcome of a successful readiness check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ready {
    pub address: String,
    pub url: String,
    pub marker: String,
}

struct Tracker {
    state: ReadinessState,
}

impl Tracker {
    fn advance(&mut self, event: ReadinessEvent) {
        match self.state.on(event) {
            Some(next) => {
                info!("Readiness: {} -> {}", self.state, next);
                self.state = next;
            }
            None => warn!("Ignoring readiness event {:?} in state {}", event, self.state),
        }
    }
}

/// Drive the readiness state machine to a terminal state
pub async fn check_readiness<F, Fut, E>(
    lookup: F,
    poll: &PollSettings,
    probe: &ProbeSettings,
) -> Result<Ready>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<Option<String>, E>>,
    E: Display,
{
    let mut tracker = Tracker {
        state: ReadinessState::AwaitingAddress,
    };

    let address = match await_endpoint("load balancer address", poll, lookup).await {
        Ok(address) => {
            tracker.advance(ReadinessEvent::AddressFound);
            address
        }
        Err(e @ MeshboxError::Timeout { .. }) => {
            tracker.advance(ReadinessEvent::AttemptsExhausted);
            return Err(e);
        }
        Err(e) => return Err(e),
    };

    match validate_http_response(&address, &probe.path, probe.timeout, &probe.marker).await {
        Ok(marker) => {
            tracker.advance(ReadinessEvent::MarkerFound);
            Ok(Ready {
                url: probe_url(&address, &probe.path),
                address,
                marker,
            })
        }
        Err(e) => {
            tracker.advance(ReadinessEvent::MarkerMissing);
            Err(e)
        }
    }
}
