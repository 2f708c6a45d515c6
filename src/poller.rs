// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Bounded polling for values that external infrastructure assigns asynchronously.

use crate::error::{MeshboxError, Result};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// Fixed polling schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Total number of lookups, including the first one
    pub max_attempts: u32,
    /// Pause between two consecutive lookups
    pub delay: Duration,
}

/// Call `lookup` until it yields a non-empty address or the attempts run out.
///
/// A lookup error counts as "no address yet" and is only logged. There is no
/// sleep after the successful lookup, nor after the final failed one.
pub async fn await_endpoint<F, Fut, E>(
    what: &str,
    settings: &PollSettings,
    mut lookup: F,
) -> Result<String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<Option<String>, E>>,
    E: Display,
{
    if settings.max_attempts == 0 {
        return Err(MeshboxError::Config(
            "polling needs at least one attempt".to_string(),
        ));
    }

    let started = Instant::now();

    for attempt in 1..=settings.max_attempts {
        match lookup().await {
            Ok(Some(address)) if !address.is_empty() => {
                info!(attempt, "Found {}: {}", what, address);
                return Ok(address);
            }
            Ok(_) => {
                debug!(attempt, max_attempts = settings.max_attempts, "{} not assigned yet", what);
            }
            Err(e) => {
                warn!(
                    attempt,
                    max_attempts = settings.max_attempts,
                    "Lookup of {} failed, treating as not yet available: {}",
                    what,
                    e
                );
            }
        }

        if attempt < settings.max_attempts {
            info!(
                "Waiting {:?} for {} (attempt {}/{})...",
                settings.delay, what, attempt, settings.max_attempts
            );
            sleep(settings.delay).await;
        }
    }

    Err(MeshboxError::Timeout {
        what: what.to_string(),
        attempts: settings.max_attempts,
        waited: started.elapsed(),
    })
}
