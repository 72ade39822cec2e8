// SPDX-FileCopyrightText: 2026 Aurum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign scheduling for the Aurum campaign engine.
//!
//! A single recurring timer drives the [`Coordinator`] over all ACTIVE
//! campaigns: the pure [`recurrence`] evaluator decides due-ness and the
//! canonical period boundary, the [`audience`] snapshotter freezes the
//! eligible contact set, and run creation is deduplicated per period.
//! Campaigns become due at tick granularity; that latency is the accepted
//! bound, not a bug.

pub mod audience;
pub mod coordinator;
pub mod recurrence;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

pub use audience::AudienceSnapshot;
pub use coordinator::Coordinator;
pub use recurrence::Outcome;

/// The periodic tick loop wrapping a [`Coordinator`].
pub struct SchedulerLoop {
    coordinator: Arc<Coordinator>,
    tick_interval: Duration,
}

impl SchedulerLoop {
    pub fn new(coordinator: Arc<Coordinator>, config: &aurum_config::model::SchedulerConfig) -> Self {
        Self {
            coordinator,
            tick_interval: Duration::from_secs(config.tick_interval_secs.max(1)),
        }
    }

    /// Run ticks until the token is cancelled. The first tick fires
    /// immediately so campaigns due at startup are not delayed by one
    /// interval.
    ///
    /// Dispatch handles are dropped here on purpose: runs complete in the
    /// background and pausing or shutdown never cancels an in-flight run.
    pub async fn run(self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.tick_interval);
        info!(
            interval_secs = self.tick_interval.as_secs(),
            "campaign scheduler started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.coordinator.trigger_due_campaigns(chrono::Utc::now()).await {
                        Ok(handles) if handles.is_empty() => {
                            debug!("no campaigns due");
                        }
                        Ok(handles) => {
                            info!(triggered = handles.len(), "campaign runs triggered");
                        }
                        Err(e) => {
                            error!(error = %e, "scheduler tick failed");
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    info!("campaign scheduler shutting down");
                    break;
                }
            }
        }
    }
}
