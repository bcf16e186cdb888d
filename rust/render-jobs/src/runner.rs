// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-job network task
//!
//! A runner submits one request, then polls until the job is terminal or
//! the attempt budget runs out. It never touches the plan; every result is
//! sent to the owning orchestrator as a message. Runners stop as soon as
//! the receiving side is gone.

use crate::client::RenderClient;
use crate::job::{JobEvent, JobKey};
use crate::types::RenderRequest;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// Message from a background task to the orchestrator.
#[derive(Debug)]
pub enum RunnerMessage {
    Job(JobKey, JobEvent),
    /// A completed job's grace period ended
    Expire(JobKey),
}

/// Poll loop settings.
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
}

/// Submit a render request and poll it to a terminal state.
pub async fn run_job<C: RenderClient>(
    client: Arc<C>,
    key: JobKey,
    request: RenderRequest,
    settings: PollSettings,
    tx: UnboundedSender<RunnerMessage>,
) {
    let submitted = match client.submit(&request).await {
        Ok(resp) => resp,
        Err(e) => {
            tracing::warn!(job = %key, error = %e, "Render submission failed");
            let _ = tx.send(RunnerMessage::Job(key, JobEvent::SubmitFailed(e.to_string())));
            return;
        }
    };
    let remote_id = submitted.job_id.clone();
    let event = JobEvent::Submitted {
        job_id: submitted.job_id,
        initial_drawing: submitted.initial_modified_svg,
    };
    if tx.send(RunnerMessage::Job(key, event)).is_err() {
        return;
    }

    for attempt in 1..=settings.max_attempts {
        tokio::time::sleep(settings.interval).await;
        if tx.is_closed() {
            tracing::debug!(job = %key, "Orchestrator gone, stopping poll loop");
            return;
        }

        match client.poll(&remote_id).await {
            Ok(poll) => {
                let terminal = poll.status.is_terminal();
                if tx.send(RunnerMessage::Job(key, JobEvent::Polled(poll))).is_err() || terminal {
                    return;
                }
            }
            Err(e) if e.is_transient() => {
                tracing::debug!(job = %key, attempt, error = %e, "Transient poll error, retrying");
            }
            Err(e) => {
                tracing::warn!(job = %key, attempt, error = %e, "Polling failed");
                let _ = tx.send(RunnerMessage::Job(key, JobEvent::PollFailed(e.to_string())));
                return;
            }
        }
    }

    tracing::warn!(job = %key, attempts = settings.max_attempts, "Render job timed out");
    let _ = tx.send(RunnerMessage::Job(
        key,
        JobEvent::TimedOut {
            attempts: settings.max_attempts,
        },
    ));
}

/// Send an expiry message for `key` after `grace`.
pub async fn expire_after(key: JobKey, grace: Duration, tx: UnboundedSender<RunnerMessage>) {
    tokio::time::sleep(grace).await;
    let _ = tx.send(RunnerMessage::Expire(key));
}
