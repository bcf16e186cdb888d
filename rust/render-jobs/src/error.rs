// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for editing sessions and the render service.

use crate::job::{JobKey, JobStatus};
use planedit_geometry::{DrawingError, PlacementRejection};
use thiserror::Error;

/// Failures talking to the render service.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Render service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl ClientError {
    /// Whether a retry of the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Http(e) => e.is_timeout() || e.is_connect(),
            ClientError::Status { status, .. } => *status >= 500 || *status == 429,
            ClientError::Decode(_) => false,
        }
    }
}

/// Session-level failures for an opening edit.
#[derive(Debug, Error)]
pub enum EditError {
    #[error("Opening editing is unavailable for this plan")]
    EditingUnavailable,

    #[error("Unknown wall: {0}")]
    UnknownWall(String),

    #[error("Placement rejected: {0}")]
    Rejected(#[from] PlacementRejection),

    #[error("Unknown render job: {0}")]
    UnknownJob(JobKey),
}

/// Errors loading a plan.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Invalid raster image: {0}")]
    Raster(#[from] DrawingError),

    #[error("Invalid base64 image data: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// A job event that does not apply to the job's current state.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StateError {
    #[error("Job is already {0:?}")]
    Terminal(JobStatus),

    #[error("Event {event} is not valid while {status:?}")]
    Unexpected { status: JobStatus, event: &'static str },
}
