// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Render job state machine
//!
//! ```text
//! Pending --Submitted--> Rendering --Polled(complete)--> Complete
//!    |                       |
//!    +--SubmitFailed--+      +--Polled(failed) / PollFailed / TimedOut--+
//!                     v                                                  v
//!                   Failed <---------------------------------------------+
//! ```
//!
//! [`RenderJob::apply`] is a pure reducer; side effects belong to the
//! session that owns the job.

use crate::error::StateError;
use crate::plan::Raster;
use crate::types::{PollResponse, RemoteStatus};
use planedit_geometry::{OpeningPlacement, RoomPolygon, WallSegment};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Local identifier of a render job, independent of the service's id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobKey(Uuid);

impl JobKey {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Local job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Rendering,
    Complete,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Failed)
    }
}

/// Messages that drive a job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    /// The service accepted the request.
    Submitted {
        job_id: String,
        initial_drawing: Option<String>,
    },
    /// The service rejected the request or could not be reached.
    SubmitFailed(String),
    /// A status poll returned.
    Polled(PollResponse),
    /// Polling failed in a way retries will not fix.
    PollFailed(String),
    /// The poll budget ran out.
    TimedOut { attempts: u32 },
}

impl JobEvent {
    fn name(&self) -> &'static str {
        match self {
            JobEvent::Submitted { .. } => "submitted",
            JobEvent::SubmitFailed(_) => "submit_failed",
            JobEvent::Polled(_) => "polled",
            JobEvent::PollFailed(_) => "poll_failed",
            JobEvent::TimedOut { .. } => "timed_out",
        }
    }
}

/// Effect of applying an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Pending → Rendering
    Started,
    /// Still rendering; carries the last reported progress
    Progress(Option<f64>),
    /// Rendering → Complete
    Completed {
        raster: Raster,
        /// Drawing to adopt: the poll's, else the submission's
        drawing: Option<String>,
    },
    /// Any → Failed
    Failed(String),
}

/// One opening edit being rendered remotely.
///
/// The opening, its host wall and the rooms beside it are copied at
/// admission. Wall ids are reassigned whenever the drawing changes, so
/// the job never looks its wall up again.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub key: JobKey,
    /// Optimistic opening this job renders
    pub opening: OpeningPlacement,
    /// Host wall as it was when the opening was admitted
    pub wall: WallSegment,
    /// Rooms on either side of `wall`
    pub rooms: Vec<RoomPolygon>,
    /// Service-side job id, once submitted
    pub remote_id: Option<String>,
    pub status: JobStatus,
    /// Drawing returned with the submission
    pub initial_drawing: Option<String>,
    pub progress: Option<f64>,
    pub error: Option<String>,
}

impl RenderJob {
    pub fn new(
        key: JobKey,
        opening: OpeningPlacement,
        wall: WallSegment,
        rooms: Vec<RoomPolygon>,
    ) -> Self {
        Self {
            key,
            opening,
            wall,
            rooms,
            remote_id: None,
            status: JobStatus::Pending,
            initial_drawing: None,
            progress: None,
            error: None,
        }
    }

    /// Apply an event, returning the resulting transition.
    ///
    /// Terminal jobs reject every event. A completion whose image cannot
    /// be decoded fails the job.
    pub fn apply(&mut self, event: JobEvent) -> Result<Transition, StateError> {
        if self.status.is_terminal() {
            return Err(StateError::Terminal(self.status));
        }

        match (self.status, event) {
            (
                JobStatus::Pending,
                JobEvent::Submitted {
                    job_id,
                    initial_drawing,
                },
            ) => {
                self.remote_id = Some(job_id);
                self.initial_drawing = initial_drawing;
                self.status = JobStatus::Rendering;
                Ok(Transition::Started)
            }
            (JobStatus::Pending, JobEvent::SubmitFailed(reason)) => Ok(self.fail(reason)),
            (JobStatus::Rendering, JobEvent::Polled(poll)) => Ok(self.apply_poll(poll)),
            (JobStatus::Rendering, JobEvent::PollFailed(reason)) => Ok(self.fail(reason)),
            (JobStatus::Rendering, JobEvent::TimedOut { attempts }) => Ok(self.fail(format!(
                "Render did not finish after {} status checks",
                attempts
            ))),
            (status, event) => Err(StateError::Unexpected {
                status,
                event: event.name(),
            }),
        }
    }

    fn apply_poll(&mut self, poll: PollResponse) -> Transition {
        if poll.progress.is_some() {
            self.progress = poll.progress;
        }
        match poll.status {
            RemoteStatus::Pending | RemoteStatus::Rendering => Transition::Progress(self.progress),
            RemoteStatus::Failed => {
                self.fail(poll.error.unwrap_or_else(|| "Render failed".to_string()))
            }
            RemoteStatus::Complete => {
                let Some(encoded) = poll.rendered_png_base64 else {
                    return self.fail("Render completed without an image".to_string());
                };
                match Raster::from_base64(&encoded) {
                    Ok(raster) => {
                        self.status = JobStatus::Complete;
                        Transition::Completed {
                            raster,
                            drawing: poll.modified_svg.or_else(|| self.initial_drawing.clone()),
                        }
                    }
                    Err(e) => self.fail(format!("Rendered image is unreadable: {}", e)),
                }
            }
        }
    }

    fn fail(&mut self, reason: String) -> Transition {
        self.status = JobStatus::Failed;
        self.error = Some(reason.clone());
        Transition::Failed(reason)
    }
}
