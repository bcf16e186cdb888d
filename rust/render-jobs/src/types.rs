// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Render service request and response bodies.

use planedit_geometry::{OpeningKind, OpeningPlacement, SwingDirection};
use serde::{Deserialize, Serialize};

/// Body of `POST /openings/render`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RenderRequest {
    pub plan_id: String,
    /// Full drawing
    pub svg: String,
    /// Drawing with its view box tightened to the rooms
    pub cropped_svg: String,
    /// Current raster preview, base64 PNG
    pub png_base64: String,
    pub opening: OpeningSpec,
    /// Room-type keys present on the plan
    pub room_keys: Vec<String>,
}

/// Opening description sent with a render request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpeningSpec {
    #[serde(rename = "type")]
    pub kind: OpeningKind,
    pub wall_id: String,
    pub position_on_wall: f64,
    pub width_inches: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swing_direction: Option<SwingDirection>,
}

impl From<&OpeningPlacement> for OpeningSpec {
    fn from(opening: &OpeningPlacement) -> Self {
        Self {
            kind: opening.kind,
            wall_id: opening.wall_id.clone(),
            position_on_wall: opening.position_on_wall,
            width_inches: opening.width_inches,
            swing_direction: opening.swing,
        }
    }
}

/// Body returned by a successful submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmitResponse {
    pub job_id: String,
    /// Drawing with the opening applied, when the service can produce it up front
    #[serde(default)]
    pub initial_modified_svg: Option<String>,
}

/// Remote job status as reported by `GET /openings/status/{job_id}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RemoteStatus {
    Pending,
    Rendering,
    Complete,
    Failed,
}

impl RemoteStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RemoteStatus::Complete | RemoteStatus::Failed)
    }
}

/// Body of a status poll.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PollResponse {
    pub status: RemoteStatus,
    #[serde(default)]
    pub rendered_png_base64: Option<String>,
    #[serde(default)]
    pub modified_svg: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub progress: Option<f64>,
}

impl PollResponse {
    pub fn in_progress(status: RemoteStatus, progress: Option<f64>) -> Self {
        Self {
            status,
            rendered_png_base64: None,
            modified_svg: None,
            error: None,
            progress,
        }
    }

    pub fn complete(rendered_png_base64: impl Into<String>, modified_svg: Option<String>) -> Self {
        Self {
            status: RemoteStatus::Complete,
            rendered_png_base64: Some(rendered_png_base64.into()),
            modified_svg,
            error: None,
            progress: Some(1.0),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: RemoteStatus::Failed,
            rendered_png_base64: None,
            modified_svg: None,
            error: Some(error.into()),
            progress: None,
        }
    }
}
