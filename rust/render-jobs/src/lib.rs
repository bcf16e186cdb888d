// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Render job orchestration for door and window edits
//!
//! Placing an opening is optimistic: the opening appears on the plan as
//! soon as it passes validation, a render job is submitted to the remote
//! service, and the job's outcome either confirms the edit (new raster and
//! drawing) or rolls it back.
//!
//! # Usage
//!
//! ```rust,ignore
//! use planedit_render::{
//!     EditorSession, HttpRenderClient, Orchestrator, Plan, Raster, RenderServiceConfig,
//! };
//! use planedit_geometry::{OpeningCandidate, RoomPalette};
//!
//! let service = RenderServiceConfig::from_env();
//! let plan = Plan::new("plan-1", svg, Raster::from_png(png_bytes)?);
//! let session = EditorSession::new(plan, RoomPalette::default(), service.orchestrator_config());
//! let mut orchestrator = Orchestrator::new(session, Arc::new(HttpRenderClient::new(&service)?));
//!
//! orchestrator.place_opening(OpeningCandidate::door("wall-4", 0.5, 36.0))?;
//! for outcome in orchestrator.run_until_idle().await {
//!     println!("{:?}", outcome);
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod job;
pub mod orchestrator;
pub mod plan;
pub mod runner;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use client::{HttpRenderClient, RenderClient};
pub use config::{OrchestratorConfig, RenderServiceConfig};
pub use error::{ClientError, EditError, PlanError, StateError};
pub use job::{JobEvent, JobKey, JobStatus, RenderJob, Transition};
pub use orchestrator::Orchestrator;
pub use plan::{Plan, Raster};
pub use session::{EditorSession, Outcome};
pub use types::{OpeningSpec, PollResponse, RemoteStatus, RenderRequest, SubmitResponse};
