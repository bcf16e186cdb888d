// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Editing session: the single owner of a plan and its render jobs
//!
//! Placements are applied optimistically. A completed job keeps its
//! opening and replaces the raster; a failed job rolls the opening back.
//! Derived geometry (rooms, walls, mapper) is rebuilt whenever the drawing
//! or raster changes, and existing openings are moved onto the rebuilt
//! walls by position.

use crate::config::OrchestratorConfig;
use crate::error::{EditError, PlanError};
use crate::job::{JobEvent, JobKey, JobStatus, RenderJob, Transition};
use crate::plan::{Plan, Raster};
use crate::types::{OpeningSpec, RenderRequest};
use planedit_geometry::{
    blend_png, crop_drawing, extract_walls, locate_point_on_walls, merge_collinear, parse_drawing,
    validate, BlendRegion, CoordinateMapper, LogicalWall, OpeningCandidate, Point2D, RoomPalette,
    RoomPolygon, WallHit, WallSegment,
};
use rustc_hash::FxHashMap;
use uuid::Uuid;

/// What a handled event did to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The event was for a job that is no longer tracked, or out of order
    Ignored,
    Started {
        key: JobKey,
    },
    Progress {
        key: JobKey,
        progress: Option<f64>,
    },
    Completed {
        key: JobKey,
        opening_id: String,
    },
    Failed {
        key: JobKey,
        opening_id: String,
        reason: String,
    },
    /// A completed job's grace period ended and it was dropped
    Expired {
        key: JobKey,
    },
}

impl Outcome {
    /// Whether the job reached Complete or Failed with this outcome.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Outcome::Completed { .. } | Outcome::Failed { .. })
    }
}

/// A plan under edit with its derived geometry and in-flight jobs.
pub struct EditorSession {
    plan: Plan,
    palette: RoomPalette,
    config: OrchestratorConfig,
    room_type_keys: Vec<String>,
    rooms: Vec<RoomPolygon>,
    walls: Vec<WallSegment>,
    mapper: Option<CoordinateMapper>,
    jobs: FxHashMap<JobKey, RenderJob>,
    last_error: Option<String>,
}

impl EditorSession {
    pub fn new(plan: Plan, palette: RoomPalette, config: OrchestratorConfig) -> Self {
        let mut session = Self {
            plan,
            palette,
            config,
            room_type_keys: Vec::new(),
            rooms: Vec::new(),
            walls: Vec::new(),
            mapper: None,
            jobs: FxHashMap::default(),
            last_error: None,
        };
        session.derive_geometry();
        session
    }

    /// Rebuild rooms, walls, mapper and room keys from the current drawing and raster.
    fn derive_geometry(&mut self) {
        let previous = std::mem::take(&mut self.walls);
        match parse_drawing(&self.plan.drawing, &self.palette) {
            Ok(drawing) => {
                self.room_type_keys = drawing.room_type_keys();
                self.walls = extract_walls(&drawing.rooms, &self.config.extraction);
                self.rooms = drawing.rooms;
                self.mapper = drawing
                    .view_box
                    .and_then(|vb| CoordinateMapper::new(vb, self.plan.raster.size()));
            }
            Err(e) => {
                tracing::warn!(plan = %self.plan.id, error = %e, "Drawing unreadable, opening editing disabled");
                self.room_type_keys.clear();
                self.rooms.clear();
                self.mapper = None;
            }
        }
        self.reanchor_openings(&previous);
        tracing::debug!(
            plan = %self.plan.id,
            walls = self.walls.len(),
            mapper = self.mapper.is_some(),
            "Derived plan geometry"
        );
    }

    /// Move openings from `previous` walls onto the current ones
    ///
    /// Wall ids follow extraction order, so the same wall can get a new id
    /// when the drawing changes. Each opening keeps its center point.
    fn reanchor_openings(&mut self, previous: &[WallSegment]) {
        if previous.is_empty() || self.walls.is_empty() {
            return;
        }
        let epsilon = self.config.extraction.epsilon;
        for opening in self.plan.openings.iter_mut() {
            let Some(old) = previous.iter().find(|w| w.id == opening.wall_id) else {
                continue;
            };
            let center = old.point_at(opening.position_on_wall);
            match locate_point_on_walls(&center, &self.walls, epsilon) {
                Some((wall_id, position)) => {
                    if wall_id != opening.wall_id {
                        tracing::debug!(
                            opening = %opening.id,
                            from = %opening.wall_id,
                            to = %wall_id,
                            "Opening moved to renamed wall"
                        );
                    }
                    opening.wall_id = wall_id;
                    opening.position_on_wall = position;
                }
                None => {
                    tracing::warn!(opening = %opening.id, wall = %opening.wall_id, "Opening's wall is gone");
                }
            }
        }
    }

    /// Whether the plan has walls and a usable raster mapping.
    pub fn editing_available(&self) -> bool {
        self.mapper.is_some() && !self.walls.is_empty()
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn walls(&self) -> &[WallSegment] {
        &self.walls
    }

    pub fn wall(&self, id: &str) -> Option<&WallSegment> {
        self.walls.iter().find(|w| w.id == id)
    }

    pub fn rooms(&self) -> &[RoomPolygon] {
        &self.rooms
    }

    /// Collinear wall chains, for selection UIs that show whole walls.
    pub fn logical_walls(&self) -> Vec<LogicalWall> {
        merge_collinear(&self.walls, &self.config.extraction)
    }

    pub fn mapper(&self) -> Option<&CoordinateMapper> {
        self.mapper.as_ref()
    }

    pub fn room_type_keys(&self) -> &[String] {
        &self.room_type_keys
    }

    /// Wall nearest to a point on the raster preview.
    pub fn wall_at(&self, raster_point: &Point2D, max_distance_px: f64) -> Option<WallHit> {
        self.mapper
            .as_ref()?
            .nearest_wall(raster_point, &self.walls, max_distance_px)
    }

    pub fn job(&self, key: JobKey) -> Option<&RenderJob> {
        self.jobs.get(&key)
    }

    pub fn jobs(&self) -> impl Iterator<Item = &RenderJob> {
        self.jobs.values()
    }

    /// Number of tracked jobs, including completed ones in their grace period.
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Number of jobs still waiting on the render service.
    pub fn active_job_count(&self) -> usize {
        self.jobs.values().filter(|j| !j.status.is_terminal()).count()
    }

    /// Message from the most recent failed job.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Validate a placement and apply it optimistically.
    ///
    /// On success the opening is on the plan and a `Pending` job tracks its
    /// render. Nothing changes on error.
    pub fn admit(&mut self, candidate: OpeningCandidate) -> Result<JobKey, EditError> {
        if !self.editing_available() {
            return Err(EditError::EditingUnavailable);
        }
        let wall = self
            .wall(&candidate.wall_id)
            .ok_or_else(|| EditError::UnknownWall(candidate.wall_id.clone()))?;
        validate(&candidate, wall, &self.plan.openings, &self.config.placement)?;

        let wall = wall.clone();
        let rooms: Vec<RoomPolygon> = self
            .rooms
            .iter()
            .filter(|room| wall.touches_room(&room.id))
            .cloned()
            .collect();
        let opening = candidate.into_placement(Uuid::new_v4().to_string());
        let key = JobKey::new();
        tracing::info!(
            job = %key,
            opening = %opening.id,
            wall = %opening.wall_id,
            kind = opening.kind.as_str(),
            position = opening.position_on_wall,
            width_inches = opening.width_inches,
            "Opening admitted"
        );
        self.jobs
            .insert(key, RenderJob::new(key, opening.clone(), wall, rooms));
        self.plan.openings.push(opening);
        Ok(key)
    }

    /// Build the render request for an admitted job.
    pub fn build_request(&self, key: JobKey) -> Result<RenderRequest, EditError> {
        let job = self.jobs.get(&key).ok_or(EditError::UnknownJob(key))?;
        let opening = self
            .plan
            .opening(&job.opening.id)
            .ok_or(EditError::UnknownJob(key))?;

        let cropped_svg = match crop_drawing(&self.plan.drawing, &self.palette, &self.config.crop) {
            Ok(cropped) => cropped.svg,
            Err(e) => {
                tracing::warn!(job = %key, error = %e, "Sending uncropped drawing");
                self.plan.drawing.clone()
            }
        };

        Ok(RenderRequest {
            plan_id: self.plan.id.clone(),
            svg: self.plan.drawing.clone(),
            cropped_svg,
            png_base64: self.plan.raster.to_base64(),
            opening: OpeningSpec::from(opening),
            room_keys: self.room_type_keys.clone(),
        })
    }

    /// Apply a job event and its side effects.
    pub fn handle(&mut self, key: JobKey, event: JobEvent) -> Outcome {
        let Some(job) = self.jobs.get_mut(&key) else {
            tracing::debug!(job = %key, "Ignoring event for inactive job");
            return Outcome::Ignored;
        };
        let transition = match job.apply(event) {
            Ok(transition) => transition,
            Err(e) => {
                tracing::debug!(job = %key, error = %e, "Ignoring event");
                return Outcome::Ignored;
            }
        };
        let opening_id = job.opening.id.clone();

        match transition {
            Transition::Started => {
                tracing::info!(job = %key, remote = ?job.remote_id, "Render job submitted");
                Outcome::Started { key }
            }
            Transition::Progress(progress) => {
                tracing::debug!(job = %key, progress = ?progress, "Render in progress");
                Outcome::Progress { key, progress }
            }
            Transition::Completed { raster, drawing } => {
                self.complete(key, &opening_id, raster, drawing);
                Outcome::Completed { key, opening_id }
            }
            Transition::Failed(reason) => {
                self.roll_back(key, &opening_id, &reason);
                Outcome::Failed {
                    key,
                    opening_id,
                    reason,
                }
            }
        }
    }

    fn complete(&mut self, key: JobKey, opening_id: &str, rendered: Raster, drawing: Option<String>) {
        let raster = if self.config.blend_on_complete {
            self.blend_onto_current(key, rendered)
        } else {
            rendered
        };
        self.plan.raster = raster;
        if let Some(drawing) = drawing {
            self.plan.drawing = drawing;
        }
        self.derive_geometry();
        tracing::info!(
            job = %key,
            opening = %opening_id,
            editing_available = self.editing_available(),
            "Render job complete"
        );
    }

    /// Composite the rooms beside the opening from `rendered` onto the current raster.
    fn blend_onto_current(&self, key: JobKey, rendered: Raster) -> Raster {
        let Some(job) = self.jobs.get(&key) else {
            return rendered;
        };
        let Some(region) = self.blend_region(job) else {
            tracing::warn!(job = %key, "No blend region, using full render");
            return rendered;
        };
        let profile = match region {
            BlendRegion::Rooms(_) => self.config.blend.profile(job.opening.kind),
            BlendRegion::Rect(_) => self.config.blend.fallback_profile(job.opening.kind),
        };

        match blend_png(self.plan.raster.bytes(), rendered.bytes(), &region, &profile)
            .map_err(PlanError::from)
            .and_then(Raster::from_png)
        {
            Ok(blended) => blended,
            Err(e) => {
                tracing::warn!(job = %key, error = %e, "Blend failed, using full render");
                rendered
            }
        }
    }

    /// Rooms beside the job's wall in raster space, else a padded rectangle
    /// around the opening.
    fn blend_region(&self, job: &RenderJob) -> Option<BlendRegion> {
        let mapper = self.mapper.as_ref()?;
        let outlines: Vec<Vec<Point2D>> = job
            .rooms
            .iter()
            .filter(|room| room.points.len() >= 3)
            .map(|room| mapper.polygon_to_raster(&room.points))
            .collect();
        if !outlines.is_empty() {
            return Some(BlendRegion::Rooms(outlines));
        }
        mapper
            .opening_region(
                &job.wall,
                job.opening.position_on_wall,
                self.config.placement.inches_to_units(job.opening.width_inches),
                self.config.blend.padding_px,
            )
            .map(BlendRegion::Rect)
    }

    fn roll_back(&mut self, key: JobKey, opening_id: &str, reason: &str) {
        self.plan.remove_opening(opening_id);
        self.jobs.remove(&key);
        self.last_error = Some(reason.to_string());
        tracing::warn!(job = %key, opening = %opening_id, reason, "Render job failed, opening rolled back");
    }

    /// Drop a completed job after its grace period.
    pub fn expire(&mut self, key: JobKey) -> bool {
        match self.jobs.get(&key) {
            Some(job) if job.status == JobStatus::Complete => {
                self.jobs.remove(&key);
                tracing::debug!(job = %key, "Completed job expired");
                true
            }
            _ => false,
        }
    }

    /// Stop tracking a job; its opening is rolled back unless it completed.
    pub fn cancel(&mut self, key: JobKey) -> Option<RenderJob> {
        let job = self.jobs.remove(&key)?;
        if job.status != JobStatus::Complete {
            self.plan.remove_opening(&job.opening.id);
        }
        tracing::info!(job = %key, status = ?job.status, "Render job cancelled");
        Some(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PollResponse;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use image::{ImageFormat, Rgba, RgbaImage};
    use planedit_geometry::{drawing_view_box, PlacementRejection};
    use std::io::Cursor;

    const DRAWING: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 200 100">
        <rect id="bed" x="0" y="0" width="100" height="100" fill="#ff8c00"/>
        <rect id="living" x="100" y="0" width="100" height="100" fill="#87ceeb"/>
    </svg>"##;

    fn png(width: u32, height: u32, value: u8) -> Vec<u8> {
        let mut bytes = Vec::new();
        RgbaImage::from_pixel(width, height, Rgba([value, value, value, 255]))
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn session_with(config: OrchestratorConfig) -> EditorSession {
        let plan = Plan::new("plan-1", DRAWING, Raster::from_png(png(400, 200, 0)).unwrap());
        EditorSession::new(plan, RoomPalette::default(), config)
    }

    fn session() -> EditorSession {
        session_with(OrchestratorConfig::default())
    }

    fn exterior_wall_id(session: &EditorSession) -> String {
        session
            .walls()
            .iter()
            .find(|w| w.is_exterior && (w.length - 100.0).abs() < 1e-9)
            .map(|w| w.id.clone())
            .unwrap()
    }

    fn top_wall(session: &EditorSession, room: &str) -> WallSegment {
        session
            .walls()
            .iter()
            .find(|w| w.is_exterior && w.touches_room(room) && w.start.y == 0.0 && w.end.y == 0.0)
            .cloned()
            .unwrap()
    }

    fn same_segment(a: &WallSegment, b: &WallSegment) -> bool {
        (a.start == b.start && a.end == b.end) || (a.start == b.end && a.end == b.start)
    }

    fn interior_wall_id(session: &EditorSession) -> String {
        session
            .walls()
            .iter()
            .find(|w| !w.is_exterior)
            .map(|w| w.id.clone())
            .unwrap()
    }

    fn submit(session: &mut EditorSession, key: JobKey) {
        let outcome = session.handle(
            key,
            JobEvent::Submitted {
                job_id: "remote".into(),
                initial_drawing: None,
            },
        );
        assert_eq!(outcome, Outcome::Started { key });
    }

    #[test]
    fn test_geometry_is_derived() {
        let session = session();
        assert!(session.editing_available());
        assert_eq!(session.walls().len(), 7);
        assert_eq!(session.room_type_keys(), &["bedroom".to_string(), "living".to_string()]);
        assert_eq!(session.mapper().unwrap().scale_x(), 2.0);
    }

    #[test]
    fn test_unreadable_drawing_disables_editing() {
        let plan = Plan::new("p", "<svg", Raster::from_png(png(4, 4, 0)).unwrap());
        let mut session = EditorSession::new(plan, RoomPalette::default(), OrchestratorConfig::default());
        assert!(!session.editing_available());
        assert!(matches!(
            session.admit(OpeningCandidate::door("wall-0", 0.5, 36.0)),
            Err(EditError::EditingUnavailable)
        ));
    }

    #[test]
    fn test_admit_is_optimistic() {
        let mut session = session();
        let wall = exterior_wall_id(&session);
        let key = session.admit(OpeningCandidate::door(wall.clone(), 0.5, 36.0)).unwrap();

        assert_eq!(session.plan().openings.len(), 1);
        assert_eq!(session.job(key).unwrap().status, JobStatus::Pending);

        let request = session.build_request(key).unwrap();
        assert_eq!(request.plan_id, "plan-1");
        assert_eq!(request.opening.wall_id, wall);
        assert_eq!(request.room_keys, vec!["bedroom", "living"]);
        let framed = drawing_view_box(&request.cropped_svg).unwrap();
        assert!((framed.y + 24.0).abs() < 1e-9);
        assert!((framed.height - 148.0).abs() < 1e-9);
        assert!(request.cropped_svg.contains(r#"width="1052""#));
        assert!(request.cropped_svg.contains(r#"height="592""#));
        assert_eq!(
            STANDARD.decode(&request.png_base64).unwrap(),
            session.plan().raster.bytes()
        );
    }

    #[test]
    fn test_second_placement_sees_first() {
        let mut session = session();
        let wall = exterior_wall_id(&session);
        session.admit(OpeningCandidate::door(wall.clone(), 0.5, 36.0)).unwrap();
        let err = session
            .admit(OpeningCandidate::door(wall, 0.52, 36.0))
            .unwrap_err();
        assert!(matches!(err, EditError::Rejected(PlacementRejection::Overlaps { .. })));
        assert_eq!(session.plan().openings.len(), 1);
        assert_eq!(session.job_count(), 1);
    }

    #[test]
    fn test_rejections_do_not_mutate() {
        let mut session = session();
        let interior = interior_wall_id(&session);
        assert!(matches!(
            session.admit(OpeningCandidate::window(interior, 0.5, 36.0)),
            Err(EditError::Rejected(PlacementRejection::WindowOnInteriorWall))
        ));
        assert!(matches!(
            session.admit(OpeningCandidate::door("wall-99", 0.5, 36.0)),
            Err(EditError::UnknownWall(_))
        ));
        assert!(session.plan().openings.is_empty());
        assert_eq!(session.job_count(), 0);
    }

    #[test]
    fn test_completion_replaces_raster_and_drawing() {
        let mut session = session();
        let wall = exterior_wall_id(&session);
        let key = session.admit(OpeningCandidate::door(wall, 0.5, 36.0)).unwrap();
        submit(&mut session, key);

        let new_png = png(800, 400, 90);
        let new_drawing = DRAWING.replace("viewBox=\"0 0 200 100\"", "viewBox=\"0 0 200 100\" data-rev=\"2\"");
        let outcome = session.handle(
            key,
            JobEvent::Polled(PollResponse::complete(STANDARD.encode(&new_png), Some(new_drawing.clone()))),
        );
        assert!(matches!(outcome, Outcome::Completed { key: k, .. } if k == key));

        assert_eq!(session.plan().raster.bytes(), new_png.as_slice());
        assert_eq!(session.plan().drawing, new_drawing);
        assert_eq!(session.plan().openings.len(), 1);
        assert_eq!(session.mapper().unwrap().scale_x(), 4.0);
        assert_eq!(session.job(key).unwrap().status, JobStatus::Complete);

        assert!(session.expire(key));
        assert!(session.job(key).is_none());
        assert_eq!(session.plan().openings.len(), 1);
    }

    #[test]
    fn test_failure_rolls_back() {
        let mut session = session();
        let wall = exterior_wall_id(&session);
        let before = session.plan().raster.clone();
        let key = session.admit(OpeningCandidate::door(wall, 0.5, 36.0)).unwrap();
        submit(&mut session, key);

        let outcome = session.handle(key, JobEvent::Polled(PollResponse::failed("no capacity")));
        assert!(matches!(outcome, Outcome::Failed { ref reason, .. } if reason == "no capacity"));
        assert!(session.plan().openings.is_empty());
        assert_eq!(session.plan().raster, before);
        assert_eq!(session.plan().drawing, DRAWING);
        assert_eq!(session.last_error(), Some("no capacity"));
        assert!(session.job(key).is_none());
    }

    #[test]
    fn test_late_events_are_ignored() {
        let mut session = session();
        let wall = exterior_wall_id(&session);
        let key = session.admit(OpeningCandidate::door(wall, 0.5, 36.0)).unwrap();
        session.handle(key, JobEvent::SubmitFailed("offline".into()));

        let late = session.handle(key, JobEvent::Polled(PollResponse::complete("AAAA", None)));
        assert_eq!(late, Outcome::Ignored);
        assert_eq!(session.handle(JobKey::new(), JobEvent::TimedOut { attempts: 1 }), Outcome::Ignored);
    }

    #[test]
    fn test_cancel_rolls_back_unfinished_job() {
        let mut session = session();
        let wall = exterior_wall_id(&session);
        let key = session.admit(OpeningCandidate::door(wall, 0.5, 36.0)).unwrap();
        submit(&mut session, key);

        let job = session.cancel(key).unwrap();
        assert_eq!(job.status, JobStatus::Rendering);
        assert!(session.plan().openings.is_empty());
        assert!(session.cancel(key).is_none());
    }

    #[test]
    fn test_blend_keeps_previous_raster_outside_opening() {
        let config = OrchestratorConfig {
            blend_on_complete: true,
            ..OrchestratorConfig::default()
        };
        let mut session = session_with(config);
        let wall = exterior_wall_id(&session);
        let key = session.admit(OpeningCandidate::door(wall, 0.5, 36.0)).unwrap();
        submit(&mut session, key);

        session.handle(
            key,
            JobEvent::Polled(PollResponse::complete(STANDARD.encode(png(400, 200, 200)), None)),
        );
        let blended = image::load_from_memory(session.plan().raster.bytes())
            .unwrap()
            .to_rgba8();
        assert_eq!(blended.dimensions(), (400, 200));
        // Far corner of the other room is untouched
        let wall = session.wall(&session.plan().openings[0].wall_id).unwrap();
        let center = session.mapper().unwrap().vector_to_raster(&wall.midpoint());
        let far = if center.x < 200.0 { (399, 199) } else { (0, 199) };
        assert_eq!(blended.get_pixel(far.0, far.1).0[0], 0);
        assert!(blended.get_pixel(center.x.min(399.0) as u32, center.y.min(199.0) as u32).0[0] > 50);
    }

    #[test]
    fn test_reordered_drawing_keeps_in_flight_opening_on_its_wall() {
        let config = OrchestratorConfig {
            blend_on_complete: true,
            ..OrchestratorConfig::default()
        };
        let mut session = session_with(config);
        let living_wall = top_wall(&session, "living");
        let bed_wall = top_wall(&session, "bed");
        let first = session
            .admit(OpeningCandidate::door(living_wall.id.clone(), 0.5, 36.0))
            .unwrap();
        let second = session
            .admit(OpeningCandidate::door(bed_wall.id.clone(), 0.5, 36.0))
            .unwrap();
        submit(&mut session, first);
        submit(&mut session, second);
        let second_opening = session.job(second).unwrap().opening.id.clone();

        // Same rooms, living listed first, so every wall id shifts
        let reordered = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 200 100">
            <rect id="living" x="100" y="0" width="100" height="100" fill="#87ceeb"/>
            <rect id="bed" x="0" y="0" width="100" height="100" fill="#ff8c00"/>
        </svg>"##;
        session.handle(
            first,
            JobEvent::Polled(PollResponse::complete(
                STANDARD.encode(png(400, 200, 100)),
                Some(reordered.to_string()),
            )),
        );
        assert_eq!(session.job(second).unwrap().status, JobStatus::Rendering);

        let moved = session.plan().opening(&second_opening).unwrap().clone();
        assert_ne!(moved.wall_id, bed_wall.id);
        assert!(same_segment(session.wall(&moved.wall_id).unwrap(), &bed_wall));
        assert!((moved.position_on_wall - 0.5).abs() < 1e-9);

        let job = session.job(second).unwrap();
        assert_eq!(job.wall, bed_wall);
        assert_eq!(job.opening.wall_id, bed_wall.id);
        let rooms: Vec<&str> = job.rooms.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(rooms, vec!["bed"]);

        // The overlap check still finds the in-flight opening
        let err = session
            .admit(OpeningCandidate::door(moved.wall_id.clone(), 0.52, 36.0))
            .unwrap_err();
        assert!(matches!(err, EditError::Rejected(PlacementRejection::Overlaps { .. })));

        session.handle(
            second,
            JobEvent::Polled(PollResponse::complete(STANDARD.encode(png(400, 200, 200)), None)),
        );
        let blended = image::load_from_memory(session.plan().raster.bytes())
            .unwrap()
            .to_rgba8();
        assert_eq!(blended.get_pixel(100, 100).0[0], 200);
        assert_eq!(blended.get_pixel(300, 100).0[0], 100);
        assert_eq!(session.plan().openings.len(), 2);
    }
}
