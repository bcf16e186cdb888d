// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end render job lifecycles against a scripted render service.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{ImageFormat, Rgba, RgbaImage};
use planedit_geometry::{OpeningCandidate, PlacementRejection, RoomPalette};
use planedit_render::{
    ClientError, EditError, EditorSession, JobStatus, Orchestrator, OrchestratorConfig, Outcome,
    Plan, PollResponse, Raster, RemoteStatus, RenderClient, RenderRequest, SubmitResponse,
};
use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const DRAWING: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 200 100">
    <rect id="bed" x="0" y="0" width="100" height="100" fill="#ff8c00"/>
    <rect id="living" x="100" y="0" width="100" height="100" fill="#87ceeb"/>
</svg>"##;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const GRACE: Duration = Duration::from_secs(1);

/// Render service double that replays scripted responses.
#[derive(Default)]
struct ScriptedClient {
    submits: Mutex<VecDeque<Result<SubmitResponse, ClientError>>>,
    polls: Mutex<HashMap<String, VecDeque<Result<PollResponse, ClientError>>>>,
    requests: Mutex<Vec<RenderRequest>>,
    poll_count: AtomicUsize,
}

impl ScriptedClient {
    fn accept(self, job_id: &str, initial_svg: Option<&str>) -> Self {
        self.submits.lock().unwrap().push_back(Ok(SubmitResponse {
            job_id: job_id.into(),
            initial_modified_svg: initial_svg.map(str::to_string),
        }));
        self
    }

    fn reject(self, error: ClientError) -> Self {
        self.submits.lock().unwrap().push_back(Err(error));
        self
    }

    fn then_poll(self, job_id: &str, response: Result<PollResponse, ClientError>) -> Self {
        self.polls
            .lock()
            .unwrap()
            .entry(job_id.to_string())
            .or_default()
            .push_back(response);
        self
    }

    fn polls(&self) -> usize {
        self.poll_count.load(Ordering::SeqCst)
    }

    fn requests(&self) -> Vec<RenderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl RenderClient for ScriptedClient {
    async fn submit(&self, request: &RenderRequest) -> Result<SubmitResponse, ClientError> {
        self.requests.lock().unwrap().push(request.clone());
        self.submits
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::Decode("no scripted submission".into())))
    }

    async fn poll(&self, job_id: &str) -> Result<PollResponse, ClientError> {
        self.poll_count.fetch_add(1, Ordering::SeqCst);
        self.polls
            .lock()
            .unwrap()
            .get_mut(job_id)
            .and_then(|script| script.pop_front())
            .unwrap_or_else(|| Ok(PollResponse::in_progress(RemoteStatus::Rendering, None)))
    }
}

fn png(width: u32, height: u32, value: u8) -> Vec<u8> {
    let mut bytes = Vec::new();
    RgbaImage::from_pixel(width, height, Rgba([value, value, value, 255]))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn config() -> OrchestratorConfig {
    OrchestratorConfig {
        poll_interval: POLL_INTERVAL,
        max_poll_attempts: 5,
        completion_grace: GRACE,
        ..OrchestratorConfig::default()
    }
}

fn orchestrator(client: ScriptedClient) -> (Orchestrator<ScriptedClient>, Arc<ScriptedClient>) {
    let plan = Plan::new("plan-1", DRAWING, Raster::from_png(png(400, 200, 0)).unwrap());
    let session = EditorSession::new(plan, RoomPalette::default(), config());
    let client = Arc::new(client);
    (Orchestrator::new(session, Arc::clone(&client)), client)
}

fn exterior_walls(orchestrator: &Orchestrator<ScriptedClient>) -> Vec<String> {
    orchestrator
        .session()
        .walls()
        .iter()
        .filter(|w| w.is_exterior)
        .map(|w| w.id.clone())
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_successful_render_replaces_raster() {
    let new_png = png(400, 200, 120);
    let new_drawing = DRAWING.replace("<svg ", "<svg data-rev=\"2\" ");
    let client = ScriptedClient::default()
        .accept("r1", Some("<svg id='initial'/>"))
        .then_poll("r1", Ok(PollResponse::in_progress(RemoteStatus::Rendering, Some(0.3))))
        .then_poll(
            "r1",
            Ok(PollResponse::complete(STANDARD.encode(&new_png), Some(new_drawing.clone()))),
        );
    let (mut orchestrator, client) = orchestrator(client);
    let wall = exterior_walls(&orchestrator)[0].clone();

    let started_at = tokio::time::Instant::now();
    let key = orchestrator
        .place_opening(OpeningCandidate::door(wall.clone(), 0.5, 36.0))
        .unwrap();
    assert_eq!(orchestrator.session().plan().openings.len(), 1);

    let outcomes = orchestrator.run_until_idle().await;
    assert_eq!(outcomes.len(), 4, "{:?}", outcomes);
    assert_eq!(outcomes[0], Outcome::Started { key });
    assert_eq!(
        outcomes[1],
        Outcome::Progress {
            key,
            progress: Some(0.3)
        }
    );
    assert!(matches!(outcomes[2], Outcome::Completed { key: k, .. } if k == key));
    assert_eq!(outcomes[3], Outcome::Expired { key });
    assert!(started_at.elapsed() >= POLL_INTERVAL * 2 + GRACE);

    let session = orchestrator.session();
    assert_eq!(session.plan().raster.bytes(), new_png.as_slice());
    assert_eq!(session.plan().drawing, new_drawing);
    assert_eq!(session.plan().openings.len(), 1);
    assert_eq!(session.plan().openings[0].wall_id, wall);
    assert!(session.editing_available());
    assert_eq!(session.job_count(), 0);

    let requests = client.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].opening.wall_id, wall);
    assert_eq!(requests[0].room_keys, vec!["bedroom", "living"]);
    assert_eq!(client.polls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_completed_job_stays_visible_during_grace() {
    let client = ScriptedClient::default()
        .accept("r1", None)
        .then_poll("r1", Ok(PollResponse::complete(STANDARD.encode(png(400, 200, 9)), None)));
    let (mut orchestrator, _client) = orchestrator(client);
    let wall = exterior_walls(&orchestrator)[0].clone();
    let key = orchestrator
        .place_opening(OpeningCandidate::window(wall, 0.5, 30.0))
        .unwrap();

    assert_eq!(orchestrator.next_update().await, Some(Outcome::Started { key }));
    assert!(matches!(orchestrator.next_update().await, Some(Outcome::Completed { .. })));
    let job = orchestrator.session().job(key).unwrap();
    assert_eq!(job.status, JobStatus::Complete);
    // No drawing from either response: the plan keeps its drawing
    assert_eq!(orchestrator.session().plan().drawing, DRAWING);

    assert_eq!(orchestrator.next_update().await, Some(Outcome::Expired { key }));
    assert_eq!(orchestrator.next_update().await, None);
}

#[tokio::test(start_paused = true)]
async fn test_failed_render_rolls_back() {
    let client = ScriptedClient::default()
        .accept("r1", None)
        .then_poll("r1", Ok(PollResponse::failed("no capacity")));
    let (mut orchestrator, _client) = orchestrator(client);
    let before = orchestrator.session().plan().raster.clone();
    let wall = exterior_walls(&orchestrator)[0].clone();

    let key = orchestrator
        .place_opening(OpeningCandidate::door(wall, 0.5, 36.0))
        .unwrap();
    let outcomes = orchestrator.run_until_idle().await;

    assert_eq!(outcomes.len(), 2);
    assert!(matches!(
        &outcomes[1],
        Outcome::Failed { key: k, reason, .. } if *k == key && reason == "no capacity"
    ));
    let session = orchestrator.session();
    assert!(session.plan().openings.is_empty());
    assert_eq!(session.plan().raster, before);
    assert_eq!(session.plan().drawing, DRAWING);
    assert_eq!(session.last_error(), Some("no capacity"));
}

#[tokio::test(start_paused = true)]
async fn test_submission_error_rolls_back() {
    let client = ScriptedClient::default().reject(ClientError::Status {
        status: 422,
        body: "wall not found".into(),
    });
    let (mut orchestrator, client) = orchestrator(client);
    let wall = exterior_walls(&orchestrator)[0].clone();
    orchestrator
        .place_opening(OpeningCandidate::door(wall, 0.5, 36.0))
        .unwrap();

    let outcomes = orchestrator.run_until_idle().await;
    assert_eq!(outcomes.len(), 1);
    assert!(matches!(&outcomes[0], Outcome::Failed { reason, .. } if reason.contains("422")));
    assert!(orchestrator.session().plan().openings.is_empty());
    assert_eq!(client.polls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_poll_budget_exhaustion_times_out() {
    let client = ScriptedClient::default().accept("r1", None);
    let (mut orchestrator, client) = orchestrator(client);
    let wall = exterior_walls(&orchestrator)[0].clone();
    orchestrator
        .place_opening(OpeningCandidate::door(wall, 0.5, 36.0))
        .unwrap();

    let outcomes = orchestrator.run_until_idle().await;
    // Started, five progress polls, then the timeout
    assert_eq!(outcomes.len(), 7, "{:?}", outcomes);
    assert!(matches!(outcomes.last(), Some(Outcome::Failed { .. })));
    assert_eq!(client.polls(), 5);
    assert!(orchestrator.session().plan().openings.is_empty());
    assert!(orchestrator.session().last_error().unwrap().contains('5'));
}

#[tokio::test(start_paused = true)]
async fn test_transient_poll_errors_are_retried() {
    let client = ScriptedClient::default()
        .accept("r1", None)
        .then_poll(
            "r1",
            Err(ClientError::Status {
                status: 503,
                body: String::new(),
            }),
        )
        .then_poll("r1", Ok(PollResponse::complete(STANDARD.encode(png(400, 200, 1)), None)));
    let (mut orchestrator, client) = orchestrator(client);
    let wall = exterior_walls(&orchestrator)[0].clone();
    orchestrator
        .place_opening(OpeningCandidate::door(wall, 0.5, 36.0))
        .unwrap();

    let outcomes = orchestrator.run_until_idle().await;
    assert!(outcomes.iter().any(|o| matches!(o, Outcome::Completed { .. })));
    assert_eq!(client.polls(), 2);
    assert_eq!(orchestrator.session().plan().openings.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_fatal_poll_error_fails_job() {
    let client = ScriptedClient::default()
        .accept("r1", None)
        .then_poll("r1", Err(ClientError::Decode("not json".into())));
    let (mut orchestrator, _client) = orchestrator(client);
    let wall = exterior_walls(&orchestrator)[0].clone();
    orchestrator
        .place_opening(OpeningCandidate::door(wall, 0.5, 36.0))
        .unwrap();

    let outcomes = orchestrator.run_until_idle().await;
    assert!(matches!(outcomes.last(), Some(Outcome::Failed { .. })));
    assert!(orchestrator.session().plan().openings.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_jobs_resolve_independently() {
    let client = ScriptedClient::default()
        .accept("r1", None)
        .accept("r2", None)
        .then_poll("r1", Ok(PollResponse::complete(STANDARD.encode(png(400, 200, 7)), None)))
        .then_poll("r2", Ok(PollResponse::failed("blocked by stairs")));
    let (mut orchestrator, _client) = orchestrator(client);
    let walls = exterior_walls(&orchestrator);

    let first = orchestrator
        .place_opening(OpeningCandidate::door(walls[0].clone(), 0.5, 36.0))
        .unwrap();
    let second = orchestrator
        .place_opening(OpeningCandidate::door(walls[1].clone(), 0.5, 36.0))
        .unwrap();
    assert_ne!(first, second);
    assert_eq!(orchestrator.session().plan().openings.len(), 2);
    assert_eq!(orchestrator.session().active_job_count(), 2);

    let outcomes = orchestrator.run_until_idle().await;
    assert_eq!(outcomes.iter().filter(|o| matches!(o, Outcome::Completed { .. })).count(), 1);
    assert_eq!(outcomes.iter().filter(|o| matches!(o, Outcome::Failed { .. })).count(), 1);

    let session = orchestrator.session();
    assert_eq!(session.plan().openings.len(), 1);
    assert_eq!(session.last_error(), Some("blocked by stairs"));
    assert_eq!(session.job_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_placement_rejected_before_submission() {
    let client = ScriptedClient::default().accept("r1", None);
    let (mut orchestrator, client) = orchestrator(client);
    let wall = exterior_walls(&orchestrator)[0].clone();

    orchestrator
        .place_opening(OpeningCandidate::door(wall.clone(), 0.5, 36.0))
        .unwrap();
    let err = orchestrator
        .place_opening(OpeningCandidate::door(wall, 0.55, 36.0))
        .unwrap_err();
    assert!(matches!(err, EditError::Rejected(PlacementRejection::Overlaps { .. })));
    assert_eq!(orchestrator.session().plan().openings.len(), 1);

    tokio::task::yield_now().await;
    assert!(client.requests().len() <= 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_polling_and_rolls_back() {
    let client = ScriptedClient::default().accept("r1", None);
    let (mut orchestrator, client) = orchestrator(client);
    let wall = exterior_walls(&orchestrator)[0].clone();
    let key = orchestrator
        .place_opening(OpeningCandidate::door(wall, 0.5, 36.0))
        .unwrap();

    assert_eq!(orchestrator.next_update().await, Some(Outcome::Started { key }));
    assert!(orchestrator.cancel(key));
    assert!(orchestrator.session().plan().openings.is_empty());
    assert_eq!(orchestrator.next_update().await, None);

    let polls = client.polls();
    tokio::time::sleep(POLL_INTERVAL * 10).await;
    assert_eq!(client.polls(), polls);
    assert!(!orchestrator.cancel(key));
}

#[tokio::test(start_paused = true)]
async fn test_unavailable_plan_never_submits() {
    let plan = Plan::new("p", "<svg viewBox=\"0 0 10 10\"/>", Raster::from_png(png(40, 40, 0)).unwrap());
    let session = EditorSession::new(plan, RoomPalette::default(), config());
    let client = Arc::new(ScriptedClient::default().accept("r1", None));
    let mut orchestrator = Orchestrator::new(session, Arc::clone(&client));

    assert!(!orchestrator.session().editing_available());
    assert!(matches!(
        orchestrator.place_opening(OpeningCandidate::door("wall-0", 0.5, 36.0)),
        Err(EditError::EditingUnavailable)
    ));
    assert_eq!(orchestrator.next_update().await, None);
    assert!(client.requests().is_empty());
}
