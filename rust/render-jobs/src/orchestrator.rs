// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Render job orchestration
//!
//! The orchestrator owns the [`EditorSession`] and is the only writer to
//! it. Each admitted opening gets a background runner task; runners report
//! back over an unbounded channel and [`Orchestrator::next_update`] applies
//! their messages one at a time.

use crate::client::RenderClient;
use crate::error::EditError;
use crate::job::JobKey;
use crate::runner::{expire_after, run_job, PollSettings, RunnerMessage};
use crate::session::{EditorSession, Outcome};
use planedit_geometry::OpeningCandidate;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// Drives render jobs for one editing session.
pub struct Orchestrator<C: RenderClient> {
    session: EditorSession,
    client: Arc<C>,
    tx: UnboundedSender<RunnerMessage>,
    rx: UnboundedReceiver<RunnerMessage>,
    tasks: FxHashMap<JobKey, JoinHandle<()>>,
}

impl<C: RenderClient> Orchestrator<C> {
    pub fn new(session: EditorSession, client: Arc<C>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            session,
            client,
            tx,
            rx,
            tasks: FxHashMap::default(),
        }
    }

    pub fn session(&self) -> &EditorSession {
        &self.session
    }

    /// Give the session back, stopping every runner.
    pub fn into_session(self) -> EditorSession {
        for handle in self.tasks.into_values() {
            handle.abort();
        }
        self.session
    }

    /// Validate and place an opening, then start rendering it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn place_opening(&mut self, candidate: OpeningCandidate) -> Result<JobKey, EditError> {
        let key = self.session.admit(candidate)?;
        let request = match self.session.build_request(key) {
            Ok(request) => request,
            Err(e) => {
                self.session.cancel(key);
                return Err(e);
            }
        };

        let config = self.session.config();
        let settings = PollSettings {
            interval: config.poll_interval,
            max_attempts: config.max_poll_attempts,
        };
        let handle = tokio::spawn(run_job(
            Arc::clone(&self.client),
            key,
            request,
            settings,
            self.tx.clone(),
        ));
        self.tasks.insert(key, handle);
        Ok(key)
    }

    /// Wait for and apply the next runner message.
    ///
    /// Returns `None` once no jobs are tracked, including completed jobs
    /// still in their grace period.
    pub async fn next_update(&mut self) -> Option<Outcome> {
        if self.session.job_count() == 0 {
            return None;
        }
        let message = self.rx.recv().await?;
        let outcome = match message {
            RunnerMessage::Job(key, event) => {
                let outcome = self.session.handle(key, event);
                match &outcome {
                    Outcome::Completed { .. } => {
                        self.tasks.remove(&key);
                        let grace = self.session.config().completion_grace;
                        tokio::spawn(expire_after(key, grace, self.tx.clone()));
                    }
                    Outcome::Failed { .. } => {
                        self.tasks.remove(&key);
                    }
                    _ => {}
                }
                outcome
            }
            RunnerMessage::Expire(key) => {
                if self.session.expire(key) {
                    Outcome::Expired { key }
                } else {
                    Outcome::Ignored
                }
            }
        };
        Some(outcome)
    }

    /// Apply messages until no jobs remain.
    pub async fn run_until_idle(&mut self) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        while let Some(outcome) = self.next_update().await {
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Stop tracking a job and abort its runner.
    ///
    /// The opening is rolled back unless the job already completed. Work
    /// already accepted by the render service is not cancelled there.
    pub fn cancel(&mut self, key: JobKey) -> bool {
        if let Some(handle) = self.tasks.remove(&key) {
            handle.abort();
        }
        self.session.cancel(key).is_some()
    }
}
