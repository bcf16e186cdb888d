// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Render service client.

use crate::config::RenderServiceConfig;
use crate::error::ClientError;
use crate::types::{PollResponse, RenderRequest, SubmitResponse};
use serde::de::DeserializeOwned;
use std::future::Future;

/// Submits opening renders and reports their status.
pub trait RenderClient: Send + Sync + 'static {
    /// Start rendering an opening edit.
    fn submit(
        &self,
        request: &RenderRequest,
    ) -> impl Future<Output = Result<SubmitResponse, ClientError>> + Send;

    /// Fetch the status of a submitted job.
    fn poll(&self, job_id: &str) -> impl Future<Output = Result<PollResponse, ClientError>> + Send;
}

/// HTTP client for the openings render API.
pub struct HttpRenderClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpRenderClient {
    /// Create a client for the configured service.
    pub fn new(config: &RenderServiceConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

impl RenderClient for HttpRenderClient {
    async fn submit(&self, request: &RenderRequest) -> Result<SubmitResponse, ClientError> {
        tracing::debug!(
            plan = %request.plan_id,
            wall = %request.opening.wall_id,
            "Submitting opening render"
        );
        let resp = self
            .http
            .post(format!("{}/openings/render", self.base_url))
            .json(request)
            .send()
            .await?;
        Self::read_json(resp).await
    }

    async fn poll(&self, job_id: &str) -> Result<PollResponse, ClientError> {
        let resp = self
            .http
            .get(format!("{}/openings/status/{}", self.base_url, job_id))
            .send()
            .await?;
        Self::read_json(resp).await
    }
}
