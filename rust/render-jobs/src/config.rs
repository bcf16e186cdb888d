// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Render service and orchestration configuration.

use planedit_geometry::{BlendConfig, CropConfig, ExtractionConfig, PlacementConfig};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Connection and polling settings for the render service, loaded from
/// environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderServiceConfig {
    /// Base URL of the openings API.
    pub base_url: String,
    /// Delay between status polls in milliseconds.
    pub poll_interval_ms: u64,
    /// Maximum number of status polls before a job times out.
    pub max_poll_attempts: u32,
    /// How long a completed job stays visible in milliseconds.
    pub completion_grace_ms: u64,
    /// HTTP request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Blend only the opening region of the new render onto the old preview.
    pub blend_on_complete: bool,
}

impl RenderServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// Missing or unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("RENDER_BASE_URL")
                .ok()
                .map(|s| s.trim().trim_end_matches('/').to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.base_url),
            poll_interval_ms: env_or("RENDER_POLL_INTERVAL_MS", defaults.poll_interval_ms),
            max_poll_attempts: env_or("RENDER_MAX_POLL_ATTEMPTS", defaults.max_poll_attempts),
            completion_grace_ms: env_or("RENDER_COMPLETION_GRACE_MS", defaults.completion_grace_ms),
            request_timeout_secs: env_or("RENDER_REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs),
            blend_on_complete: env_or("RENDER_BLEND_ON_COMPLETE", defaults.blend_on_complete),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn completion_grace(&self) -> Duration {
        Duration::from_millis(self.completion_grace_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Orchestrator settings derived from this service configuration.
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            poll_interval: self.poll_interval(),
            max_poll_attempts: self.max_poll_attempts,
            completion_grace: self.completion_grace(),
            blend_on_complete: self.blend_on_complete,
            ..OrchestratorConfig::default()
        }
    }
}

impl Default for RenderServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api/drafted".into(),
            poll_interval_ms: 1500,
            max_poll_attempts: 120,
            completion_grace_ms: 2000,
            request_timeout_secs: 60,
            blend_on_complete: false,
        }
    }
}

/// Settings for an editing session and its render jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
    pub completion_grace: Duration,
    pub blend_on_complete: bool,
    /// Framing of the cropped drawing sent with each request.
    pub crop: CropConfig,
    pub extraction: ExtractionConfig,
    pub placement: PlacementConfig,
    pub blend: BlendConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1500),
            max_poll_attempts: 120,
            completion_grace: Duration::from_millis(2000),
            blend_on_complete: false,
            crop: CropConfig::default(),
            extraction: ExtractionConfig::default(),
            placement: PlacementConfig::default(),
            blend: BlendConfig::default(),
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    parse_or(std::env::var(name).ok().as_deref(), default)
}

fn parse_or<T: FromStr>(value: Option<&str>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RenderServiceConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000/api/drafted");
        assert_eq!(config.poll_interval(), Duration::from_millis(1500));
        assert_eq!(config.max_poll_attempts, 120);
        assert_eq!(config.completion_grace(), Duration::from_secs(2));
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
        assert!(!config.blend_on_complete);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        assert_eq!(parse_or(Some("250"), 1500u64), 250);
        assert_eq!(parse_or(Some(" 7 "), 1u32), 7);
        assert_eq!(parse_or(Some("soon"), 1500u64), 1500);
        assert_eq!(parse_or(Some("-3"), 120u32), 120);
        assert_eq!(parse_or(None, 120u32), 120);
        assert!(parse_or(Some("true"), false));
        assert!(!parse_or(Some("yes"), false));
    }

    #[test]
    fn test_orchestrator_config_follows_service() {
        let service = RenderServiceConfig {
            poll_interval_ms: 10,
            max_poll_attempts: 3,
            completion_grace_ms: 50,
            blend_on_complete: true,
            ..RenderServiceConfig::default()
        };
        let config = service.orchestrator_config();
        assert_eq!(config.poll_interval, Duration::from_millis(10));
        assert_eq!(config.max_poll_attempts, 3);
        assert_eq!(config.completion_grace, Duration::from_millis(50));
        assert!(config.blend_on_complete);
    }
}
