use std::time::Duration;

use log::{debug, info};
use reqwest::blocking::Client;
use serde::Serialize;

use crate::{
    errors::ReplayError,
    session::{FrameBatch, FrameBatchRequest, Session, SessionRequest},
};

use super::{FrameSource, SessionLoader};

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";
const LOAD_SESSION_PATH: &str = "/api/load-session";
const FRAMES_BATCH_PATH: &str = "/api/get-frames-batch";
// the server may have to download and process the whole session first
const LOAD_SESSION_TIMEOUT_S: u64 = 900;
const FRAMES_BATCH_TIMEOUT_S: u64 = 120;

/// Talks JSON over HTTP to the replay server.
#[derive(Clone, Debug)]
pub struct HttpBackend {
    base_url: String,
    client: Client,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Result<Self, ReplayError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let client = Client::builder()
            .build()
            .map_err(|e| ReplayError::HttpRequestError {
                url: base_url.clone(),
                source: e,
            })?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn post_json<T: Serialize>(
        &self,
        path: &str,
        body: &T,
        timeout: Duration,
    ) -> Result<String, ReplayError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(body)
            .send()
            .map_err(|e| ReplayError::HttpRequestError {
                url: url.clone(),
                source: e,
            })?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| ReplayError::HttpRequestError { url, source: e })?;

        if !status.is_success() {
            return Err(ReplayError::HttpStatusError {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }
        Ok(text)
    }
}

/// Prefers the `error` field of a JSON error body, falling back to the raw
/// text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

impl SessionLoader for HttpBackend {
    fn load_session(&self, request: &SessionRequest) -> Result<Session, ReplayError> {
        info!(
            "Loading session: year={}, round={}, type={}, refresh={}",
            request.year, request.round, request.session_type, request.force_refresh
        );
        let body = self.post_json(
            LOAD_SESSION_PATH,
            request,
            Duration::from_secs(LOAD_SESSION_TIMEOUT_S),
        )?;
        let session = Session::from_response_body(&body)?;
        info!(
            "Loaded session {} with {} frames",
            session.session_id, session.total_frames
        );
        Ok(session)
    }
}

impl FrameSource for HttpBackend {
    fn fetch_frames(&self, request: &FrameBatchRequest) -> Result<FrameBatch, ReplayError> {
        debug!(
            "Requesting frames {} to {}",
            request.start_index,
            request.start_index + request.count
        );
        let body = self.post_json(
            FRAMES_BATCH_PATH,
            request,
            Duration::from_secs(FRAMES_BATCH_TIMEOUT_S),
        )?;
        if body.trim().is_empty() {
            return Err(ReplayError::EmptyResponse);
        }
        serde_json::from_str(&body).map_err(|e| ReplayError::InvalidResponse { source: e })
    }

    fn asset_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }
}
