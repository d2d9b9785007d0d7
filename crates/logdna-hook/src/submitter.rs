// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Batch submission to the LogDNA ingestion endpoint.
//!
//! A submission is a single authenticated POST:
//!
//! ```text
//! POST {ingest_url}?hostname=web-1&now=1700000000000[&mac=..][&ip=..]
//! Authorization: Basic base64(":" + api_key)
//! Content-Type: application/json
//!
//! {"lines": [{"timestamp": .., "line": .., "app": .., ...}]}
//! ```
//!
//! The response is accepted when the status is 204, or when it is 2xx and the
//! body is a JSON object with `"status": "ok"`.

use crate::config::Config;
use crate::entry::{unix_millis, Lines, LogEntry};
use crate::error::SubmitError;
use crate::http::get_client;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

/// Sends one batch and reports whether the remote accepted it.
///
/// Implementations never touch engine state; the engine decides what to do
/// with the batch based on the returned result.
#[async_trait]
pub trait BatchSubmitter: Send + Sync {
    async fn submit(&self, batch: &[LogEntry]) -> Result<(), SubmitError>;
}

pub struct HttpSubmitter {
    client: reqwest::Client,
    config: Arc<Config>,
}

impl HttpSubmitter {
    #[must_use]
    pub fn new(config: Arc<Config>) -> Self {
        let client = get_client(&config);
        HttpSubmitter { client, config }
    }

    fn query(&self, now: i64) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("hostname", self.config.hostname.clone()),
            ("now", now.to_string()),
        ];
        if let Some(mac) = self.config.mac.as_ref().filter(|m| !m.is_empty()) {
            query.push(("mac", mac.clone()));
        }
        if let Some(ip) = self.config.ip.as_ref().filter(|i| !i.is_empty()) {
            query.push(("ip", ip.clone()));
        }
        query
    }

    fn create_request(&self, body: Vec<u8>) -> reqwest::RequestBuilder {
        self.client
            .post(&self.config.ingest_url)
            .basic_auth("", Some(&self.config.api_key))
            .header(CONTENT_TYPE, "application/json")
            .query(&self.query(unix_millis(SystemTime::now())))
            .body(body)
    }
}

#[async_trait]
impl BatchSubmitter for HttpSubmitter {
    async fn submit(&self, batch: &[LogEntry]) -> Result<(), SubmitError> {
        if batch.is_empty() {
            return Ok(());
        }

        let lines = Lines::new(batch, self.config.app.as_deref(), self.config.env.as_deref());
        let body =
            serde_json::to_vec(&lines).map_err(|e| SubmitError::Payload(e.to_string()))?;

        debug!("Submitting {} lines ({} bytes)", batch.len(), body.len());
        let response = self
            .create_request(body)
            .send()
            .await
            .map_err(|e| SubmitError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SubmitError::HttpStatus(status.as_u16()));
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(());
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| SubmitError::Transport(e.to_string()))?;
        check_response_body(&body)
    }
}

fn check_response_body(body: &[u8]) -> Result<(), SubmitError> {
    let parsed: Value = serde_json::from_slice(body)
        .map_err(|e| SubmitError::BadResponse(format!("response is not JSON: {e}")))?;

    match parsed.get("status") {
        None => Err(SubmitError::BadResponse(
            "response has no 'status' key".to_string(),
        )),
        Some(Value::String(status)) if status == "ok" => Ok(()),
        Some(other) => Err(SubmitError::BadResponse(format!(
            "non-OK status: {other}"
        ))),
    }
}
