//! Platform HTTP client.
//!
//! Uses the curl crate (libcurl) for JSON POSTs with bearer auth. Every call
//! the jobs make goes through `post_expecting`, which applies the shared
//! retry policy; `post_json` is the single attempt underneath it.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use crate::config::Settings;
use crate::retry::{run_with_retry, RequestError, RetryPolicy};

/// Status and body of one platform response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u32,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON. An empty body decodes as `null`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, RequestError> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::from_value(serde_json::Value::Null)?);
        }
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Blocking client for the platform REST API.
#[derive(Debug, Clone)]
pub struct PlatformClient {
    bearer_token: String,
    connect_timeout: Duration,
    timeout: Duration,
    policy: RetryPolicy,
}

impl PlatformClient {
    pub fn new(
        bearer_token: impl Into<String>,
        connect_timeout: Duration,
        timeout: Duration,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            bearer_token: bearer_token.into(),
            connect_timeout,
            timeout,
            policy,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.bearer_token.clone(),
            Duration::from_secs(settings.connect_timeout_secs),
            Duration::from_secs(settings.timeout_secs),
            RetryPolicy::from_config(&settings.retry_config()),
        )
    }

    /// One POST with a JSON body. Returns the response whatever its status.
    pub fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<ApiResponse, RequestError> {
        let payload = serde_json::to_vec(body)?;
        let mut response_body: Vec<u8> = Vec::new();

        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.post(true)?;
        easy.post_fields_copy(&payload)?;
        easy.follow_location(true)?;
        easy.connect_timeout(self.connect_timeout)?;
        easy.timeout(self.timeout)?;

        let mut list = curl::easy::List::new();
        list.append(&format!("Authorization: Bearer {}", self.bearer_token))?;
        list.append("Content-Type: application/json")?;
        list.append("Accept: application/json")?;
        easy.http_headers(list)?;

        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                response_body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }

        let status = easy.response_code()?;
        Ok(ApiResponse {
            status,
            body: response_body,
        })
    }

    /// POST with retry. Any status other than `expected` is an error; 429 and
    /// 5xx responses and network failures are retried per the policy.
    pub fn post_expecting<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        expected: u32,
    ) -> Result<ApiResponse, RequestError> {
        run_with_retry(&self.policy, |attempt| {
            tracing::debug!(attempt, url, "POST");
            let resp = self.post_json(url, body)?;
            if resp.status == expected {
                Ok(resp)
            } else {
                tracing::info!(
                    attempt,
                    url,
                    status = resp.status,
                    "unexpected response: {}",
                    resp.text()
                );
                Err(RequestError::Status {
                    status: resp.status,
                    body: resp.text(),
                })
            }
        })
    }
}
