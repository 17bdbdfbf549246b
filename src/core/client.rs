use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::Value;

use crate::core::error::ApiError;
use crate::core::models::subscription::lenient_i64;

pub const DEFAULT_BASE_URL: &str = "https://www.88code.org";
pub const DEFAULT_TIMEOUT_MS: u64 = 8000;

/// Authenticated POST client for the subscription API.
///
/// The base URL is checked before each call so the key never goes out over
/// plain HTTP to a non-loopback host. Every call is raced against a fixed timeout; whichever finishes first wins
/// and the other future is dropped, which cancels the in-flight request or
/// the pending timer. No retries happen here.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// POST `path` and decode the response envelope into its payload.
    ///
    /// `Ok(None)` means the server sent no data (absent or null), which is
    /// not the same thing as an empty list.
    pub async fn request(&self, path: &str, api_key: &str) -> Result<Option<Value>, ApiError> {
        let body = self.post_raw(path, api_key).await?;
        decode_response(&body)
    }

    /// POST `path` and return the raw body text of a 2xx response.
    pub async fn post_raw(&self, path: &str, api_key: &str) -> Result<String, ApiError> {
        if api_key.trim().is_empty() {
            return Err(ApiError::MissingCredential);
        }
        validate_base_url(&self.base_url)?;

        let url = format!("{}{}", self.base_url, path);
        let after_ms = self.timeout.as_millis() as u64;
        let classify = move |e: reqwest::Error| {
            if e.is_timeout() {
                ApiError::Timeout { after_ms }
            } else {
                ApiError::Transport(e.to_string())
            }
        };

        let exchange = async {
            let response = self
                .http
                .post(&url)
                .header(AUTHORIZATION, format!("Bearer {}", api_key))
                .header(CONTENT_TYPE, "application/json")
                .send()
                .await
                .map_err(classify)?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.ok();
                return Err(ApiError::HttpStatus {
                    code: status.as_u16(),
                    body,
                });
            }

            response.text().await.map_err(classify)
        };

        let started = Instant::now();
        let result = tokio::select! {
            result = exchange => result,
            _ = tokio::time::sleep(self.timeout) => Err(ApiError::Timeout { after_ms }),
        };

        match &result {
            Ok(body) => tracing::debug!(
                path,
                elapsed_ms = started.elapsed().as_millis() as u64,
                bytes = body.len(),
                "request succeeded"
            ),
            Err(e) => tracing::debug!(
                path,
                elapsed_ms = started.elapsed().as_millis() as u64,
                error = %e,
                "request failed"
            ),
        }

        result
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default, deserialize_with = "lenient_i64")]
    code: i64,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

/// Bodies come in two shapes: the current envelope, or a bare array from
/// older API versions. The envelope is tried first.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ResponseBody {
    Envelope(Envelope),
    Bare(Vec<Value>),
}

/// Decode a response body into its payload.
pub fn decode_response(body: &str) -> Result<Option<Value>, ApiError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| ApiError::MalformedBody(e.to_string()))?;

    match serde_json::from_value::<ResponseBody>(value) {
        Ok(ResponseBody::Envelope(envelope)) => {
            if !envelope.ok {
                return Err(ApiError::RemoteRejected {
                    code: envelope.code,
                    message: envelope.msg.unwrap_or_default(),
                });
            }
            Ok(envelope.data.filter(|d| !d.is_null()))
        }
        Ok(ResponseBody::Bare(items)) => Ok(Some(Value::Array(items))),
        Err(_) => Err(ApiError::MalformedBody(
            "expected a response envelope or a JSON array".to_string(),
        )),
    }
}

/// Reject base URLs that would send the API key in clear text.
/// Plain HTTP is tolerated only for loopback hosts.
pub fn validate_base_url(url: &str) -> Result<(), ApiError> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| ApiError::InsecureEndpoint(format!("'{}' is not a URL ({})", url, e)))?;
    match parsed.scheme() {
        "https" => Ok(()),
        "http" if matches!(parsed.host_str(), Some("localhost") | Some("127.0.0.1")) => Ok(()),
        _ => Err(ApiError::InsecureEndpoint(format!(
            "must use HTTPS, got: {}",
            url
        ))),
    }
}
