use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::core::client::{decode_response, ApiClient};
use crate::core::error::ApiError;
use crate::core::models::subscription::Subscription;

pub const SUBSCRIPTION_PATH: &str = "/api/subscription";
pub const RESET_PATH: &str = "/api/reset-credits";
/// Used when a reset succeeds but the server says nothing about it.
pub const DEFAULT_RESET_MESSAGE: &str = "Credit reset requested successfully";

/// Where the refresh controller gets its subscriptions from.
#[async_trait]
pub trait SubscriptionSource: Send + Sync {
    /// Currently usable subscriptions, evaluated against the wall clock at call time.
    async fn fetch_active(&self, api_key: &str) -> Result<Vec<Subscription>, ApiError>;

    /// Trigger one credit reset and return the confirmation text.
    async fn reset_credits(&self, api_key: &str, subscription_id: &str)
        -> Result<String, ApiError>;
}

pub struct SubscriptionRepository {
    client: ApiClient,
}

impl SubscriptionRepository {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Every subscription on the account, active or not.
    pub async fn fetch_all(&self, api_key: &str) -> Result<Vec<Subscription>, ApiError> {
        let payload = self.client.request(SUBSCRIPTION_PATH, api_key).await?;
        let items = match payload {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(ApiError::InvalidShape(format!(
                    "expected a list of subscriptions, got {}",
                    json_kind(&other)
                )))
            }
            None => {
                return Err(ApiError::InvalidShape(
                    "expected a list of subscriptions, got no data".to_string(),
                ))
            }
        };

        items
            .into_iter()
            .map(|item| {
                serde_json::from_value::<Subscription>(item)
                    .map_err(|e| ApiError::InvalidShape(format!("bad subscription entry: {}", e)))
            })
            .collect()
    }
}

#[async_trait]
impl SubscriptionSource for SubscriptionRepository {
    async fn fetch_active(&self, api_key: &str) -> Result<Vec<Subscription>, ApiError> {
        let all = self.fetch_all(api_key).await?;
        let total = all.len();
        let active = filter_active(all, Utc::now());
        tracing::debug!(total, active = active.len(), "fetched subscriptions");
        Ok(active)
    }

    async fn reset_credits(
        &self,
        api_key: &str,
        subscription_id: &str,
    ) -> Result<String, ApiError> {
        if api_key.trim().is_empty() {
            return Err(ApiError::MissingCredential);
        }
        let id = parse_subscription_id(subscription_id)?;
        let path = format!("{}/{}", RESET_PATH, id);
        let body = self.client.post_raw(&path, api_key).await?;
        interpret_reset_body(&body)
    }
}

/// Keep subscriptions that are active and end strictly after `now`.
pub fn filter_active(subs: Vec<Subscription>, now: DateTime<Utc>) -> Vec<Subscription> {
    subs.into_iter().filter(|s| s.is_usable_at(now)).collect()
}

// Integral floats above 2^53 may already have been rounded to a neighbour.
const MAX_EXACT_FLOAT_ID: f64 = 9_007_199_254_740_992.0;

/// Subscription ids must be finite integers. Accepts anything that parses
/// as a number ("42", "42.0") but rejects NaN, infinities, fractions and
/// ids that do not fit exactly in an `i64`.
pub fn parse_subscription_id(raw: &str) -> Result<i64, ApiError> {
    let invalid = || ApiError::InvalidArgument(raw.to_string());
    let trimmed = raw.trim();
    if let Ok(id) = trimmed.parse::<i64>() {
        return Ok(id);
    }
    let value: f64 = trimmed.parse().map_err(|_| invalid())?;
    if !value.is_finite() || value.fract() != 0.0 || value.abs() > MAX_EXACT_FLOAT_ID {
        return Err(invalid());
    }
    Ok(value as i64)
}

/// Reset responses are either a plain confirmation string or an envelope.
/// An empty 2xx body counts as success with the default message.
fn interpret_reset_body(body: &str) -> Result<String, ApiError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(DEFAULT_RESET_MESSAGE.to_string());
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::String(text)) => Ok(non_empty_or_default(&text)),
        Ok(Value::Object(map)) if map.contains_key("ok") => {
            decode_response(trimmed)?;
            let message = map
                .get("msg")
                .and_then(Value::as_str)
                .filter(|m| !m.trim().is_empty())
                .or_else(|| map.get("data").and_then(Value::as_str))
                .unwrap_or(DEFAULT_RESET_MESSAGE);
            Ok(non_empty_or_default(message))
        }
        Ok(_) => Ok(DEFAULT_RESET_MESSAGE.to_string()),
        Err(_) => Ok(trimmed.to_string()),
    }
}

fn non_empty_or_default(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        DEFAULT_RESET_MESSAGE.to_string()
    } else {
        text.to_string()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
