use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Plan type as reported by the API. Only pay-per-use plans get special
/// treatment; everything else is carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum PlanType {
    PayPerUse,
    Other(String),
}

impl Default for PlanType {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for PlanType {
    fn from(value: String) -> Self {
        if value == "PAY_PER_USE" {
            Self::PayPerUse
        } else {
            Self::Other(value)
        }
    }
}

impl From<Option<String>> for PlanType {
    fn from(value: Option<String>) -> Self {
        value.map(Self::from).unwrap_or_default()
    }
}

impl From<PlanType> for String {
    fn from(value: PlanType) -> Self {
        match value {
            PlanType::PayPerUse => "PAY_PER_USE".to_string(),
            PlanType::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPlan {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub id: i64,
    #[serde(default)]
    pub subscription_name: Option<String>,
    #[serde(default)]
    pub billing_cycle: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub cost: f64,
    /// Credit granted per reset cycle
    #[serde(default, deserialize_with = "lenient_f64")]
    pub credit_limit: f64,
    #[serde(default)]
    pub plan_type: PlanType,
    #[serde(default)]
    pub features: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub current_credits: f64,
    /// Refill cycles left before expiry or renewal; upstream may send zero or negative values
    #[serde(default, deserialize_with = "lenient_i64")]
    pub reset_times: i64,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub subscription_plan_name: Option<String>,
    #[serde(default)]
    pub billing_cycle: Option<String>,
    #[serde(default)]
    pub billing_cycle_desc: Option<String>,
    #[serde(default)]
    pub subscription_status: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub auto_renew: bool,
    #[serde(default)]
    pub subscription_plan: SubscriptionPlan,
}

impl Subscription {
    /// Usable means flagged active and ending strictly after `now`. A missing
    /// end date can't be proven to be in the future, so it is not usable.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.end_date.is_some_and(|end| end > now)
    }

    pub fn plan_name(&self) -> &str {
        self.subscription_plan_name
            .as_deref()
            .or(self.subscription_plan.subscription_name.as_deref())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or("(unnamed)")
    }

    /// Human billing cycle, preferring the localized description.
    pub fn cycle_label(&self) -> &str {
        self.billing_cycle_desc
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.billing_cycle.as_deref())
            .or(self.subscription_plan.billing_cycle.as_deref())
            .unwrap_or("-")
    }
}

// The API is loose with numbers: nulls, strings and floats all show up.
// Anything unreadable becomes NaN so the credit engine can zero it out.
fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    })
}

pub(crate) fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = lenient_f64(deserializer)?;
    if value.is_finite() {
        Ok(value.trunc() as i64)
    } else {
        Ok(0)
    }
}

fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => parse_timestamp(&s),
        _ => None,
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(matches!(value, Some(serde_json::Value::Bool(true))))
}

/// Parse RFC 3339 timestamps, falling back to zone-less forms which are
/// interpreted in local time.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}
