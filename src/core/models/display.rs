use serde::{Deserialize, Serialize};

/// One refresh outcome as handed to the display surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DisplayUpdate {
    #[serde(rename_all = "camelCase")]
    Ready {
        /// Aggregate total, e.g. "$52.34"
        sum_text: String,
        /// One line per active subscription
        detail_lines: Vec<String>,
        /// Set when the total moved since the previous successful poll
        changed: bool,
    },
    #[serde(rename_all = "camelCase")]
    Degraded { reason_text: String },
    Unconfigured,
}

impl DisplayUpdate {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}
