//! Alert events received from the pacemaker
//!
//! Only events describing an active condition are relayed to chat. An event
//! without a state, or with a resolved state (`OK`, `RESOLVED`), is suppressed.

use chrono::DateTime;
use serde::{Deserialize, Serialize};

/// Classification of an event's `state` field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertStatus {
    /// No state, or an empty one
    Missing,

    /// The anomaly is over
    Resolved,

    /// Anything else (`CRITICAL`, `WARNING`, ...)
    Active,
}

impl AlertStatus {
    pub fn classify(state: Option<&str>) -> Self {
        let Some(state) = state.filter(|s| !s.is_empty()) else {
            return AlertStatus::Missing;
        };

        let state = state.trim();
        if state.eq_ignore_ascii_case("ok") || state.eq_ignore_ascii_case("resolved") {
            AlertStatus::Resolved
        } else {
            AlertStatus::Active
        }
    }
}

/// One notification from the pacemaker
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(default)]
    pub org: String,

    #[serde(default)]
    pub check: String,

    /// Unix timestamp (seconds) at which the anomaly started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomaly_start: Option<i64>,

    /// Anomaly duration in seconds (older pacemaker releases)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomaly_duration: Option<i64>,

    #[serde(default)]
    pub tags: Vec<String>,
}

impl AlertEvent {
    pub fn status(&self) -> AlertStatus {
        AlertStatus::classify(self.state.as_deref())
    }

    /// Whether this event should be forwarded to chat
    pub fn is_active(&self) -> bool {
        self.status() == AlertStatus::Active
    }

    /// Human readable description of when the anomaly began
    pub fn anomaly_description(&self) -> Option<String> {
        if let Some(start) = self.anomaly_start {
            return Some(match DateTime::from_timestamp(start, 0) {
                Some(time) => format!("since {}", time.to_rfc3339()),
                None => format!("since {start}"),
            });
        }

        self.anomaly_duration
            .map(|duration| format!("for {duration}s"))
    }

    /// One-line summary used in chat messages and logs
    pub fn summary(&self) -> String {
        let state = self.state.as_deref().map(str::trim).unwrap_or("UNKNOWN");
        let mut text = format!("[{}] *{}* `{}`", state, self.org, self.check);

        if let Some(anomaly) = self.anomaly_description() {
            text.push_str(&format!(" anomalous {anomaly}"));
        }

        if !self.tags.is_empty() {
            text.push_str(&format!(" ({})", self.tags.join(", ")));
        }

        text
    }
}
