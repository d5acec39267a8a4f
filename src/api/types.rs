//! Request and response bodies of the relay endpoints

use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub queued_alerts: usize,
}

/// Form posted by a Slack outgoing webhook / slash command
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommandForm {
    #[serde(default)]
    pub text: String,
}

/// Reply shown in the channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandReply {
    pub text: String,
}
