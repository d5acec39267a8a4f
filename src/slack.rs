//! Slack delivery for relayed alerts
//!
//! Messages go to an incoming webhook as a form-encoded `payload` field.
//! An optional [`AlertEnricher`] may add a line of context; if it fails or
//! takes too long the alert is posted without it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{instrument, trace, warn};

use crate::actors::dispatcher::Sink;
use crate::actors::messages::DispatchResult;
use crate::alerts::AlertEvent;
use crate::error::FetchError;
use crate::fetch::{FetchRequest, Fetcher};
use crate::history::AlertEnricher;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlackPayload {
    pub username: String,
    pub text: String,
}

pub struct MessageBuilder {
    username: String,
    lines: Vec<String>,
}

impl MessageBuilder {
    pub fn new(username: impl ToString) -> Self {
        Self {
            username: username.to_string(),
            lines: Vec::new(),
        }
    }

    pub fn line(mut self, line: impl ToString) -> Self {
        self.lines.push(line.to_string());
        self
    }

    pub fn build(self) -> SlackPayload {
        SlackPayload {
            username: self.username,
            text: self.lines.join("\n"),
        }
    }
}

/// Text of the chat message for an alert, before enrichment
pub fn alert_message(username: &str, alert: &AlertEvent) -> MessageBuilder {
    MessageBuilder::new(username)
        .line(":rotating_light: Anomaly detected")
        .line(alert.summary())
}

#[derive(Clone)]
pub struct SlackSink {
    webhook_url: String,
    username: String,
    timeout: Duration,
    fetcher: Fetcher,
    enricher: Option<Arc<dyn AlertEnricher>>,
}

impl SlackSink {
    pub fn new(
        webhook_url: impl Into<String>,
        username: impl Into<String>,
        timeout: Duration,
        fetcher: Fetcher,
    ) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            username: username.into(),
            timeout,
            fetcher,
            enricher: None,
        }
    }

    pub fn with_enricher(mut self, enricher: Arc<dyn AlertEnricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    /// Best-effort extra context; never fails the delivery
    async fn enrichment(&self, alert: &AlertEvent) -> Option<String> {
        let enricher = self.enricher.as_ref()?;

        match tokio::time::timeout(self.timeout, enricher.enrich(alert)).await {
            Ok(Ok(line)) => line,
            Ok(Err(e)) => {
                warn!("history lookup failed, posting without it: {:#}", e);
                None
            }
            Err(_) => {
                warn!("history lookup timed out, posting without it");
                None
            }
        }
    }

    pub async fn build_payload(&self, alert: &AlertEvent) -> SlackPayload {
        let mut message = alert_message(&self.username, alert);
        if let Some(line) = self.enrichment(alert).await {
            message = message.line(line);
        }
        message.build()
    }

    async fn post(&self, payload: &SlackPayload) -> Result<reqwest::StatusCode, FetchError> {
        let json = serde_json::to_string(payload).map_err(FetchError::Encode)?;
        let request = FetchRequest::post(&self.webhook_url, self.timeout)
            .form(vec![("payload".to_string(), json)]);

        let fetched = self.fetcher.fetch(request).await?.require_ok()?;
        trace!("slack answered: {}", fetched.text());
        Ok(fetched.status)
    }
}

#[async_trait]
impl Sink for SlackSink {
    type Item = AlertEvent;

    fn name(&self) -> &str {
        "slack"
    }

    #[instrument(skip(self, alert), fields(org = %alert.org, check = %alert.check))]
    async fn deliver(&self, alert: AlertEvent) -> DispatchResult {
        let payload = self.build_payload(&alert).await;

        match self.post(&payload).await {
            Ok(status) => DispatchResult::delivered(status),
            Err(e) => DispatchResult::failed(e.status(), e),
        }
    }
}
